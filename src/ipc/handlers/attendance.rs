use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceStatus, NewAttendance};
use crate::service::{AttendanceService, ServiceError};
use crate::session::{CurrentUser, Role};
use crate::storage::SqliteStorage;
use crate::store::LocalRecordStore;
use crate::views;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use tracing::error;

type Service<'a> = AttendanceService<LocalRecordStore<SqliteStorage<'a>>>;

fn service(conn: &Connection) -> Service<'_> {
    AttendanceService::new(LocalRecordStore::new(SqliteStorage::new(conn)))
}

impl From<ServiceError> for HandlerErr {
    fn from(e: ServiceError) -> Self {
        error!(error = %e, "attendance storage failure");
        HandlerErr::new("storage_failed", e.to_string())
    }
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

fn get_status(params: &serde_json::Value) -> Result<AttendanceStatus, HandlerErr> {
    let raw = get_required_str(params, "status")?;
    AttendanceStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params("status must be present or absent"))
}

fn get_date(params: &serde_json::Value) -> Result<NaiveDate, HandlerErr> {
    let raw = get_required_str(params, "date")?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params("date must be YYYY-MM-DD"))
}

fn require_role(user: &CurrentUser, role: Role) -> Result<(), HandlerErr> {
    if user.role != role {
        return Err(HandlerErr::new(
            "forbidden",
            format!("{:?} access required", role).to_lowercase(),
        ));
    }
    Ok(())
}

fn courses(
    svc: &Service<'_>,
    _user: &CurrentUser,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "courses": svc.get_courses()? }))
}

fn students(
    svc: &Service<'_>,
    _user: &CurrentUser,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "students": svc.get_students()? }))
}

fn student_overview(
    svc: &Service<'_>,
    user: &CurrentUser,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_role(user, Role::Student)?;
    Ok(json!(views::student_overview(svc, &user.id)?))
}

fn student_course(
    svc: &Service<'_>,
    user: &CurrentUser,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_role(user, Role::Student)?;
    let course_id = get_required_str(params, "courseId")?;
    Ok(json!(views::student_course_view(svc, &user.id, &course_id)?))
}

fn mark(
    svc: &Service<'_>,
    user: &CurrentUser,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_role(user, Role::Faculty)?;
    let input = NewAttendance {
        student_id: get_required_str(params, "studentId")?,
        course_id: get_required_str(params, "courseId")?,
        date: get_date(params)?,
        status: get_status(params)?,
        marked_by: user.id.clone(),
    };
    let record = svc.mark_attendance(input)?;
    Ok(json!({ "record": record }))
}

fn update(
    svc: &Service<'_>,
    user: &CurrentUser,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let status = get_status(params)?;

    if user.role == Role::Student {
        let owned = svc
            .find_record(&id)?
            .map(|r| r.student_id == user.id)
            .unwrap_or(false);
        if !owned {
            // Unknown and foreign ids look the same to a student.
            return Err(HandlerErr::new("not_found", "attendance record not found"));
        }
    }

    match svc.update_attendance(&id, status)? {
        Some(record) => Ok(json!({ "record": record })),
        None => Err(HandlerErr::new("not_found", "attendance record not found")),
    }
}

fn delete(
    svc: &Service<'_>,
    user: &CurrentUser,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_role(user, Role::Faculty)?;
    let id = get_required_str(params, "id")?;
    let deleted = svc.delete_attendance(&id)?;
    Ok(json!({ "deleted": deleted }))
}

type Op =
    fn(&Service<'_>, &CurrentUser, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>;

fn run(state: &mut AppState, req: &Request, op: Op) -> serde_json::Value {
    let Some(user) = state.user.as_ref() else {
        return err(&req.id, "unauthenticated", "sign in first", None);
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match op(&service(conn), user, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_faculty_course(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(user) = state.user.as_ref() else {
        return err(&req.id, "unauthenticated", "sign in first", None);
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let result = require_role(user, Role::Faculty)
        .and_then(|()| get_required_str(&req.params, "courseId"))
        .and_then(|course_id| {
            views::faculty_course_view(
                &service(conn),
                &user.id,
                &course_id,
                &state.expanded_dates,
            )
            .map_err(HandlerErr::from)
        });
    match result {
        Ok(view) => ok(&req.id, json!(view)),
        Err(error) => error.response(&req.id),
    }
}

fn handle_toggle_date(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(user) = state.user.as_ref() else {
        return err(&req.id, "unauthenticated", "sign in first", None);
    };
    let date = require_role(user, Role::Faculty).and_then(|()| get_date(&req.params));
    match date {
        Ok(date) => {
            let key = date.format("%Y-%m-%d").to_string();
            let expanded = state.expanded_dates.toggle(&key);
            ok(&req.id, json!({ "date": key, "expanded": expanded }))
        }
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.courses" => Some(run(state, req, courses)),
        "attendance.students" => Some(run(state, req, students)),
        "attendance.studentOverview" => Some(run(state, req, student_overview)),
        "attendance.studentCourse" => Some(run(state, req, student_course)),
        "attendance.facultyCourse" => Some(handle_faculty_course(state, req)),
        "attendance.mark" => Some(run(state, req, mark)),
        "attendance.update" => Some(run(state, req, update)),
        "attendance.delete" => Some(run(state, req, delete)),
        "attendance.toggleDate" => Some(handle_toggle_date(state, req)),
        _ => None,
    }
}
