//! Read models for the portal's attendance screens. They are derived from
//! service queries on every call and never cached.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::model::{AttendanceRecord, Course, Student};
use crate::service::{AttendanceService, ServiceResult};
use crate::stats::{self, AttendanceStats, OverallSummary, StandingLabel};
use crate::store::RecordStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCourseView {
    pub course: Option<Course>,
    pub records: Vec<AttendanceRecord>,
    pub stats: AttendanceStats,
    pub standing: StandingLabel,
    pub last_attended: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course: Option<Course>,
    pub stats: AttendanceStats,
    pub standing: StandingLabel,
    pub last_attended: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentOverview {
    pub courses: Vec<CourseSummary>,
    pub overall: OverallSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacultyRow {
    pub student: Student,
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub expanded: bool,
    pub stats: AttendanceStats,
    pub rows: Vec<FacultyRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacultyCourseView {
    pub course: Option<Course>,
    pub students: Vec<Student>,
    pub groups: Vec<DateGroup>,
}

/// Which date groups are open in the faculty view. UI state only.
#[derive(Debug, Default, Clone)]
pub struct ExpandedDates {
    open: HashSet<String>,
}

impl ExpandedDates {
    /// Flips the group and returns whether it is now expanded.
    pub fn toggle(&mut self, date: &str) -> bool {
        if self.open.remove(date) {
            false
        } else {
            self.open.insert(date.to_string());
            true
        }
    }

    pub fn is_expanded(&self, date: &str) -> bool {
        self.open.contains(date)
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

pub fn student_course_view<R: RecordStore>(
    service: &AttendanceService<R>,
    student_id: &str,
    course_id: &str,
) -> ServiceResult<StudentCourseView> {
    let mut found = service.get_student_course_attendance(student_id, course_id)?;
    found.records.sort_by(|a, b| b.date.cmp(&a.date));
    let stats = stats::compute(&found.records);
    Ok(StudentCourseView {
        last_attended: stats::last_attended(&found.records),
        standing: stats.standing(),
        stats,
        course: found.course,
        records: found.records,
    })
}

pub fn student_overview<R: RecordStore>(
    service: &AttendanceService<R>,
    student_id: &str,
) -> ServiceResult<StudentOverview> {
    let courses: Vec<CourseSummary> = service
        .get_student_attendance(student_id)?
        .into_iter()
        .map(|group| {
            let stats = stats::compute(&group.records);
            CourseSummary {
                last_attended: stats::last_attended(&group.records),
                standing: stats.standing(),
                stats,
                course: group.course,
            }
        })
        .collect();
    let overall = stats::overall(courses.iter().map(|c| &c.stats));
    Ok(StudentOverview { courses, overall })
}

pub fn faculty_course_view<R: RecordStore>(
    service: &AttendanceService<R>,
    faculty_id: &str,
    course_id: &str,
    expanded: &ExpandedDates,
) -> ServiceResult<FacultyCourseView> {
    let mut found = service.get_faculty_course_attendance(faculty_id, course_id)?;

    let mut groups = Vec::with_capacity(found.dates.len());
    for date in &found.dates {
        let mut by_student = found.attendance_by_date.remove(date).unwrap_or_default();
        let rows: Vec<FacultyRow> = found
            .students
            .iter()
            .map(|s| FacultyRow {
                student: s.clone(),
                record: by_student.remove(&s.id),
            })
            .collect();
        // Records for student ids outside the roster have no row to sit in.
        if !by_student.is_empty() {
            debug!(%date, orphans = by_student.len(), "records without a roster student");
        }
        let stats = stats::compute(rows.iter().filter_map(|row| row.record.as_ref()));
        let key = date.format("%Y-%m-%d").to_string();
        groups.push(DateGroup {
            date: *date,
            expanded: expanded.is_expanded(&key),
            stats,
            rows,
        });
    }

    Ok(FacultyCourseView {
        course: found.course,
        students: found.students,
        groups,
    })
}
