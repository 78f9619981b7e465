use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::model::{self, AttendanceRecord, AttendanceStatus, Course, NewAttendance, Student};
use crate::storage::StoreError;
use crate::store::RecordStore;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq)]
pub struct CourseAttendance {
    /// `None` when records point at a course id that is not in the dataset.
    pub course: Option<Course>,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacultyCourseAttendance {
    pub course: Option<Course>,
    pub students: Vec<Student>,
    /// Most recent first.
    pub dates: Vec<NaiveDate>,
    pub attendance_by_date: BTreeMap<NaiveDate, BTreeMap<String, AttendanceRecord>>,
}

/// Queries and mutations over the attendance dataset. Holds no cache; every
/// call starts from a fresh `load()`.
pub struct AttendanceService<R: RecordStore> {
    store: R,
}

impl<R: RecordStore> AttendanceService<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    pub fn get_courses(&self) -> ServiceResult<Vec<Course>> {
        Ok(self.store.load()?.courses)
    }

    pub fn get_students(&self) -> ServiceResult<Vec<Student>> {
        Ok(self.store.load()?.students)
    }

    pub fn get_student_attendance(&self, student_id: &str) -> ServiceResult<Vec<CourseAttendance>> {
        let ds = self.store.load()?;
        let mut groups: Vec<CourseAttendance> = Vec::new();
        let mut group_ix: BTreeMap<String, usize> = BTreeMap::new();
        for record in ds.attendance_records {
            if record.student_id != student_id {
                continue;
            }
            let ix = match group_ix.get(&record.course_id) {
                Some(ix) => *ix,
                None => {
                    let course = ds.courses.iter().find(|c| c.id == record.course_id).cloned();
                    groups.push(CourseAttendance {
                        course,
                        records: Vec::new(),
                    });
                    group_ix.insert(record.course_id.clone(), groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[ix].records.push(record);
        }
        Ok(groups)
    }

    pub fn get_student_course_attendance(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> ServiceResult<CourseAttendance> {
        let ds = self.store.load()?;
        let records = ds
            .attendance_records
            .into_iter()
            .filter(|r| r.student_id == student_id && r.course_id == course_id)
            .collect();
        let course = ds.courses.into_iter().find(|c| c.id == course_id);
        Ok(CourseAttendance { course, records })
    }

    /// Every record under the course, whoever marked it. `faculty_id` is not
    /// used for filtering.
    pub fn get_faculty_course_attendance(
        &self,
        faculty_id: &str,
        course_id: &str,
    ) -> ServiceResult<FacultyCourseAttendance> {
        let ds = self.store.load()?;
        debug!(faculty_id, course_id, "faculty course attendance");

        let mut attendance_by_date: BTreeMap<NaiveDate, BTreeMap<String, AttendanceRecord>> =
            BTreeMap::new();
        for record in ds.attendance_records {
            if record.course_id != course_id {
                continue;
            }
            attendance_by_date
                .entry(record.date)
                .or_default()
                .insert(record.student_id.clone(), record);
        }
        let dates = attendance_by_date.keys().rev().copied().collect();
        let course = ds.courses.into_iter().find(|c| c.id == course_id);

        Ok(FacultyCourseAttendance {
            course,
            students: ds.students,
            dates,
            attendance_by_date,
        })
    }

    /// Writes the record for a (student, course, date) slot. An existing record
    /// in that slot is replaced in place by the new one, new id included.
    pub fn mark_attendance(&self, input: NewAttendance) -> ServiceResult<AttendanceRecord> {
        let mut ds = self.store.load()?;
        let record = input.into_record(model::now_millis());

        let existing = ds
            .attendance_records
            .iter()
            .position(|r| r.matches_slot(&record.student_id, &record.course_id, record.date));
        match existing {
            Some(ix) => {
                debug!(
                    replaced = %ds.attendance_records[ix].id,
                    id = %record.id,
                    "attendance slot overwritten"
                );
                ds.attendance_records[ix] = record.clone();
            }
            None => {
                debug!(id = %record.id, "attendance marked");
                ds.attendance_records.push(record.clone());
            }
        }

        self.store.save(&ds)?;
        Ok(record)
    }

    /// `Ok(None)` when no record has `id`; nothing is written in that case.
    pub fn update_attendance(
        &self,
        id: &str,
        status: AttendanceStatus,
    ) -> ServiceResult<Option<AttendanceRecord>> {
        let mut ds = self.store.load()?;
        let Some(record) = ds.attendance_records.iter_mut().find(|r| r.id == id) else {
            debug!(id, "update for unknown attendance id");
            return Ok(None);
        };
        record.status = status;
        record.updated_at = refreshed(record.created_at, model::now_millis());
        let updated = record.clone();

        self.store.save(&ds)?;
        debug!(id, ?status, "attendance updated");
        Ok(Some(updated))
    }

    /// Returns whether a record was removed. An unknown id is not an error.
    pub fn delete_attendance(&self, id: &str) -> ServiceResult<bool> {
        let mut ds = self.store.load()?;
        let before = ds.attendance_records.len();
        ds.attendance_records.retain(|r| r.id != id);
        let removed = ds.attendance_records.len() != before;

        if removed {
            self.store.save(&ds)?;
        }
        debug!(id, removed, "attendance delete");
        Ok(removed)
    }

    pub fn find_record(&self, id: &str) -> ServiceResult<Option<AttendanceRecord>> {
        Ok(self
            .store
            .load()?
            .attendance_records
            .into_iter()
            .find(|r| r.id == id))
    }
}

// Wall clocks can step backwards; updatedAt never precedes createdAt.
fn refreshed(created_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(created_at)
}
