use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::Rng;

use crate::model::{AttendanceRecord, AttendanceStatus, Course, Dataset, Faculty, Student};

pub const SEED_DAYS: i64 = 20;
pub const PRESENT_PROBABILITY: f64 = 0.8;

pub fn sample_courses() -> Vec<Course> {
    [
        ("1", "CS301", "Data Structures & Algorithms"),
        ("2", "CS302", "Web Development"),
        ("3", "CS303", "Object Oriented Programming"),
    ]
    .into_iter()
    .map(|(id, code, name)| Course {
        id: id.to_string(),
        code: code.to_string(),
        name: name.to_string(),
    })
    .collect()
}

pub fn sample_students() -> Vec<Student> {
    [
        ("s1", "Alex Johnson", "alex@example.com"),
        ("s2", "Samantha Lee", "samantha@example.com"),
        ("s3", "Michael Chen", "michael@example.com"),
    ]
    .into_iter()
    .map(|(id, name, email)| Student {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
    })
    .collect()
}

pub fn sample_faculty() -> Faculty {
    Faculty {
        id: "f1".to_string(),
        name: "Dr. Smith".to_string(),
        email: "drsmith@example.com".to_string(),
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Sample dataset covering the `SEED_DAYS` calendar days ending at `today`,
/// one record per course and student on each weekday.
pub fn generate<R: Rng>(today: NaiveDate, now: DateTime<Utc>, rng: &mut R) -> Dataset {
    let courses = sample_courses();
    let students = sample_students();
    let faculty = sample_faculty();

    let mut records = Vec::new();
    for offset in 0..SEED_DAYS {
        let date = today - Duration::days(offset);
        if is_weekend(date) {
            continue;
        }
        for course in &courses {
            for student in &students {
                let status = if rng.random_bool(PRESENT_PROBABILITY) {
                    AttendanceStatus::Present
                } else {
                    AttendanceStatus::Absent
                };
                records.push(AttendanceRecord {
                    id: crate::model::new_record_id(now),
                    student_id: student.id.clone(),
                    course_id: course.id.clone(),
                    date,
                    status,
                    marked_by: faculty.id.clone(),
                    created_at: now,
                    updated_at: now,
                });
            }
        }
    }

    Dataset {
        courses,
        students,
        faculty,
        attendance_records: records,
        version: 0,
    }
}
