use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: u32,
}

impl AttendanceStats {
    pub fn from_counts(total: usize, present: usize) -> Self {
        Self {
            total,
            present,
            absent: total.saturating_sub(present),
            percentage: percentage(present, total),
        }
    }

    pub fn standing(&self) -> StandingLabel {
        StandingLabel::for_percentage(self.percentage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StandingLabel {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl StandingLabel {
    pub fn for_percentage(pct: u32) -> Self {
        if pct >= 90 {
            Self::Excellent
        } else if pct >= 75 {
            Self::Good
        } else if pct >= 60 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Rounded half away from zero; an empty set is 0%.
pub fn percentage(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (present as f64 / total as f64 * 100.0).round() as u32
}

pub fn compute<'a, I>(records: I) -> AttendanceStats
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut total = 0;
    let mut present = 0;
    for r in records {
        total += 1;
        if r.status == AttendanceStatus::Present {
            present += 1;
        }
    }
    AttendanceStats::from_counts(total, present)
}

pub fn last_attended<'a, I>(records: I) -> Option<NaiveDate>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    records
        .into_iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .map(|r| r.date)
        .max()
}

/// Totals across several courses, as shown on the student's overview card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallSummary {
    pub total_classes: usize,
    pub present: usize,
    pub absent: usize,
    pub courses: usize,
    pub percentage: u32,
    pub standing: StandingLabel,
}

pub fn overall<'a, I>(per_course: I) -> OverallSummary
where
    I: IntoIterator<Item = &'a AttendanceStats>,
{
    let mut courses = 0;
    let mut total = 0;
    let mut present = 0;
    for s in per_course {
        courses += 1;
        total += s.total;
        present += s.present;
    }
    let combined = AttendanceStats::from_counts(total, present);
    OverallSummary {
        total_classes: combined.total,
        present: combined.present,
        absent: combined.absent,
        courses,
        percentage: combined.percentage,
        standing: combined.standing(),
    }
}
