use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AvailabilityWindow, DayAvailability, DoctorRule, ExamCategory, ScheduleException,
    ScheduleOpening, WindowSource,
};
use crate::services::time::weekday;

/// Merges a doctor's weekly rules, one-off openings and exceptions for one date.
///
/// Any exception for (doctor, date) vetoes the day. Otherwise every matching rule and
/// opening contributes its own window; overlapping windows are kept apart so each one
/// spawns its own slot grid.
pub fn aggregate_day(
    doctor_id: Uuid,
    date: NaiveDate,
    category: ExamCategory,
    rules: &[DoctorRule],
    openings: &[ScheduleOpening],
    exceptions: &[ScheduleException],
) -> DayAvailability {
    if let Some(exception) = exceptions
        .iter()
        .find(|e| e.doctor_id == doctor_id && e.date == date)
    {
        debug!("Doctor {} has an exception on {}", doctor_id, date);
        return DayAvailability::Blocked { reason: exception.reason.clone() };
    }

    let day_of_week = weekday(date);

    let from_rules = rules
        .iter()
        .filter(|r| r.doctor_id == doctor_id && r.day_of_week == day_of_week)
        .filter(|r| r.attendance.admits(category))
        .map(|r| AvailabilityWindow {
            start: r.start,
            end: r.end,
            source: WindowSource::Rule(r.id),
        });

    let from_openings = openings
        .iter()
        .filter(|o| o.doctor_id == doctor_id && o.date == date)
        .filter(|o| o.attendance.admits(category))
        .map(|o| AvailabilityWindow {
            start: o.start,
            end: o.end,
            source: WindowSource::Opening(o.id),
        });

    let mut windows: Vec<AvailabilityWindow> = from_rules.chain(from_openings).collect();
    if windows.is_empty() {
        return DayAvailability::NoSchedule;
    }

    windows.sort_by_key(|w| (w.start, w.end));
    DayAvailability::Open(windows)
}
