use chrono::{Duration, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use crate::models::{DoctorSchedule, ExamType, FoundSlot};
use crate::services::occupancy::ElapsedCutoff;
use crate::services::schedule::SlotFilter;

/// Parameters of a forward scan for free slots.
#[derive(Debug, Clone, Copy)]
pub struct SlotSearch<'a> {
    pub exam: &'a ExamType,
    pub from: NaiveDate,
    pub horizon_days: u32,
    /// Slots on the cutoff's day must start after now + buffer; earlier days are skipped.
    pub cutoff: ElapsedCutoff,
    pub exclude_appointment_id: Option<Uuid>,
}

impl SlotSearch<'_> {
    fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.horizon_days as i64).map(move |offset| self.from + Duration::days(offset))
    }

    fn filter(&self) -> SlotFilter {
        SlotFilter {
            cutoff: Some(self.cutoff),
            exclude_appointment_id: self.exclude_appointment_id,
        }
    }
}

/// Greedy day-by-day scan. On each day the first doctor, in the given order, with any
/// free slot wins and its earliest slot is returned. Read-only.
pub fn find_next_slot(schedules: &[DoctorSchedule], search: &SlotSearch<'_>) -> Option<FoundSlot> {
    for date in search.days() {
        for schedule in schedules {
            if let Some(slot) = schedule.free_slots(date, search.exam, search.filter()).into_iter().next() {
                debug!("Next free slot for exam {} on {} with doctor {}", search.exam.id, date, schedule.doctor.id);
                return Some(FoundSlot {
                    doctor_id: schedule.doctor.id,
                    doctor_name: schedule.doctor.name.clone(),
                    date,
                    slot,
                });
            }
        }
    }
    None
}

/// Up to `limit` free slots, ordered by day, then time, then doctor order.
pub fn next_free_slots(schedules: &[DoctorSchedule], search: &SlotSearch<'_>, limit: usize) -> Vec<FoundSlot> {
    let mut found = Vec::new();

    for date in search.days() {
        let mut day: Vec<(usize, FoundSlot)> = schedules
            .iter()
            .enumerate()
            .flat_map(|(rank, schedule)| {
                schedule
                    .free_slots(date, search.exam, search.filter())
                    .into_iter()
                    .map(move |slot| {
                        (rank, FoundSlot {
                            doctor_id: schedule.doctor.id,
                            doctor_name: schedule.doctor.name.clone(),
                            date,
                            slot,
                        })
                    })
            })
            .collect();
        day.sort_by_key(|(rank, found)| (found.slot.start, *rank));

        for (_, slot) in day {
            if found.len() >= limit {
                return found;
            }
            found.push(slot);
        }
    }

    found
}
