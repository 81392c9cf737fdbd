use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{DayAvailability, DoctorSchedule, ExamType, GridRow, Slot};
use crate::services::aggregator::aggregate_day;
use crate::services::occupancy::{day_grid, dedup_slots, filter_elapsed, filter_occupied, ElapsedCutoff};
use crate::services::slots::candidate_slots;

/// Options for turning a doctor's day into bookable slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotFilter {
    pub cutoff: Option<ElapsedCutoff>,
    /// Appointment ignored for occupancy, used when searching a new time for it.
    pub exclude_appointment_id: Option<Uuid>,
}

impl DoctorSchedule {
    pub fn day_availability(&self, date: NaiveDate, exam: &ExamType) -> DayAvailability {
        aggregate_day(
            self.doctor.id,
            date,
            exam.category,
            &self.rules,
            &self.openings,
            &self.exceptions,
        )
    }

    /// Bookable slots for one date: aggregate, generate, dedup, drop occupied and elapsed.
    pub fn free_slots(&self, date: NaiveDate, exam: &ExamType, filter: SlotFilter) -> Vec<Slot> {
        let Some(duration) = exam.slot_duration() else {
            return Vec::new();
        };
        let day = self.day_availability(date, exam);
        let candidates = dedup_slots(candidate_slots(day.windows(), duration));

        let appointments: Vec<_> = self
            .appointments
            .iter()
            .filter(|apt| apt.doctor_id == self.doctor.id && apt.date == date)
            .cloned()
            .collect();

        let free = filter_occupied(candidates, &appointments, filter.exclude_appointment_id);
        match filter.cutoff {
            Some(cutoff) => filter_elapsed(free, date, &cutoff),
            None => free,
        }
    }

    /// All candidate slots for the date with their occupancy, for display.
    pub fn grid(&self, date: NaiveDate, exam: &ExamType) -> Vec<GridRow> {
        let Some(duration) = exam.slot_duration() else {
            return Vec::new();
        };
        let day = self.day_availability(date, exam);
        let candidates = dedup_slots(candidate_slots(day.windows(), duration));
        let appointments: Vec<_> = self
            .appointments
            .iter()
            .filter(|apt| apt.doctor_id == self.doctor.id && apt.date == date)
            .cloned()
            .collect();

        day_grid(&candidates, &appointments)
    }
}
