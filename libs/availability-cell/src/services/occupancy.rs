use chrono::{NaiveDate, NaiveDateTime, Timelike};
use uuid::Uuid;

use crate::models::{Appointment, GridCellState, GridRow, Slot};

/// Half-open interval overlap. Touching intervals do not overlap.
pub fn overlaps(start: i32, end: i32, other_start: i32, other_end: i32) -> bool {
    !(end <= other_start || start >= other_end)
}

/// Sorts by start and collapses slots sharing an identical (start, end).
pub fn dedup_slots(mut slots: Vec<Slot>) -> Vec<Slot> {
    slots.sort();
    slots.dedup();
    slots
}

/// Appointments that still hold time, minus the one being moved, if any.
pub fn occupying<'a>(
    appointments: &'a [Appointment],
    exclude: Option<Uuid>,
) -> impl Iterator<Item = &'a Appointment> {
    appointments
        .iter()
        .filter(|apt| apt.occupies_time())
        .filter(move |apt| Some(apt.id) != exclude)
}

/// First active appointment overlapping `[start, end)`. Encaixe appointments count.
pub fn find_conflict<'a>(
    start: i32,
    end: i32,
    appointments: &'a [Appointment],
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    occupying(appointments, exclude).find(|apt| overlaps(start, end, apt.start, apt.end))
}

/// Hard filter: drops every slot touching an active appointment's time.
pub fn filter_occupied(slots: Vec<Slot>, appointments: &[Appointment], exclude: Option<Uuid>) -> Vec<Slot> {
    slots
        .into_iter()
        .filter(|slot| find_conflict(slot.start, slot.end, appointments, exclude).is_none())
        .collect()
}

/// Earliest bookable moment in clinic-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedCutoff {
    pub today: NaiveDate,
    pub now_minutes: i32,
    pub buffer_minutes: i32,
}

impl ElapsedCutoff {
    pub fn new(local_now: NaiveDateTime, buffer_minutes: i32) -> Self {
        let time = local_now.time();
        Self {
            today: local_now.date(),
            now_minutes: (time.hour() * 60 + time.minute()) as i32,
            buffer_minutes,
        }
    }

    pub fn admits(&self, date: NaiveDate, slot: &Slot) -> bool {
        if date > self.today {
            return true;
        }
        date == self.today && slot.start > self.now_minutes + self.buffer_minutes
    }
}

pub fn filter_elapsed(slots: Vec<Slot>, date: NaiveDate, cutoff: &ElapsedCutoff) -> Vec<Slot> {
    slots.into_iter().filter(|slot| cutoff.admits(date, slot)).collect()
}

/// Soft mode for grid rendering. Occupied slots stay visible.
///
/// A slot shows the appointment starting exactly on it, else a regular appointment starting
/// inside it; slots a regular appointment started before show it as continuing. Encaixe
/// appointments never continue: they show on their own start slot, or in `inserted` of the
/// row their start falls into.
pub fn day_grid(slots: &[Slot], appointments: &[Appointment]) -> Vec<GridRow> {
    let active: Vec<&Appointment> = occupying(appointments, None).collect();

    slots
        .iter()
        .map(|slot| {
            let starting = active
                .iter()
                .find(|apt| apt.start == slot.start)
                .or_else(|| {
                    active
                        .iter()
                        .find(|apt| !apt.is_encaixe && slot.start < apt.start && apt.start < slot.end)
                });
            let continuing = active
                .iter()
                .find(|apt| !apt.is_encaixe && apt.start < slot.start && slot.start < apt.end);

            let (state, appointment) = match (starting, continuing) {
                (Some(apt), _) => (GridCellState::Booked, Some(*apt)),
                (None, Some(apt)) => (GridCellState::Continuing, Some(*apt)),
                (None, None) => (GridCellState::Free, None),
            };

            let inserted = active
                .iter()
                .filter(|apt| apt.is_encaixe && slot.start < apt.start && apt.start < slot.end)
                .filter(|apt| !slots.iter().any(|s| s.start == apt.start))
                .map(|apt| (*apt).clone())
                .collect();

            GridRow {
                slot: *slot,
                state,
                appointment_id: appointment.map(|apt| apt.id),
                appointment: match state {
                    GridCellState::Booked => appointment.cloned(),
                    _ => None,
                },
                inserted,
            }
        })
        .collect()
}
