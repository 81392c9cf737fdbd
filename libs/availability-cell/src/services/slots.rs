use crate::models::{AvailabilityWindow, Slot};
use crate::services::time::MINUTES_PER_DAY;

/// Fixed grid of candidate slots for one window.
///
/// Starts at `start` and advances by `step`; every start `<= end` is emitted, so a slot
/// may begin exactly at the window's end and run past it. No slot starts at or after
/// midnight. Yields nothing for a non-positive duration or step.
pub fn slot_grid(start: i32, end: i32, duration: i32, step: i32) -> impl Iterator<Item = Slot> {
    let valid = duration > 0 && step > 0 && start <= end;
    std::iter::successors(valid.then_some(start), move |t| Some(t + step))
        .take_while(move |t| *t <= end && *t < MINUTES_PER_DAY)
        .map(move |t| Slot::new(t, t + duration))
}

/// Grid for a window with the step equal to the exam duration.
pub fn window_slots(window: &AvailabilityWindow, duration: i32) -> impl Iterator<Item = Slot> {
    slot_grid(window.start, window.end, duration, duration)
}

/// Raw candidates across all windows, in window order. May contain duplicates.
pub fn candidate_slots(windows: &[AvailabilityWindow], duration: i32) -> Vec<Slot> {
    windows
        .iter()
        .flat_map(|window| window_slots(window, duration))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WindowSource;
    use uuid::Uuid;

    #[test]
    fn test_window_ending_at_midnight() {
        let starts: Vec<i32> = slot_grid(23 * 60, MINUTES_PER_DAY, 30, 30).map(|s| s.start).collect();
        assert_eq!(starts, vec![1380, 1410]);
    }

    #[test]
    fn test_grid_aligned_to_window_start() {
        // 14:00-16:00 with a 20 minute exam.
        let starts: Vec<i32> = slot_grid(840, 960, 20, 20).map(|s| s.start).collect();
        assert_eq!(starts, vec![840, 860, 880, 900, 920, 940, 960]);
    }

    #[test]
    fn test_window_end_is_last_permissible_start() {
        let slots: Vec<Slot> = slot_grid(480, 540, 30, 30).collect();
        assert_eq!(slots.last(), Some(&Slot::new(540, 570)));
    }

    #[test]
    fn test_grid_property_over_many_windows() {
        for start in [0, 415, 480, 1200] {
            for len in [0, 7, 30, 95, 240] {
                for duration in [5, 15, 20, 30, 45, 60] {
                    let end = start + len;
                    let slots: Vec<Slot> = slot_grid(start, end, duration, duration).collect();
                    let expected = (len / duration + 1) as usize;
                    assert_eq!(slots.len(), expected);
                    for (i, slot) in slots.iter().enumerate() {
                        assert_eq!(slot.start, start + i as i32 * duration);
                        assert!(slot.start >= start && slot.start <= end);
                        assert_eq!(slot.duration_minutes(), duration);
                    }
                }
            }
        }
    }

    #[test]
    fn test_degenerate_inputs_yield_nothing() {
        assert_eq!(slot_grid(480, 540, 0, 0).count(), 0);
        assert_eq!(slot_grid(480, 540, 30, -5).count(), 0);
        assert_eq!(slot_grid(600, 540, 30, 30).count(), 0);
    }

    #[test]
    fn test_explicit_step_differs_from_duration() {
        let slots: Vec<Slot> = slot_grid(480, 510, 30, 15).collect();
        assert_eq!(slots, vec![Slot::new(480, 510), Slot::new(495, 525), Slot::new(510, 540)]);
    }

    #[test]
    fn test_candidates_from_overlapping_windows_keep_duplicates() {
        let windows = [
            AvailabilityWindow { start: 480, end: 540, source: WindowSource::Rule(Uuid::new_v4()) },
            AvailabilityWindow { start: 510, end: 570, source: WindowSource::Opening(Uuid::new_v4()) },
        ];
        let slots = candidate_slots(&windows, 30);
        assert_eq!(slots.len(), 6);
        assert_eq!(slots.iter().filter(|s| s.start == 510).count(), 2);
    }
}
