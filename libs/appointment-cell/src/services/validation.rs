use uuid::Uuid;

use availability_cell::models::{
    AppointmentStatus, DayAvailability, Doctor, DoctorSchedule, ExamType,
};
use availability_cell::services::occupancy::{occupying, overlaps};
use availability_cell::services::time::{minutes_to_time, parse_date, time_to_minutes};

use crate::models::{BookingError, BookingSlot, PatientDetails, SlotChecks};

const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;

/// Names a tool caller produces when it echoes its prompt instead of asking the patient.
const PLACEHOLDER_NAMES: &[&str] = &[
    "teste",
    "test",
    "paciente",
    "patient",
    "placeholder",
    "nome",
    "name",
    "nome completo",
    "nome do paciente",
    "nome_completo",
    "nome_do_paciente",
    "fulano",
    "fulano de tal",
    "xxx",
    "null",
    "undefined",
    "n/a",
];

// ==============================================================================
// INPUT SHAPE
// ==============================================================================

pub fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, BookingError> {
    Uuid::parse_str(raw.trim()).map_err(|_| BookingError::malformed(format!("{} '{}' is not a valid id", field, raw)))
}

/// Parses the raw interval. End must come after start.
pub fn parse_slot(
    doctor_id: &str,
    exam_type_id: &str,
    date: &str,
    start: &str,
    end: &str,
) -> Result<BookingSlot, BookingError> {
    let doctor_id = parse_uuid("doctor_id", doctor_id)?;
    let exam_type_id = parse_uuid("exam_type_id", exam_type_id)?;
    let date = parse_date(date).map_err(|e| BookingError::malformed(e.to_string()))?;
    let start = time_to_minutes(start).map_err(|e| BookingError::malformed(e.to_string()))?;
    let end = time_to_minutes(end).map_err(|e| BookingError::malformed(e.to_string()))?;

    if end <= start {
        return Err(BookingError::malformed(format!(
            "end {} must be after start {}",
            minutes_to_time(end),
            minutes_to_time(start)
        )));
    }

    Ok(BookingSlot { doctor_id, exam_type_id, date, start, end })
}

pub fn parse_status(raw: Option<&str>) -> Result<AppointmentStatus, BookingError> {
    match raw.map(str::trim) {
        None | Some("") | Some("reservado") => Ok(AppointmentStatus::Reservado),
        Some("confirmado") => Ok(AppointmentStatus::Confirmado),
        Some(other) => Err(BookingError::malformed(format!(
            "status '{}' is not allowed for a new appointment",
            other
        ))),
    }
}

/// Rejects unfilled templates like `[nome_completo_do_paciente]` and bare placeholder words.
pub fn validate_patient_name(raw: &str) -> Result<String, BookingError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(BookingError::malformed("patient name is empty"));
    }
    if name.contains('[') || name.contains(']') {
        return Err(BookingError::malformed(format!("patient name '{}' looks like a template", name)));
    }

    let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if PLACEHOLDER_NAMES.contains(&normalized.as_str()) {
        return Err(BookingError::malformed(format!("patient name '{}' is a placeholder", name)));
    }

    Ok(name.to_string())
}

/// Accepts `+`, spaces, parentheses and dashes around 8 to 15 digits.
pub fn validate_phone(raw: &str) -> Result<String, BookingError> {
    let phone = raw.trim();
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '(' | ')' | '-'))
        .collect();

    let valid = digits.chars().all(|c| c.is_ascii_digit())
        && (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len());
    if !valid {
        return Err(BookingError::malformed(format!("patient phone '{}' is not a valid number", phone)));
    }

    Ok(phone.to_string())
}

pub fn patient_details(name: Option<&str>, phone: Option<&str>) -> Result<PatientDetails, BookingError> {
    Ok(PatientDetails {
        name: name.map(validate_patient_name).transpose()?,
        phone: phone
            .filter(|p| !p.trim().is_empty())
            .map(validate_phone)
            .transpose()?,
    })
}

/// Cross-item rules of a multi-booking. Sorts `slots` by start.
pub fn check_batch(slots: &mut [BookingSlot], max_items: usize) -> Result<(), BookingError> {
    if slots.is_empty() {
        return Err(BookingError::malformed("a reservation needs at least one item"));
    }
    if slots.len() > max_items {
        return Err(BookingError::TooManyItems(max_items));
    }

    let date = slots[0].date;
    if slots.iter().any(|slot| slot.date != date) {
        return Err(BookingError::MixedDates);
    }

    slots.sort_by_key(|slot| slot.start);
    for pair in slots.windows(2) {
        if pair[0].end != pair[1].start {
            return Err(BookingError::NotContiguous {
                previous_end: minutes_to_time(pair[0].end),
                next_start: minutes_to_time(pair[1].start),
            });
        }
    }

    Ok(())
}

// ==============================================================================
// REFERENCE DATA
// ==============================================================================

pub fn check_exam_type(exam: Option<ExamType>) -> Result<ExamType, BookingError> {
    let exam = exam.ok_or(BookingError::ExamTypeNotFound)?;
    if !exam.active {
        return Err(BookingError::ExamTypeInactive);
    }
    if !exam.is_schedulable() {
        return Err(BookingError::CategoryNotBookable(exam.name));
    }
    if exam.slot_duration().is_none() {
        return Err(BookingError::MissingDuration(exam.name));
    }
    Ok(exam)
}

pub fn check_binding(exam: &ExamType, doctor_id: Uuid) -> Result<(), BookingError> {
    if exam.is_bound_to(doctor_id) {
        Ok(())
    } else {
        Err(BookingError::BindingMismatch)
    }
}

pub fn check_doctor(doctor: Option<Doctor>) -> Result<Doctor, BookingError> {
    let doctor = doctor.ok_or(BookingError::DoctorNotFound)?;
    if !doctor.active {
        return Err(BookingError::DoctorInactive);
    }
    Ok(doctor)
}

// ==============================================================================
// SCHEDULE
// ==============================================================================

/// Checks a requested interval against the doctor's day as currently stored.
///
/// Fails with the first violated rule: exception, no matching window, start outside every
/// window, duration other than the exam's, then overlap with an active appointment.
pub fn check_slot(
    schedule: &DoctorSchedule,
    exam: &ExamType,
    slot: &BookingSlot,
    checks: SlotChecks,
) -> Result<(), BookingError> {
    let windows = match schedule.day_availability(slot.date, exam) {
        DayAvailability::Blocked { .. } => return Err(BookingError::Unavailable(slot.date)),
        DayAvailability::NoSchedule => return Err(BookingError::NoSchedule(slot.date)),
        DayAvailability::Open(windows) => windows,
    };

    if checks.grid {
        if !windows.iter().any(|window| window.admits_start(slot.start)) {
            return Err(BookingError::OutOfWindow(minutes_to_time(slot.start)));
        }
        let expected = exam
            .slot_duration()
            .ok_or_else(|| BookingError::MissingDuration(exam.name.clone()))?;
        if slot.duration_minutes() != expected {
            return Err(BookingError::DurationMismatch {
                expected,
                actual: slot.duration_minutes(),
            });
        }
    }

    if checks.overlap {
        let conflict = occupying(&schedule.appointments, None)
            .filter(|apt| apt.doctor_id == slot.doctor_id && apt.date == slot.date)
            .filter(|apt| !(checks.ignore_encaixe && apt.is_encaixe))
            .find(|apt| overlaps(slot.start, slot.end, apt.start, apt.end));
        if let Some(existing) = conflict {
            return Err(BookingError::overlap(slot.start, slot.end, existing));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use availability_cell::models::{
        Appointment, AttendanceType, DoctorRule, ExamCategory, ScheduleException,
    };
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn exam(duration: i32) -> ExamType {
        ExamType {
            id: Uuid::new_v4(),
            name: "Ultrassom transvaginal".to_string(),
            category: ExamCategory::Ultrassom,
            duration_minutes: Some(duration),
            doctor_id: None,
            active: true,
            price: None,
        }
    }

    fn schedule() -> DoctorSchedule {
        let doctor = Doctor { id: Uuid::new_v4(), name: "Dra. Ana Souza".to_string(), specialty: None, active: true };
        DoctorSchedule {
            rules: vec![DoctorRule {
                id: Uuid::new_v4(),
                doctor_id: doctor.id,
                day_of_week: 1,
                start: 8 * 60,
                end: 12 * 60,
                attendance: AttendanceType::Ambos,
            }],
            openings: vec![],
            exceptions: vec![],
            appointments: vec![],
            doctor,
        }
    }

    fn slot(schedule: &DoctorSchedule, exam: &ExamType, start: i32, end: i32) -> BookingSlot {
        BookingSlot { doctor_id: schedule.doctor.id, exam_type_id: exam.id, date: monday(), start, end }
    }

    fn booked(schedule: &DoctorSchedule, start: i32, end: i32, is_encaixe: bool) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: schedule.doctor.id,
            exam_type_id: Uuid::new_v4(),
            date: monday(),
            start,
            end,
            status: AppointmentStatus::Reservado,
            patient_name: Some("Joana Prado".to_string()),
            patient_phone: None,
            is_encaixe,
            created_at: None,
        }
    }

    #[test]
    fn test_parse_slot_rejects_bad_shapes() {
        let doctor = Uuid::new_v4().to_string();
        let exam = Uuid::new_v4().to_string();

        assert!(parse_slot(&doctor, &exam, "2024-06-03", "08:00", "08:30").is_ok());
        assert_matches!(parse_slot("abc", &exam, "2024-06-03", "08:00", "08:30"), Err(BookingError::MalformedInput(_)));
        assert_matches!(parse_slot(&doctor, &exam, "03/06/2024", "08:00", "08:30"), Err(BookingError::MalformedInput(_)));
        assert_matches!(parse_slot(&doctor, &exam, "2024-06-03", "8:00", "08:30"), Err(BookingError::MalformedInput(_)));
        assert_matches!(parse_slot(&doctor, &exam, "2024-06-03", "09:00", "09:00"), Err(BookingError::MalformedInput(_)));
    }

    #[test]
    fn test_placeholder_names_rejected() {
        for name in ["[nome_completo_do_paciente]", "Maria [sobrenome]", "teste", "  Paciente ", "PLACEHOLDER", "nome   completo"] {
            assert_matches!(validate_patient_name(name), Err(BookingError::MalformedInput(_)), "{}", name);
        }
        assert_eq!(validate_patient_name(" Maria Teste da Silva ").unwrap(), "Maria Teste da Silva");
    }

    #[test]
    fn test_phone_digits() {
        assert!(validate_phone("+55 (11) 98765-4321").is_ok());
        assert!(validate_phone("98765432").is_ok());
        assert!(validate_phone("1234567").is_err());
        assert!(validate_phone("1234567890123456").is_err());
        assert!(validate_phone("11 9876x4321").is_err());
    }

    #[test]
    fn test_status_defaults_to_reservado() {
        assert_eq!(parse_status(None).unwrap(), AppointmentStatus::Reservado);
        assert_eq!(parse_status(Some("confirmado")).unwrap(), AppointmentStatus::Confirmado);
        assert!(parse_status(Some("finalizado")).is_err());
    }

    #[test]
    fn test_batch_must_be_contiguous_on_one_date() {
        let s = schedule();
        let e = exam(30);

        let mut ok = vec![slot(&s, &e, 510, 540), slot(&s, &e, 480, 510)];
        assert!(check_batch(&mut ok, 5).is_ok());
        assert_eq!(ok[0].start, 480);

        let mut gap = vec![slot(&s, &e, 480, 510), slot(&s, &e, 520, 550)];
        assert_matches!(check_batch(&mut gap, 5), Err(BookingError::NotContiguous { .. }));

        let mut overlap = vec![slot(&s, &e, 480, 510), slot(&s, &e, 500, 530)];
        assert_matches!(check_batch(&mut overlap, 5), Err(BookingError::NotContiguous { .. }));

        let mut mixed = vec![slot(&s, &e, 480, 510), slot(&s, &e, 510, 540)];
        mixed[1].date = monday().succ_opt().unwrap();
        assert_matches!(check_batch(&mut mixed, 5), Err(BookingError::MixedDates));

        let mut many: Vec<BookingSlot> = (0..6).map(|i| slot(&s, &e, 480 + i * 30, 510 + i * 30)).collect();
        assert_matches!(check_batch(&mut many, 5), Err(BookingError::TooManyItems(5)));

        assert_matches!(check_batch(&mut [], 5), Err(BookingError::MalformedInput(_)));
    }

    #[test]
    fn test_exam_type_checks_in_order() {
        let mut inactive_lab = exam(10);
        inactive_lab.category = ExamCategory::Laboratorio;
        inactive_lab.active = false;
        assert_matches!(check_exam_type(Some(inactive_lab.clone())), Err(BookingError::ExamTypeInactive));

        inactive_lab.active = true;
        assert_matches!(check_exam_type(Some(inactive_lab)), Err(BookingError::CategoryNotBookable(_)));
        assert_matches!(check_exam_type(None), Err(BookingError::ExamTypeNotFound));
    }

    #[test]
    fn test_exam_type_without_duration() {
        let mut lab = exam(10);
        lab.category = ExamCategory::Laboratorio;
        lab.duration_minutes = None;
        assert_matches!(check_exam_type(Some(lab)), Err(BookingError::CategoryNotBookable(_)));

        let mut unset = exam(10);
        unset.duration_minutes = None;
        assert_matches!(check_exam_type(Some(unset.clone())), Err(BookingError::MissingDuration(_)));
        assert_eq!(BookingError::MissingDuration(unset.name).kind(), crate::models::ErrorKind::StateConflict);
    }

    #[test]
    fn test_check_slot_accepts_grid_slot() {
        let s = schedule();
        let e = exam(30);
        assert!(check_slot(&s, &e, &slot(&s, &e, 720, 750), SlotChecks::regular()).is_ok());
    }

    #[test]
    fn test_check_slot_failures() {
        let mut s = schedule();
        let e = exam(30);

        assert_matches!(
            check_slot(&s, &e, &slot(&s, &e, 721, 751), SlotChecks::regular()),
            Err(BookingError::OutOfWindow(start)) if start == "12:01"
        );
        assert_matches!(
            check_slot(&s, &e, &slot(&s, &e, 480, 520), SlotChecks::regular()),
            Err(BookingError::DurationMismatch { expected: 30, actual: 40 })
        );

        let existing = booked(&s, 540, 570, false);
        s.appointments.push(existing.clone());
        assert_matches!(
            check_slot(&s, &e, &slot(&s, &e, 555, 585), SlotChecks::regular()),
            Err(BookingError::OverlapConflict { existing_id, .. }) if existing_id == existing.id
        );
        // Touching intervals are fine.
        assert!(check_slot(&s, &e, &slot(&s, &e, 570, 600), SlotChecks::regular()).is_ok());

        let sunday = BookingSlot { date: monday().pred_opt().unwrap(), ..slot(&s, &e, 480, 510) };
        assert_matches!(check_slot(&s, &e, &sunday, SlotChecks::regular()), Err(BookingError::NoSchedule(_)));

        s.exceptions.push(ScheduleException { id: Uuid::new_v4(), doctor_id: s.doctor.id, date: monday(), reason: None });
        assert_matches!(check_slot(&s, &e, &slot(&s, &e, 480, 510), SlotChecks::regular()), Err(BookingError::Unavailable(_)));
    }

    #[test]
    fn test_cancelled_appointments_do_not_block() {
        let mut s = schedule();
        let e = exam(30);
        let mut cancelled = booked(&s, 480, 510, false);
        cancelled.status = AppointmentStatus::Cancelado;
        s.appointments.push(cancelled);

        assert!(check_slot(&s, &e, &slot(&s, &e, 480, 510), SlotChecks::regular()).is_ok());
    }

    #[test]
    fn test_encaixe_skips_grid_and_ignores_other_encaixes() {
        let mut s = schedule();
        let e = exam(30);
        s.appointments.push(booked(&s, 600, 610, true));

        // Off grid, past the window, odd length.
        let fit = slot(&s, &e, 725, 735);
        assert!(check_slot(&s, &e, &fit, SlotChecks::encaixe(true)).is_ok());
        assert!(check_slot(&s, &e, &slot(&s, &e, 600, 615), SlotChecks::encaixe(true)).is_ok());

        s.appointments.push(booked(&s, 720, 750, false));
        assert_matches!(check_slot(&s, &e, &fit, SlotChecks::encaixe(true)), Err(BookingError::OverlapConflict { .. }));
        assert!(check_slot(&s, &e, &fit, SlotChecks::encaixe(false)).is_ok());
    }

    #[test]
    fn test_encaixe_still_respects_exceptions() {
        let mut s = schedule();
        let e = exam(30);
        s.exceptions.push(ScheduleException { id: Uuid::new_v4(), doctor_id: s.doctor.id, date: monday(), reason: None });

        assert_matches!(
            check_slot(&s, &e, &slot(&s, &e, 700, 710), SlotChecks::encaixe(false)),
            Err(BookingError::Unavailable(_))
        );
    }
}
