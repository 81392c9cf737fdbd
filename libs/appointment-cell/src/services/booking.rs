use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use availability_cell::models::{
    Appointment, AppointmentStatus, DoctorSchedule, ExamType, NewAppointment,
};
use availability_cell::services::repository::ScheduleRepository;
use shared_config::{AppConfig, MultiBookingCommit, SchedulingConfig};

use crate::models::{
    BookingError, BookingSlot, PatientDetails, ReserveMultipleRequest, ReserveRequest,
    ReservedAppointment, SlotChecks,
};
use crate::services::validation::{
    check_batch, check_binding, check_doctor, check_exam_type, check_slot, parse_slot,
    parse_status, patient_details,
};

fn store_error(err: anyhow::Error) -> BookingError {
    BookingError::Database(err.to_string())
}

pub struct BookingService {
    repository: ScheduleRepository,
    config: SchedulingConfig,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_repository(ScheduleRepository::new(config), config.scheduling.clone())
    }

    pub fn with_repository(repository: ScheduleRepository, config: SchedulingConfig) -> Self {
        Self { repository, config }
    }

    /// Reserve. Every rule is re-checked against the store right before the insert.
    pub async fn reserve(
        &self,
        request: ReserveRequest,
        auth_token: &str,
    ) -> Result<ReservedAppointment, BookingError> {
        let slot = parse_slot(
            &request.doctor_id,
            &request.exam_type_id,
            &request.date,
            &request.start,
            &request.end,
        )?;
        let patient = patient_details(request.patient_name.as_deref(), request.patient_phone.as_deref())?;
        let status = parse_status(request.status.as_deref())?;
        let checks = if request.is_encaixe {
            SlotChecks::encaixe(self.config.encaixe_checks_overlap)
        } else {
            SlotChecks::regular()
        };

        let exam = check_exam_type(self.get_exam_type(slot.exam_type_id, auth_token).await?)?;
        check_binding(&exam, slot.doctor_id)?;
        let schedule = self.load_doctor_day(slot.doctor_id, slot.date, auth_token).await?;

        if let Err(err) = check_slot(&schedule, &exam, &slot, checks) {
            warn!("Rejected reservation for doctor {} on {}: {}", slot.doctor_id, slot.date, err);
            return Err(err);
        }

        let row = new_row(&slot, &patient, status, request.is_encaixe);
        let appointment = self.repository.insert_appointment(&row, auth_token).await
            .map_err(store_error)?;

        info!(
            "Reserved appointment {} for doctor {} on {} at {}{}",
            appointment.id,
            slot.doctor_id,
            slot.date,
            request.start,
            if request.is_encaixe { " (encaixe)" } else { "" }
        );

        Ok(ReservedAppointment {
            appointment,
            exam_name: exam.name,
            doctor_name: schedule.doctor.name,
        })
    }

    /// ReserveMultiple. Nothing is written until every item has passed every check.
    pub async fn reserve_multiple(
        &self,
        request: ReserveMultipleRequest,
        auth_token: &str,
    ) -> Result<Vec<ReservedAppointment>, BookingError> {
        let mut slots = request
            .items
            .iter()
            .map(|item| parse_slot(&item.doctor_id, &item.exam_type_id, &item.date, &item.start, &item.end))
            .collect::<Result<Vec<_>, _>>()?;
        let patient = patient_details(Some(&request.patient_name), request.patient_phone.as_deref())?;

        check_batch(&mut slots, self.config.max_batch_items)?;

        // Lookups are shared by items with the same exam type or doctor.
        let mut exams: HashMap<Uuid, ExamType> = HashMap::new();
        let mut schedules: HashMap<Uuid, DoctorSchedule> = HashMap::new();
        let mut labels = Vec::with_capacity(slots.len());

        for slot in &slots {
            let exam = match exams.entry(slot.exam_type_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let exam = check_exam_type(self.get_exam_type(slot.exam_type_id, auth_token).await?)?;
                    entry.insert(exam)
                }
            };
            check_binding(exam, slot.doctor_id)?;

            let schedule = match schedules.entry(slot.doctor_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    entry.insert(self.load_doctor_day(slot.doctor_id, slot.date, auth_token).await?)
                }
            };

            if let Err(err) = check_slot(schedule, exam, slot, SlotChecks::regular()) {
                warn!("Rejected multi-reservation item for doctor {} on {}: {}", slot.doctor_id, slot.date, err);
                return Err(err);
            }

            labels.push((slot.doctor_id, slot.start, exam.name.clone(), schedule.doctor.name.clone()));
        }

        let rows: Vec<NewAppointment> = slots
            .iter()
            .map(|slot| new_row(slot, &patient, AppointmentStatus::Reservado, false))
            .collect();

        let created = match self.config.multi_booking_commit {
            MultiBookingCommit::Atomic => self.repository.insert_appointments(&rows, auth_token).await
                .map_err(store_error)?,
            MultiBookingCommit::Sequential => self.commit_sequential(&rows, auth_token).await?,
        };

        info!("Reserved {} contiguous appointments on {}", created.len(), slots[0].date);

        Ok(created
            .into_iter()
            .map(|appointment| {
                let (exam_name, doctor_name) = labels
                    .iter()
                    .find(|(doctor_id, start, _, _)| *doctor_id == appointment.doctor_id && *start == appointment.start)
                    .map(|(_, _, exam, doctor)| (exam.clone(), doctor.clone()))
                    .unwrap_or_default();
                ReservedAppointment { appointment, exam_name, doctor_name }
            })
            .collect())
    }

    /// Inserts row by row. On failure the rows already written are cancelled, best effort;
    /// a row whose cancellation also fails stays committed and is logged for manual cleanup.
    async fn commit_sequential(
        &self,
        rows: &[NewAppointment],
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut committed: Vec<Appointment> = Vec::with_capacity(rows.len());

        for row in rows {
            match self.repository.insert_appointment(row, auth_token).await {
                Ok(appointment) => committed.push(appointment),
                Err(err) if committed.is_empty() => return Err(store_error(err)),
                Err(err) => {
                    warn!(
                        "Insert failed after {} of {} items, cancelling committed rows: {}",
                        committed.len(),
                        rows.len(),
                        err
                    );
                    let cancelled = self.compensate(&committed, auth_token).await;
                    return Err(BookingError::PartialCommitRolledBack {
                        committed: committed.len(),
                        cancelled,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(committed)
    }

    async fn compensate(&self, committed: &[Appointment], auth_token: &str) -> usize {
        let mut cancelled = 0;
        for appointment in committed {
            match self.repository.cancel_appointment(appointment.id, auth_token).await {
                Ok(()) => cancelled += 1,
                Err(err) => error!(
                    "Appointment {} left committed after failed rollback, needs manual cancellation: {}",
                    appointment.id, err
                ),
            }
        }
        cancelled
    }

    async fn get_exam_type(&self, exam_type_id: Uuid, auth_token: &str) -> Result<Option<ExamType>, BookingError> {
        self.repository.get_exam_type(exam_type_id, auth_token).await.map_err(store_error)
    }

    /// Doctor plus a fresh read of the day's rules, exceptions and appointments.
    async fn load_doctor_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DoctorSchedule, BookingError> {
        let doctor = check_doctor(self.repository.get_doctor(doctor_id, auth_token).await.map_err(store_error)?)?;
        debug!("Loading {} for doctor {}", date, doctor.id);
        self.repository.load_schedule(doctor, date, date, auth_token).await.map_err(store_error)
    }
}

fn new_row(slot: &BookingSlot, patient: &PatientDetails, status: AppointmentStatus, is_encaixe: bool) -> NewAppointment {
    NewAppointment {
        doctor_id: slot.doctor_id,
        exam_type_id: slot.exam_type_id,
        date: slot.date,
        start: slot.start,
        end: slot.end,
        status,
        patient_name: patient.name.clone(),
        patient_phone: patient.phone.clone(),
        is_encaixe,
    }
}
