use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::try_join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig};

use crate::models::{
    AvailabilityError, AvailabilityQuery, Doctor, DoctorSchedule, DoctorSlots, ExamCategory,
    ExamType, FoundSlot, GridQuery, GridRow, NextSlotQuery, Slot,
};
use crate::services::clock::ClinicClock;
use crate::services::repository::ScheduleRepository;
use crate::services::schedule::SlotFilter;
use crate::services::search::{find_next_slot, next_free_slots, SlotSearch};
use crate::services::time::parse_date;

const DEFAULT_DISPLAY_LIMIT: usize = 10;

/// Result of GetAvailability: one doctor's slots, or every doctor with at least one slot.
#[derive(Debug, Clone)]
pub enum AvailabilityResult {
    Doctor(Vec<Slot>),
    AllDoctors(Vec<DoctorSlots>),
}

pub struct AvailabilityService {
    repository: ScheduleRepository,
    clock: ClinicClock,
    config: SchedulingConfig,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_repository(ScheduleRepository::new(config), config.scheduling.clone())
    }

    pub fn with_repository(repository: ScheduleRepository, config: SchedulingConfig) -> Self {
        Self {
            clock: ClinicClock::new(config.utc_offset_hours),
            repository,
            config,
        }
    }

    /// GetAvailability. Pure listing: slots already started are dropped, no extra lead time.
    pub async fn get_availability(
        &self,
        query: AvailabilityQuery,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<AvailabilityResult, AvailabilityError> {
        let date = parse_date(&query.date)?;
        let exam = self.resolve_exam_type(query.exam_type_id, auth_token).await?;
        let filter = SlotFilter {
            cutoff: Some(self.clock.cutoff(now, 0)),
            exclude_appointment_id: query.exclude_appointment_id,
        };

        match query.doctor_id {
            Some(doctor_id) => {
                let doctor = self.resolve_doctor(doctor_id, &exam, auth_token).await?;
                let schedule = self.load_schedule(doctor, date, date, auth_token).await?;
                let slots = schedule.free_slots(date, &exam, filter);
                debug!("Doctor {} has {} free slots on {}", doctor_id, slots.len(), date);
                Ok(AvailabilityResult::Doctor(slots))
            }
            None => {
                let schedules = self.candidate_schedules(&exam, date, date, auth_token).await?;
                let by_doctor: Vec<DoctorSlots> = schedules
                    .iter()
                    .map(|schedule| DoctorSlots {
                        doctor_id: schedule.doctor.id,
                        doctor_name: schedule.doctor.name.clone(),
                        doctor_specialty: schedule.doctor.specialty.clone(),
                        slots: schedule.free_slots(date, &exam, filter),
                    })
                    .filter(|entry| !entry.slots.is_empty())
                    .collect();
                debug!("{} doctors have free {} slots on {}", by_doctor.len(), exam.category, date);
                Ok(AvailabilityResult::AllDoctors(by_doctor))
            }
        }
    }

    /// Earliest free slot within the search horizon, honouring the booking lead time today.
    pub async fn find_next_slot(
        &self,
        query: NextSlotQuery,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Option<FoundSlot>, AvailabilityError> {
        let horizon = self.config.next_slot_horizon_days;
        let (exam, from, schedules) = self.prepare_search(&query, horizon, now, auth_token).await?;

        let search = self.slot_search(&exam, from, horizon, now, query.exclude_appointment_id);
        let found = find_next_slot(&schedules, &search);
        match &found {
            Some(slot) => info!("Next free slot for exam {}: {} {} with doctor {}", exam.id, slot.date, slot.slot.start, slot.doctor_id),
            None => info!("No free slot for exam {} within {} days of {}", exam.id, horizon, from),
        }
        Ok(found)
    }

    /// Upcoming free slots for display over the short horizon.
    pub async fn next_free_slots(
        &self,
        query: NextSlotQuery,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<FoundSlot>, AvailabilityError> {
        let horizon = self.config.display_horizon_days;
        let limit = query.limit.unwrap_or(DEFAULT_DISPLAY_LIMIT);
        let (exam, from, schedules) = self.prepare_search(&query, horizon, now, auth_token).await?;

        let search = self.slot_search(&exam, from, horizon, now, query.exclude_appointment_id);
        Ok(next_free_slots(&schedules, &search, limit))
    }

    /// Occupancy grid for one doctor's day. Past slots stay visible.
    pub async fn day_grid(
        &self,
        doctor_id: Uuid,
        query: GridQuery,
        auth_token: &str,
    ) -> Result<Vec<GridRow>, AvailabilityError> {
        let date = parse_date(&query.date)?;
        let exam = self.resolve_exam_type(query.exam_type_id, auth_token).await?;
        let doctor = self.resolve_doctor(doctor_id, &exam, auth_token).await?;
        let schedule = self.load_schedule(doctor, date, date, auth_token).await?;
        Ok(schedule.grid(date, &exam))
    }

    /// Exam type must exist, take part in scheduling, be active and carry a duration.
    pub async fn resolve_exam_type(&self, exam_type_id: Uuid, auth_token: &str) -> Result<ExamType, AvailabilityError> {
        let exam = self.repository.get_exam_type(exam_type_id, auth_token).await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?
            .ok_or(AvailabilityError::ExamTypeNotFound)?;

        if !exam.is_schedulable() {
            return Err(AvailabilityError::NotSchedulable(exam.name));
        }
        if !exam.active {
            return Err(AvailabilityError::ExamTypeInactive);
        }
        if exam.slot_duration().is_none() {
            warn!("Exam type {} has no usable duration", exam.id);
            return Err(AvailabilityError::MissingDuration(exam.name));
        }
        Ok(exam)
    }

    async fn resolve_doctor(&self, doctor_id: Uuid, exam: &ExamType, auth_token: &str) -> Result<Doctor, AvailabilityError> {
        if !exam.is_bound_to(doctor_id) {
            warn!("Exam type {} is not bound to doctor {}", exam.id, doctor_id);
            return Err(AvailabilityError::BindingMismatch);
        }

        let doctor = self.repository.get_doctor(doctor_id, auth_token).await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?
            .ok_or(AvailabilityError::DoctorNotFound)?;

        if !doctor.active {
            return Err(AvailabilityError::DoctorInactive);
        }
        Ok(doctor)
    }

    async fn load_schedule(
        &self,
        doctor: Doctor,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<DoctorSchedule, AvailabilityError> {
        self.repository.load_schedule(doctor, from, to, auth_token).await
            .map_err(|e| AvailabilityError::Database(e.to_string()))
    }

    /// Doctors eligible for an exam when none was named. A consulta only ever has its own doctor.
    async fn candidate_schedules(
        &self,
        exam: &ExamType,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<DoctorSchedule>, AvailabilityError> {
        let doctors = match (exam.category, exam.doctor_id) {
            (ExamCategory::Consulta, Some(doctor_id)) => {
                match self.repository.get_doctor(doctor_id, auth_token).await
                    .map_err(|e| AvailabilityError::Database(e.to_string()))?
                {
                    Some(doctor) if doctor.active => vec![doctor],
                    _ => vec![],
                }
            }
            (ExamCategory::Consulta, None) => {
                warn!("Consulta exam type {} has no bound doctor", exam.id);
                vec![]
            }
            _ => self.repository.list_active_doctors(auth_token).await
                .map_err(|e| AvailabilityError::Database(e.to_string()))?,
        };

        // Read-only loads; safe to run concurrently. Order follows `doctors`.
        try_join_all(doctors.into_iter().map(|doctor| self.load_schedule(doctor, from, to, auth_token))).await
    }

    async fn prepare_search(
        &self,
        query: &NextSlotQuery,
        horizon_days: u32,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<(ExamType, NaiveDate, Vec<DoctorSchedule>), AvailabilityError> {
        let today = self.clock.today(now);
        let from = match &query.from {
            Some(raw) => parse_date(raw)?.max(today),
            None => today,
        };
        let to = from + Duration::days(i64::from(horizon_days.max(1)) - 1);

        let exam = self.resolve_exam_type(query.exam_type_id, auth_token).await?;
        let schedules = match query.doctor_id {
            Some(doctor_id) => {
                let doctor = self.resolve_doctor(doctor_id, &exam, auth_token).await?;
                vec![self.load_schedule(doctor, from, to, auth_token).await?]
            }
            None => self.candidate_schedules(&exam, from, to, auth_token).await?,
        };

        Ok((exam, from, schedules))
    }

    fn slot_search<'a>(
        &self,
        exam: &'a ExamType,
        from: NaiveDate,
        horizon_days: u32,
        now: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> SlotSearch<'a> {
        SlotSearch {
            exam,
            from,
            horizon_days,
            cutoff: self.clock.cutoff(now, self.config.booking_lead_minutes),
            exclude_appointment_id,
        }
    }
}
