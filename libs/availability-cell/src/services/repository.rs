use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentStatus, Doctor, DoctorRule, DoctorSchedule, ExamType, NewAppointment,
    ScheduleException, ScheduleOpening,
};

/// Read access to the scheduling tables plus the appointment writes the booking path needs.
pub struct ScheduleRepository {
    supabase: Arc<SupabaseClient>,
}

impl ScheduleRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, auth_token: &str) -> Result<Vec<T>> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|e| anyhow!("Failed to parse rows from {}: {}", path, e))
    }

    pub async fn get_exam_type(&self, exam_type_id: Uuid, auth_token: &str) -> Result<Option<ExamType>> {
        let path = format!("/rest/v1/exam_types?id=eq.{}", exam_type_id);
        let mut rows: Vec<ExamType> = self.fetch(&path, auth_token).await?;
        Ok(rows.pop())
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Option<Doctor>> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let mut rows: Vec<Doctor> = self.fetch(&path, auth_token).await?;
        Ok(rows.pop())
    }

    /// Active doctors in a stable order (name, then id) so scans are deterministic.
    pub async fn list_active_doctors(&self, auth_token: &str) -> Result<Vec<Doctor>> {
        self.fetch("/rest/v1/doctors?active=eq.true&order=name.asc,id.asc", auth_token).await
    }

    pub async fn get_rules(&self, doctor_id: Uuid, auth_token: &str) -> Result<Vec<DoctorRule>> {
        let path = format!(
            "/rest/v1/doctor_rules?doctor_id=eq.{}&order=dia_semana.asc,hora_inicio.asc",
            doctor_id
        );
        self.fetch(&path, auth_token).await
    }

    pub async fn get_openings(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<ScheduleOpening>> {
        let path = format!(
            "/rest/v1/schedule_openings?doctor_id=eq.{}&data=gte.{}&data=lte.{}&order=data.asc,hora_inicio.asc",
            doctor_id, from, to
        );
        self.fetch(&path, auth_token).await
    }

    pub async fn get_exceptions(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<ScheduleException>> {
        let path = format!(
            "/rest/v1/schedule_exceptions?doctor_id=eq.{}&data=gte.{}&data=lte.{}",
            doctor_id, from, to
        );
        self.fetch(&path, auth_token).await
    }

    /// Appointments holding time for the doctor in the date range (cancelled rows excluded).
    pub async fn get_active_appointments(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&data=gte.{}&data=lte.{}&status=neq.{}&order=data.asc,hora_inicio.asc",
            doctor_id, from, to, AppointmentStatus::Cancelado
        );
        let appointments: Vec<Appointment> = self.fetch(&path, auth_token).await?;
        Ok(appointments.into_iter().filter(|apt| apt.occupies_time()).collect())
    }

    /// Loads everything needed to compute the doctor's slots between `from` and `to`.
    pub async fn load_schedule(
        &self,
        doctor: Doctor,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<DoctorSchedule> {
        debug!("Loading schedule for doctor {} from {} to {}", doctor.id, from, to);

        let (rules, openings, exceptions, appointments) = futures::try_join!(
            self.get_rules(doctor.id, auth_token),
            self.get_openings(doctor.id, from, to, auth_token),
            self.get_exceptions(doctor.id, from, to, auth_token),
            self.get_active_appointments(doctor.id, from, to, auth_token),
        )?;

        Ok(DoctorSchedule {
            doctor,
            rules,
            openings,
            exceptions,
            appointments,
        })
    }

    pub async fn insert_appointment(&self, row: &NewAppointment, auth_token: &str) -> Result<Appointment> {
        let mut created = self.insert_appointments(std::slice::from_ref(row), auth_token).await?;
        created.pop().ok_or_else(|| anyhow!("Failed to create appointment"))
    }

    /// Single bulk insert; the store applies all rows in one statement.
    pub async fn insert_appointments(&self, rows: &[NewAppointment], auth_token: &str) -> Result<Vec<Appointment>> {
        let body = serde_json::to_value(rows)?;

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        if result.len() != rows.len() {
            return Err(anyhow!("Expected {} created appointments, store returned {}", rows.len(), result.len()));
        }

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| anyhow!("Failed to parse created appointment: {}", e))
    }

    /// Logical deletion used to compensate a partially committed batch.
    pub async fn cancel_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<()> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let body = json!({ "status": AppointmentStatus::Cancelado });

        let updated: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        if updated.is_empty() {
            return Err(anyhow!("Appointment {} not found for cancellation", appointment_id));
        }
        Ok(())
    }
}

