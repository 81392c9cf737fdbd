use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::services::time::{hhmm, TimeError};

// ==============================================================================
// REFERENCE DATA (read-only snapshots)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamCategory {
    Consulta,
    Ultrassom,
    /// Walk-in lab work. Never scheduled.
    Laboratorio,
}

impl fmt::Display for ExamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamCategory::Consulta => write!(f, "consulta"),
            ExamCategory::Ultrassom => write!(f, "ultrassom"),
            ExamCategory::Laboratorio => write!(f, "laboratorio"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamType {
    pub id: Uuid,
    pub name: String,
    pub category: ExamCategory,
    /// Unset for laboratorio rows.
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    pub active: bool,
    #[serde(default)]
    pub price: Option<f64>,
}

impl ExamType {
    pub fn is_schedulable(&self) -> bool {
        self.category != ExamCategory::Laboratorio
    }

    /// Slot length, when the row carries a usable one.
    pub fn slot_duration(&self) -> Option<i32> {
        self.duration_minutes.filter(|minutes| *minutes > 0)
    }

    /// Consultas belong to exactly one doctor; other categories are open to any doctor.
    pub fn is_bound_to(&self, doctor_id: Uuid) -> bool {
        match self.category {
            ExamCategory::Consulta => self.doctor_id == Some(doctor_id),
            _ => true,
        }
    }
}

/// Which exam categories a rule or opening serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceType {
    Consulta,
    Ultrassom,
    Ambos,
}

impl AttendanceType {
    pub fn admits(&self, category: ExamCategory) -> bool {
        match (self, category) {
            (_, ExamCategory::Laboratorio) => false,
            (AttendanceType::Ambos, _) => true,
            (AttendanceType::Consulta, ExamCategory::Consulta) => true,
            (AttendanceType::Ultrassom, ExamCategory::Ultrassom) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    #[serde(rename = "dia_semana")]
    pub day_of_week: u8, // 0 = Sunday, 1 = Monday, etc.
    #[serde(rename = "hora_inicio", with = "hhmm")]
    pub start: i32,
    /// Last permissible slot start, not a cutoff on slot end.
    #[serde(rename = "hora_fim", with = "hhmm")]
    pub end: i32,
    #[serde(rename = "tipo_atendimento")]
    pub attendance: AttendanceType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOpening {
    pub id: Uuid,
    pub doctor_id: Uuid,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "hora_inicio", with = "hhmm")]
    pub start: i32,
    #[serde(rename = "hora_fim", with = "hhmm")]
    pub end: i32,
    #[serde(rename = "tipo_atendimento")]
    pub attendance: AttendanceType,
    #[serde(rename = "motivo", default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleException {
    pub id: Uuid,
    pub doctor_id: Uuid,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "motivo", default)]
    pub reason: Option<String>,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Reservado,
    Confirmado,
    EmAtendimento,
    Finalizado,
    Cancelado,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Reservado => write!(f, "reservado"),
            AppointmentStatus::Confirmado => write!(f, "confirmado"),
            AppointmentStatus::EmAtendimento => write!(f, "em_atendimento"),
            AppointmentStatus::Finalizado => write!(f, "finalizado"),
            AppointmentStatus::Cancelado => write!(f, "cancelado"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub exam_type_id: Uuid,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "hora_inicio", with = "hhmm")]
    pub start: i32,
    #[serde(rename = "hora_fim", with = "hhmm")]
    pub end: i32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub is_encaixe: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Cancelled rows are logically deleted for scheduling purposes.
    pub fn occupies_time(&self) -> bool {
        self.status != AppointmentStatus::Cancelado
    }
}

/// Row shape written when committing a booking.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub exam_type_id: Uuid,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "hora_inicio", with = "hhmm")]
    pub start: i32,
    #[serde(rename = "hora_fim", with = "hhmm")]
    pub end: i32,
    pub status: AppointmentStatus,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub is_encaixe: bool,
}

// ==============================================================================
// COMPUTED VALUES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    #[serde(with = "hhmm")]
    pub start: i32,
    #[serde(with = "hhmm")]
    pub end: i32,
}

impl Slot {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i32 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSource {
    Rule(Uuid),
    Opening(Uuid),
}

/// One open interval of a doctor's day. `end` is the last permissible slot start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityWindow {
    pub start: i32,
    pub end: i32,
    pub source: WindowSource,
}

impl AvailabilityWindow {
    pub fn admits_start(&self, minutes: i32) -> bool {
        self.start <= minutes && minutes <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayAvailability {
    /// A schedule exception vetoes the whole day.
    Blocked { reason: Option<String> },
    /// No rule or opening serves this day and category.
    NoSchedule,
    Open(Vec<AvailabilityWindow>),
}

impl DayAvailability {
    pub fn windows(&self) -> &[AvailabilityWindow] {
        match self {
            DayAvailability::Open(windows) => windows,
            _ => &[],
        }
    }
}

/// Everything needed to compute one doctor's slots over a date range.
#[derive(Debug, Clone)]
pub struct DoctorSchedule {
    pub doctor: Doctor,
    pub rules: Vec<DoctorRule>,
    pub openings: Vec<ScheduleOpening>,
    pub exceptions: Vec<ScheduleException>,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSlots {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub doctor_specialty: Option<String>,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundSlot {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(flatten)]
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridCellState {
    Free,
    Booked,
    Continuing,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridRow {
    #[serde(flatten)]
    pub slot: Slot,
    pub state: GridCellState,
    /// The appointment starting at this row, or the one this row continues.
    pub appointment_id: Option<Uuid>,
    pub appointment: Option<Appointment>,
    /// Encaixe appointments starting inside this row but not on its start.
    pub inserted: Vec<Appointment>,
}

// ==============================================================================
// QUERIES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub exam_type_id: Uuid,
    pub date: String,
    pub doctor_id: Option<Uuid>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextSlotQuery {
    pub exam_type_id: Uuid,
    pub doctor_id: Option<Uuid>,
    /// First day to search; clinic-local today when absent.
    pub from: Option<String>,
    pub exclude_appointment_id: Option<Uuid>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridQuery {
    pub exam_type_id: Uuid,
    pub date: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Exam type not found")]
    ExamTypeNotFound,

    #[error("Exam type is inactive")]
    ExamTypeInactive,

    #[error("Exam type '{0}' does not use scheduling")]
    NotSchedulable(String),

    #[error("Exam type '{0}' has no duration configured")]
    MissingDuration(String),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is inactive")]
    DoctorInactive,

    #[error("Exam type is not offered by this doctor")]
    BindingMismatch,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<TimeError> for AvailabilityError {
    fn from(err: TimeError) -> Self {
        AvailabilityError::InvalidInput(err.to_string())
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidInput(msg) => AppError::ValidationError(msg),
            AvailabilityError::NotSchedulable(_) => AppError::BadRequest(err.to_string()),
            AvailabilityError::ExamTypeNotFound
            | AvailabilityError::DoctorNotFound
            | AvailabilityError::DoctorInactive => AppError::NotFound(err.to_string()),
            AvailabilityError::ExamTypeInactive
            | AvailabilityError::MissingDuration(_)
            | AvailabilityError::BindingMismatch => {
                AppError::Unprocessable(err.to_string())
            }
            AvailabilityError::Database(msg) => AppError::Database(msg),
        }
    }
}
