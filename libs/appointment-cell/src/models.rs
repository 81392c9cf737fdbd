use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use availability_cell::models::Appointment;
use availability_cell::services::time::minutes_to_time;
use shared_models::error::AppError;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Single reservation as received on the wire. Ids, date and times stay raw until
/// validation so shape errors surface as input errors before any lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub doctor_id: String,
    pub exam_type_id: String,
    #[serde(alias = "data")]
    pub date: String,
    #[serde(alias = "hora_inicio")]
    pub start: String,
    #[serde(alias = "hora_fim")]
    pub end: String,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub is_encaixe: bool,
    /// `reservado` when absent.
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationItem {
    pub doctor_id: String,
    pub exam_type_id: String,
    #[serde(alias = "data")]
    pub date: String,
    #[serde(alias = "hora_inicio")]
    pub start: String,
    #[serde(alias = "hora_fim")]
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveMultipleRequest {
    pub items: Vec<ReservationItem>,
    pub patient_name: String,
    pub patient_phone: Option<String>,
}

// ==============================================================================
// VALIDATED VALUES
// ==============================================================================

/// One requested interval with every field parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingSlot {
    pub doctor_id: Uuid,
    pub exam_type_id: Uuid,
    pub date: NaiveDate,
    pub start: i32,
    pub end: i32,
}

impl BookingSlot {
    pub fn duration_minutes(&self) -> i32 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Which of the schedule checks apply to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChecks {
    /// Start inside a window and exact exam duration.
    pub grid: bool,
    pub overlap: bool,
    /// Only regular appointments block the request.
    pub ignore_encaixe: bool,
}

impl SlotChecks {
    pub fn regular() -> Self {
        Self { grid: true, overlap: true, ignore_encaixe: false }
    }

    /// Walk-in fit: off-grid and outside windows are allowed.
    pub fn encaixe(check_overlap: bool) -> Self {
        Self { grid: false, overlap: check_overlap, ignore_encaixe: true }
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// Created appointment with the names callers usually display next to it.
#[derive(Debug, Clone, Serialize)]
pub struct ReservedAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub exam_name: String,
    pub doctor_name: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Coarse classes callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    NotFound,
    /// The request can never succeed as-is.
    StateConflict,
    /// Someone else holds the time; retry with fresh availability.
    SchedulingConflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Invalid input: {0}")]
    MalformedInput(String),

    #[error("A reservation accepts at most {0} items")]
    TooManyItems(usize),

    #[error("All items of a reservation must share the same date")]
    MixedDates,

    #[error("Items must be contiguous: {previous_end} does not meet {next_start}")]
    NotContiguous { previous_end: String, next_start: String },

    #[error("Exam type not found")]
    ExamTypeNotFound,

    #[error("Exam type is inactive")]
    ExamTypeInactive,

    #[error("Exam type '{0}' does not use scheduling")]
    CategoryNotBookable(String),

    #[error("Exam type '{0}' has no duration configured")]
    MissingDuration(String),

    #[error("Exam type is not offered by this doctor")]
    BindingMismatch,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is inactive")]
    DoctorInactive,

    #[error("Doctor is unavailable on {0}")]
    Unavailable(NaiveDate),

    #[error("Doctor does not attend this exam type on {0}")]
    NoSchedule(NaiveDate),

    #[error("Start {0} is outside the doctor's hours")]
    OutOfWindow(String),

    #[error("Exam takes {expected} minutes, requested interval has {actual}")]
    DurationMismatch { expected: i32, actual: i32 },

    #[error("Requested time {start}-{end} is already taken")]
    OverlapConflict { start: String, end: String, existing_id: Uuid },

    #[error("Failed to store reservation after committing {committed} item(s); cancelled {cancelled}: {reason}")]
    PartialCommitRolledBack { committed: usize, cancelled: usize, reason: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl BookingError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        BookingError::MalformedInput(msg.into())
    }

    pub fn overlap(start: i32, end: i32, existing: &Appointment) -> Self {
        BookingError::OverlapConflict {
            start: minutes_to_time(start),
            end: minutes_to_time(end),
            existing_id: existing.id,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::MalformedInput(_)
            | BookingError::TooManyItems(_)
            | BookingError::MixedDates
            | BookingError::NotContiguous { .. } => ErrorKind::InputValidation,
            BookingError::ExamTypeNotFound | BookingError::DoctorNotFound => ErrorKind::NotFound,
            BookingError::ExamTypeInactive
            | BookingError::CategoryNotBookable(_)
            | BookingError::MissingDuration(_)
            | BookingError::BindingMismatch
            | BookingError::DoctorInactive
            | BookingError::Unavailable(_)
            | BookingError::NoSchedule(_)
            | BookingError::OutOfWindow(_)
            | BookingError::DurationMismatch { .. } => ErrorKind::StateConflict,
            BookingError::OverlapConflict { .. } => ErrorKind::SchedulingConflict,
            BookingError::PartialCommitRolledBack { .. } | BookingError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::InputValidation => AppError::ValidationError(msg),
            ErrorKind::NotFound => AppError::NotFound(msg),
            ErrorKind::StateConflict => AppError::Unprocessable(msg),
            ErrorKind::SchedulingConflict => AppError::Conflict(msg),
            ErrorKind::Internal => AppError::Database(msg),
        }
    }
}
