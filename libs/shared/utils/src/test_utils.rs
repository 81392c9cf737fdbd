use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub service_role_key: String,
    pub scheduling: SchedulingConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            service_role_key: "test-service-role-key".to_string(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl TestConfig {
    /// Points the store at a mock server, e.g. `MockServer::uri()`.
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.service_role_key.clone(),
            bind_address: "127.0.0.1:0".to_string(),
            scheduling: self.scheduling.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Rows shaped like the PostgREST responses of the scheduling tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(id: &str, name: &str, specialty: &str, active: bool) -> Value {
        json!({
            "id": id,
            "name": name,
            "specialty": specialty,
            "active": active
        })
    }

    pub fn exam_type_response(
        id: &str,
        name: &str,
        category: &str,
        duration_minutes: i32,
        doctor_id: Option<&str>,
    ) -> Value {
        json!({
            "id": id,
            "name": name,
            "category": category,
            "duration_minutes": duration_minutes,
            "doctor_id": doctor_id,
            "active": true,
            "price": null
        })
    }

    pub fn rule_response(doctor_id: &str, day_of_week: u8, start: &str, end: &str, attendance: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "dia_semana": day_of_week,
            "hora_inicio": format!("{}:00", start),
            "hora_fim": format!("{}:00", end),
            "tipo_atendimento": attendance
        })
    }

    pub fn opening_response(doctor_id: &str, date: &str, start: &str, end: &str, attendance: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "data": date,
            "hora_inicio": start,
            "hora_fim": end,
            "tipo_atendimento": attendance,
            "motivo": "Atendimento extra"
        })
    }

    pub fn exception_response(doctor_id: &str, date: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "data": date,
            "motivo": "Férias"
        })
    }

    pub fn appointment_response(
        doctor_id: &str,
        exam_type_id: &str,
        date: &str,
        start: &str,
        end: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "exam_type_id": exam_type_id,
            "data": date,
            "hora_inicio": format!("{}:00", start),
            "hora_fim": format!("{}:00", end),
            "status": status,
            "patient_name": "Maria da Silva",
            "patient_phone": "+55 11 98765-4321",
            "is_encaixe": false,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
