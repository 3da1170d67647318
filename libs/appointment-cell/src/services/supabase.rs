use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentError, LedgerOutcome, NewAppointment};
use crate::services::ledger::AppointmentLedger;

const APPOINTMENTS: &str = "/rest/v1/appointments";
const ACTIVE: &str = "cancelled=eq.false&is_completed=eq.false";

/// PostgREST-backed ledger. Status changes are conditional PATCHes, so the
/// database applies the terminal-state check; an empty result is re-read to
/// tell a missing record from one that was already terminal.
pub struct SupabaseAppointmentLedger {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentLedger {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn conditional_patch(&self, filter: &str, body: Value) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("{}?{}", APPOINTMENTS, filter);
        let rows: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(rows.into_iter().next())
    }

    async fn fetch(&self, filter: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("{}?{}&order=created_at.desc", APPOINTMENTS, filter);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }
}

#[async_trait]
impl AppointmentLedger for SupabaseAppointmentLedger {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let appointment = appointment.into_appointment(Uuid::new_v4(), Utc::now());
        let body = serde_json::to_value(&appointment)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let rows: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            APPOINTMENTS,
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let created = rows.into_iter().next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to record appointment".to_string()))?;
        info!("Recorded appointment {}", created.id);
        Ok(created)
    }

    async fn mark_cancelled(&self, appointment_id: Uuid) -> Result<LedgerOutcome, AppointmentError> {
        let filter = format!("id=eq.{}&{}", appointment_id, ACTIVE);
        match self.conditional_patch(&filter, json!({ "cancelled": true })).await? {
            Some(updated) => Ok(LedgerOutcome::Applied(updated)),
            None => {
                let current = self.find_by_id(appointment_id).await?;
                debug!("Appointment {} already terminal, cancel skipped", appointment_id);
                Ok(LedgerOutcome::AlreadyTerminal(current))
            }
        }
    }

    async fn mark_completed(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<LedgerOutcome, AppointmentError> {
        let filter = format!("id=eq.{}&doctor_id=eq.{}&{}", appointment_id, doctor_id, ACTIVE);
        match self.conditional_patch(&filter, json!({ "is_completed": true })).await? {
            Some(updated) => Ok(LedgerOutcome::Applied(updated)),
            None => {
                let current = self.find_by_id(appointment_id).await?;
                if current.doctor_id != doctor_id {
                    return Err(AppointmentError::Forbidden);
                }
                Ok(LedgerOutcome::AlreadyTerminal(current))
            }
        }
    }

    async fn mark_paid(&self, appointment_id: Uuid) -> Result<LedgerOutcome, AppointmentError> {
        let filter = format!("id=eq.{}&cancelled=eq.false", appointment_id);
        match self.conditional_patch(&filter, json!({ "paid": true })).await? {
            Some(updated) => Ok(LedgerOutcome::Applied(updated)),
            None => Ok(LedgerOutcome::AlreadyTerminal(self.find_by_id(appointment_id).await?)),
        }
    }

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment_id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    async fn find_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch(&format!("doctor_id=eq.{}", doctor_id)).await
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch(&format!("user_id=eq.{}", user_id)).await
    }

    async fn find_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch("select=*").await
    }
}
