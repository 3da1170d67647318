use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, LedgerOutcome, NewAppointment};
use crate::services::ledger::AppointmentLedger;

/// Ledger held in process memory. Every mutation runs under the write lock,
/// so the terminal-state check and the flag update cannot interleave.
#[derive(Default)]
pub struct InMemoryAppointmentLedger {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<F>(&self, appointment_id: Uuid, apply: F) -> Result<LedgerOutcome, AppointmentError>
    where
        F: FnOnce(&mut Appointment) -> Result<bool, AppointmentError> + Send,
    {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound)?;

        if apply(appointment)? {
            Ok(LedgerOutcome::Applied(appointment.clone()))
        } else {
            Ok(LedgerOutcome::AlreadyTerminal(appointment.clone()))
        }
    }

    async fn select<P>(&self, predicate: P) -> Vec<Appointment>
    where
        P: Fn(&Appointment) -> bool + Send,
    {
        self.appointments
            .read()
            .await
            .values()
            .filter(|appointment| predicate(appointment))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AppointmentLedger for InMemoryAppointmentLedger {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let appointment = appointment.into_appointment(Uuid::new_v4(), Utc::now());
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());

        debug!("Recorded appointment {}", appointment.id);
        Ok(appointment)
    }

    async fn mark_cancelled(&self, appointment_id: Uuid) -> Result<LedgerOutcome, AppointmentError> {
        self.mutate(appointment_id, |appointment| {
            if appointment.is_terminal() {
                return Ok(false);
            }
            appointment.cancelled = true;
            Ok(true)
        })
        .await
    }

    async fn mark_completed(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<LedgerOutcome, AppointmentError> {
        self.mutate(appointment_id, |appointment| {
            if appointment.doctor_id != doctor_id {
                return Err(AppointmentError::Forbidden);
            }
            if appointment.is_terminal() {
                return Ok(false);
            }
            appointment.is_completed = true;
            Ok(true)
        })
        .await
    }

    async fn mark_paid(&self, appointment_id: Uuid) -> Result<LedgerOutcome, AppointmentError> {
        self.mutate(appointment_id, |appointment| {
            if appointment.cancelled {
                return Ok(false);
            }
            appointment.paid = true;
            Ok(true)
        })
        .await
    }

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn find_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.select(|appointment| appointment.doctor_id == doctor_id).await)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.select(|appointment| appointment.user_id == user_id).await)
    }

    async fn find_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.select(|_| true).await)
    }
}
