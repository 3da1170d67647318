use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, LedgerOutcome, NewAppointment};

/// Appointment records and their status flags.
///
/// The ledger never touches reservations; keeping the two in step is the
/// lifecycle service's job. Status mutations are first-writer-wins: once an
/// appointment is cancelled or completed, later mutations report
/// [`LedgerOutcome::AlreadyTerminal`] and leave the record unchanged.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn mark_cancelled(&self, appointment_id: Uuid) -> Result<LedgerOutcome, AppointmentError>;

    /// `Forbidden` when `doctor_id` does not own the appointment, checked
    /// before the terminal state.
    async fn mark_completed(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<LedgerOutcome, AppointmentError>;

    /// A cancelled appointment is never marked paid.
    async fn mark_paid(&self, appointment_id: Uuid) -> Result<LedgerOutcome, AppointmentError>;

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError>;

    async fn find_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_all(&self) -> Result<Vec<Appointment>, AppointmentError>;
}
