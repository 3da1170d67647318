use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::models::{CalendarConfig, ReservationError, SlotKey};
use doctor_cell::services::{DoctorDirectory, ReservationStore};
use patient_cell::services::PatientDirectory;

use crate::models::{
    Actor, Appointment, AppointmentError, DoctorSnapshot, LedgerOutcome, NewAppointment,
    PatientSnapshot,
};
use crate::services::ledger::AppointmentLedger;

/// Keeps reservations and appointment records in step.
///
/// `calendar` must be the grid the slot listing shows, or bookings of
/// listed slots are rejected as off-grid.
///
/// Booking reserves before recording, and undoes the reservation if the
/// record cannot be written. Cancelling marks the record before releasing,
/// so an interrupted cancel leaves a cancelled appointment holding its slot,
/// which [`AppointmentLifecycleService::repair_reservations`] reports and can reclaim.
pub struct AppointmentLifecycleService {
    pub(crate) doctors: Arc<dyn DoctorDirectory>,
    pub(crate) reservations: Arc<dyn ReservationStore>,
    pub(crate) patients: Arc<dyn PatientDirectory>,
    pub(crate) ledger: Arc<dyn AppointmentLedger>,
    calendar: CalendarConfig,
}

impl AppointmentLifecycleService {
    pub fn new(
        doctors: Arc<dyn DoctorDirectory>,
        reservations: Arc<dyn ReservationStore>,
        patients: Arc<dyn PatientDirectory>,
        ledger: Arc<dyn AppointmentLedger>,
        calendar: CalendarConfig,
    ) -> Self {
        Self {
            doctors,
            reservations,
            patients,
            ledger,
            calendar,
        }
    }

    #[instrument(skip(self))]
    pub async fn book_appointment(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        slot: SlotKey,
    ) -> Result<Appointment, AppointmentError> {
        if !self.calendar.is_on_grid(&slot.time) {
            return Err(AppointmentError::InvalidSlot(format!(
                "{} is outside clinic hours or off the {}-minute grid",
                slot.time, self.calendar.slot_minutes
            )));
        }

        let doctor = self.doctors.get_doctor(doctor_id).await?;
        if !doctor.available {
            return Err(AppointmentError::DoctorNotAvailable);
        }
        let patient = self.patients.get_patient(user_id).await?;

        if let Err(e) = self.reservations.reserve(doctor_id, &slot).await {
            if e == ReservationError::Conflict {
                warn!("Slot {} of doctor {} lost to a concurrent booking", slot, doctor_id);
            }
            return Err(e.into());
        }

        let new_appointment = NewAppointment {
            user_id,
            doctor_id,
            slot,
            user_snapshot: PatientSnapshot::from(&patient),
            doctor_snapshot: DoctorSnapshot::from(&doctor),
            amount: doctor.fees,
        };

        match self.ledger.create(new_appointment).await {
            Ok(appointment) => {
                info!("Appointment {} booked for slot {} with doctor {}", appointment.id, slot, doctor_id);
                Ok(appointment)
            }
            Err(ledger_error) => Err(self.compensate(doctor_id, slot, ledger_error).await),
        }
    }

    /// Releases a slot whose appointment could not be recorded. Returns the
    /// error to surface: the ledger's own when the release worked,
    /// `CompensationFailed` when the slot is left stranded.
    async fn compensate(&self, doctor_id: Uuid, slot: SlotKey, ledger_error: AppointmentError) -> AppointmentError {
        match self.reservations.release(doctor_id, &slot).await {
            Ok(()) | Err(ReservationError::NotReserved) => {
                warn!("Released slot {} of doctor {} after failed booking: {}", slot, doctor_id, ledger_error);
                ledger_error
            }
            Err(release_error) => {
                error!(
                    "Slot {} of doctor {} stranded: booking failed ({}) and release failed ({})",
                    slot, doctor_id, ledger_error, release_error
                );
                AppointmentError::CompensationFailed {
                    doctor_id,
                    slot,
                    reason: format!("{}; release failed: {}", ledger_error, release_error),
                }
            }
        }
    }

    /// Cancels on behalf of `actor`. Cancelling twice, or cancelling a completed
    /// appointment, reports `AlreadyTerminal` and changes nothing.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        actor: Actor,
    ) -> Result<LedgerOutcome, AppointmentError> {
        let appointment = self.ledger.find_by_id(appointment_id).await?;
        if !actor.may_manage(&appointment) {
            return Err(AppointmentError::Forbidden);
        }
        if appointment.cancelled {
            debug!("Appointment {} already cancelled", appointment_id);
            return Ok(LedgerOutcome::AlreadyTerminal(appointment));
        }

        let outcome = self.ledger.mark_cancelled(appointment_id).await?;
        let LedgerOutcome::Applied(cancelled) = &outcome else {
            return Ok(outcome);
        };

        match self.reservations.release(cancelled.doctor_id, &cancelled.slot).await {
            Ok(()) => info!("Appointment {} cancelled, slot {} released", appointment_id, cancelled.slot),
            Err(ReservationError::NotReserved) => {
                warn!("Appointment {} cancelled but slot {} was not reserved", appointment_id, cancelled.slot)
            }
            Err(e) => warn!(
                "Appointment {} cancelled but releasing slot {} failed: {}",
                appointment_id, cancelled.slot, e
            ),
        }

        Ok(outcome)
    }

    /// The slot stays reserved: the visit happened.
    #[instrument(skip(self))]
    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<LedgerOutcome, AppointmentError> {
        let outcome = self.ledger.mark_completed(appointment_id, doctor_id).await?;
        if outcome.was_applied() {
            info!("Appointment {} completed", appointment_id);
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn mark_paid(&self, appointment_id: Uuid) -> Result<LedgerOutcome, AppointmentError> {
        let outcome = self.ledger.mark_paid(appointment_id).await?;
        if !outcome.was_applied() {
            warn!("Payment for cancelled appointment {} ignored", appointment_id);
        }
        Ok(outcome)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid, actor: Actor) -> Result<Appointment, AppointmentError> {
        let appointment = self.ledger.find_by_id(appointment_id).await?;
        if !actor.may_manage(&appointment) {
            return Err(AppointmentError::Forbidden);
        }
        Ok(appointment)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(newest_first(self.ledger.find_by_user(user_id).await?))
    }

    pub async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(newest_first(self.ledger.find_by_doctor(doctor_id).await?))
    }

    pub async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(newest_first(self.ledger.find_all().await?))
    }
}

pub(crate) fn newest_first(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    appointments
}
