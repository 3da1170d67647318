use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, ReservationError, SlotKey, UpdateDoctorProfileRequest};

/// Doctor profiles, including the embedded reservation map.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError>;

    async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError>;

    async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError>;

    async fn update_profile(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorProfileRequest,
    ) -> Result<Doctor, DoctorError>;

    async fn toggle_availability(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError>;
}

/// Authoritative record of which slot keys are held.
///
/// `reserve` must be indivisible per doctor: of any number of concurrent
/// callers asking for the same slot key, at most one succeeds and the rest
/// get [`ReservationError::Conflict`].
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn reserve(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<(), ReservationError>;

    /// Frees the slot. Releasing a slot that is not held reports
    /// [`ReservationError::NotReserved`] and leaves state untouched.
    async fn release(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<(), ReservationError>;

    async fn is_reserved(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<bool, ReservationError>;
}
