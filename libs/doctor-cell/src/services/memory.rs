use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorError, ReservationError, SlotKey, UpdateDoctorProfileRequest,
};
use crate::services::store::{DoctorDirectory, ReservationStore};

type DoctorRecord = Arc<Mutex<Doctor>>;

/// Process-local doctor store. Each record sits behind its own mutex, which
/// is the serialization point for reservations on that doctor; different
/// doctors never wait on each other.
#[derive(Default)]
pub struct InMemoryDoctorStore {
    doctors: RwLock<HashMap<Uuid, DoctorRecord>>,
}

impl InMemoryDoctorStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, doctor_id: Uuid) -> Option<DoctorRecord> {
        self.doctors.read().await.get(&doctor_id).cloned()
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorStore {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let record = self.record(doctor_id).await.ok_or(DoctorError::NotFound)?;
        let doctor = record.lock().await.clone();
        Ok(doctor)
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        let records: Vec<DoctorRecord> = self.doctors.read().await.values().cloned().collect();

        let mut doctors = Vec::with_capacity(records.len());
        for record in records {
            doctors.push(record.lock().await.clone());
        }
        doctors.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(doctors)
    }

    async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        request.validate()?;

        let mut doctors = self.doctors.write().await;
        for record in doctors.values() {
            if record.lock().await.email.eq_ignore_ascii_case(&request.email) {
                return Err(DoctorError::Validation(format!(
                    "Doctor with email {} already exists",
                    request.email
                )));
            }
        }

        let doctor = request.into_doctor(Uuid::new_v4(), Utc::now());
        doctors.insert(doctor.id, Arc::new(Mutex::new(doctor.clone())));

        info!("Doctor {} created", doctor.id);
        Ok(doctor)
    }

    async fn update_profile(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorProfileRequest,
    ) -> Result<Doctor, DoctorError> {
        request.validate()?;

        let record = self.record(doctor_id).await.ok_or(DoctorError::NotFound)?;
        let mut doctor = record.lock().await;
        request.apply(&mut doctor);

        debug!("Doctor {} profile updated", doctor_id);
        Ok(doctor.clone())
    }

    async fn toggle_availability(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let record = self.record(doctor_id).await.ok_or(DoctorError::NotFound)?;
        let mut doctor = record.lock().await;
        doctor.available = !doctor.available;

        info!("Doctor {} is now {}", doctor_id, if doctor.available { "available" } else { "unavailable" });
        Ok(doctor.clone())
    }
}

#[async_trait]
impl ReservationStore for InMemoryDoctorStore {
    async fn reserve(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<(), ReservationError> {
        let record = self.record(doctor_id).await.ok_or(ReservationError::DoctorNotFound)?;

        // Held across the availability check and the insert.
        let mut doctor = record.lock().await;
        if !doctor.available {
            return Err(ReservationError::DoctorUnavailable);
        }
        if !doctor.insert_reservation(slot) {
            warn!("Slot {} of doctor {} already reserved", slot, doctor_id);
            return Err(ReservationError::Conflict);
        }

        debug!("Reserved slot {} for doctor {}", slot, doctor_id);
        Ok(())
    }

    async fn release(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<(), ReservationError> {
        let record = self.record(doctor_id).await.ok_or(ReservationError::DoctorNotFound)?;

        let mut doctor = record.lock().await;
        if !doctor.remove_reservation(slot) {
            return Err(ReservationError::NotReserved);
        }

        debug!("Released slot {} for doctor {}", slot, doctor_id);
        Ok(())
    }

    async fn is_reserved(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<bool, ReservationError> {
        let record = self.record(doctor_id).await.ok_or(ReservationError::DoctorNotFound)?;
        let reserved = record.lock().await.is_reserved(slot);
        Ok(reserved)
    }
}
