use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};
use crate::services::store::PatientDirectory;

#[derive(Default)]
pub struct InMemoryPatientStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

}

#[async_trait]
impl PatientDirectory for InMemoryPatientStore {
    async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        self.patients
            .read()
            .await
            .get(&patient_id)
            .cloned()
            .ok_or(PatientError::NotFound)
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        let mut patients: Vec<Patient> = self.patients.read().await.values().cloned().collect();
        patients.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(patients)
    }

    async fn count_patients(&self) -> Result<usize, PatientError> {
        Ok(self.patients.read().await.len())
    }

    async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        request.validate()?;

        let mut patients = self.patients.write().await;
        let duplicate = patients.values().any(|p| p.email.eq_ignore_ascii_case(&request.email))
            || request.id.is_some_and(|id| patients.contains_key(&id));
        if duplicate {
            return Err(PatientError::Validation("Patient with this email already exists".to_string()));
        }

        let patient = request.into_patient(Utc::now());
        patients.insert(patient.id, patient.clone());
        info!("Patient {} registered", patient.id);
        Ok(patient)
    }

    async fn update_profile(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        request.validate()?;

        let mut patients = self.patients.write().await;
        let patient = patients.get_mut(&patient_id).ok_or(PatientError::NotFound)?;
        request.apply(patient);
        debug!("Patient {} profile updated", patient_id);
        Ok(patient.clone())
    }
}
