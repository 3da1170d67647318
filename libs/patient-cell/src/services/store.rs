use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

/// Patient profiles; the source of the user snapshot copied into appointments.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError>;

    async fn list_patients(&self) -> Result<Vec<Patient>, PatientError>;

    async fn count_patients(&self) -> Result<usize, PatientError>;

    async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError>;

    async fn update_profile(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError>;
}
