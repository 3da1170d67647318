use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use urlencoding::encode;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};
use crate::services::store::PatientDirectory;

const PATIENTS: &str = "/rest/v1/patients";

pub struct SupabasePatientStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePatientStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl PatientDirectory for SupabasePatientStore {
    async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("{}?id=eq.{}", PATIENTS, patient_id);
        let rows: Vec<Patient> = self.supabase.request(Method::GET, &path, None, None).await?;
        rows.into_iter().next().ok_or(PatientError::NotFound)
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        let path = format!("{}?order=created_at.asc", PATIENTS);
        let rows: Vec<Patient> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }

    async fn count_patients(&self) -> Result<usize, PatientError> {
        let path = format!("{}?select=id", PATIENTS);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.len())
    }

    async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        request.validate()?;

        let existing_path = format!("{}?email=eq.{}&select=id", PATIENTS, encode(&request.email));
        let existing: Vec<Value> = self.supabase.request(Method::GET, &existing_path, None, None).await?;
        if !existing.is_empty() {
            return Err(PatientError::Validation("Patient with this email already exists".to_string()));
        }

        let patient = request.into_patient(Utc::now());
        let body = serde_json::to_value(&patient).map_err(|e| PatientError::Database(e.to_string()))?;

        let rows: Vec<Patient> = self.supabase.request_with_headers(
            Method::POST,
            PATIENTS,
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let created = rows.into_iter().next()
            .ok_or_else(|| PatientError::Database("Failed to create patient profile".to_string()))?;
        info!("Patient {} registered", created.id);
        Ok(created)
    }

    async fn update_profile(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        request.validate()?;
        if request.is_empty() {
            return self.get_patient(patient_id).await;
        }

        let mut update = serde_json::Map::new();
        if let Some(name) = request.name {
            update.insert("name".to_string(), json!(name));
        }
        if let Some(phone) = request.phone {
            update.insert("phone".to_string(), json!(phone));
        }
        if let Some(gender) = request.gender {
            update.insert("gender".to_string(), json!(gender));
        }
        if let Some(dob) = request.dob {
            update.insert("dob".to_string(), json!(dob));
        }
        if let Some(address) = request.address {
            update.insert("address".to_string(), json!(address));
        }
        if let Some(image) = request.image {
            update.insert("image".to_string(), json!(image));
        }

        let path = format!("{}?id=eq.{}", PATIENTS, patient_id);
        let rows: Vec<Patient> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(Value::Object(update)),
            Some(SupabaseClient::return_representation()),
        ).await?;

        debug!("Patient {} profile updated", patient_id);
        rows.into_iter().next().ok_or(PatientError::NotFound)
    }
}
