use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;

pub const DEFAULT_PHONE: &str = "0000000000";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
}

/// A patient's live profile. Appointments copy what they need from it at
/// booking time, so edits here never reach existing appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    #[serde(default = "default_phone")]
    pub phone: String,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

fn default_phone() -> String {
    DEFAULT_PHONE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    /// Links the profile to an existing auth subject; a fresh id is assigned when absent.
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub address: Address,
}

impl CreatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.name.trim().is_empty() {
            return Err(PatientError::Validation("Missing patient name".to_string()));
        }
        if !self.email.contains('@') {
            return Err(PatientError::Validation("Invalid email".to_string()));
        }
        Ok(())
    }

    pub fn into_patient(self, created_at: DateTime<Utc>) -> Patient {
        Patient {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            email: self.email,
            image: self.image,
            phone: self.phone.unwrap_or_else(default_phone),
            gender: self.gender,
            dob: self.dob,
            address: self.address,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub address: Option<Address>,
    pub image: Option<String>,
}

impl UpdatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        match &self.name {
            Some(name) if name.trim().is_empty() => {
                Err(PatientError::Validation("Patient name cannot be empty".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.gender.is_none()
            && self.dob.is_none()
            && self.address.is_none()
            && self.image.is_none()
    }

    pub fn apply(self, patient: &mut Patient) {
        if let Some(name) = self.name {
            patient.name = name;
        }
        if let Some(phone) = self.phone {
            patient.phone = phone;
        }
        if let Some(gender) = self.gender {
            patient.gender = Some(gender);
        }
        if let Some(dob) = self.dob {
            patient.dob = Some(dob);
        }
        if let Some(address) = self.address {
            patient.address = address;
        }
        if let Some(image) = self.image {
            patient.image = Some(image);
        }
    }
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for PatientError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => {
                PatientError::Validation("Patient with this email already exists".to_string())
            }
            other => PatientError::Database(other.to_string()),
        }
    }
}
