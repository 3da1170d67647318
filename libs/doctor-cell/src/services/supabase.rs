use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use urlencoding::encode;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorError, ReservationError, SlotKey, SlotsBooked,
    UpdateDoctorProfileRequest,
};
use crate::services::store::{DoctorDirectory, ReservationStore};

const DOCTORS: &str = "/rest/v1/doctors";
const RESERVATIONS: &str = "/rest/v1/slot_reservations";

/// One row of `slot_reservations`, unique on `(doctor_id, slot_date, slot_time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReservationRow {
    doctor_id: Uuid,
    slot_date: String,
    slot_time: String,
}

#[derive(Debug, Deserialize)]
struct AvailabilityRow {
    available: bool,
}

/// PostgREST-backed doctor store. Reservations live in their own table so the
/// unique constraint, not an application lock, decides who wins a slot; doctor
/// reads fold those rows back into `slots_booked`.
pub struct SupabaseDoctorStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn slot_filter(doctor_id: Uuid, slot: &SlotKey) -> String {
        format!(
            "doctor_id=eq.{}&slot_date=eq.{}&slot_time=eq.{}",
            doctor_id,
            encode(&slot.date_key()),
            encode(&slot.time_key())
        )
    }

    async fn fetch_reservations(&self, doctor_id: Option<Uuid>) -> Result<Vec<ReservationRow>, DoctorError> {
        let path = match doctor_id {
            Some(id) => format!("{}?doctor_id=eq.{}&select=doctor_id,slot_date,slot_time", RESERVATIONS, id),
            None => format!("{}?select=doctor_id,slot_date,slot_time", RESERVATIONS),
        };
        let rows: Vec<ReservationRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }

    async fn attach_reservations(&self, mut doctor: Doctor) -> Result<Doctor, DoctorError> {
        let rows = self.fetch_reservations(Some(doctor.id)).await?;
        doctor.slots_booked = fold_reservations(rows.into_iter().map(|row| (row.slot_date, row.slot_time)));
        Ok(doctor)
    }

    async fn doctor_availability(&self, doctor_id: Uuid) -> Result<Option<bool>, ReservationError> {
        let path = format!("{}?id=eq.{}&select=available", DOCTORS, doctor_id);
        let rows: Vec<AvailabilityRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.first().map(|row| row.available))
    }

    async fn patch_doctor(&self, doctor_id: Uuid, body: Value) -> Result<Doctor, DoctorError> {
        let path = format!("{}?id=eq.{}", DOCTORS, doctor_id);
        let rows: Vec<Doctor> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let doctor = rows.into_iter().next().ok_or(DoctorError::NotFound)?;
        self.attach_reservations(doctor).await
    }
}

fn fold_reservations(rows: impl IntoIterator<Item = (String, String)>) -> SlotsBooked {
    let mut slots_booked = SlotsBooked::new();
    for (slot_date, slot_time) in rows {
        slots_booked.entry(slot_date).or_default().insert(slot_time);
    }
    slots_booked
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorStore {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("{}?id=eq.{}", DOCTORS, doctor_id);
        let rows: Vec<Doctor> = self.supabase.request(Method::GET, &path, None, None).await?;
        let doctor = rows.into_iter().next().ok_or(DoctorError::NotFound)?;

        self.attach_reservations(doctor).await
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        let path = format!("{}?order=created_at.asc", DOCTORS);
        let mut doctors: Vec<Doctor> = self.supabase.request(Method::GET, &path, None, None).await?;

        let mut by_doctor: HashMap<Uuid, Vec<(String, String)>> = HashMap::new();
        for row in self.fetch_reservations(None).await? {
            by_doctor.entry(row.doctor_id).or_default().push((row.slot_date, row.slot_time));
        }
        for doctor in &mut doctors {
            doctor.slots_booked = fold_reservations(by_doctor.remove(&doctor.id).unwrap_or_default());
        }

        Ok(doctors)
    }

    async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        request.validate()?;

        let doctor = request.into_doctor(Uuid::new_v4(), Utc::now());
        let mut body = serde_json::to_value(&doctor)
            .map_err(|e| DoctorError::Database(e.to_string()))?;
        if let Value::Object(fields) = &mut body {
            fields.remove("slots_booked");
        }

        let rows: Vec<Doctor> = self.supabase.request_with_headers(
            Method::POST,
            DOCTORS,
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let created = rows.into_iter().next()
            .ok_or_else(|| DoctorError::Database("Failed to create doctor".to_string()))?;
        info!("Doctor {} created", created.id);
        Ok(created)
    }

    async fn update_profile(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorProfileRequest,
    ) -> Result<Doctor, DoctorError> {
        request.validate()?;

        let mut update = serde_json::Map::new();
        if let Some(name) = request.name {
            update.insert("name".to_string(), json!(name));
        }
        if let Some(fees) = request.fees {
            update.insert("fees".to_string(), json!(fees));
        }
        if let Some(address) = request.address {
            update.insert("address".to_string(), json!(address));
        }
        if let Some(about) = request.about {
            update.insert("about".to_string(), json!(about));
        }
        if let Some(image) = request.image {
            update.insert("image".to_string(), json!(image));
        }
        if let Some(available) = request.available {
            update.insert("available".to_string(), json!(available));
        }

        if update.is_empty() {
            return self.get_doctor(doctor_id).await;
        }
        self.patch_doctor(doctor_id, Value::Object(update)).await
    }

    async fn toggle_availability(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let current = self.get_doctor(doctor_id).await?;
        let updated = self.patch_doctor(doctor_id, json!({ "available": !current.available })).await?;

        info!("Doctor {} is now {}", doctor_id, if updated.available { "available" } else { "unavailable" });
        Ok(updated)
    }
}

#[async_trait]
impl ReservationStore for SupabaseDoctorStore {
    async fn reserve(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<(), ReservationError> {
        match self.doctor_availability(doctor_id).await? {
            None => return Err(ReservationError::DoctorNotFound),
            Some(false) => return Err(ReservationError::DoctorUnavailable),
            Some(true) => {}
        }

        let row = json!({
            "doctor_id": doctor_id,
            "slot_date": slot.date_key(),
            "slot_time": slot.time_key(),
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Result<Value, _> = self.supabase.request(Method::POST, RESERVATIONS, None, Some(row)).await;
        match result {
            Ok(_) => {
                debug!("Reserved slot {} for doctor {}", slot, doctor_id);
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                warn!("Slot {} of doctor {} already reserved", slot, doctor_id);
                Err(ReservationError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<(), ReservationError> {
        let path = format!("{}?{}", RESERVATIONS, Self::slot_filter(doctor_id, slot));
        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            None,
            Some(SupabaseClient::return_representation()),
        ).await?;

        if deleted.is_empty() {
            return match self.doctor_availability(doctor_id).await? {
                None => Err(ReservationError::DoctorNotFound),
                Some(_) => Err(ReservationError::NotReserved),
            };
        }

        debug!("Released slot {} for doctor {}", slot, doctor_id);
        Ok(())
    }

    async fn is_reserved(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<bool, ReservationError> {
        let path = format!("{}?{}&select=doctor_id", RESERVATIONS, Self::slot_filter(doctor_id, slot));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }
}
