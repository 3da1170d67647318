#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use appointment_cell::services::{AppointmentLedger, AppointmentLifecycleService, InMemoryAppointmentLedger};
use doctor_cell::models::{
    Address, AvailableSlotsResponse, CalendarConfig, CreateDoctorRequest, Doctor, SlotKey,
};
use doctor_cell::services::{available_slots, DoctorDirectory, InMemoryDoctorStore, ReservationStore};
use patient_cell::models::{Address as PatientAddress, CreatePatientRequest, Patient};
use patient_cell::services::{InMemoryPatientStore, PatientDirectory};

pub struct Clinic {
    pub doctors: Arc<InMemoryDoctorStore>,
    pub patients: Arc<InMemoryPatientStore>,
    pub ledger: Arc<InMemoryAppointmentLedger>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub calendar: CalendarConfig,
}

impl Clinic {
    pub fn new() -> Self {
        Self::with_calendar(CalendarConfig::default())
    }

    /// Booking and slot listing share `calendar`, as they do in the API.
    pub fn with_calendar(calendar: CalendarConfig) -> Self {
        let doctors = Arc::new(InMemoryDoctorStore::new());
        let patients = Arc::new(InMemoryPatientStore::new());
        let ledger = Arc::new(InMemoryAppointmentLedger::new());
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            doctors.clone(),
            doctors.clone(),
            patients.clone(),
            ledger.clone(),
            calendar,
        ));
        Self { doctors, patients, ledger, lifecycle, calendar }
    }

    /// Same stores, different reservation store or ledger in front of them.
    pub fn lifecycle_with(
        &self,
        reservations: Arc<dyn ReservationStore>,
        ledger: Arc<dyn AppointmentLedger>,
    ) -> AppointmentLifecycleService {
        AppointmentLifecycleService::new(
            self.doctors.clone(),
            reservations,
            self.patients.clone(),
            ledger,
            self.calendar,
        )
    }

    /// What `GET /doctors/{id}/available-slots` would show at `now()`.
    pub async fn listed_slots(&self, doctor_id: Uuid) -> AvailableSlotsResponse {
        let doctor = self.doctors.get_doctor(doctor_id).await.unwrap();
        available_slots(&doctor, now(), self.calendar)
    }

    pub async fn doctor(&self, name: &str, fees: f64) -> Doctor {
        self.doctors
            .create_doctor(CreateDoctorRequest {
                name: name.to_string(),
                email: format!("{}@clinic.test", Uuid::new_v4()),
                image: None,
                speciality: "General physician".to_string(),
                degree: "MBBS".to_string(),
                experience: "4 Years".to_string(),
                about: String::new(),
                fees,
                address: Address::default(),
                available: None,
            })
            .await
            .unwrap()
    }

    pub async fn patient(&self, name: &str) -> Patient {
        self.patient_with_id(Uuid::new_v4(), name).await
    }

    pub async fn patient_with_id(&self, id: Uuid, name: &str) -> Patient {
        self.patients
            .create_patient(CreatePatientRequest {
                id: Some(id),
                name: name.to_string(),
                email: format!("{}@patients.test", id),
                image: None,
                phone: None,
                gender: None,
                dob: None,
                address: PatientAddress::default(),
            })
            .await
            .unwrap()
    }
}

pub fn slot(key: &str) -> SlotKey {
    key.parse().unwrap()
}

/// Clinic-local "now", the day before the slots used in tests.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 14).unwrap().and_hms_opt(8, 0, 0).unwrap()
}
