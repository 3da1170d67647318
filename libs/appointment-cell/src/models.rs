use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::{Address, Doctor, DoctorError, ReservationError, SlotKey, SlotKeyError};
use patient_cell::models::{Patient, PatientError};
use shared_database::DatabaseError;

// ==============================================================================
// SNAPSHOTS
// ==============================================================================

/// Patient details as they were when the appointment was booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub phone: String,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
}

impl From<&Patient> for PatientSnapshot {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            email: patient.email.clone(),
            image: patient.image.clone(),
            phone: patient.phone.clone(),
            gender: patient.gender.clone(),
            dob: patient.dob,
        }
    }
}

/// Doctor details as they were when the appointment was booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSnapshot {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub fees: f64,
    #[serde(default)]
    pub address: Address,
}

impl From<&Doctor> for DoctorSnapshot {
    fn from(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            email: doctor.email.clone(),
            image: doctor.image.clone(),
            speciality: doctor.speciality.clone(),
            degree: doctor.degree.clone(),
            experience: doctor.experience.clone(),
            fees: doctor.fees,
            address: doctor.address.clone(),
        }
    }
}

// ==============================================================================
// APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(flatten)]
    pub slot: SlotKey,
    pub user_snapshot: PatientSnapshot,
    pub doctor_snapshot: DoctorSnapshot,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub paid: bool,
}

impl Appointment {
    pub fn is_terminal(&self) -> bool {
        self.cancelled || self.is_completed
    }

    /// Every appointment except a cancelled one keeps its slot reserved.
    pub fn holds_slot(&self) -> bool {
        !self.cancelled
    }

    /// Counted towards a doctor's earnings.
    pub fn is_billable(&self) -> bool {
        !self.cancelled && (self.is_completed || self.paid)
    }
}

/// Everything the ledger needs to record a booking; identity, timestamp and
/// status flags are assigned by the ledger.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub slot: SlotKey,
    pub user_snapshot: PatientSnapshot,
    pub doctor_snapshot: DoctorSnapshot,
    pub amount: f64,
}

impl NewAppointment {
    pub fn into_appointment(self, id: Uuid, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            user_id: self.user_id,
            doctor_id: self.doctor_id,
            slot: self.slot,
            user_snapshot: self.user_snapshot,
            doctor_snapshot: self.doctor_snapshot,
            amount: self.amount,
            created_at,
            cancelled: false,
            is_completed: false,
            paid: false,
        }
    }
}

/// Result of a ledger status mutation. `AlreadyTerminal` is a no-op, not a
/// failure: the record was left as it was.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    Applied(Appointment),
    AlreadyTerminal(Appointment),
}

impl LedgerOutcome {
    pub fn appointment(&self) -> &Appointment {
        match self {
            LedgerOutcome::Applied(appointment) | LedgerOutcome::AlreadyTerminal(appointment) => appointment,
        }
    }

    pub fn into_appointment(self) -> Appointment {
        match self {
            LedgerOutcome::Applied(appointment) | LedgerOutcome::AlreadyTerminal(appointment) => appointment,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, LedgerOutcome::Applied(_))
    }
}

/// Who is acting on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Patient(Uuid),
    Doctor(Uuid),
    Admin,
}

impl Actor {
    /// Patients and doctors may act on their own appointments, admins on any.
    pub fn may_manage(&self, appointment: &Appointment) -> bool {
        match self {
            Actor::Patient(user_id) => appointment.user_id == *user_id,
            Actor::Doctor(doctor_id) => appointment.doctor_id == *doctor_id,
            Actor::Admin => true,
        }
    }
}

// ==============================================================================
// REQUESTS & RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
}

impl BookAppointmentRequest {
    pub fn slot_key(&self) -> Result<SlotKey, AppointmentError> {
        Ok(SlotKey::from_parts(&self.slot_date, &self.slot_time)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepairQuery {
    #[serde(default)]
    pub release: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboard {
    pub earnings: f64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub doctors: usize,
    pub patients: usize,
    pub appointments: usize,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRef {
    pub doctor_id: Uuid,
    #[serde(flatten)]
    pub slot: SlotKey,
}

/// Findings of a reservation/ledger reconciliation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    /// Reserved slots whose appointments were all cancelled.
    pub cancelled_only: Vec<ReservationRef>,
    /// Reserved slots with no appointment at all.
    pub stranded: Vec<ReservationRef>,
    /// Whether `cancelled_only` and `stranded` slots were released in this run.
    pub released: bool,
    /// Non-cancelled appointments whose slot is not reserved.
    pub unreserved_appointments: Vec<Uuid>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.cancelled_only.is_empty() && self.stranded.is_empty() && self.unreserved_appointments.is_empty()
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Slot not available")]
    SlotNotAvailable,

    #[error("Doctor not available")]
    DoctorNotAvailable,

    #[error("Not authorized to act on this appointment")]
    Forbidden,

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Slot {slot} of doctor {doctor_id} is still reserved after a failed booking: {reason}")]
    CompensationFailed {
        doctor_id: Uuid,
        slot: SlotKey,
        reason: String,
    },
}

impl From<ReservationError> for AppointmentError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::DoctorNotFound => AppointmentError::DoctorNotFound,
            ReservationError::DoctorUnavailable => AppointmentError::DoctorNotAvailable,
            ReservationError::Conflict => AppointmentError::SlotNotAvailable,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<PatientError> for AppointmentError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppointmentError::PatientNotFound,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<SlotKeyError> for AppointmentError {
    fn from(err: SlotKeyError) -> Self {
        AppointmentError::InvalidSlot(err.to_string())
    }
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_appointment_row_shape() {
        let row = json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "slot_date": "15_6_2025",
            "slot_time": "10:30 AM",
            "user_snapshot": { "name": "Ana", "email": "ana@patients.test", "image": null, "phone": "0000000000", "gender": null, "dob": null },
            "doctor_snapshot": { "name": "Dr. Test", "email": "dr@clinic.test", "image": null, "speciality": "General physician", "degree": "MBBS", "experience": "4 Years", "fees": 500.0 },
            "amount": 500.0,
            "created_at": "2025-06-01T08:00:00Z"
        });

        let appointment: Appointment = serde_json::from_value(row).unwrap();
        assert_eq!(appointment.slot.to_string(), "15_6_2025_10:30");
        assert!(!appointment.is_terminal());

        let back = serde_json::to_value(&appointment).unwrap();
        assert_eq!(back["slot_time"], "10:30");
        assert_eq!(back["cancelled"], false);
    }

    #[test]
    fn test_actor_scope() {
        let user_id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id,
            doctor_id,
            slot: "15_6_2025_10:00".parse().unwrap(),
            user_snapshot: PatientSnapshot {
                name: "Ana".to_string(),
                email: "ana@patients.test".to_string(),
                image: None,
                phone: "0000000000".to_string(),
                gender: None,
                dob: None,
            },
            doctor_snapshot: DoctorSnapshot {
                name: "Dr. Test".to_string(),
                email: "dr@clinic.test".to_string(),
                image: None,
                speciality: "General physician".to_string(),
                degree: "MBBS".to_string(),
                experience: "4 Years".to_string(),
                fees: 500.0,
                address: Address::default(),
            },
            amount: 500.0,
            created_at: Utc::now(),
            cancelled: false,
            is_completed: false,
            paid: true,
        };

        assert!(Actor::Patient(user_id).may_manage(&appointment));
        assert!(!Actor::Patient(doctor_id).may_manage(&appointment));
        assert!(Actor::Doctor(doctor_id).may_manage(&appointment));
        assert!(!Actor::Doctor(user_id).may_manage(&appointment));
        assert!(Actor::Admin.may_manage(&appointment));
        assert!(appointment.is_billable());
    }

    #[test]
    fn test_reservation_errors_map_to_booking_outcomes() {
        assert!(matches!(AppointmentError::from(ReservationError::Conflict), AppointmentError::SlotNotAvailable));
        assert!(matches!(AppointmentError::from(ReservationError::DoctorUnavailable), AppointmentError::DoctorNotAvailable));
        assert!(matches!(AppointmentError::from(ReservationError::Storage("io".into())), AppointmentError::DatabaseError(_)));
    }
}
