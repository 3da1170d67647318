use std::collections::HashSet;

use tracing::instrument;
use uuid::Uuid;

use crate::models::{AdminDashboard, Appointment, AppointmentError, DoctorDashboard};
use crate::services::lifecycle::{newest_first, AppointmentLifecycleService};

pub const LATEST_APPOINTMENTS: usize = 5;

fn latest(appointments: Vec<Appointment>) -> Vec<Appointment> {
    newest_first(appointments).into_iter().take(LATEST_APPOINTMENTS).collect()
}

impl AppointmentLifecycleService {
    #[instrument(skip(self))]
    pub async fn doctor_dashboard(&self, doctor_id: Uuid) -> Result<DoctorDashboard, AppointmentError> {
        let appointments = self.ledger.find_by_doctor(doctor_id).await?;

        let earnings: f64 = appointments
            .iter()
            .filter(|appointment| appointment.is_billable())
            .map(|appointment| appointment.amount)
            .sum();
        let patients = appointments
            .iter()
            .map(|appointment| appointment.user_id)
            .collect::<HashSet<_>>()
            .len();

        Ok(DoctorDashboard {
            earnings,
            appointments: appointments.len(),
            patients,
            latest_appointments: latest(appointments),
        })
    }

    #[instrument(skip(self))]
    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, AppointmentError> {
        let doctors = self.doctors.list_doctors().await?.len();
        let patients = self.patients.count_patients().await?;
        let appointments = self.ledger.find_all().await?;

        Ok(AdminDashboard {
            doctors,
            patients,
            appointments: appointments.len(),
            latest_appointments: latest(appointments),
        })
    }
}
