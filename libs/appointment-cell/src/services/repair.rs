use std::collections::{HashMap, HashSet};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use doctor_cell::models::{ReservationError, SlotKey};

use crate::models::{AppointmentError, RepairReport, ReservationRef};
use crate::services::lifecycle::AppointmentLifecycleService;

impl AppointmentLifecycleService {
    /// Reconciles doctors' reservations against the ledger.
    ///
    /// Reserved slots held only by cancelled appointments, or by none at all,
    /// are reported and released only when `release` is set. Between its
    /// reserve and its ledger write, a booking looks exactly like either case,
    /// so releasing is only safe while no bookings are in flight.
    #[instrument(skip(self))]
    pub async fn repair_reservations(&self, release: bool) -> Result<RepairReport, AppointmentError> {
        let doctors = self.doctors.list_doctors().await?;
        let appointments = self.ledger.find_all().await?;

        // (doctor, slot) -> does any appointment still hold it
        let mut holders: HashMap<(Uuid, SlotKey), bool> = HashMap::new();
        for appointment in &appointments {
            let held = holders.entry((appointment.doctor_id, appointment.slot)).or_insert(false);
            *held |= appointment.holds_slot();
        }

        let mut report = RepairReport {
            released: release,
            ..RepairReport::default()
        };
        let mut reserved = HashSet::new();

        for doctor in &doctors {
            for slot in doctor.reserved_slots() {
                reserved.insert((doctor.id, slot));
                let reservation = ReservationRef { doctor_id: doctor.id, slot };

                let orphans = match holders.get(&(doctor.id, slot)) {
                    Some(true) => continue,
                    Some(false) => &mut report.cancelled_only,
                    None => &mut report.stranded,
                };
                if release {
                    self.release_quietly(doctor.id, &slot).await?;
                }
                orphans.push(reservation);
            }
        }

        report.unreserved_appointments = appointments
            .iter()
            .filter(|appointment| appointment.holds_slot())
            .filter(|appointment| !reserved.contains(&(appointment.doctor_id, appointment.slot)))
            .map(|appointment| appointment.id)
            .collect();

        if report.is_clean() {
            info!("Reservations consistent across {} doctors", doctors.len());
        } else {
            warn!(
                "Repair found {} cancelled-only and {} stranded slots ({}), {} unreserved appointments",
                report.cancelled_only.len(),
                report.stranded.len(),
                if release { "released" } else { "kept" },
                report.unreserved_appointments.len()
            );
        }

        Ok(report)
    }

    async fn release_quietly(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<(), AppointmentError> {
        match self.reservations.release(doctor_id, slot).await {
            Ok(()) | Err(ReservationError::NotReserved) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
