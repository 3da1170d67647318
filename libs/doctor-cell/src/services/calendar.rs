use chrono::{DateTime, Days, FixedOffset, NaiveDateTime, NaiveTime, Timelike, Utc};
use tracing::warn;

use crate::models::{
    AvailableSlotsResponse, CalendarConfig, CalendarSlot, DaySlots, Doctor, SlotDate, SlotKey,
    SlotTime, SlotsBooked,
};

/// Bookable slots of one doctor over the rolling booking window.
///
/// Nothing is computed until [`SlotCalendar::days`] is iterated, and every call
/// starts again from the first day, so a calendar can be walked more than once.
/// Slots present in the doctor's reservation map are left out.
#[derive(Debug, Clone)]
pub struct SlotCalendar<'a> {
    slots_booked: &'a SlotsBooked,
    now: NaiveDateTime,
    config: CalendarConfig,
}

/// Calendar for `doctor` as seen at clinic-local time `now`.
pub fn compute_available_slots(doctor: &Doctor, now: NaiveDateTime) -> SlotCalendar<'_> {
    SlotCalendar::new(doctor, now)
}

/// Free slots of `doctor` on the given clinic grid, collected for a response.
pub fn available_slots(doctor: &Doctor, now: NaiveDateTime, config: CalendarConfig) -> AvailableSlotsResponse {
    AvailableSlotsResponse {
        doctor_id: doctor.id,
        available: doctor.available,
        days: SlotCalendar::with_config(&doctor.slots_booked, now, config).days().collect(),
    }
}

/// Converts a UTC instant into the clinic's wall-clock time.
pub fn clinic_local_time(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDateTime {
    match FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => now.with_timezone(&offset).naive_local(),
        None => {
            warn!("Clinic UTC offset {} minutes is out of range, using UTC", utc_offset_minutes);
            now.naive_utc()
        }
    }
}

impl<'a> SlotCalendar<'a> {
    pub fn new(doctor: &'a Doctor, now: NaiveDateTime) -> Self {
        Self::with_config(&doctor.slots_booked, now, CalendarConfig::default())
    }

    pub fn with_config(slots_booked: &'a SlotsBooked, now: NaiveDateTime, config: CalendarConfig) -> Self {
        Self { slots_booked, now, config }
    }

    /// One entry per day of the window, today first; a day may have no slots.
    pub fn days(&self) -> impl Iterator<Item = DaySlots> + '_ {
        (0..self.config.window_days).filter_map(move |offset| self.day(offset))
    }

    /// Slots for the day `offset` days after today.
    pub fn day(&self, offset: u32) -> Option<DaySlots> {
        let date = self.now.date().checked_add_days(Days::new(u64::from(offset)))?;

        let first_minute = if offset == 0 {
            self.first_minute_today()
        } else {
            self.config.opening_minute()
        };

        let step = self.config.slot_minutes.max(1) as usize;
        let slots = (first_minute..self.config.closing_minute())
            .step_by(step)
            .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
            .map(|time| SlotKey::new(SlotDate(date), SlotTime(time)))
            .filter(|slot| !self.is_reserved(slot))
            .map(|slot| CalendarSlot {
                starts_at: slot.starts_at(),
                slot,
            })
            .collect();

        Some(DaySlots {
            date: SlotDate(date),
            weekday: date.format("%a").to_string().to_uppercase(),
            slots,
        })
    }

    /// First candidate minute for today: never before opening, and `now`
    /// rounded up to the next slot boundary so no past slot is offered.
    fn first_minute_today(&self) -> u32 {
        let opening = self.config.opening_minute();
        let hour = self.now.hour();
        if hour * 60 < opening {
            return opening;
        }

        let step = self.config.slot_minutes.max(1);
        let rounded_minute = self.now.minute().div_ceil(step) * step;
        hour * 60 + rounded_minute
    }

    fn is_reserved(&self, slot: &SlotKey) -> bool {
        self.slots_booked
            .get(&slot.date_key())
            .map_or(false, |times| times.contains(&slot.time_key()))
    }
}
