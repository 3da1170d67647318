use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;

// ==============================================================================
// SLOT KEYS
// ==============================================================================

/// Reserved times per clinic date: `"15_6_2025" -> {"10:00", "10:30"}`.
pub type SlotsBooked = BTreeMap<String, BTreeSet<String>>;

/// A local clinic date rendered as `day_month_year` without leading zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotDate(pub NaiveDate);

impl SlotDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(SlotDate)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for SlotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.0.day(), self.0.month(), self.0.year())
    }
}

impl FromStr for SlotDate {
    type Err = SlotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotKeyError::InvalidDate(s.to_string());

        let mut parts = s.trim().split('_');
        let (day, month, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(day), Some(month), Some(year), None) => (day, month, year),
            _ => return Err(invalid()),
        };

        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;

        SlotDate::from_ymd(year, month, day).ok_or_else(invalid)
    }
}

impl TryFrom<String> for SlotDate {
    type Error = SlotKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotDate> for String {
    fn from(value: SlotDate) -> Self {
        value.to_string()
    }
}

/// A time of day rendered as 24-hour `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime(pub NaiveTime);

impl SlotTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn minutes_of_day(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for SlotTime {
    type Err = SlotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // 12-hour labels ("10:30 AM") are accepted and normalised.
        ["%H:%M", "%I:%M %p", "%I:%M%p"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
            .map(SlotTime)
            .ok_or_else(|| SlotKeyError::InvalidTime(s.to_string()))
    }
}

impl TryFrom<String> for SlotTime {
    type Error = SlotKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.to_string()
    }
}

/// One bookable (date, time) unit of a doctor's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    #[serde(rename = "slot_date")]
    pub date: SlotDate,
    #[serde(rename = "slot_time")]
    pub time: SlotTime,
}

impl SlotKey {
    pub fn new(date: SlotDate, time: SlotTime) -> Self {
        Self { date, time }
    }

    /// Parses the separate `slot_date` / `slot_time` fields used on the wire.
    pub fn from_parts(slot_date: &str, slot_time: &str) -> Result<Self, SlotKeyError> {
        Ok(Self {
            date: slot_date.parse()?,
            time: slot_time.parse()?,
        })
    }

    pub fn date_key(&self) -> String {
        self.date.to_string()
    }

    pub fn time_key(&self) -> String {
        self.time.to_string()
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.0.and_time(self.time.0)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.date, self.time)
    }
}

impl FromStr for SlotKey {
    type Err = SlotKeyError;

    /// Parses the combined `15_6_2025_10:00` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, time) = s
            .trim()
            .rsplit_once('_')
            .ok_or_else(|| SlotKeyError::InvalidKey(s.to_string()))?;
        Self::from_parts(date, time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotKeyError {
    #[error("Invalid slot date '{0}', expected day_month_year")]
    InvalidDate(String),
    #[error("Invalid slot time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("Invalid slot key '{0}'")]
    InvalidKey(String),
}

// ==============================================================================
// DOCTOR RECORD
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: f64,
    #[serde(default)]
    pub address: Address,
    pub available: bool,
    #[serde(default)]
    pub slots_booked: SlotsBooked,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    pub fn is_reserved(&self, slot: &SlotKey) -> bool {
        self.slots_booked
            .get(&slot.date_key())
            .map_or(false, |times| times.contains(&slot.time_key()))
    }

    /// Inserts the slot; false when it was already taken.
    pub fn insert_reservation(&mut self, slot: &SlotKey) -> bool {
        self.slots_booked
            .entry(slot.date_key())
            .or_default()
            .insert(slot.time_key())
    }

    /// Removes the slot, dropping the date entry once it empties.
    pub fn remove_reservation(&mut self, slot: &SlotKey) -> bool {
        let date_key = slot.date_key();
        let Some(times) = self.slots_booked.get_mut(&date_key) else {
            return false;
        };

        let removed = times.remove(&slot.time_key());
        if times.is_empty() {
            self.slots_booked.remove(&date_key);
        }
        removed
    }

    /// Every reserved slot that still parses as a slot key.
    pub fn reserved_slots(&self) -> Vec<SlotKey> {
        self.slots_booked
            .iter()
            .flat_map(|(date, times)| {
                times.iter().filter_map(move |time| SlotKey::from_parts(date, time).ok())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    #[serde(default)]
    pub about: String,
    pub fees: f64,
    #[serde(default)]
    pub address: Address,
    pub available: Option<bool>,
}

impl CreateDoctorRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.name.trim().is_empty() || self.speciality.trim().is_empty() {
            return Err(DoctorError::Validation("Missing required doctor details".to_string()));
        }
        if !self.email.contains('@') {
            return Err(DoctorError::Validation("Invalid email".to_string()));
        }
        validate_fees(self.fees)
    }

    pub fn into_doctor(self, id: Uuid, created_at: DateTime<Utc>) -> Doctor {
        Doctor {
            id,
            name: self.name,
            email: self.email,
            image: self.image,
            speciality: self.speciality,
            degree: self.degree,
            experience: self.experience,
            about: self.about,
            fees: self.fees,
            address: self.address,
            available: self.available.unwrap_or(true),
            slots_booked: SlotsBooked::new(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    pub name: Option<String>,
    pub fees: Option<f64>,
    pub address: Option<Address>,
    pub about: Option<String>,
    pub image: Option<String>,
    pub available: Option<bool>,
}

impl UpdateDoctorProfileRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DoctorError::Validation("Doctor name cannot be empty".to_string()));
            }
        }
        match self.fees {
            Some(fees) => validate_fees(fees),
            None => Ok(()),
        }
    }

    pub fn apply(self, doctor: &mut Doctor) {
        if let Some(name) = self.name {
            doctor.name = name;
        }
        if let Some(fees) = self.fees {
            doctor.fees = fees;
        }
        if let Some(address) = self.address {
            doctor.address = address;
        }
        if let Some(about) = self.about {
            doctor.about = about;
        }
        if let Some(image) = self.image {
            doctor.image = Some(image);
        }
        if let Some(available) = self.available {
            doctor.available = available;
        }
    }
}

fn validate_fees(fees: f64) -> Result<(), DoctorError> {
    if fees.is_finite() && fees > 0.0 {
        Ok(())
    } else {
        Err(DoctorError::Validation("Fees must be greater than zero".to_string()))
    }
}

// ==============================================================================
// SLOT CALENDAR
// ==============================================================================

/// Booking window and clinic hours the calendar is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarConfig {
    pub window_days: u32,
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub slot_minutes: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            opening_hour: 10,
            closing_hour: 21,
            slot_minutes: 30,
        }
    }
}

impl CalendarConfig {
    pub fn opening_minute(&self) -> u32 {
        self.opening_hour * 60
    }

    pub fn closing_minute(&self) -> u32 {
        self.closing_hour * 60
    }

    /// True when `time` is one of the candidates the calendar can produce.
    pub fn is_on_grid(&self, time: &SlotTime) -> bool {
        let minute = time.minutes_of_day();
        minute >= self.opening_minute()
            && minute < self.closing_minute()
            && (minute - self.opening_minute()) % self.slot_minutes.max(1) == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSlot {
    #[serde(flatten)]
    pub slot: SlotKey,
    pub starts_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: SlotDate,
    pub weekday: String,
    pub slots: Vec<CalendarSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub doctor_id: Uuid,
    /// Booking is refused while false, whatever the calendar shows.
    pub available: bool,
    pub days: Vec<DaySlots>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for DoctorError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => {
                DoctorError::Validation("Doctor with this email already exists".to_string())
            }
            other => DoctorError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor not available")]
    DoctorUnavailable,

    #[error("Slot already reserved")]
    Conflict,

    #[error("Slot was not reserved")]
    NotReserved,

    #[error("Reservation storage error: {0}")]
    Storage(String),
}

impl From<DatabaseError> for ReservationError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => ReservationError::Conflict,
            other => ReservationError::Storage(other.to_string()),
        }
    }
}
