use std::sync::Arc;

use assert_matches::assert_matches;
use futures::future::join_all;
use uuid::Uuid;

use doctor_cell::models::{
    Address, CreateDoctorRequest, DoctorError, ReservationError, SlotKey, UpdateDoctorProfileRequest,
};
use doctor_cell::services::{DoctorDirectory, InMemoryDoctorStore, ReservationStore};

fn request(email: &str) -> CreateDoctorRequest {
    CreateDoctorRequest {
        name: "Dr. Sarah Patel".to_string(),
        email: email.to_string(),
        image: None,
        speciality: "Dermatologist".to_string(),
        degree: "MBBS".to_string(),
        experience: "1 Years".to_string(),
        about: "Skin care".to_string(),
        fees: 30.0,
        address: Address { line1: "37th Cross".to_string(), line2: "Richmond".to_string() },
        available: None,
    }
}

fn slot(key: &str) -> SlotKey {
    key.parse().unwrap()
}

#[tokio::test]
async fn test_reserve_then_conflict() {
    let store = InMemoryDoctorStore::new();
    let doctor = store.create_doctor(request("sarah@clinic.test")).await.unwrap();
    let key = slot("15_6_2025_10:00");

    store.reserve(doctor.id, &key).await.unwrap();
    assert_matches!(store.reserve(doctor.id, &key).await, Err(ReservationError::Conflict));

    let stored = store.get_doctor(doctor.id).await.unwrap();
    assert_eq!(stored.slots_booked["15_6_2025"].len(), 1);
    assert!(store.is_reserved(doctor.id, &key).await.unwrap());
}

#[tokio::test]
async fn test_reserve_rejects_unknown_and_unavailable_doctors() {
    let store = InMemoryDoctorStore::new();
    let key = slot("15_6_2025_10:00");

    assert_matches!(store.reserve(Uuid::new_v4(), &key).await, Err(ReservationError::DoctorNotFound));

    let doctor = store.create_doctor(request("off@clinic.test")).await.unwrap();
    let toggled = store.toggle_availability(doctor.id).await.unwrap();
    assert!(!toggled.available);

    assert_matches!(store.reserve(doctor.id, &key).await, Err(ReservationError::DoctorUnavailable));
    assert!(!store.is_reserved(doctor.id, &key).await.unwrap());
}

#[tokio::test]
async fn test_release_keeps_map_sparse_and_reports_not_reserved() {
    let store = InMemoryDoctorStore::new();
    let doctor = store.create_doctor(request("sparse@clinic.test")).await.unwrap();
    let key = slot("15_6_2025_10:00");

    store.reserve(doctor.id, &key).await.unwrap();
    store.release(doctor.id, &key).await.unwrap();

    let stored = store.get_doctor(doctor.id).await.unwrap();
    assert!(!stored.slots_booked.contains_key("15_6_2025"));

    assert_matches!(store.release(doctor.id, &key).await, Err(ReservationError::NotReserved));
    assert_matches!(store.release(Uuid::new_v4(), &key).await, Err(ReservationError::DoctorNotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reserve_has_one_winner() {
    let store = Arc::new(InMemoryDoctorStore::new());
    let doctor = store.create_doctor(request("race@clinic.test")).await.unwrap();
    let key = slot("20_6_2025_18:30");

    let doctor_id = doctor.id;
    let attempts = (0..32).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.reserve(doctor_id, &key).await })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(r, Err(ReservationError::Conflict))));
}

#[tokio::test]
async fn test_doctors_do_not_share_slots() {
    let store = InMemoryDoctorStore::new();
    let first = store.create_doctor(request("first@clinic.test")).await.unwrap();
    let second = store.create_doctor(request("second@clinic.test")).await.unwrap();
    let key = slot("15_6_2025_10:00");

    store.reserve(first.id, &key).await.unwrap();
    store.reserve(second.id, &key).await.unwrap();
}

#[tokio::test]
async fn test_profile_validation_and_duplicate_email() {
    let store = InMemoryDoctorStore::new();
    let doctor = store.create_doctor(request("dup@clinic.test")).await.unwrap();

    assert_matches!(
        store.create_doctor(request("DUP@clinic.test")).await,
        Err(DoctorError::Validation(_))
    );

    let mut bad_fee = request("fee@clinic.test");
    bad_fee.fees = 0.0;
    assert_matches!(store.create_doctor(bad_fee).await, Err(DoctorError::Validation(_)));

    let updated = store
        .update_profile(doctor.id, UpdateDoctorProfileRequest { fees: Some(75.0), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(updated.fees, 75.0);

    assert_matches!(
        store
            .update_profile(doctor.id, UpdateDoctorProfileRequest { fees: Some(-1.0), ..Default::default() })
            .await,
        Err(DoctorError::Validation(_))
    );
}
