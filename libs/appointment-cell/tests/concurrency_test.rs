use assert_matches::assert_matches;
use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, BookAppointmentRequest, BookingRejection, NewAppointment};
use appointment_cell::services::memory::InMemoryAppointmentStore;
use appointment_cell::services::store::AppointmentStore;
use appointment_cell::services::validator::BookingValidator;
use doctor_cell::models::Doctor;

fn tomorrow_or_next_weekday() -> NaiveDate {
    let mut date = Utc::now().date_naive().checked_add_days(Days::new(1)).unwrap();
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date = date.succ_opt().unwrap();
    }
    date
}

fn request(doctor_id: Uuid, date: NaiveDate) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id,
        patient_id: Uuid::new_v4(),
        date,
        hour: "9:00".to_string(),
        title: "Consultation".to_string(),
        description: None,
    }
}

/// Two requests validated against the same empty snapshot: both pass, and the
/// write that lands second is refused by the store.
#[tokio::test]
async fn test_second_write_on_validated_slot_conflicts() {
    let doctor = Doctor {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Dr. Race".to_string(),
        bio: String::new(),
        working_hours: "9-12".to_string(),
        off_dates: vec![],
        profession_id: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let store = InMemoryAppointmentStore::with_doctors([doctor.clone()]);
    let validator = BookingValidator::default();
    let now = Utc::now();
    let date = tomorrow_or_next_weekday();

    let snapshot = store.appointments_for_doctor(doctor.id, "token").await.unwrap();
    let first = request(doctor.id, date);
    let second = request(doctor.id, date);

    assert_eq!(validator.validate_booking(&first, Some(&doctor), &snapshot, &[], now), Ok(()));
    assert_eq!(validator.validate_booking(&second, Some(&doctor), &snapshot, &[], now), Ok(()));

    store
        .insert_appointment(NewAppointment::pending(&first, "9:00".to_string()), "token")
        .await
        .unwrap();
    let result = store
        .insert_appointment(NewAppointment::pending(&second, "9:00".to_string()), "token")
        .await;

    assert_matches!(result, Err(AppointmentError::Rejected(BookingRejection::ConcurrentConflict)));

    // Re-validating against a fresh snapshot now reports the slot as taken.
    let snapshot = store.appointments_for_doctor(doctor.id, "token").await.unwrap();
    assert_eq!(
        validator.validate_booking(&second, Some(&doctor), &snapshot, &[], now),
        Err(BookingRejection::SlotUnavailable)
    );
}
