use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::models::{AppointmentStatus, NewAppointment};
use appointment_cell::router::appointment_routes;
use appointment_cell::services::memory::InMemoryAppointmentStore;
use doctor_cell::models::Doctor;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    app: Router,
    store: Arc<InMemoryAppointmentStore>,
    secret: String,
}

impl TestApp {
    fn new(doctors: Vec<Doctor>) -> Self {
        let config = TestConfig::default();
        let store = Arc::new(InMemoryAppointmentStore::with_doctors(doctors));
        let app = appointment_routes(config.to_arc(), store.clone());

        Self {
            app,
            store,
            secret: config.jwt_secret,
        }
    }

    fn token(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.secret, Some(1))
    }

    async fn send(&self, method: &str, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("Authorization", format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn book(&self, user: &TestUser, doctor_id: Uuid, date: NaiveDate, hour: &str) -> (StatusCode, Value) {
        self.send("POST", "/", Some(user), Some(booking_body(user, doctor_id, date, hour)))
            .await
    }
}

fn create_doctor(working_hours: &str, off_dates: Vec<NaiveDate>) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Dr. Flow".to_string(),
        bio: String::new(),
        working_hours: working_hours.to_string(),
        off_dates,
        profession_id: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn booking_body(user: &TestUser, doctor_id: Uuid, date: NaiveDate, hour: &str) -> Value {
    json!({
        "doctorId": doctor_id,
        "patientId": user.uuid(),
        "date": date.format("%Y-%m-%d").to_string(),
        "hour": hour,
        "title": "Consultation",
        "description": "Recurring headaches"
    })
}

fn next_weekday() -> NaiveDate {
    let mut date = Utc::now().date_naive().checked_add_days(Days::new(1)).unwrap();
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date = date.succ_opt().unwrap();
    }
    date
}

fn next_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive().succ_opt().unwrap();
    while date.weekday() != Weekday::Mon {
        date = date.succ_opt().unwrap();
    }
    date
}

#[tokio::test]
async fn test_book_appointment_success() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");

    let (status, body) = app.book(&patient, doctor_id, next_weekday(), "09:00").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["hour"], "9:00");
    assert_eq!(body["patientId"], patient.id);
    assert_eq!(body["date"], next_weekday().format("%Y-%m-%d").to_string());
}

#[tokio::test]
async fn test_booking_requires_token() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");

    let (status, _) = app
        .send("POST", "/", None, Some(booking_body(&patient, doctor_id, next_weekday(), "9:00")))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.appointment_count().await, 0);
}

#[tokio::test]
async fn test_patient_cannot_book_for_another_patient() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");
    let other = TestUser::patient("other@example.com");

    let (status, _) = app
        .send("POST", "/", Some(&patient), Some(booking_body(&other, doctor_id, next_weekday(), "9:00")))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_can_book_for_patient() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let admin = TestUser::admin("admin@example.com");
    let patient = TestUser::patient("patient@example.com");

    let (status, _) = app
        .send("POST", "/", Some(&admin), Some(booking_body(&patient, doctor_id, next_weekday(), "10:00")))
        .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_doctor() {
    let app = TestApp::new(vec![]);
    let patient = TestUser::patient("patient@example.com");

    let (status, body) = app.book(&patient, Uuid::new_v4(), next_weekday(), "9:00").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "doctor_not_found");
}

#[tokio::test]
async fn test_hour_outside_working_hours() {
    let doctor = create_doctor("9-17", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");

    let (status, body) = app.book(&patient, doctor_id, next_weekday(), "20:00").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "slot_unavailable");
}

#[tokio::test]
async fn test_off_date_next_monday() {
    let monday = next_monday();
    let doctor = create_doctor("9-17", vec![monday]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);

    for hour in ["9:00", "12:00", "16:00"] {
        let patient = TestUser::patient("patient@example.com");
        let (status, body) = app.book(&patient, doctor_id, monday, hour).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["reason"], "slot_unavailable");
    }
}

#[tokio::test]
async fn test_misconfigured_doctor() {
    let doctor = create_doctor("17-9", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");

    let (status, body) = app.book(&patient, doctor_id, next_weekday(), "10:00").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "configuration_error");
}

#[tokio::test]
async fn test_taken_slot_is_unavailable() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let date = next_weekday();

    let (status, _) = app.book(&TestUser::patient("a@example.com"), doctor_id, date, "9:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.book(&TestUser::patient("b@example.com"), doctor_id, date, "9:00").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "slot_unavailable");
}

#[tokio::test]
async fn test_cooldown_blocks_second_booking_with_any_doctor() {
    let first_doctor = create_doctor("9-12", vec![]);
    let second_doctor = create_doctor("9-12", vec![]);
    let second_id = second_doctor.id;
    let first_id = first_doctor.id;
    let app = TestApp::new(vec![first_doctor, second_doctor]);
    let patient = TestUser::patient("patient@example.com");

    let (status, _) = app.book(&patient, first_id, next_weekday(), "9:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.book(&patient, second_id, next_weekday(), "10:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "cooldown_active");
}

#[tokio::test]
async fn test_concurrent_bookings_for_one_slot() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let date = next_weekday();

    let patients: Vec<TestUser> = (0..4)
        .map(|i| TestUser::patient(&format!("racer{}@example.com", i)))
        .collect();

    let results = futures::future::join_all(patients.iter().map(|patient| app.book(patient, doctor_id, date, "9:00"))).await;

    let created = results.iter().filter(|(status, _)| *status == StatusCode::CREATED).count();
    assert_eq!(created, 1);

    for (status, body) in results.iter().filter(|(status, _)| *status != StatusCode::CREATED) {
        assert_eq!(*status, StatusCode::CONFLICT);
        let reason = body["reason"].as_str().unwrap();
        assert!(reason == "slot_unavailable" || reason == "concurrent_conflict", "{}", reason);
    }

    assert_eq!(app.store.appointment_count().await, 1);
}

#[tokio::test]
async fn test_reschedule_to_own_slot_succeeds() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");
    let date = next_weekday();

    let (_, booked) = app.book(&patient, doctor_id, date, "10:00").await;
    let id = booked["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "PUT",
            &format!("/{}", id),
            Some(&patient),
            Some(json!({ "date": date.format("%Y-%m-%d").to_string(), "hour": "10:00", "title": "Follow-up" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hour"], "10:00");
    assert_eq!(body["title"], "Follow-up");
}

#[tokio::test]
async fn test_reschedule_onto_taken_slot() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let date = next_weekday();
    let first = TestUser::patient("first@example.com");
    let second = TestUser::patient("second@example.com");

    let (_, booked) = app.book(&first, doctor_id, date, "9:00").await;
    app.book(&second, doctor_id, date, "10:00").await;

    let (status, body) = app
        .send(
            "PUT",
            &format!("/{}", booked["id"].as_str().unwrap()),
            Some(&first),
            Some(json!({ "hour": "10:00" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "slot_unavailable");

    let (status, body) = app
        .send(
            "PUT",
            &format!("/{}", booked["id"].as_str().unwrap()),
            Some(&first),
            Some(json!({ "hour": "11:00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hour"], "11:00");
}

#[tokio::test]
async fn test_cancelled_appointment_frees_slot() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let date = next_weekday();
    let first = TestUser::patient("first@example.com");

    let (_, booked) = app.book(&first, doctor_id, date, "9:00").await;
    let (status, body) = app
        .send(
            "PATCH",
            &format!("/{}/status", booked["id"].as_str().unwrap()),
            Some(&first),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = app.book(&TestUser::patient("second@example.com"), doctor_id, date, "9:00").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_status_lifecycle_over_http() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");
    let staff = TestUser::doctor("doctor@example.com");

    let (_, booked) = app.book(&patient, doctor_id, next_weekday(), "11:00").await;
    let uri = format!("/{}/status", booked["id"].as_str().unwrap());

    // Patients cannot accept their own booking.
    let (status, _) = app.send("PATCH", &uri, Some(&patient), Some(json!({ "status": "accepted" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("PATCH", &uri, Some(&staff), Some(json!({ "status": "accepted" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, _) = app.send("PATCH", &uri, Some(&staff), Some(json!({ "status": "rejected" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("PATCH", &uri, Some(&patient), Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::OK);

    // Cancelled appointments can no longer be moved.
    let (status, _) = app
        .send("PUT", &format!("/{}", booked["id"].as_str().unwrap()), Some(&patient), Some(json!({ "hour": "10:00" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_list_and_delete() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let patient = TestUser::patient("patient@example.com");
    let stranger = TestUser::patient("stranger@example.com");
    let admin = TestUser::admin("admin@example.com");

    let (_, booked) = app.book(&patient, doctor_id, next_weekday(), "9:00").await;
    let uri = format!("/{}", booked["id"].as_str().unwrap());

    let (status, body) = app.send("GET", &uri, Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], booked["id"]);

    let (status, _) = app.send("GET", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("GET", &format!("/patients/{}", patient.id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.send("GET", &format!("/doctors/{}", doctor_id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("GET", &format!("/doctors/{}", doctor_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.send("DELETE", &uri, Some(&patient), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send("GET", &uri, Some(&patient), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reschedule_to_another_doctor() {
    let first_doctor = create_doctor("9-12", vec![]);
    let first_id = first_doctor.id;
    let app = TestApp::new(vec![first_doctor]);
    let patient = TestUser::patient("patient@example.com");
    let admin = TestUser::admin("admin@example.com");
    let date = next_weekday();

    // Second doctor joins after startup with an accepted 10:00 already on the books.
    let second_doctor = create_doctor("9-12", vec![]);
    let second_id = second_doctor.id;
    app.store.put_doctor(second_doctor).await;
    let existing = NewAppointment {
        doctor_id: second_id,
        patient_id: Uuid::new_v4(),
        date,
        hour: "10:00".to_string(),
        title: "Existing".to_string(),
        description: None,
        status: AppointmentStatus::Accepted,
    };
    app.store.put_appointment(existing.into_appointment(Uuid::new_v4())).await;

    let (_, booked) = app.book(&patient, first_id, date, "10:00").await;
    let uri = format!("/{}", booked["id"].as_str().unwrap());

    let (status, body) = app
        .send("PUT", &uri, Some(&patient), Some(json!({ "doctorId": second_id, "hour": "10:00" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "slot_unavailable");

    let (status, body) = app
        .send("PUT", &uri, Some(&patient), Some(json!({ "doctorId": Uuid::new_v4() })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "doctor_not_found");

    let (status, body) = app
        .send("PUT", &uri, Some(&patient), Some(json!({ "doctorId": second_id, "hour": "11:00" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctorId"], second_id.to_string());
    assert_eq!(body["hour"], "11:00");

    let (_, body) = app.send("GET", &format!("/doctors/{}", first_id), Some(&admin), None).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = app.send("GET", &format!("/doctors/{}", second_id), Some(&admin), None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    // The freed 10:00 with the first doctor is bookable again.
    let (status, _) = app.book(&TestUser::patient("other@example.com"), first_id, date, "10:00").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_list_appointments_by_role() {
    let doctor = create_doctor("9-12", vec![]);
    let doctor_id = doctor.id;
    let app = TestApp::new(vec![doctor]);
    let date = next_weekday();
    let first = TestUser::patient("first@example.com");
    let second = TestUser::patient("second@example.com");
    let admin = TestUser::admin("admin@example.com");

    app.book(&first, doctor_id, date, "9:00").await;
    app.book(&second, doctor_id, date, "10:00").await;

    let (status, body) = app.send("GET", "/", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["patientId"], first.id);

    let (status, body) = app.send("GET", "/", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
