//! Helpers shared by the HTTP test suites.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime};
use serde_json::{Value, json};
use tower::ServiceExt;

use payslip_engine::api::{ROLE_HEADER, USER_ID_HEADER};
use payslip_engine::clock::{Clock, FixedClock};

pub const ADMIN: (u64, &str) = (1, "admin");
pub const EMPLOYEE: (u64, &str) = (7, "employee");

/// Friday 2025-08-01 09:00 UTC+7.
pub fn test_clock() -> Arc<dyn Clock> {
    let wib = FixedOffset::east_opt(7 * 3600).unwrap();
    Arc::new(FixedClock::at_civil(
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        wib,
    ))
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    who: (u64, &str),
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, who.0.to_string())
        .header(ROLE_HEADER, who.1);
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

pub async fn create_july(router: &Router) -> u64 {
    let (status, period) = send(
        router,
        "POST",
        "/periods",
        ADMIN,
        Some(json!({
            "name": "Jul 2025",
            "start_date": "2025-07-01",
            "end_date": "2025-07-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", period);
    period["id"].as_u64().unwrap()
}

/// Weekdays of July 2025 in order.
pub fn july_weekdays() -> Vec<String> {
    (1..=31)
        .map(|day| NaiveDate::from_ymd_opt(2025, 7, day).unwrap())
        .filter(|d| d.weekday().number_from_monday() <= 5)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect()
}

/// Salary 7,000,000, 20 attended days, 3h + 2h overtime and 60,000 + 40,000
/// in reimbursements, all in July 2025.
pub async fn seed_reference_employee(router: &Router, who: (u64, &str)) {
    let (status, _) = send(
        router,
        "PUT",
        &format!("/employees/{}/salary", who.0),
        ADMIN,
        Some(json!({"salary": 7000000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for day in july_weekdays().iter().take(20) {
        let body = json!({ "date": day });
        let (status, body) = send(router, "POST", "/attendance", who, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    for (date, hours) in [("2025-07-01", "3"), ("2025-07-02", "2")] {
        let (status, body) = send(
            router,
            "POST",
            "/overtime",
            who,
            Some(json!({"date": date, "hours": hours})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    for (date, amount) in [("2025-07-10", 60000), ("2025-07-03", 40000)] {
        let (status, body) = send(
            router,
            "POST",
            "/reimbursements",
            who,
            Some(json!({"date": date, "amount": amount, "description": "client visit"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }
}

pub fn assert_reference_figures(payslip: &Value) {
    assert_eq!(payslip["working_days"], 23);
    assert_eq!(payslip["attendance_days"], 20);
    assert_eq!(payslip["working_hours"], 184);
    assert_eq!(payslip["attendance_hours"], 160);
    assert_eq!(payslip["hourly_rate"], "38043.48");
    assert_eq!(payslip["base_pay"], "6086956.52");
    assert_eq!(payslip["overtime_hours"], "5.00");
    assert_eq!(payslip["overtime_multiplier"], "2.00");
    assert_eq!(payslip["overtime_pay"], "380434.78");
    assert_eq!(payslip["reimbursement_sum"], "100000.00");
    assert_eq!(payslip["salary_snapshot"], "7000000.00");
    assert_eq!(payslip["grand_total"], "6567391.30");
}
