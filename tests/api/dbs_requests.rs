use childminder_registration::domain::household_member::MemberKind;
use uuid::Uuid;
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

fn delivered() -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(serde_json::json!({ "messageId": "<dbs@provider>" }))
}

#[tokio::test]
async fn dbs_request_marks_the_member_as_requested_and_sends_an_email() {
    let test_app = TestApp::spawn_app().await;
    let member_id = test_app
        .insert_household_member(MemberKind::Applicant, "Alex Morgan", 2)
        .await;

    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .and(header("api-key", "test-api-key"))
        .respond_with(delivered())
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": member_id,
            "memberEmail": "alex@test.com",
            "applicantName": "Jane Smith"
        }))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "DBS request sent successfully");

    let member = test_app
        .get_household_member(MemberKind::Applicant, member_id)
        .await;
    assert_eq!(member.dbs_status, "requested");
    assert_eq!(member.reminder_count, 3);
    assert_eq!(member.email.as_deref(), Some("alex@test.com"));
    assert!(member.dbs_request_date.is_some());
    assert_eq!(member.dbs_request_date, member.last_contact_date);
    assert_eq!(member.reminder_history.len(), 3);
    let last_event = member.reminder_history.last().unwrap();
    assert_eq!(last_event.kind, "dbs_request");
    assert_eq!(last_event.sent_to, "alex@test.com");
}

#[tokio::test]
async fn dbs_request_email_is_addressed_to_the_member() {
    let test_app = TestApp::spawn_app().await;
    let member_id = test_app
        .insert_household_member(MemberKind::Applicant, "Alex Morgan", 0)
        .await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": member_id,
            "memberEmail": "alex@test.com",
            "applicantName": "Jane Smith"
        }))
        .await;

    let received_requests = test_app.email_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received_requests[0].body).unwrap();
    let html = body["htmlContent"].as_str().unwrap();

    assert_eq!(body["to"][0]["email"], "alex@test.com");
    assert_eq!(body["to"][0]["name"], "Alex Morgan");
    assert_eq!(body["subject"], "DBS Check Required - Action Needed");
    assert!(html.contains("Dear Alex Morgan,"));
    assert!(html.contains("Jane Smith has applied to become a registered childminder"));
}

#[tokio::test]
async fn employee_dbs_request_updates_the_employee_household_member() {
    let test_app = TestApp::spawn_app().await;
    let member_id = test_app
        .insert_household_member(MemberKind::Employee, "Chris Taylor", 0)
        .await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": member_id,
            "memberEmail": "chris@test.com",
            "employeeName": "Sam Jones",
            "employeeId": Uuid::new_v4(),
            "isEmployee": true
        }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let member = test_app
        .get_household_member(MemberKind::Employee, member_id)
        .await;
    assert_eq!(member.dbs_status, "requested");
    assert_eq!(member.reminder_count, 1);
}

#[tokio::test]
async fn dbs_request_for_an_unknown_member_fails_without_sending_an_email() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": Uuid::new_v4(),
            "memberEmail": "nobody@test.com"
        }))
        .await;

    assert_eq!(500, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Member not found");
}

#[tokio::test]
async fn applicant_member_is_not_found_in_the_employee_table() {
    let test_app = TestApp::spawn_app().await;
    let member_id = test_app
        .insert_household_member(MemberKind::Applicant, "Alex Morgan", 0)
        .await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": member_id,
            "memberEmail": "alex@test.com",
            "isEmployee": true
        }))
        .await;

    assert_eq!(500, response.status().as_u16());
}

#[tokio::test]
async fn failed_delivery_returns_an_error_but_keeps_the_tracking_update() {
    let test_app = TestApp::spawn_app().await;
    let member_id = test_app
        .insert_household_member(MemberKind::Applicant, "Alex Morgan", 2)
        .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": member_id,
            "memberEmail": "alex@test.com"
        }))
        .await;

    assert_eq!(500, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("500"));

    let member = test_app
        .get_household_member(MemberKind::Applicant, member_id)
        .await;
    assert_eq!(member.dbs_status, "requested");
    assert_eq!(member.reminder_count, 3);
    assert_eq!(member.reminder_history.len(), 3);
}

#[tokio::test]
async fn dbs_request_accepts_members_with_any_stored_status() {
    let test_app = TestApp::spawn_app().await;
    let received_member = test_app
        .insert_household_member_with_status(MemberKind::Applicant, "Alex Morgan", 1, "received")
        .await;
    let expired_member = test_app
        .insert_household_member_with_status(MemberKind::Applicant, "Robin Lee", 0, "expired")
        .await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(2)
        .mount(&test_app.email_server)
        .await;

    for (member_id, previous_count) in [(received_member, 1), (expired_member, 0)] {
        let response = test_app
            .post_dbs_request(&serde_json::json!({
                "memberId": member_id,
                "memberEmail": "member@test.com"
            }))
            .await;

        assert_eq!(200, response.status().as_u16());

        let member = test_app
            .get_household_member(MemberKind::Applicant, member_id)
            .await;
        assert_eq!(member.dbs_status, "requested");
        assert_eq!(member.reminder_count, previous_count + 1);
    }
}

#[tokio::test]
async fn dbs_request_accepts_names_with_punctuation() {
    let test_app = TestApp::spawn_app().await;
    let member_id = test_app
        .insert_household_member(MemberKind::Applicant, "Alex <Morgan>", 0)
        .await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": member_id,
            "memberEmail": "alex@test.com",
            "applicantName": "Jane Smith (née Jones)"
        }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let received_requests = test_app.email_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received_requests[0].body).unwrap();
    let html = body["htmlContent"].as_str().unwrap();
    assert!(html.contains("Dear Alex &lt;Morgan&gt;,"));
    assert!(html.contains("Jane Smith (née Jones) has applied"));
}

#[tokio::test]
async fn concurrent_dbs_requests_keep_every_reminder() {
    let test_app = TestApp::spawn_app().await;
    let member_id = test_app
        .insert_household_member(MemberKind::Applicant, "Alex Morgan", 0)
        .await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(10)
        .mount(&test_app.email_server)
        .await;

    let client = reqwest::Client::new();
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let request = client
                .post(&format!("{}/send-dbs-request-email", test_app.address))
                .json(&serde_json::json!({
                    "memberId": member_id,
                    "memberEmail": format!("alex{}@test.com", i)
                }));
            tokio::spawn(request.send())
        })
        .collect();

    for handle in handles {
        let response = handle
            .await
            .expect("Request task panicked.")
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
    }

    let member = test_app
        .get_household_member(MemberKind::Applicant, member_id)
        .await;
    assert_eq!(member.reminder_count, 10);
    assert_eq!(member.reminder_history.len(), 10);
}

#[tokio::test]
async fn dbs_request_returns_500_without_side_effects_when_body_is_invalid() {
    let test_app = TestApp::spawn_app().await;
    let test_cases = vec![
        (
            serde_json::json!({ "memberEmail": "alex@test.com" }),
            "missing member id",
        ),
        (
            serde_json::json!({ "memberId": Uuid::new_v4() }),
            "missing member email",
        ),
        (
            serde_json::json!({ "memberId": "42", "memberEmail": "alex@test.com" }),
            "member id is not a uuid",
        ),
        (
            serde_json::json!({ "memberId": Uuid::new_v4(), "memberEmail": "alex.test.com" }),
            "invalid member email",
        ),
        (
            serde_json::json!({
                "memberId": Uuid::new_v4(),
                "memberEmail": "alex@test.com",
                "applicantName": "  "
            }),
            "blank applicant name",
        ),
    ];

    Mock::given(any())
        .respond_with(delivered())
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_dbs_request(&invalid_body).await;

        assert_eq!(
            500,
            response.status().as_u16(),
            "The API did not fail with 500 status when payload was {}",
            error_message
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn responses_carry_cors_headers() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_dbs_request(&serde_json::json!({
            "memberId": Uuid::new_v4(),
            "memberEmail": "nobody@test.com"
        }))
        .await;

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn preflight_request_returns_cors_headers_and_no_body() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(delivered())
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.preflight_dbs_request().await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        response.headers()["access-control-allow-headers"],
        "authorization, x-client-info, apikey, content-type"
    );
    assert_eq!(Some(0), response.content_length());
}
