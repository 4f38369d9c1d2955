use chrono::NaiveDate;
use garmin_sheets_sync::prompt::ScriptedPrompter;
use garmin_sheets_sync::{DailyRecord, SheetsSink, Sink, SinkReport, SyncError};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const META: &str = "/v4/spreadsheets/sheet-1";
const FIRST_CELL: &str = "/v4/spreadsheets/sheet-1/values/'Metrics'!A1";
const DATE_COLUMN: &str = "/v4/spreadsheets/sheet-1/values/'Metrics'!A:A";
const APPEND: &str = "/v4/spreadsheets/sheet-1/values/'Metrics'!A1:append";
const BATCH_VALUES: &str = "/v4/spreadsheets/sheet-1/values:batchUpdate";

fn sink(server: &MockServer) -> SheetsSink {
    SheetsSink::new(
        &server.uri(),
        "sheet-1",
        "Metrics",
        SecretString::new("ya29.token".into()),
    )
    .with_label("Health")
}

fn records() -> Vec<DailyRecord> {
    let mut first = DailyRecord::blank(NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));
    first.summary.steps = Some(9000);
    let second = DailyRecord::blank(NaiveDate::from_ymd_opt(2025, 3, 2).expect("date"));
    vec![first, second]
}

async fn mount_metadata(server: &MockServer, tabs: &[&str]) {
    let sheets: Vec<_> = tabs
        .iter()
        .map(|t| json!({"properties": {"title": t}}))
        .collect();
    Mock::given(method("GET"))
        .and(path(META))
        .and(header("authorization", "Bearer ya29.token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"title": "Health"},
            "sheets": sheets
        })))
        .mount(server)
        .await;
}

async fn mount_values(server: &MockServer, at: &str, values: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Metrics!A1",
            "majorDimension": "ROWS",
            "values": values
        })))
        .mount(server)
        .await;
}

async fn mount_append(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(APPEND))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(body_string_contains("2025-03-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn missing_tab_is_created_with_headers() {
    let server = MockServer::start().await;
    mount_metadata(&server, &["Sheet1"]).await;

    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1:batchUpdate"))
        .and(body_string_contains("addSheet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"replies": [{}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FIRST_CELL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"range": "Metrics!A1"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(FIRST_CELL))
        .and(query_param("valueInputOption", "RAW"))
        .and(body_string_contains("Tennis Activity Duration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updatedRows": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATE_COLUMN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"range": "Metrics!A:A"})))
        .mount(&server)
        .await;
    mount_append(&server, 1).await;

    let mut prompter = ScriptedPrompter::default();
    let report = sink(&server)
        .write(&records(), &mut prompter)
        .await
        .expect("write");

    assert_eq!(
        report,
        SinkReport {
            appended: 2,
            updated: 0,
            skipped: 0
        }
    );
    assert!(prompter.asked.is_empty());
}

#[tokio::test]
async fn existing_dates_are_updated_after_confirmation() {
    let server = MockServer::start().await;
    mount_metadata(&server, &["Metrics"]).await;
    mount_values(&server, FIRST_CELL, json!([["Date"]])).await;
    mount_values(&server, DATE_COLUMN, json!([["Date"], ["2025-02-28"], ["2025-03-01"]])).await;

    Mock::given(method("POST"))
        .and(path(BATCH_VALUES))
        .and(body_string_contains("'Metrics'!A3"))
        .and(body_string_contains("9000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalUpdatedRows": 1})))
        .expect(1)
        .mount(&server)
        .await;
    mount_append(&server, 1).await;

    let mut prompter = ScriptedPrompter::new(["y"]);
    let report = sink(&server)
        .write(&records(), &mut prompter)
        .await
        .expect("write");

    assert_eq!(report.updated, 1);
    assert_eq!(report.appended, 1);
    assert_eq!(prompter.asked.len(), 1);
    assert!(prompter.asked[0].contains("Overwrite"));
}

#[tokio::test]
async fn declined_overwrite_leaves_rows_alone() {
    let server = MockServer::start().await;
    mount_metadata(&server, &["Metrics"]).await;
    mount_values(&server, FIRST_CELL, json!([["Date"]])).await;
    mount_values(&server, DATE_COLUMN, json!([["Date"], ["2025-03-01"]])).await;

    Mock::given(method("POST"))
        .and(path(BATCH_VALUES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    mount_append(&server, 1).await;

    let mut prompter = ScriptedPrompter::new(["n"]);
    let report = sink(&server)
        .write(&records(), &mut prompter)
        .await
        .expect("write");

    assert_eq!(report.skipped, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.appended, 1);
}

#[tokio::test]
async fn rejected_token_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(META))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let err = sink(&server)
        .write(&records(), &mut ScriptedPrompter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::GoogleAuth(_)), "got {err:?}");
}

#[tokio::test]
async fn server_errors_surface_as_sheets_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(META))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let err = sink(&server)
        .write(&records(), &mut ScriptedPrompter::default())
        .await
        .unwrap_err();
    match err {
        SyncError::Sheets(msg) => assert!(msg.contains("500")),
        other => panic!("unexpected error: {other:?}"),
    }
}
