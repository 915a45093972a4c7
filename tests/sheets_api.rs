//! `SheetsApiBackend` against a local stand-in for the Sheets v4
//! `spreadsheets.values` endpoints.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use instamon::config::{HeaderLabels, SheetConfig};
use instamon::models::Record;
use instamon::sheet::api::SheetsApiBackend;
use instamon::sheet::{SheetError, SheetWriter};

const TOKEN: &str = "test-token";

#[derive(Default)]
struct MockSheet {
    /// (col, row), both 1-based.
    cells: HashMap<(u32, u32), String>,
    puts: Vec<PutLog>,
    fail_with: Option<u16>,
    delay: Option<Duration>,
}

#[derive(Debug, Clone)]
struct PutLog {
    range: String,
    value_input: Option<String>,
    rows: usize,
}

type Shared = Arc<Mutex<MockSheet>>;

/// `B12` → (2, 12).
fn parse_a1(cell: &str) -> (u32, u32) {
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap();
    let (letters, digits) = cell.split_at(split);
    let col = letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + (b - b'A' + 1) as u32);
    (col, digits.parse().unwrap())
}

/// `'Tab Name'!B2` → ("Tab Name", Some((2, 2))).
fn split_range(range: &str) -> (String, Option<(u32, u32)>) {
    let (sheet, cell) = match range.rsplit_once('!') {
        Some((sheet, cell)) => (sheet, Some(parse_a1(cell))),
        None => (range, None),
    };
    let sheet = sheet.trim_matches('\'').replace("''", "'");
    (sheet, cell)
}

fn api_error(status: u16, message: &str) -> Response {
    let code = StatusCode::from_u16(status).unwrap();
    (
        code,
        Json(json!({ "error": { "code": status, "message": message, "status": "FAILED" } })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

async fn gate(state: &Shared, headers: &HeaderMap) -> Option<Response> {
    let (delay, fail_with) = {
        let mock = state.lock().unwrap();
        (mock.delay, mock.fail_with)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if !authorized(headers) {
        return Some(api_error(401, "Request had invalid authentication credentials."));
    }
    fail_with.map(|status| api_error(status, "The caller does not have permission"))
}

async fn handle_get(
    State(state): State<Shared>,
    Path((_id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(resp) = gate(&state, &headers).await {
        return resp;
    }

    let mock = state.lock().unwrap();
    let (_, cell) = split_range(&range);
    match cell {
        Some(cell) => match mock.cells.get(&cell) {
            Some(value) if !value.is_empty() => {
                Json(json!({ "range": range, "values": [[value]] })).into_response()
            }
            _ => Json(json!({ "range": range })).into_response(),
        },
        None => {
            let max_row = mock
                .cells
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|((_, row), _)| *row)
                .max()
                .unwrap_or(0);
            let rows: Vec<Vec<String>> = (1..=max_row)
                .map(|row| {
                    let max_col = mock
                        .cells
                        .iter()
                        .filter(|((_, r), v)| *r == row && !v.is_empty())
                        .map(|((c, _), _)| *c)
                        .max()
                        .unwrap_or(0);
                    (1..=max_col)
                        .map(|col| mock.cells.get(&(col, row)).cloned().unwrap_or_default())
                        .collect()
                })
                .collect();
            if rows.is_empty() {
                Json(json!({ "range": range })).into_response()
            } else {
                Json(json!({ "range": range, "values": rows })).into_response()
            }
        }
    }
}

#[derive(Deserialize)]
struct PutQuery {
    #[serde(rename = "valueInputOption")]
    value_input: Option<String>,
}

#[derive(Deserialize)]
struct PutBody {
    values: Vec<Vec<String>>,
}

async fn handle_put(
    State(state): State<Shared>,
    Path((_id, range)): Path<(String, String)>,
    Query(query): Query<PutQuery>,
    headers: HeaderMap,
    Json(body): Json<PutBody>,
) -> Response {
    if let Some(resp) = gate(&state, &headers).await {
        return resp;
    }

    let mut mock = state.lock().unwrap();
    let (_, start) = split_range(&range);
    let Some((col0, row0)) = start else {
        return api_error(400, "Range must name a start cell.");
    };
    for (r, row) in body.values.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            mock.cells
                .insert((col0 + c as u32, row0 + r as u32), value.clone());
        }
    }
    mock.puts.push(PutLog {
        range: range.clone(),
        value_input: query.value_input,
        rows: body.values.len(),
    });
    Json(json!({ "updatedRange": range, "updatedRows": body.values.len() })).into_response()
}

async fn start_mock(mock: MockSheet) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(mock));
    let app = Router::new()
        .route(
            "/v4/spreadsheets/{id}/values/{range}",
            get(handle_get).put(handle_put),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v4", addr), state)
}

fn sheet_config(api_base: &str) -> SheetConfig {
    SheetConfig {
        spreadsheet_id: "sheet-id".to_string(),
        sheet_name: "Rekap Harian".to_string(),
        api_base: api_base.to_string(),
        ..SheetConfig::default()
    }
}

fn writer(config: &SheetConfig, token: &str) -> SheetWriter {
    let backend = SheetsApiBackend::with_token(config, token.to_string()).unwrap();
    SheetWriter::new(Arc::new(backend), HeaderLabels::default())
}

fn record(n: u32) -> Record {
    Record {
        link: format!("https://www.instagram.com/p/{n}/"),
        caption: format!("Post number {n}."),
        date: "05/03/2024".to_string(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_write_adds_headers_and_rows() {
    let (base, state) = start_mock(MockSheet::default()).await;
    let config = sheet_config(&base);

    let report = writer(&config, TOKEN)
        .write(&[record(1), record(2)])
        .await
        .unwrap();
    assert_eq!(report.start_row, 2);
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.headers_written, 3);

    let mock = state.lock().unwrap();
    assert_eq!(mock.cells[&(2, 1)], "Caption");
    assert_eq!(mock.cells[&(3, 1)], "Date");
    assert_eq!(mock.cells[&(5, 1)], "Link");
    assert!(mock.cells.get(&(4, 1)).is_none());

    assert_eq!(mock.cells[&(2, 2)], "Post number 1.");
    assert_eq!(mock.cells[&(3, 2)], "05/03/2024");
    assert_eq!(mock.cells[&(4, 2)], "");
    assert_eq!(mock.cells[&(5, 3)], "https://www.instagram.com/p/2/");

    let block = mock.puts.last().unwrap();
    assert_eq!(block.range, "'Rekap Harian'!B2");
    assert_eq!(block.rows, 2);
    // Default config stores cells verbatim; the sheet never re-parses dates.
    assert!(mock
        .puts
        .iter()
        .all(|p| p.value_input.as_deref() == Some("RAW")));
}

#[tokio::test]
async fn test_second_write_appends_below() {
    let (base, state) = start_mock(MockSheet::default()).await;
    let config = sheet_config(&base);
    let writer = writer(&config, TOKEN);

    writer.write(&[record(1), record(2)]).await.unwrap();
    let report = writer.write(&[record(3)]).await.unwrap();
    assert_eq!(report.start_row, 4);
    assert_eq!(report.headers_written, 0);

    let mock = state.lock().unwrap();
    // 3 header cells + 2 blocks
    assert_eq!(mock.puts.len(), 5);
    assert_eq!(mock.cells[&(2, 4)], "Post number 3.");
}

#[tokio::test]
async fn test_existing_content_is_respected() {
    let mut seeded = MockSheet::default();
    seeded.cells.insert((2, 1), "Judul".to_string());
    for row in 2..=6 {
        seeded.cells.insert((5, row), format!("https://old/{row}"));
    }
    let (base, state) = start_mock(seeded).await;
    let config = sheet_config(&base);

    let report = writer(&config, TOKEN).write(&[record(9)]).await.unwrap();
    assert_eq!(report.start_row, 7);
    assert_eq!(report.headers_written, 2);

    let mock = state.lock().unwrap();
    assert_eq!(mock.cells[&(2, 1)], "Judul");
    assert_eq!(mock.cells[&(2, 7)], "Post number 9.");
}

#[tokio::test]
async fn test_user_entered_value_input_passed_through() {
    let (base, state) = start_mock(MockSheet::default()).await;
    let config = SheetConfig {
        value_input: "USER_ENTERED".to_string(),
        ..sheet_config(&base)
    };

    writer(&config, TOKEN).write(&[record(1)]).await.unwrap();

    let mock = state.lock().unwrap();
    assert!(mock
        .puts
        .iter()
        .all(|p| p.value_input.as_deref() == Some("USER_ENTERED")));
}

#[tokio::test]
async fn test_bad_token_maps_to_status_error() {
    let (base, state) = start_mock(MockSheet::default()).await;
    let config = sheet_config(&base);

    let err = writer(&config, "wrong").write(&[record(1)]).await.unwrap_err();
    match err {
        SheetError::Status { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid authentication credentials"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(state.lock().unwrap().cells.is_empty());
}

#[tokio::test]
async fn test_permission_denied_surfaces_api_message() {
    let mock = MockSheet {
        fail_with: Some(403),
        ..MockSheet::default()
    };
    let (base, _) = start_mock(mock).await;
    let config = sheet_config(&base);

    let err = writer(&config, TOKEN).write(&[record(1)]).await.unwrap_err();
    assert!(matches!(err, SheetError::Status { status: 403, .. }));
    assert!(err.to_string().contains("The caller does not have permission"));
}

#[tokio::test]
async fn test_slow_api_times_out() {
    let mock = MockSheet {
        delay: Some(Duration::from_secs(3)),
        ..MockSheet::default()
    };
    let (base, _) = start_mock(mock).await;
    let config = SheetConfig {
        timeout_secs: 1,
        ..sheet_config(&base)
    };

    let err = writer(&config, TOKEN).write(&[record(1)]).await.unwrap_err();
    assert!(matches!(err, SheetError::Transport(_)), "got {err:?}");
}

#[test]
fn test_missing_token_env() {
    let config = SheetConfig {
        token_env: "INSTAMON_TEST_TOKEN_NEVER_SET".to_string(),
        ..sheet_config("http://127.0.0.1:1/v4")
    };
    let err = SheetsApiBackend::new(&config).err().unwrap();
    assert!(matches!(err, SheetError::MissingToken(ref name) if name == "INSTAMON_TEST_TOKEN_NEVER_SET"));
}

#[test]
fn test_invalid_api_base() {
    let config = sheet_config("not a url");
    let err = SheetsApiBackend::with_token(&config, TOKEN.to_string())
        .err()
        .unwrap();
    assert!(matches!(err, SheetError::Config(_)));
}
