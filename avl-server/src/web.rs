use axum::{
    body::Bytes,
    debug_handler,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_graceful_shutdown::SubsystemHandle;

use avl_server::{
    location::{DeviceLocation, DEFAULT_DEVICE_MODEL},
    recording::{ControlError, ExportReport, StopOutcome},
    Session,
};

// Paths kept compatible with the deployed Android client and map page
const RECEIVE_LOCATION_URI: &str = "/api/receive_location/";
const START_RECORDING_URI: &str = "/start_recording/";
const STOP_RECORDING_URI: &str = "/stop_recording/";
const RECORDING_STATUS_URI: &str = "/recording/status";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
}

#[derive(Clone)]
pub struct Web {
    session: Session,
    shutdown_tx: broadcast::Sender<()>,
}

impl Web {
    pub fn new(session: Session) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Web {
            session,
            shutdown_tx,
        }
    }

    fn router(self) -> Router {
        Router::new()
            .route(
                RECEIVE_LOCATION_URI,
                post(receive_location).get(get_active_devices),
            )
            .route(START_RECORDING_URI, post(start_recording))
            .route(STOP_RECORDING_URI, post(stop_recording))
            .route(RECORDING_STATUS_URI, get(get_recording_status))
            .layer(middleware::from_fn(no_cache_middleware))
            .with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let port = self.session.read().args.port;
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await
                .map_err(WebError::Io)?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone(); // Clone as self is moved into router() below

        let app = self.router();

        info!("Starting HTTP web server on port {}", port);

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                let _ = shutdown_tx.send(());
            },
            r = axum::serve(listener, app)
                    .with_graceful_shutdown(
                        async move {
                            _ = shutdown_rx.recv().await;
                        }
                    ) => {
                return r.map_err(WebError::Io);
            }
        }
        Ok(())
    }
}

/// Middleware to add no-cache headers to API responses
async fn no_cache_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

// ============================================================================
// Location Reports
// ============================================================================

/// Reasons a location report is rejected
#[derive(Error, Debug, PartialEq)]
enum ReportError {
    #[error("Empty request body")]
    EmptyBody,
    #[error("Invalid JSON data")]
    InvalidJson,
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": self.to_string()})),
        )
            .into_response()
    }
}

/// Read a finite number that may also arrive as a numeric string
fn number_field(body: &Value, name: &'static str) -> Result<Option<f64>, ReportError> {
    let value = match body.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ReportError::InvalidValue(name)),
    }
}

fn required_number(body: &Value, name: &'static str) -> Result<f64, ReportError> {
    number_field(body, name)?.ok_or(ReportError::MissingField(name))
}

/// Validate a raw report body into a location stamped with the current time
fn parse_report(body: &[u8]) -> Result<DeviceLocation, ReportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ReportError::EmptyBody);
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("JSON decode error: {}", e);
        ReportError::InvalidJson
    })?;
    if !value.is_object() {
        return Err(ReportError::InvalidJson);
    }

    let device_id = match value.get("android_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        None | Some(Value::Null) => return Err(ReportError::MissingField("android_id")),
        Some(_) => return Err(ReportError::InvalidValue("android_id")),
    };
    let latitude = required_number(&value, "latitude")?;
    let longitude = required_number(&value, "longitude")?;
    let speed = number_field(&value, "speed")?.unwrap_or(0.0);
    let battery_level = number_field(&value, "battery_level")?.unwrap_or(0.0);
    let device_model = match value.get("device_model") {
        None | Some(Value::Null) => DEFAULT_DEVICE_MODEL.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(ReportError::InvalidValue("device_model")),
    };

    Ok(DeviceLocation {
        device_id,
        latitude,
        longitude,
        speed,
        battery_level,
        device_model,
        timestamp: Utc::now(),
    })
}

/// POST /api/receive_location/ - Report a device position
#[debug_handler]
async fn receive_location(State(state): State<Web>, body: Bytes) -> Response {
    let location = match parse_report(&body) {
        Ok(location) => location,
        Err(e) => {
            debug!("Rejected location report: {}", e);
            return e.into_response();
        }
    };

    debug!(
        "Received location: android_id={}, latitude={}, longitude={}, speed={}, battery_level={}, device_model={}",
        location.device_id,
        location.latitude,
        location.longitude,
        location.speed,
        location.battery_level,
        location.device_model
    );

    state.session.report_location(location);
    Json(json!({"status": "success"})).into_response()
}

/// GET /api/receive_location/ - Devices that reported recently
#[debug_handler]
async fn get_active_devices(State(state): State<Web>) -> Response {
    let devices = state.session.active_devices(Utc::now());
    debug!("GET active devices: {}", devices.len());

    Json(json!({"status": "success", "devices": devices})).into_response()
}

// ============================================================================
// Recording Control Endpoints
// ============================================================================

/// POST /start_recording/ - Start a new recording session
#[debug_handler]
async fn start_recording(State(state): State<Web>) -> Response {
    state.session.recording().start();
    Json(json!({"status": "started"})).into_response()
}

/// Request body for stopping a recording
#[derive(Deserialize, Default)]
struct StopRecordingRequest {
    #[serde(default)]
    selected_devices: Vec<String>,
}

#[derive(Serialize)]
struct ExportFailureApi {
    device: String,
    message: String,
}

#[derive(Serialize)]
struct StopRecordingResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ExportFailureApi>,
}

impl StopRecordingResponse {
    fn message(status: &'static str, message: &str) -> Self {
        StopRecordingResponse {
            status,
            files: None,
            message: Some(message.to_string()),
            errors: Vec::new(),
        }
    }

    fn from_report(report: &ExportReport) -> Self {
        let errors: Vec<ExportFailureApi> = report
            .failed
            .iter()
            .map(|f| ExportFailureApi {
                device: f.device_id.clone(),
                message: f.error.to_string(),
            })
            .collect();

        if report.is_empty() {
            Self::message("stopped", "No points recorded for selected devices")
        } else if report.exported.is_empty() {
            StopRecordingResponse {
                errors,
                ..Self::message("error", "Failed to export selected devices")
            }
        } else {
            StopRecordingResponse {
                status: "stopped",
                files: Some(report.files()),
                message: None,
                errors,
            }
        }
    }
}

fn parse_stop_request(body: &[u8]) -> Result<StopRecordingRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StopRecordingRequest::default());
    }
    serde_json::from_slice(body)
}

/// POST /stop_recording/ - Stop recording and export the selected devices
#[debug_handler]
async fn stop_recording(State(state): State<Web>, body: Bytes) -> Response {
    let request = parse_stop_request(&body);
    let selected = request
        .as_ref()
        .map(|r| r.selected_devices.clone())
        .unwrap_or_default();
    debug!("POST stop recording, selected={:?}", selected);

    // Export does blocking file I/O
    let controller = state.session.recording().clone();
    let outcome =
        match tokio::task::spawn_blocking(move || controller.stop_and_export(&selected)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Export task failed: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(StopRecordingResponse::message("error", &e.to_string())),
                )
                    .into_response();
            }
        };

    match outcome {
        Ok(StopOutcome::NothingRecorded) => {
            Json(StopRecordingResponse::message("stopped", "No points recorded")).into_response()
        }
        Ok(StopOutcome::Exported(report)) => {
            Json(StopRecordingResponse::from_report(&report)).into_response()
        }
        Err(ControlError::NoDevicesSelected) => {
            let message = match request {
                Err(e) => format!("Invalid JSON data: {}", e),
                Ok(_) => ControlError::NoDevicesSelected.to_string(),
            };
            (
                StatusCode::BAD_REQUEST,
                Json(StopRecordingResponse::message("error", &message)),
            )
                .into_response()
        }
    }
}

/// GET /recording/status - Recording state and retained points per device
#[debug_handler]
async fn get_recording_status(State(state): State<Web>) -> Response {
    Json(state.session.recording().status()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use clap::Parser;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use avl_server::Cli;

    fn create_test_web() -> (Web, TempDir) {
        let temp = TempDir::new().unwrap();
        let export_dir = temp.path().to_str().unwrap().to_string();
        let args = Cli::parse_from(["avl-server", "--export-dir", &export_dir]);
        (Web::new(Session::new(args)), temp)
    }

    async fn send(web: &Web, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = web.clone().router().oneshot(request).await.unwrap();

        let status = response.status();
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn report(web: &Web, id: &str, latitude: f64, longitude: f64) -> StatusCode {
        let body = json!({"android_id": id, "latitude": latitude, "longitude": longitude});
        send(web, "POST", RECEIVE_LOCATION_URI, &body.to_string()).await.0
    }

    #[test]
    fn test_parse_report_defaults() {
        let location =
            parse_report(br#"{"android_id": "abc", "latitude": 35.7, "longitude": "51.4"}"#)
                .unwrap();
        assert_eq!(location.device_id, "abc");
        assert_eq!(location.longitude, 51.4);
        assert_eq!(location.speed, 0.0);
        assert_eq!(location.battery_level, 0.0);
        assert_eq!(location.device_model, DEFAULT_DEVICE_MODEL);
    }

    #[test]
    fn test_parse_report_device_model() {
        let model = |body: &str| parse_report(body.as_bytes()).map(|l| l.device_model);
        assert_eq!(
            model(r#"{"android_id": "a", "latitude": 1, "longitude": 2, "device_model": "Pixel 7"}"#),
            Ok("Pixel 7".to_string())
        );
        assert_eq!(
            model(r#"{"android_id": "a", "latitude": 1, "longitude": 2, "device_model": 3310}"#),
            Ok("3310".to_string())
        );
        assert_eq!(
            model(r#"{"android_id": "a", "latitude": 1, "longitude": 2, "device_model": null}"#),
            Ok(DEFAULT_DEVICE_MODEL.to_string())
        );
        assert_eq!(
            model(r#"{"android_id": "a", "latitude": 1, "longitude": 2, "device_model": {}}"#),
            Err(ReportError::InvalidValue("device_model"))
        );
    }

    #[test]
    fn test_parse_report_errors() {
        assert_eq!(parse_report(b"").unwrap_err(), ReportError::EmptyBody);
        assert_eq!(parse_report(b"{not json").unwrap_err(), ReportError::InvalidJson);
        assert_eq!(
            parse_report(br#"{"latitude": 1, "longitude": 2}"#).unwrap_err(),
            ReportError::MissingField("android_id")
        );
        assert_eq!(
            parse_report(br#"{"android_id": "a", "longitude": 2}"#).unwrap_err(),
            ReportError::MissingField("latitude")
        );
        assert_eq!(
            parse_report(br#"{"android_id": "a", "latitude": "north", "longitude": 2}"#)
                .unwrap_err(),
            ReportError::InvalidValue("latitude")
        );
        assert_eq!(
            parse_report(br#"{"android_id": "a", "latitude": 1, "longitude": 2, "speed": []}"#)
                .unwrap_err(),
            ReportError::InvalidValue("speed")
        );
    }

    #[tokio::test]
    async fn test_receive_and_list_devices() {
        let (web, _temp) = create_test_web();

        assert_eq!(report(&web, "dev1", 35.70, 51.40).await, StatusCode::OK);
        assert_eq!(report(&web, "dev2", 35.80, 51.50).await, StatusCode::OK);

        let (status, body) = send(&web, "GET", RECEIVE_LOCATION_URI, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        let devices = body["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0]["android_id"], "dev1");
        assert_eq!(devices[0]["device_model"], "Unknown");
    }

    #[tokio::test]
    async fn test_invalid_report_is_bad_request() {
        let (web, _temp) = create_test_web();

        let (status, body) = send(&web, "POST", RECEIVE_LOCATION_URI, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Empty request body");

        let (status, body) = send(&web, "POST", RECEIVE_LOCATION_URI, "[1, 2]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_record_and_export() {
        let (web, temp) = create_test_web();

        let (_, body) = send(&web, "POST", START_RECORDING_URI, "").await;
        assert_eq!(body["status"], "started");

        report(&web, "dev1", 35.70, 51.40).await;
        report(&web, "dev1", 35.71, 51.41).await;
        report(&web, "dev2", 35.70, 51.40).await;

        let (_, status) = send(&web, "GET", RECORDING_STATUS_URI, "").await;
        assert_eq!(status["active"], true);
        assert_eq!(status["devices"]["dev1"], 2);

        let (code, body) = send(
            &web,
            "POST",
            STOP_RECORDING_URI,
            r#"{"selected_devices": ["dev1", "dev2"]}"#,
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "stopped");
        assert_eq!(body["files"], json!(["dev1.shp"]));
        assert_eq!(body["errors"][0]["device"], "dev2");

        assert!(temp.path().join("dev1.shp").exists());
        assert!(temp.path().join("dev1.shx").exists());
        assert!(temp.path().join("dev1.dbf").exists());

        let (_, status) = send(&web, "GET", RECORDING_STATUS_URI, "").await;
        assert_eq!(status["active"], false);
    }

    #[tokio::test]
    async fn test_stop_without_points() {
        let (web, _temp) = create_test_web();
        send(&web, "POST", START_RECORDING_URI, "").await;

        let (code, body) = send(&web, "POST", STOP_RECORDING_URI, "").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["message"], "No points recorded");
    }

    #[tokio::test]
    async fn test_stop_without_selection() {
        let (web, _temp) = create_test_web();
        send(&web, "POST", START_RECORDING_URI, "").await;
        report(&web, "dev1", 35.70, 51.40).await;

        let (code, body) =
            send(&web, "POST", STOP_RECORDING_URI, r#"{"selected_devices": []}"#).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No devices selected");
    }

    #[tokio::test]
    async fn test_stop_with_only_failures() {
        let (web, _temp) = create_test_web();
        send(&web, "POST", START_RECORDING_URI, "").await;
        report(&web, "dev1", 35.70, 51.40).await;

        let (code, body) =
            send(&web, "POST", STOP_RECORDING_URI, r#"{"selected_devices": ["dev1"]}"#).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["errors"][0]["device"], "dev1");
        assert!(body.get("files").is_none());
    }

    #[tokio::test]
    async fn test_stop_unknown_device() {
        let (web, _temp) = create_test_web();
        send(&web, "POST", START_RECORDING_URI, "").await;
        report(&web, "dev1", 35.70, 51.40).await;

        let (_, body) =
            send(&web, "POST", STOP_RECORDING_URI, r#"{"selected_devices": ["other"]}"#).await;
        assert_eq!(body["status"], "stopped");
        assert_eq!(body["message"], "No points recorded for selected devices");
    }
}
