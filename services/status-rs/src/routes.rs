use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use steamid_core::{ErrorRecord, StatusReader};
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};

/// How many errors `/health` shows; `/status` shows all that are kept.
const HEALTH_ERRORS: usize = 3;

#[derive(Clone)]
pub struct StatusState {
    pub reader: StatusReader,
    pub process_started: Instant,
}

impl StatusState {
    pub fn new(reader: StatusReader, process_started: Instant) -> Self {
        Self {
            reader,
            process_started,
        }
    }
}

pub fn status_router(state: StatusState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(ServiceBuilder::new().layer(ConcurrencyLimitLayer::new(32)))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    uptime: String,
    processing: HealthProcessing,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthProcessing {
    is_running: bool,
    current_id: Option<String>,
    progress: String,
    successful: usize,
    failed: usize,
    start_time: Option<DateTime<Utc>>,
    recent_errors: Vec<ErrorRecord>,
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
    processing: &'static str,
    progress: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    processing: StatusProcessing,
    system: SystemInfo,
    recent_errors: Vec<ErrorRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusProcessing {
    is_running: bool,
    current_id: Option<String>,
    total_ids: usize,
    processed: usize,
    successful: usize,
    failed: usize,
    start_time: Option<DateTime<Utc>>,
    progress: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfo {
    uptime: f64,
    timestamp: DateTime<Utc>,
    memory: MemoryInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MemoryInfo {
    resident_bytes: Option<u64>,
}

async fn health_handler(State(state): State<StatusState>) -> Json<HealthResponse> {
    let counters = state.reader.snapshot();
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        uptime: format_uptime(state.process_started.elapsed().as_secs()),
        processing: HealthProcessing {
            is_running: counters.running,
            current_id: counters.current_id.clone(),
            progress: counters.progress_label(),
            successful: counters.successful,
            failed: counters.failed,
            start_time: counters.started_at,
            recent_errors: counters.latest_errors(HEALTH_ERRORS),
        },
    })
}

async fn root_handler(State(state): State<StatusState>) -> Json<RootResponse> {
    let counters = state.reader.snapshot();
    let progress = if counters.total > 0 {
        format!("{}/{}", counters.processed, counters.total)
    } else {
        "not started".to_string()
    };
    Json(RootResponse {
        message: "Steam ID Processor Service",
        status: "running",
        processing: if counters.running { "active" } else { "idle" },
        progress,
    })
}

async fn status_handler(State(state): State<StatusState>) -> Json<StatusResponse> {
    let counters = state.reader.snapshot();
    Json(StatusResponse {
        processing: StatusProcessing {
            is_running: counters.running,
            current_id: counters.current_id.clone(),
            total_ids: counters.total,
            processed: counters.processed,
            successful: counters.successful,
            failed: counters.failed,
            start_time: counters.started_at,
            progress: counters.progress_percent(),
        },
        system: SystemInfo {
            uptime: state.process_started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
            memory: MemoryInfo {
                resident_bytes: resident_memory_bytes(),
            },
        },
        recent_errors: counters.recent_errors().cloned().collect(),
    })
}

fn format_uptime(secs: u64) -> String {
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

// Linux only; `None` elsewhere.
fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use steamid_core::{FailureReason, Outcome, RunCounters};
    use tokio::sync::watch;
    use tower::ServiceExt;

    fn failure(id: &str) -> Outcome {
        Outcome::Failure {
            steam_id: id.to_string(),
            reason: FailureReason::Http {
                status: 400,
                message: format!("bad id {}", id),
            },
        }
    }

    /// A run over 20 ids, stopped while the 12th is in flight; ids 1..=11 failed.
    fn mid_run() -> RunCounters {
        let mut counters = RunCounters::default();
        counters.begin(20);
        for i in 1..=11 {
            let id = i.to_string();
            counters.start_item(&id);
            counters.record(&failure(&id));
        }
        counters.start_item("12");
        counters
    }

    async fn get_json(counters: RunCounters, uri: &str) -> Value {
        let (_tx, rx) = watch::channel(counters);
        let app = status_router(StatusState::new(rx.into(), Instant::now()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_before_any_run_is_idle() {
        let body = get_json(RunCounters::default(), "/").await;
        assert_eq!(body["message"], "Steam ID Processor Service");
        assert_eq!(body["status"], "running");
        assert_eq!(body["processing"], "idle");
        assert_eq!(body["progress"], "not started");
    }

    #[tokio::test]
    async fn root_during_run_is_active() {
        let body = get_json(mid_run(), "/").await;
        assert_eq!(body["processing"], "active");
        assert_eq!(body["progress"], "12/20");
    }

    #[tokio::test]
    async fn health_shows_condensed_snapshot() {
        let body = get_json(mid_run(), "/health").await;
        assert_eq!(body["status"], "healthy");
        assert!(body["uptime"].as_str().unwrap().ends_with('s'));
        let processing = &body["processing"];
        assert_eq!(processing["isRunning"], true);
        assert_eq!(processing["currentId"], "12");
        assert_eq!(processing["progress"], "12/20 (60%)");
        assert_eq!(processing["successful"], 0);
        assert_eq!(processing["failed"], 11);
        assert!(processing["startTime"].is_string());

        let errors = processing["recentErrors"].as_array().unwrap();
        let ids: Vec<_> = errors.iter().map(|e| e["steamId"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["9", "10", "11"]);
        assert_eq!(errors[2]["error"], "bad id 11");
    }

    #[tokio::test]
    async fn health_before_any_run() {
        let body = get_json(RunCounters::default(), "/health").await;
        assert_eq!(body["processing"]["progress"], "0/0");
        assert_eq!(body["processing"]["isRunning"], false);
        assert!(body["processing"]["currentId"].is_null());
        assert!(body["processing"]["startTime"].is_null());
    }

    #[tokio::test]
    async fn status_has_full_counters_and_ten_errors() {
        let body = get_json(mid_run(), "/status").await;
        let processing = &body["processing"];
        assert_eq!(processing["totalIds"], 20);
        assert_eq!(processing["processed"], 12);
        assert_eq!(processing["failed"], 11);
        assert_eq!(processing["progress"], 60);
        assert!(body["system"]["uptime"].is_number());
        assert!(body["system"]["timestamp"].is_string());
        assert!(body["system"]["memory"].get("residentBytes").is_some());

        let errors = body["recentErrors"].as_array().unwrap();
        assert_eq!(errors.len(), 10);
        assert_eq!(errors[0]["steamId"], "2");
        assert_eq!(errors[9]["steamId"], "11");
    }

    #[tokio::test]
    async fn fatal_load_error_shows_up_in_status() {
        let mut counters = RunCounters::default();
        counters.record_fatal("File not found: unique_ids.json");
        let body = get_json(counters, "/status").await;
        assert_eq!(body["processing"]["isRunning"], false);
        let errors = body["recentErrors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["fatal"], true);
        assert!(errors[0].get("steamId").is_none());
    }

    #[tokio::test]
    async fn uptime_counts_from_process_start() {
        let (_tx, rx) = watch::channel(RunCounters::default());
        let started = Instant::now() - Duration::from_secs(65);
        let app = status_router(StatusState::new(rx.into(), started));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["uptime"].as_str().unwrap().starts_with("0h 1m "));
    }

    #[tokio::test]
    async fn routes_reject_other_methods() {
        let (_tx, rx) = watch::channel(RunCounters::default());
        let app = status_router(StatusState::new(rx.into(), Instant::now()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn uptime_is_hours_minutes_seconds() {
        assert_eq!(format_uptime(0), "0h 0m 0s");
        assert_eq!(format_uptime(3725), "1h 2m 5s");
        assert_eq!(format_uptime(90061), "25h 1m 1s");
    }

    #[test]
    fn vm_rss_is_read_in_kib() {
        let status = "Name:\tsteamid-status\nVmPeak:\t  20000 kB\nVmRSS:\t   1536 kB\nThreads:\t4\n";
        assert_eq!(parse_vm_rss(status), Some(1536 * 1024));
        assert_eq!(parse_vm_rss("Name:\tx\n"), None);
    }
}
