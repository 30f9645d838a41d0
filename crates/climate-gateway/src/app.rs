use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use climate_core::{config::ClimateConfig, SettingsHandle};
use climate_fan::FanController;
use climate_scheduler::{IngestionScheduler, JobLedger};
use climate_store::{ReadingStore, SettingsStore};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::ws::fanout::NotificationFanout;

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ClimateConfig,
    /// Live settings; replaced whole on every accepted update.
    pub settings: SettingsHandle,
    pub settings_store: SettingsStore,
    /// Serializes validate → persist → replace → reconfigure.
    pub settings_lock: tokio::sync::Mutex<()>,
    pub readings: Arc<ReadingStore>,
    pub fan: FanController,
    pub scheduler: IngestionScheduler,
    pub ledger: Arc<JobLedger>,
    pub fanout: Arc<NotificationFanout>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ClimateConfig,
        settings: SettingsHandle,
        settings_store: SettingsStore,
        readings: Arc<ReadingStore>,
        fan: FanController,
        scheduler: IngestionScheduler,
        ledger: Arc<JobLedger>,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        Self {
            config,
            settings,
            settings_store,
            settings_lock: tokio::sync::Mutex::new(()),
            readings,
            fan,
            scheduler,
            ledger,
            fanout,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.gateway.cors_origins);

    let settings = Router::new()
        .route(
            "/settings/",
            get(crate::http::settings::get_settings).post(crate::http::settings::update_settings),
        )
        .route(
            "/settings/indoor-address/",
            post(crate::http::settings::set_indoor_address),
        )
        .route(
            "/settings/outdoor-address/",
            post(crate::http::settings::set_outdoor_address),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::settings_auth,
        ));

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/readings/current/", get(crate::http::readings::current))
        .route("/readings/history/", get(crate::http::readings::history))
        .route(
            "/readings/history/delta/",
            get(crate::http::readings::history_delta),
        )
        .route("/fan/", get(crate::http::fan::status))
        .route("/fan/toggle/", post(crate::http::fan::toggle))
        .route("/fan/history/", get(crate::http::fan::history))
        .merge(settings)
        .route("/crons/", get(crate::http::crons::list_jobs))
        .route("/ws/", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use chrono::{Duration, TimeZone, Utc};
    use climate_core::{Reading, Settings};
    use climate_fan::LogActuator;
    use climate_scheduler::{Job, JobError};
    use climate_store::FanStateStore;
    use rusqlite::Connection;
    use serde_json::Value;
    use tower::ServiceExt;

    pub const TOKEN: &str = "test-token";
    const YEARLY: &str = "0 0 1 1 *";

    struct NoopJob;

    #[async_trait::async_trait]
    impl Job for NoopJob {
        fn name(&self) -> &str {
            "noop"
        }

        async fn run(&self) -> Result<(), JobError> {
            Ok(())
        }
    }

    fn mem() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    /// Fully wired state over in-memory databases with a started scheduler.
    pub async fn test_state(token: Option<&str>) -> Arc<AppState> {
        let mut config = ClimateConfig::default();
        config.gateway.auth.token = token.map(String::from);

        let settings_store = SettingsStore::new(mem()).unwrap();
        let initial = Settings {
            poll_interval_expression: YEARLY.to_string(),
            ..Settings::default()
        };
        let loaded = settings_store.load_or_init(&initial).unwrap();
        let settings = SettingsHandle::new(loaded);

        let fan = FanController::new(
            FanStateStore::new(mem()).unwrap(),
            Arc::new(LogActuator),
            settings.clone(),
        );
        let ledger = Arc::new(JobLedger::new(mem()).unwrap());
        let scheduler = IngestionScheduler::new(Arc::new(NoopJob), Arc::clone(&ledger));
        scheduler.schedule(YEARLY).await.unwrap();

        Arc::new(AppState::new(
            config,
            settings,
            settings_store,
            Arc::new(ReadingStore::new(mem()).unwrap()),
            fan,
            scheduler,
            ledger,
            Arc::new(NotificationFanout::new(16)),
        ))
    }

    pub async fn send(state: &Arc<AppState>, req: Request<Body>) -> Response {
        build_router(Arc::clone(state)).oneshot(req).await.unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    pub async fn json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_observers_and_next_fire() {
        let state = test_state(None).await;
        let resp = send(&state, get("/health")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["observers"], 0);
        assert!(body["next_fire"].is_string());
    }

    #[tokio::test]
    async fn current_reading_is_no_content_until_first_poll() {
        let state = test_state(None).await;
        let resp = send(&state, get("/readings/current/")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        state
            .readings
            .append(&Reading {
                timestamp: ts,
                indoor_temp: 20.0,
                outdoor_temp: 5.0,
                indoor_humidity: 50.0,
                outdoor_humidity: 90.0,
            })
            .unwrap();

        let body = json(send(&state, get("/readings/current/")).await).await;
        assert_eq!(body["indoorTemp"], 20.0);
        assert!(body["indoorDewPoint"].as_f64().unwrap() < 20.0);
        assert!(body["outdoorDewPoint"].is_number());
    }

    #[tokio::test]
    async fn history_bounds_are_exclusive_and_newest_first() {
        let state = test_state(None).await;
        let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        for h in 0..5 {
            state
                .readings
                .append(&Reading {
                    timestamp: t0 + Duration::hours(h),
                    indoor_temp: h as f64,
                    outdoor_temp: 0.0,
                    indoor_humidity: 50.0,
                    outdoor_humidity: 50.0,
                })
                .unwrap();
        }

        let uri = "/readings/history/?start=2024-01-10T00:00:00Z&end=2024-01-10T04:00:00Z";
        let body = json(send(&state, get(uri)).await).await;
        let temps: Vec<f64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["indoorTemp"].as_f64().unwrap())
            .collect();
        assert_eq!(temps, vec![3.0, 2.0, 1.0]);

        let resp = send(&state, get("/readings/history/?start=yesterday")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fan_toggle_round_trip() {
        let state = test_state(None).await;
        let (tx, mut rx) = state.fanout.queue();
        state.fanout.connect(tx);

        assert_eq!(send(&state, get("/fan/")).await.status(), StatusCode::NO_CONTENT);

        let body = json(send(&state, post("/fan/toggle/")).await).await;
        assert_eq!(body["running"], true);
        assert!(body["updatedAt"].is_string());

        let body = json(send(&state, get("/fan/")).await).await;
        assert_eq!(body["running"], true);

        let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["event"], "fan.state");
        assert_eq!(frame["payload"]["running"], true);

        send(&state, post("/fan/toggle/")).await;
        let history = json(send(&state, get("/fan/history/?limit=10")).await).await;
        let running: Vec<bool> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["running"].as_bool().unwrap())
            .collect();
        assert_eq!(running, vec![false, true]);
        assert!(history[0]["override"].is_string());
    }

    #[tokio::test]
    async fn crons_lists_ledger() {
        let state = test_state(None).await;
        let body = json(send(&state, get("/crons/")).await).await;
        let jobs = body.as_array().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0]["name"], "noop");
        assert_eq!(jobs[0]["expression"], YEARLY);
        assert_eq!(jobs[0]["status"], "pending");
    }
}
