use std::future::ready;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::metrics::{setup_metrics_recorder, track_metrics};
use crate::storage::Storage;
use crate::{health, ingest, time::TimeSource};

/// Request-handling knobs derived from [`Config`].
#[derive(Clone, Debug)]
pub struct Settings {
    pub service_name: String,
    pub max_body_size: usize,
    pub validate_events: bool,
    pub max_message_length: usize,
    pub diagnostic_message_limit: usize,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_name: config.service_name.clone(),
            max_body_size: config.max_body_size,
            validate_events: config.validate_events,
            max_message_length: config.max_message_length,
            diagnostic_message_limit: config.diagnostic_message_limit,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_name: "log-ingest".to_owned(),
            max_body_size: 0,
            validate_events: false,
            max_message_length: 8192,
            diagnostic_message_limit: 256,
        }
    }
}

#[derive(Clone)]
pub struct State {
    pub storage: Storage,
    pub timesource: Arc<dyn TimeSource + Send + Sync>,
    pub settings: Arc<Settings>,
}

async fn index() -> &'static str {
    "log-ingest"
}

pub fn router<TZ: TimeSource + Send + Sync + 'static>(
    timesource: TZ,
    storage: Storage,
    settings: Settings,
    metrics: bool,
) -> Router {
    let body_limit = match settings.max_body_size {
        0 => DefaultBodyLimit::disable(),
        max => DefaultBodyLimit::max(max),
    };
    let state = State {
        storage,
        timesource: Arc::new(timesource),
        settings: Arc::new(settings),
    };

    let router = Router::new()
        .route("/", get(index))
        .route(
            "/ingest",
            post(ingest::event)
                .fallback(ingest::method_not_allowed)
                .layer(body_limit),
        )
        .route("/health", any(health::health))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Don't install metrics unless asked to
    // Installing a global recorder when used as a library (during tests etc)
    // does not work well.
    if !metrics {
        return router;
    }

    match setup_metrics_recorder() {
        Ok(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        Err(err) => {
            tracing::warn!("failed to install prometheus recorder: {}", err);
            router
        }
    }
}
