#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use chrono::{DateTime, TimeZone, Utc};
use envconfig::Envconfig;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use reqwest::header::CONTENT_TYPE;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use log_ingest::config::{Config, DatabaseConfig, EnvMsDuration};
use log_ingest::event::LogEvent;
use log_ingest::server::serve;
use log_ingest::storage::{LogSink, StorageError};
use log_ingest::time::TimeSource;

// Points at a port nothing listens on, so the server starts in log-only mode.
pub static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(|| {
    let mut database = DatabaseConfig::init_from_hashmap(&Default::default()).unwrap();
    database.host = "127.0.0.1".to_string();
    database.port = 1;
    database.password = "not-the-default".to_string();
    database.connect_timeout = EnvMsDuration(std::time::Duration::from_millis(500));

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        service_name: "log-ingest-test".to_string(),
        max_body_size: 0,
        export_prometheus: false,
        validate_events: false,
        max_message_length: 8192,
        diagnostic_message_limit: 256,
        database,
    }
});

pub fn received_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[derive(Clone)]
pub struct FixedTime {
    pub time: DateTime<Utc>,
}

impl Default for FixedTime {
    fn default() -> Self {
        Self {
            time: received_at(),
        }
    }
}

impl TimeSource for FixedTime {
    fn current_time(&self) -> DateTime<Utc> {
        self.time
    }
}

#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<(LogEvent, DateTime<Utc>)>>>,
}

impl MemorySink {
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<(LogEvent, DateTime<Utc>)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn insert(
        &self,
        event: &LogEvent,
        received_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.events
            .lock()
            .unwrap()
            .push((event.clone(), received_at));
        Ok(())
    }
}

pub const BACKEND_DETAIL: &str = "password authentication failed for user \"ingest\"";

#[derive(Clone, Default)]
pub struct FailSink {
    attempts: Arc<Mutex<usize>>,
}

impl FailSink {
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl LogSink for FailSink {
    async fn insert(&self, _: &LogEvent, _: DateTime<Utc>) -> Result<(), StorageError> {
        *self.attempts.lock().unwrap() += 1;
        Err(StorageError::QueryError {
            command: "INSERT".to_owned(),
            error: sqlx::Error::Protocol(BACKEND_DETAIL.to_owned()),
        })
    }
}

pub fn request(method: Method, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl ServerHandle {
    pub async fn for_config(config: Config) -> ServerHandle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();

        tokio::spawn(async move {
            serve(config, listener, async move { notify.notified().await }).await
        });
        ServerHandle { addr, shutdown }
    }

    pub async fn ingest<T: Into<reqwest::Body>>(&self, body: T) -> reqwest::Response {
        let client = reqwest::Client::new();
        client
            .post(format!("http://{:?}/ingest", self.addr))
            .body(body)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        let client = reqwest::Client::new();
        client
            .get(format!("http://{:?}{}", self.addr, path))
            .send()
            .await
            .expect("failed to send request")
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}
