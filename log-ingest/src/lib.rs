pub mod api;
pub mod config;
pub mod event;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod router;
pub mod server;
pub mod storage;
pub mod time;
