use chrono::{DateTime, Utc};

pub trait TimeSource {
    // Receipt time stamped on every ingested event
    fn current_time(&self) -> DateTime<Utc>;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
