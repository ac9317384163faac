use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use metrics::{counter, histogram};
use tracing::instrument;

use crate::api::{IngestError, IngestResponse};
use crate::event::LogEvent;
use crate::metrics::report_dropped_event;
use crate::router;
use crate::storage::Storage;

#[instrument(skip_all, fields(tenant_id, level, source))]
pub async fn event(
    State(state): State<router::State>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), IngestError> {
    counter!("log_ingest_events_received_total").increment(1);

    let mut event = LogEvent::from_bytes(&body).map_err(|err| {
        report_dropped_event("invalid_payload");
        tracing::warn!("rejected invalid payload: {}", err);
        err
    })?;

    let span = tracing::Span::current();
    span.record("tenant_id", event.tenant_id.as_str());
    span.record("level", event.level.as_str());
    span.record("source", event.source.as_str());

    if state.settings.validate_events {
        event
            .validate(state.settings.max_message_length)
            .map_err(|err| {
                report_dropped_event("validation_failed");
                tracing::warn!("rejected event: {}", err);
                err
            })?;
    }

    let received_at = state.timesource.current_time();
    event.stamp(received_at);

    match &state.storage {
        Storage::Connected(sink) => {
            let start_time = Instant::now();

            sink.insert(&event, received_at).await.map_err(|err| {
                report_dropped_event("storage_error");
                tracing::error!(
                    tenant_id = %event.tenant_id,
                    error = %err,
                    "failed to insert log event"
                );
                IngestError::from(err)
            })?;

            histogram!("log_ingest_insert_duration_seconds")
                .record(start_time.elapsed().as_secs_f64());
            counter!("log_ingest_events_stored_total").increment(1);
        }
        Storage::Unavailable => {
            counter!("log_ingest_events_unpersisted_total").increment(1);
        }
    }

    let excerpt = event.diagnostic_excerpt(state.settings.diagnostic_message_limit);
    tracing::info!(
        tenant_id = %event.tenant_id,
        level = %event.level,
        source = %event.source,
        message_len = event.message_len(),
        excerpt = ?excerpt,
        "ingested log event"
    );

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse::new(event.tenant_id, received_at)),
    ))
}

/// Any method other than POST on the ingest route; the body is never read.
pub async fn method_not_allowed() -> IngestError {
    report_dropped_event("method_not_allowed");
    IngestError::MethodNotAllowed
}
