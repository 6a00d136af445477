use crate::domain::{validate_payload, DomainResult, FanoutDispatcher, SensorEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Port to the time-series store for single-point writes.
///
/// Implementations must flush the point out of any client-side buffer before
/// reporting completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPointWriter: Send + Sync {
    async fn write_event(&self, event: &SensorEvent) -> DomainResult<()>;
}

/// Orchestrates the validate → write + dispatch pipeline for one inbound
/// feed message.
///
/// Persistence and fan-out are independent outcomes of the same event: a
/// store failure is logged and the point is lost (at-most-once), but the
/// event still reaches observers. A rejected payload causes neither.
pub struct IngestService {
    writer: Arc<dyn EventPointWriter>,
    dispatcher: Arc<FanoutDispatcher>,
}

impl IngestService {
    pub fn new(writer: Arc<dyn EventPointWriter>, dispatcher: Arc<FanoutDispatcher>) -> Self {
        Self { writer, dispatcher }
    }

    #[instrument(skip_all, fields(payload_size = raw.len()))]
    pub async fn ingest(&self, raw: &[u8]) -> DomainResult<()> {
        let event = validate_payload(raw)?;

        debug!(category = %event.category, value = event.value, "event validated");

        let (write_result, ()) = tokio::join!(
            self.writer.write_event(&event),
            self.dispatcher.dispatch(&event),
        );

        if let Err(e) = write_result {
            error!(error = %e, category = %event.category, "event write failed, point lost");
        }

        Ok(())
    }
}
