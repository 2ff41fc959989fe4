use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flowquery_model::ServiceInfo;

/// Envelope for a runtime event, carrying delivery metadata.
///
/// Notes:
/// - `timestamp` is when the engine emitted the event; it travels as epoch
///   millis and becomes the `lastModified` of every document the event touches.
/// - `service` identifies the runtime bundle that emitted it.
/// - Delivery is at-least-once, so the same `event_id` may be seen twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,

    #[serde(flatten)]
    service: ServiceInfo,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(event_id: Uuid, timestamp: DateTime<Utc>, service: ServiceInfo, payload: E) -> Self {
        Self {
            event_id,
            timestamp,
            service,
            payload,
        }
    }

    /// Wrap a payload emitted now by an anonymous service.
    pub fn from_payload(payload: E) -> Self {
        Self::new(Uuid::now_v7(), Utc::now(), ServiceInfo::default(), payload)
    }

    pub fn with_service(mut self, service: ServiceInfo) -> Self {
        self.service = service;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn service(&self) -> &ServiceInfo {
        &self.service
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
