use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::DomainEvent;

/// Serialized form of a domain event, as handed to subscribers.
///
/// The typed enums live in the aggregate crates; the dispatcher works on this
/// uniform shape so it needs no knowledge of individual event types. `payload`
/// carries the typed event serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    event_id: Uuid,
    kind: String,
    occurred_on: DateTime<Utc>,

    /// Id of the aggregate the event happened to.
    subject_id: Uuid,

    payload: serde_json::Value,
}

impl EventEnvelope {
    /// Wrap a typed event, serializing it into the payload.
    pub fn from_event<E>(event: &E) -> Result<Self, serde_json::Error>
    where
        E: DomainEvent + Serialize,
    {
        Ok(Self {
            event_id: event.event_id(),
            kind: event.kind().to_string(),
            occurred_on: event.occurred_on(),
            subject_id: event.subject_id(),
            payload: serde_json::to_value(event)?,
        })
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn occurred_on(&self) -> DateTime<Utc> {
        self.occurred_on
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Deserialize the payload back into its typed form.
    pub fn payload_as<E>(&self) -> Result<E, serde_json::Error>
    where
        E: DomainEvent + for<'de> Deserialize<'de>,
    {
        serde_json::from_value(self.payload.clone())
    }
}
