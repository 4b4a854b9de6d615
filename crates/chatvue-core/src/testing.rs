//! Minimal event-sourced aggregate used by this crate's unit tests.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::aggregate::{AggregateId, AggregateRoot};
use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata};
use crate::store::StoredEvent;

#[derive(Debug, Clone)]
pub(crate) enum LedgerKind {
    Opened,
    Noted(String),
    Closed,
}

#[derive(Debug, Clone)]
pub(crate) struct LedgerEvent {
    pub metadata: EventMetadata,
    pub kind: LedgerKind,
}

impl LedgerEvent {
    pub const OPENED: &'static str = "LedgerOpened";
    pub const NOTED: &'static str = "EntryNoted";
    pub const CLOSED: &'static str = "LedgerClosed";
}

impl DomainEvent for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self.kind {
            LedgerKind::Opened => Self::OPENED,
            LedgerKind::Noted(_) => Self::NOTED,
            LedgerKind::Closed => Self::CLOSED,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        Ok(match &self.kind {
            LedgerKind::Noted(text) => serde_json::json!({ "text": text }),
            _ => serde_json::json!({}),
        })
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let kind = match stored.event_type.as_str() {
            Self::OPENED => LedgerKind::Opened,
            Self::NOTED => LedgerKind::Noted(
                stored.payload["text"]
                    .as_str()
                    .ok_or_else(|| DomainError::CorruptEvent {
                        aggregate_id: stored.aggregate_id.clone(),
                        event_id: stored.event_id,
                        reason: "missing text".into(),
                    })?
                    .to_owned(),
            ),
            Self::CLOSED => LedgerKind::Closed,
            other => {
                return Err(DomainError::UnknownEventType {
                    aggregate_id: stored.aggregate_id.clone(),
                    event_type: other.to_owned(),
                });
            }
        };
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind,
        })
    }
}

#[derive(Debug)]
pub(crate) struct Ledger {
    pub id: Option<AggregateId>,
    pub version: i64,
    pub entries: Vec<String>,
    pub closed: bool,
    pub last_occurred_at: Option<DateTime<Utc>>,
    pub uncommitted: Vec<LedgerEvent>,
}

impl AggregateRoot for Ledger {
    type Event = LedgerEvent;

    fn initial(id: AggregateId) -> Self {
        Self {
            id: Some(id),
            version: 0,
            entries: Vec::new(),
            closed: false,
            last_occurred_at: None,
            uncommitted: Vec::new(),
        }
    }

    fn aggregate_id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn last_occurred_at(&self) -> Option<DateTime<Utc>> {
        self.last_occurred_at
    }

    fn is_tombstoned(&self) -> bool {
        self.closed
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            LedgerKind::Opened => {}
            LedgerKind::Noted(text) => self.entries.push(text.clone()),
            LedgerKind::Closed => self.closed = true,
        }
        self.last_occurred_at = Some(event.metadata.occurred_at());
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted.clear();
    }
}

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

pub(crate) fn stored_event(
    aggregate_id: &str,
    sequence_number: i64,
    event_type: &str,
    payload: serde_json::Value,
) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id: AggregateId::new(aggregate_id).unwrap(),
        event_type: event_type.to_owned(),
        payload,
        sequence_number,
        correlation_id: Uuid::nil(),
        causation_id: Uuid::nil(),
        occurred_at: fixed_time(),
        global_offset: sequence_number,
    }
}
