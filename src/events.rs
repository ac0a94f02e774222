use serde::Serialize;

use crate::model::ReferenceItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Create,
    Update,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEvent {
    pub action: ItemAction,
    pub item: ReferenceItem,
}

/// Receives item changes synchronously, right after the row was written.
pub trait ItemListener {
    fn notify(&mut self, event: ItemEvent);
}

/// Collects events so the caller can hand them back with its response.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<ItemEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ItemEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ItemEvent> {
        self.events
    }
}

impl ItemListener for EventLog {
    fn notify(&mut self, event: ItemEvent) {
        tracing::debug!(
            action = ?event.action,
            item_id = event.item.id,
            reference_id = event.item.reference_id,
            "reference item changed"
        );
        self.events.push(event);
    }
}
