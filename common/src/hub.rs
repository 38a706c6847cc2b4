use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::{GroupSelector, GroupSnapshot, HubEvent, TemperatureReading};

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub state not available yet")]
    Unavailable,
    #[error("no heating group matches {0:?}")]
    GroupNotFound(String),
    #[error("group {group} has no temperature reading")]
    NoReading { group: String },
    #[error("hub command failed: {0}")]
    Command(String),
    #[error("hub session already initialized")]
    AlreadyInitialized,
    #[error("invalid hub payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// The smart-home hub as seen by a widget.
pub trait HeatingHub {
    fn reading(&self, group: &GroupSelector) -> Result<TemperatureReading, HubError>;

    /// Fire-and-forget set-point command; the hub does not acknowledge it.
    fn set_point_temperature(
        &mut self,
        group: &GroupSelector,
        target: f32,
    ) -> Result<(), HubError>;
}

/// Latest known state of every heating group the hub has reported.
#[derive(Debug, Clone, Default)]
pub struct GroupDirectory {
    groups: BTreeMap<String, GroupSnapshot>,
}

impl GroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn upsert(&mut self, snapshot: GroupSnapshot) {
        self.groups.insert(snapshot.id.clone(), snapshot);
    }

    /// Folds `GROUP_CHANGED` payloads into the directory; returns how many applied.
    ///
    /// Payloads without a group id are skipped.
    pub fn apply_events(&mut self, events: &[HubEvent]) -> usize {
        let mut applied = 0;
        for group in events.iter().filter_map(HubEvent::changed_group) {
            if group.id.is_empty() {
                continue;
            }
            self.upsert(group);
            applied += 1;
        }
        applied
    }

    /// Records a commanded set point until the hub reports the group again.
    pub fn record_set_point(&mut self, id: &str, target: f32) -> bool {
        match self.groups.get_mut(id) {
            Some(group) => {
                group.set_point_temperature = Some(target);
                true
            }
            None => false,
        }
    }

    /// First matching group in id order.
    pub fn find(&self, selector: &GroupSelector) -> Option<&GroupSnapshot> {
        self.groups.values().find(|group| selector.matches(group))
    }

    pub fn reading(&self, selector: &GroupSelector) -> Result<TemperatureReading, HubError> {
        if self.groups.is_empty() {
            return Err(HubError::Unavailable);
        }
        let group = self
            .find(selector)
            .ok_or_else(|| HubError::GroupNotFound(selector.prefix().to_string()))?;
        group.reading().ok_or_else(|| HubError::NoReading {
            group: group.id.clone(),
        })
    }
}
