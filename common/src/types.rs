use serde::{Deserialize, Serialize};

pub const EVENT_GROUP_CHANGED: &str = "GROUP_CHANGED";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub actual: f32,
    pub target: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Primary,
    Alternate,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Primary => Self::Alternate,
            Self::Alternate => Self::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

impl WheelDirection {
    /// Direction of a wheel notch from its vertical angle delta; zero is no movement.
    pub fn from_delta(delta_y: i32) -> Option<Self> {
        match delta_y {
            d if d > 0 => Some(Self::Up),
            d if d < 0 => Some(Self::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Heating group state as the hub publishes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(rename = "deviceLabels", default)]
    pub device_labels: Vec<String>,
    #[serde(rename = "actualTemperature")]
    pub actual_temperature: Option<f32>,
    #[serde(rename = "setPointTemperature")]
    pub set_point_temperature: Option<f32>,
}

impl GroupSnapshot {
    pub fn reading(&self) -> Option<TemperatureReading> {
        let actual = self.actual_temperature.filter(|value| value.is_finite())?;
        let target = self.set_point_temperature.filter(|value| value.is_finite())?;
        Some(TemperatureReading { actual, target })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl HubEvent {
    pub fn group_changed(snapshot: &GroupSnapshot) -> Self {
        Self {
            event_type: EVENT_GROUP_CHANGED.to_string(),
            data: serde_json::to_value(snapshot).unwrap_or_default(),
        }
    }

    /// The group payload of a `GROUP_CHANGED` event, if it carries one.
    pub fn changed_group(&self) -> Option<GroupSnapshot> {
        if self.event_type != EVENT_GROUP_CHANGED {
            return None;
        }
        GroupSnapshot::deserialize(&self.data).ok()
    }
}

/// Identifies the tracked heating group by label prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSelector {
    prefix: String,
}

impl GroupSelector {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, group: &GroupSnapshot) -> bool {
        group.label.starts_with(&self.prefix)
            || group
                .device_labels
                .iter()
                .any(|label| label.starts_with(&self.prefix))
    }
}
