use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::callbacks::WidgetCallback;

pub const DEFAULT_LABEL: &str = "<span class=\"icon\">{icon}</span> {level}";
pub const DEFAULT_LABEL_ALT: &str = "{level}";
pub const DEFAULT_HEATER_ICON: &str = "\u{f1a45}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("callbacks.{field} names unknown behaviour {name:?}")]
    UnknownCallback { field: &'static str, name: String },
    #[error("{field} must be {requirement}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CallbacksConfig {
    pub on_middle: String,
    pub on_right: String,
}

impl Default for CallbacksConfig {
    fn default() -> Self {
        Self {
            on_middle: WidgetCallback::DoNothing.name().to_string(),
            on_right: WidgetCallback::DoNothing.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaterWidgetConfig {
    pub label: String,
    pub label_alt: String,
    pub heater_icon: String,
    pub callbacks: CallbacksConfig,
}

impl Default for HeaterWidgetConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            label_alt: DEFAULT_LABEL_ALT.to_string(),
            heater_icon: DEFAULT_HEATER_ICON.to_string(),
            callbacks: CallbacksConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetpointConfig {
    pub step_c: f32,
    pub commit_debounce_ms: u64,
    pub min_target_c: f32,
    pub max_target_c: f32,
}

impl Default for SetpointConfig {
    fn default() -> Self {
        Self {
            step_c: 0.5,
            commit_debounce_ms: 5_000,
            min_target_c: 5.0,
            max_target_c: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub client_id: String,
    pub group_prefix: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            client_id: "heater-bar".to_string(),
            group_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub widget: HeaterWidgetConfig,
    pub setpoint: SetpointConfig,
    pub hub: HubConfig,
    pub poll_interval_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            widget: HeaterWidgetConfig::default(),
            setpoint: SetpointConfig::default(),
            hub: HubConfig::default(),
            poll_interval_ms: 5_000,
        }
    }
}

impl RuntimeConfig {
    /// Parses and validates a JSON config; absent fields take their defaults.
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.widget.callbacks.validate()?;
        self.setpoint.validate()?;

        if self.hub.mqtt_host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "hub.mqtt_host",
                requirement: "non-empty",
            });
        }
        if self.hub.mqtt_port == 0 {
            return Err(ConfigError::Invalid {
                field: "hub.mqtt_port",
                requirement: "between 1 and 65535",
            });
        }
        if self.hub.client_id.is_empty() || self.hub.client_id != self.hub.client_id.trim_start() {
            return Err(ConfigError::Invalid {
                field: "hub.client_id",
                requirement: "non-empty without leading whitespace",
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                requirement: "greater than zero",
            });
        }
        Ok(())
    }
}

impl CallbacksConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in [("on_middle", &self.on_middle), ("on_right", &self.on_right)] {
            if name.parse::<WidgetCallback>().is_err() {
                return Err(ConfigError::UnknownCallback {
                    field,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl SetpointConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_c.is_finite() && self.step_c > 0.0) {
            return Err(ConfigError::Invalid {
                field: "setpoint.step_c",
                requirement: "a positive number",
            });
        }
        if !(self.min_target_c.is_finite()
            && self.max_target_c.is_finite()
            && self.min_target_c < self.max_target_c)
        {
            return Err(ConfigError::Invalid {
                field: "setpoint.min_target_c",
                requirement: "below setpoint.max_target_c",
            });
        }
        Ok(())
    }
}
