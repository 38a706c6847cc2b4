use std::str::FromStr;

use thiserror::Error;

/// Named widget behaviours that mouse buttons and timers can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetCallback {
    ToggleLabel,
    UpdateLabel,
    DoNothing,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown widget callback {0:?}")]
pub struct UnknownCallback(pub String);

impl WidgetCallback {
    pub const ALL: [WidgetCallback; 3] = [Self::ToggleLabel, Self::UpdateLabel, Self::DoNothing];

    pub fn name(self) -> &'static str {
        match self {
            Self::ToggleLabel => "toggle_label",
            Self::UpdateLabel => "update_label",
            Self::DoNothing => "do_nothing",
        }
    }
}

impl FromStr for WidgetCallback {
    type Err = UnknownCallback;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|callback| callback.name() == value)
            .ok_or_else(|| UnknownCallback(value.to_string()))
    }
}
