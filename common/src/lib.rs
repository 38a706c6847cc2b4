pub mod callbacks;
pub mod config;
pub mod events;
pub mod hub;
pub mod setpoint;
pub mod template;
pub mod topics;
pub mod types;
pub mod widget;

pub use callbacks::WidgetCallback;
pub use config::{ConfigError, HeaterWidgetConfig, HubConfig, RuntimeConfig, SetpointConfig};
pub use events::{EventRegistry, SubscriptionId};
pub use hub::{GroupDirectory, HeatingHub, HubError};
pub use setpoint::{PendingEdit, SetpointCommit, SetpointController, SetpointState};
pub use template::{Label, LabelTemplate, RenderedSegment, Segment, SegmentKind, Substitutions};
pub use topics::*;
pub use types::{
    DisplayMode, GroupSelector, GroupSnapshot, HubEvent, MouseButton, TemperatureReading,
    WheelDirection,
};
pub use widget::HeaterWidget;
