use tracing::{debug, info, warn};

use crate::{
    callbacks::WidgetCallback,
    config::{ConfigError, HeaterWidgetConfig, SetpointConfig},
    hub::HeatingHub,
    setpoint::{SetpointCommit, SetpointController, SetpointState},
    template::{Label, RenderedSegment, Substitutions},
    types::{DisplayMode, GroupSelector, HubEvent, MouseButton, WheelDirection},
};

/// Status-bar heater block: two labels, a setpoint controller and its bindings.
pub struct HeaterWidget {
    icon: String,
    primary: Label,
    alternate: Label,
    mode: DisplayMode,
    selector: GroupSelector,
    controller: SetpointController,
    on_middle: WidgetCallback,
    on_right: WidgetCallback,
    available: bool,
}

impl HeaterWidget {
    pub fn new(
        config: &HeaterWidgetConfig,
        selector: GroupSelector,
        setpoint: SetpointConfig,
    ) -> Result<Self, ConfigError> {
        let on_middle = parse_callback("on_middle", &config.callbacks.on_middle)?;
        let on_right = parse_callback("on_right", &config.callbacks.on_right)?;

        let mut widget = Self {
            icon: config.heater_icon.clone(),
            primary: Label::new(&config.label),
            alternate: Label::new(&config.label_alt),
            mode: DisplayMode::Primary,
            selector,
            controller: SetpointController::new(setpoint),
            on_middle,
            on_right,
            available: false,
        };
        widget.render();
        Ok(widget)
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn state(&self) -> SetpointState {
        self.controller.state()
    }

    pub fn commit_due_ms(&self) -> Option<u64> {
        self.controller.commit_due_ms()
    }

    pub fn visible_segments(&self) -> Vec<RenderedSegment> {
        self.active_label().rendered()
    }

    pub fn toggle_label(&mut self) {
        self.mode = self.mode.toggled();
        self.render();
    }

    /// Re-reads the group from the hub and re-renders the visible label.
    pub fn update_label<H: HeatingHub + ?Sized>(&mut self, hub: &H) {
        match hub.reading(&self.selector) {
            Ok(reading) => {
                self.controller.observe(reading);
                self.available = true;
            }
            Err(err) => {
                debug!("heater reading unavailable: {err}");
                self.available = false;
            }
        }
        self.render();
    }

    /// Steps the setpoint by one notch in the direction of `delta_y`.
    pub fn on_wheel(&mut self, delta_y: i32, now_ms: u64) -> bool {
        let Some(direction) = WheelDirection::from_delta(delta_y) else {
            return false;
        };
        if !self.available {
            return false;
        }
        let Some(setpoint) = self.controller.adjust(direction, now_ms) else {
            return false;
        };
        debug!(setpoint, "setpoint adjusted locally");
        self.render();
        true
    }

    /// Commits the pending setpoint once its debounce deadline has passed.
    pub fn on_commit_timer<H: HeatingHub + ?Sized>(
        &mut self,
        hub: &mut H,
        now_ms: u64,
    ) -> Option<SetpointCommit> {
        let commit = self.controller.fire(now_ms)?;
        info!(
            setpoint = commit.target,
            group = self.selector.prefix(),
            "committing setpoint"
        );
        if let Err(err) = hub.set_point_temperature(&self.selector, commit.target) {
            warn!("setpoint commit failed: {err}");
        }
        self.render();
        Some(commit)
    }

    /// Applies pushed group changes for the tracked group. Returns whether the label changed.
    pub fn handle_events(&mut self, events: &[HubEvent]) -> bool {
        let mut changed = false;
        for group in events.iter().filter_map(HubEvent::changed_group) {
            if !self.selector.matches(&group) {
                continue;
            }
            let Some(reading) = group.reading() else {
                continue;
            };
            changed |= self.controller.apply_push(reading) || !self.available;
            self.available = true;
        }
        if changed {
            self.render();
        }
        changed
    }

    pub fn on_click<H: HeatingHub + ?Sized>(&mut self, button: MouseButton, hub: &H) {
        let callback = match button {
            MouseButton::Left => WidgetCallback::ToggleLabel,
            MouseButton::Middle => self.on_middle,
            MouseButton::Right => self.on_right,
        };
        self.run_callback(callback, hub);
    }

    pub fn run_callback<H: HeatingHub + ?Sized>(&mut self, callback: WidgetCallback, hub: &H) {
        match callback {
            WidgetCallback::ToggleLabel => self.toggle_label(),
            WidgetCallback::UpdateLabel => self.update_label(hub),
            WidgetCallback::DoNothing => {}
        }
    }

    fn active_label(&self) -> &Label {
        match self.mode {
            DisplayMode::Primary => &self.primary,
            DisplayMode::Alternate => &self.alternate,
        }
    }

    fn render(&mut self) {
        let temperature = if self.available {
            self.controller.display_temperature()
        } else {
            None
        };
        let substitutions = Substitutions::heater(&self.icon, temperature);
        match self.mode {
            DisplayMode::Primary => self.primary.refresh(&substitutions),
            DisplayMode::Alternate => self.alternate.refresh(&substitutions),
        }
    }
}

fn parse_callback(field: &'static str, name: &str) -> Result<WidgetCallback, ConfigError> {
    name.parse().map_err(|_| ConfigError::UnknownCallback {
        field,
        name: name.to_string(),
    })
}
