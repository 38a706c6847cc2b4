use crate::{
    config::SetpointConfig,
    types::{TemperatureReading, WheelDirection},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointState {
    Idle,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingEdit {
    pub target: f32,
    pub changed_at_ms: u64,
    pub commit_due_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointCommit {
    pub target: f32,
}

/// Debounces local setpoint edits and shields them from hub echoes.
///
/// Every adjustment restarts a single-shot commit deadline, so a burst of
/// wheel notches yields one commit carrying the accumulated target.
#[derive(Debug, Clone)]
pub struct SetpointController {
    config: SetpointConfig,
    baseline: Option<TemperatureReading>,
    pending: Option<PendingEdit>,
}

impl SetpointController {
    pub fn new(config: SetpointConfig) -> Self {
        Self {
            config,
            baseline: None,
            pending: None,
        }
    }

    pub fn state(&self) -> SetpointState {
        if self.pending.is_some() {
            SetpointState::Pending
        } else {
            SetpointState::Idle
        }
    }

    pub fn baseline(&self) -> Option<TemperatureReading> {
        self.baseline
    }

    pub fn pending(&self) -> Option<PendingEdit> {
        self.pending
    }

    pub fn commit_due_ms(&self) -> Option<u64> {
        self.pending.map(|edit| edit.commit_due_ms)
    }

    /// Pending target while an edit is open, otherwise the actual temperature.
    pub fn display_temperature(&self) -> Option<f32> {
        match self.pending {
            Some(edit) => Some(edit.target),
            None => self.baseline.map(|reading| reading.actual),
        }
    }

    /// Records a polled reading. A pending target is never overwritten.
    pub fn observe(&mut self, reading: TemperatureReading) {
        self.baseline = Some(match (self.pending, self.baseline) {
            (Some(_), Some(previous)) => TemperatureReading {
                actual: reading.actual,
                target: previous.target,
            },
            _ => reading,
        });
    }

    /// Applies a pushed group update. Returns whether the display changed.
    pub fn apply_push(&mut self, reading: TemperatureReading) -> bool {
        if self.pending.is_some() {
            self.observe(reading);
            return false;
        }
        let changed = self.baseline != Some(reading);
        self.baseline = Some(reading);
        changed
    }

    /// Steps the target and restarts the commit deadline.
    ///
    /// Returns the new pending target, or `None` when no reading exists yet.
    pub fn adjust(&mut self, direction: WheelDirection, now_ms: u64) -> Option<f32> {
        let current = match self.pending {
            Some(edit) => edit.target,
            None => self.baseline?.target,
        };

        let step = match direction {
            WheelDirection::Up => self.config.step_c,
            WheelDirection::Down => -self.config.step_c,
        };
        let target = (current + step).clamp(self.config.min_target_c, self.config.max_target_c);

        self.pending = Some(PendingEdit {
            target,
            changed_at_ms: now_ms,
            commit_due_ms: now_ms.saturating_add(self.config.commit_debounce_ms),
        });
        Some(target)
    }

    /// Fires the commit timer if its deadline has passed.
    ///
    /// The pending edit is cleared whether or not the caller's commit succeeds.
    pub fn fire(&mut self, now_ms: u64) -> Option<SetpointCommit> {
        let edit = self.pending?;
        if now_ms < edit.commit_due_ms {
            return None;
        }
        self.pending = None;

        if let Some(reading) = self.baseline.as_mut() {
            reading.target = edit.target;
        }
        Some(SetpointCommit {
            target: edit.target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(actual: f32, target: f32) -> TemperatureReading {
        TemperatureReading { actual, target }
    }

    fn idle_controller() -> SetpointController {
        let mut controller = SetpointController::new(SetpointConfig::default());
        controller.observe(reading(20.0, 20.0));
        controller
    }

    #[test]
    fn wheel_up_enters_pending_with_armed_deadline() {
        let mut controller = idle_controller();
        assert_eq!(controller.state(), SetpointState::Idle);

        assert_eq!(controller.adjust(WheelDirection::Up, 1_000), Some(20.5));

        assert_eq!(controller.state(), SetpointState::Pending);
        assert_eq!(controller.commit_due_ms(), Some(6_000));
        assert_eq!(controller.display_temperature(), Some(20.5));
    }

    #[test]
    fn rapid_scrolling_restarts_deadline_and_commits_once() {
        let mut controller = idle_controller();

        controller.adjust(WheelDirection::Up, 1_000);
        controller.adjust(WheelDirection::Up, 4_000);
        assert_eq!(controller.commit_due_ms(), Some(9_000));

        // The first deadline has passed but was replaced.
        assert_eq!(controller.fire(6_000), None);

        assert_eq!(
            controller.fire(9_000),
            Some(SetpointCommit { target: 21.0 })
        );
        assert_eq!(controller.fire(20_000), None);
        assert_eq!(controller.state(), SetpointState::Idle);
    }

    #[test]
    fn wheel_down_steps_from_pending_target() {
        let mut controller = idle_controller();

        controller.adjust(WheelDirection::Up, 0);
        controller.adjust(WheelDirection::Up, 10);
        assert_eq!(controller.adjust(WheelDirection::Down, 20), Some(20.5));
    }

    #[test]
    fn push_while_pending_keeps_local_target() {
        let mut controller = idle_controller();
        controller.adjust(WheelDirection::Up, 0);

        let changed = controller.apply_push(reading(19.0, 18.0));

        assert!(!changed);
        assert_eq!(controller.display_temperature(), Some(20.5));
        assert_eq!(controller.pending().map(|edit| edit.target), Some(20.5));
        assert_eq!(controller.baseline().map(|r| r.actual), Some(19.0));
        assert_eq!(controller.baseline().map(|r| r.target), Some(20.0));
    }

    #[test]
    fn push_while_idle_adopts_new_baseline() {
        let mut controller = idle_controller();

        assert!(controller.apply_push(reading(19.0, 18.0)));
        assert_eq!(controller.baseline(), Some(reading(19.0, 18.0)));
        assert_eq!(controller.display_temperature(), Some(19.0));
        assert!(!controller.apply_push(reading(19.0, 18.0)));
    }

    #[test]
    fn poll_while_pending_does_not_overwrite_target() {
        let mut controller = idle_controller();
        controller.adjust(WheelDirection::Down, 0);

        controller.observe(reading(21.5, 22.0));

        assert_eq!(controller.display_temperature(), Some(19.5));
        assert_eq!(controller.baseline(), Some(reading(21.5, 20.0)));
    }

    #[test]
    fn commit_returns_to_idle_with_optimistic_baseline() {
        let mut controller = idle_controller();
        controller.adjust(WheelDirection::Up, 0);

        let commit = controller.fire(5_000);

        assert_eq!(commit, Some(SetpointCommit { target: 20.5 }));
        assert_eq!(controller.state(), SetpointState::Idle);
        assert_eq!(controller.baseline(), Some(reading(20.0, 20.5)));
        assert_eq!(controller.display_temperature(), Some(20.0));
    }

    #[test]
    fn adjust_without_reading_is_ignored() {
        let mut controller = SetpointController::new(SetpointConfig::default());

        assert_eq!(controller.adjust(WheelDirection::Up, 0), None);
        assert_eq!(controller.state(), SetpointState::Idle);
        assert_eq!(controller.fire(10_000), None);
    }

    #[test]
    fn adjust_clamps_to_configured_range() {
        let mut controller = SetpointController::new(SetpointConfig::default());
        controller.observe(reading(29.0, 30.0));

        assert_eq!(controller.adjust(WheelDirection::Up, 0), Some(30.0));

        controller.observe(reading(6.0, 5.0));
        controller.fire(10_000);
        controller.observe(reading(6.0, 5.0));
        assert_eq!(controller.adjust(WheelDirection::Down, 20_000), Some(5.0));
    }

    #[test]
    fn fire_before_deadline_keeps_pending() {
        let mut controller = idle_controller();
        controller.adjust(WheelDirection::Up, 100);

        assert_eq!(controller.fire(5_099), None);
        assert_eq!(controller.state(), SetpointState::Pending);
    }
}
