// Input manager settings

/// Largest frame delta fed to triggers, in seconds
pub const DEFAULT_MAX_DELTA_TIME: f32 = 0.25;

/// Tunables for [`InputManager`](super::InputManager)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSettings {
    /// `update` clamps its delta time to this, so a long stall does not
    /// complete every hold trigger at once
    pub max_delta_time: f32,

    /// Move actuated controllers to the front of the connected list each
    /// frame (the front controller is the "current" one)
    pub reorder_controllers: bool,
}

impl InputSettings {
    pub fn new() -> Self {
        Self {
            max_delta_time: DEFAULT_MAX_DELTA_TIME,
            reorder_controllers: true,
        }
    }

    pub fn with_max_delta_time(mut self, max_delta_time: f32) -> Self {
        self.max_delta_time = max_delta_time.max(0.0);
        self
    }

    pub fn with_reorder_controllers(mut self, reorder: bool) -> Self {
        self.reorder_controllers = reorder;
        self
    }

    /// Clamp a raw frame delta into `[0, max_delta_time]`
    pub fn clamp_delta(&self, delta_time: f32) -> f32 {
        crate::math::clamp(delta_time, 0.0, self.max_delta_time)
    }
}

impl Default for InputSettings {
    fn default() -> Self {
        Self::new()
    }
}
