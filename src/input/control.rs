// Controls - single readable capabilities exposed by controllers

use super::controller::ControllerId;
use glam::{Quat, Vec2, Vec3};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A readable input capability (button, axis, stick, pose)
pub trait Control<T> {
    /// Current value of the control
    fn read_value(&self) -> T;

    /// Whether the control is currently actuated
    fn is_activated(&self) -> bool;

    /// Continuous sources (poses, tracked positions) report `true`; they
    /// bypass edge-based competition between bindings.
    fn is_state(&self) -> bool {
        false
    }

    /// Control path relative to its controller (e.g. `trigger/value`)
    fn path(&self) -> &str;
}

/// Tracked position and orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// A control as handed out by a controller, tagged by value kind
#[derive(Clone)]
pub enum ControlHandle {
    Button(Rc<dyn Control<bool>>),
    Axis(Rc<dyn Control<f32>>),
    Vector2(Rc<dyn Control<Vec2>>),
    Vector3(Rc<dyn Control<Vec3>>),
    Pose(Rc<dyn Control<Pose>>),
}

impl ControlHandle {
    /// Name of the value kind carried by this control
    pub fn kind(&self) -> &'static str {
        match self {
            ControlHandle::Button(_) => bool::KIND,
            ControlHandle::Axis(_) => f32::KIND,
            ControlHandle::Vector2(_) => Vec2::KIND,
            ControlHandle::Vector3(_) => Vec3::KIND,
            ControlHandle::Pose(_) => Pose::KIND,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ControlHandle::Button(control) => control.path(),
            ControlHandle::Axis(control) => control.path(),
            ControlHandle::Vector2(control) => control.path(),
            ControlHandle::Vector3(control) => control.path(),
            ControlHandle::Pose(control) => control.path(),
        }
    }
}

impl fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlHandle")
            .field("kind", &self.kind())
            .field("path", &self.path())
            .finish()
    }
}

/// Value types a control can produce
pub trait ControlValue: Copy + PartialEq + fmt::Debug + 'static {
    /// Human-readable kind name, used in diagnostics
    const KIND: &'static str;

    /// Narrow a handle to a typed control, if the kinds are compatible
    fn from_handle(handle: &ControlHandle) -> Option<Rc<dyn Control<Self>>>;

    /// Magnitude used for threshold-based activation
    fn magnitude(&self) -> f32;
}

impl ControlValue for bool {
    const KIND: &'static str = "button";

    fn from_handle(handle: &ControlHandle) -> Option<Rc<dyn Control<Self>>> {
        match handle {
            ControlHandle::Button(control) => Some(control.clone()),
            _ => None,
        }
    }

    fn magnitude(&self) -> f32 {
        if *self {
            1.0
        } else {
            0.0
        }
    }
}

impl ControlValue for f32 {
    const KIND: &'static str = "axis";

    fn from_handle(handle: &ControlHandle) -> Option<Rc<dyn Control<Self>>> {
        match handle {
            ControlHandle::Axis(control) => Some(control.clone()),
            // Buttons read as 0.0 / 1.0 so keys can drive composite axes
            ControlHandle::Button(control) => Some(Rc::new(ButtonAxis(control.clone()))),
            _ => None,
        }
    }

    fn magnitude(&self) -> f32 {
        self.abs()
    }
}

impl ControlValue for Vec2 {
    const KIND: &'static str = "vector2";

    fn from_handle(handle: &ControlHandle) -> Option<Rc<dyn Control<Self>>> {
        match handle {
            ControlHandle::Vector2(control) => Some(control.clone()),
            _ => None,
        }
    }

    fn magnitude(&self) -> f32 {
        self.length()
    }
}

impl ControlValue for Vec3 {
    const KIND: &'static str = "vector3";

    fn from_handle(handle: &ControlHandle) -> Option<Rc<dyn Control<Self>>> {
        match handle {
            ControlHandle::Vector3(control) => Some(control.clone()),
            _ => None,
        }
    }

    fn magnitude(&self) -> f32 {
        self.length()
    }
}

impl ControlValue for Pose {
    const KIND: &'static str = "pose";

    fn from_handle(handle: &ControlHandle) -> Option<Rc<dyn Control<Self>>> {
        match handle {
            ControlHandle::Pose(control) => Some(control.clone()),
            _ => None,
        }
    }

    fn magnitude(&self) -> f32 {
        self.position.length()
    }
}

/// Button viewed as an axis
struct ButtonAxis(Rc<dyn Control<bool>>);

impl Control<f32> for ButtonAxis {
    fn read_value(&self) -> f32 {
        self.0.read_value().magnitude()
    }

    fn is_activated(&self) -> bool {
        self.0.is_activated()
    }

    fn is_state(&self) -> bool {
        self.0.is_state()
    }

    fn path(&self) -> &str {
        self.0.path()
    }
}

/// A control backed by a settable cell.
///
/// Event controls are activated while their magnitude exceeds the
/// threshold; state controls are always activated.
#[derive(Debug)]
pub struct ValueControl<T: ControlValue> {
    path: String,
    value: Cell<T>,
    threshold: f32,
    state: bool,
}

impl<T: ControlValue> ValueControl<T> {
    /// Create an event control (button, axis, stick)
    pub fn new(path: impl Into<String>, initial: T) -> Self {
        Self {
            path: path.into(),
            value: Cell::new(initial),
            threshold: 0.0,
            state: false,
        }
    }

    /// Create a continuous state control (pose, tracked position)
    pub fn state(path: impl Into<String>, initial: T) -> Self {
        Self {
            state: true,
            ..Self::new(path, initial)
        }
    }

    /// Magnitude that must be exceeded for an event control to activate
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Write the value seen by bound bindings
    pub fn set(&self, value: T) {
        self.value.set(value);
    }

    /// Current value
    pub fn get(&self) -> T {
        self.value.get()
    }
}

impl<T: ControlValue> Control<T> for ValueControl<T> {
    fn read_value(&self) -> T {
        self.value.get()
    }

    fn is_activated(&self) -> bool {
        self.state || self.value.get().magnitude() > self.threshold
    }

    fn is_state(&self) -> bool {
        self.state
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// A control as seen by a binding: the control plus the controller it came from
pub struct BoundControl<T> {
    controller: ControllerId,
    control: Rc<dyn Control<T>>,
}

impl<T> BoundControl<T> {
    pub fn new(controller: ControllerId, control: Rc<dyn Control<T>>) -> Self {
        Self {
            controller,
            control,
        }
    }

    /// The controller this control belongs to
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Read the underlying control
    pub fn read_value(&self) -> T {
        self.control.read_value()
    }

    /// Whether the underlying control is actuated
    pub fn is_activated(&self) -> bool {
        self.control.is_activated()
    }

    /// Whether the underlying control is a continuous state control
    pub fn is_state(&self) -> bool {
        self.control.is_state()
    }

    pub fn path(&self) -> &str {
        self.control.path()
    }
}

impl<T> Clone for BoundControl<T> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller,
            control: self.control.clone(),
        }
    }
}

impl<T> fmt::Debug for BoundControl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundControl")
            .field("controller", &self.controller)
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_control_activation() {
        let button = ValueControl::new("buttonA", false);
        assert!(!button.is_activated());
        button.set(true);
        assert!(button.is_activated());
        assert!(!button.is_state());
    }

    #[test]
    fn test_threshold() {
        let trigger = ValueControl::new("trigger", 0.0f32).with_threshold(0.5);
        trigger.set(0.4);
        assert!(!trigger.is_activated());
        trigger.set(-0.6);
        assert!(trigger.is_activated());
    }

    #[test]
    fn test_state_control_always_activated() {
        let pose = ValueControl::state("grip/pose", Pose::default());
        assert!(pose.is_activated());
        assert!(pose.is_state());
    }

    #[test]
    fn test_button_readable_as_axis() {
        let button = Rc::new(ValueControl::new("KeyD", false));
        let handle = ControlHandle::Button(button.clone());

        let axis = f32::from_handle(&handle).unwrap();
        assert_eq!(axis.read_value(), 0.0);
        button.set(true);
        assert_eq!(axis.read_value(), 1.0);
        assert!(axis.is_activated());
        assert_eq!(axis.path(), "KeyD");
    }

    #[test]
    fn test_kind_mismatch_is_absent() {
        let stick = Rc::new(ValueControl::new("leftStick", Vec2::ZERO));
        let handle = ControlHandle::Vector2(stick);

        assert!(bool::from_handle(&handle).is_none());
        assert!(f32::from_handle(&handle).is_none());
        assert!(Vec2::from_handle(&handle).is_some());
        assert_eq!(handle.kind(), "vector2");
    }

    #[test]
    fn test_bound_control_reports_controller() {
        let button: Rc<dyn Control<bool>> = Rc::new(ValueControl::new("buttonA", true));
        let bound = BoundControl::new(ControllerId::new(7), button);
        assert_eq!(bound.controller(), ControllerId::new(7));
        assert!(bound.read_value());
        assert_eq!(bound.path(), "buttonA");
    }
}
