// Virtual controller - programmatic controls set from code

use crate::input::control::{Control, ControlHandle, ControlValue, Pose, ValueControl};
use crate::input::controller::{Controller, ControllerId};
use crate::input::path::Handedness;
use glam::{Vec2, Vec3};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

struct Slot {
    handle: ControlHandle,
    /// The concrete control when it was added through `add_*`
    cell: Option<Rc<dyn Any>>,
}

/// A controller whose controls are plain cells.
///
/// Used for scripted input, network-replicated input and tests: add
/// controls by name, keep the returned handles and `set` them each frame.
pub struct VirtualController {
    path: Vec<String>,
    handedness: Handedness,
    controls: RefCell<HashMap<String, Slot>>,
    connected_as: Cell<Option<ControllerId>>,
}

impl VirtualController {
    /// `path` segments go from generic to specific, e.g. `["gamepad", "xbox"]`
    pub fn new(path: &[&str]) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            handedness: Handedness::None,
            controls: RefCell::new(HashMap::new()),
            connected_as: Cell::new(None),
        }
    }

    /// Report `handedness` to hand-prefixed paths
    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    /// Id assigned by the manager, while connected
    pub fn id(&self) -> Option<ControllerId> {
        self.connected_as.get()
    }

    /// Register a control under `name`, replacing any previous one
    pub fn insert(&self, name: &str, control: ControlHandle) {
        self.insert_slot(
            name,
            Slot {
                handle: control,
                cell: None,
            },
        );
    }

    fn insert_slot(&self, name: &str, slot: Slot) {
        if self
            .controls
            .borrow_mut()
            .insert(name.to_string(), slot)
            .is_some()
        {
            log::warn!("Replacing control '{}' on {}", name, self.path.join("/"));
        }
    }

    fn add<T: ControlValue>(
        &self,
        control: ValueControl<T>,
        wrap: fn(Rc<dyn Control<T>>) -> ControlHandle,
    ) -> Rc<ValueControl<T>> {
        let name = control.path().to_string();
        let control = Rc::new(control);
        let cell: Rc<dyn Any> = control.clone();
        self.insert_slot(
            &name,
            Slot {
                handle: wrap(control.clone()),
                cell: Some(cell),
            },
        );
        control
    }

    fn typed<T: ControlValue>(&self, name: &str) -> Option<Rc<ValueControl<T>>> {
        let cell = self.controls.borrow().get(name)?.cell.clone()?;
        cell.downcast::<ValueControl<T>>().ok()
    }

    /// Add an event button
    pub fn add_button(&self, name: &str) -> Rc<ValueControl<bool>> {
        self.add(ValueControl::new(name, false), ControlHandle::Button)
    }

    /// Add an event axis
    pub fn add_axis(&self, name: &str) -> Rc<ValueControl<f32>> {
        self.add(ValueControl::new(name, 0.0), ControlHandle::Axis)
    }

    /// Add an event 2D vector (sticks, touchpads)
    pub fn add_vector2(&self, name: &str) -> Rc<ValueControl<Vec2>> {
        self.add(ValueControl::new(name, Vec2::ZERO), ControlHandle::Vector2)
    }

    /// Tracked position, always a state control
    pub fn add_vector3(&self, name: &str) -> Rc<ValueControl<Vec3>> {
        self.add(ValueControl::state(name, Vec3::ZERO), ControlHandle::Vector3)
    }

    /// Tracked pose, always a state control
    pub fn add_pose(&self, name: &str) -> Rc<ValueControl<Pose>> {
        self.add(ValueControl::state(name, Pose::default()), ControlHandle::Pose)
    }

    /// Button added through `add_button`
    pub fn button(&self, name: &str) -> Option<Rc<ValueControl<bool>>> {
        self.typed(name)
    }

    pub fn axis(&self, name: &str) -> Option<Rc<ValueControl<f32>>> {
        self.typed(name)
    }

    pub fn vector2(&self, name: &str) -> Option<Rc<ValueControl<Vec2>>> {
        self.typed(name)
    }

    pub fn vector3(&self, name: &str) -> Option<Rc<ValueControl<Vec3>>> {
        self.typed(name)
    }

    pub fn pose(&self, name: &str) -> Option<Rc<ValueControl<Pose>>> {
        self.typed(name)
    }

    /// Remove a control, returning whether it existed
    pub fn remove(&self, name: &str) -> bool {
        self.controls.borrow_mut().remove(name).is_some()
    }

    pub fn control_count(&self) -> usize {
        self.controls.borrow().len()
    }
}

/// Event controls count towards activation; state controls never do
fn is_actuated(handle: &ControlHandle) -> bool {
    fn check<T>(control: &Rc<dyn Control<T>>) -> bool {
        !control.is_state() && control.is_activated()
    }
    match handle {
        ControlHandle::Button(c) => check(c),
        ControlHandle::Axis(c) => check(c),
        ControlHandle::Vector2(c) => check(c),
        ControlHandle::Vector3(c) => check(c),
        ControlHandle::Pose(c) => check(c),
    }
}

impl Controller for VirtualController {
    fn path(&self) -> &[String] {
        &self.path
    }

    fn handedness(&self) -> Handedness {
        self.handedness
    }

    fn is_activated(&self) -> bool {
        self.controls
            .borrow()
            .values()
            .any(|slot| is_actuated(&slot.handle))
    }

    fn on_connect(&self, id: ControllerId) {
        self.connected_as.set(Some(id));
    }

    fn on_disconnect(&self) {
        self.connected_as.set(None);
    }

    fn control(&self, segments: &[String]) -> Option<ControlHandle> {
        self.controls
            .borrow()
            .get(&segments.join("/"))
            .map(|slot| slot.handle.clone())
    }
}
