// Controllers - devices exposing controls under a hierarchical path

use super::control::{BoundControl, ControlHandle, ControlValue};
use super::path::{Handedness, InputPath};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identifier assigned to a controller when it connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u32);

impl ControllerId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Numeric value of the id
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A physical or virtual input device.
///
/// Controllers are shared (`Rc<dyn Controller>`) between the host that feeds
/// them and the manager, so every method takes `&self`; implementations keep
/// their mutable state in cells.
pub trait Controller {
    /// Path segments identifying the device, most generic first
    /// (e.g. `["gamepad", "xbox"]`)
    fn path(&self) -> &[String];

    fn handedness(&self) -> Handedness {
        Handedness::None
    }

    /// Whether any control on the device is actuated this frame
    fn is_activated(&self) -> bool;

    /// Per-frame refresh, called by the manager before bindings are evaluated
    fn update(&self, _delta_time: f32) {}

    fn on_connect(&self, _id: ControllerId) {}

    fn on_disconnect(&self) {}

    /// Look up a control by its path segments
    fn control(&self, segments: &[String]) -> Option<ControlHandle>;

    /// Match an input path's controller half against this device
    fn check_path(&self, path: &InputPath) -> bool {
        path.handedness().accepts(self.handedness()) && path.matches_controller(self.path())
    }
}

/// A controller attached to a manager under its assigned id
#[derive(Clone)]
pub struct ConnectedController {
    id: ControllerId,
    controller: Rc<dyn Controller>,
}

impl ConnectedController {
    pub fn new(id: ControllerId, controller: Rc<dyn Controller>) -> Self {
        Self { id, controller }
    }

    /// Id assigned by the manager
    pub fn id(&self) -> ControllerId {
        self.id
    }

    /// The controller itself
    pub fn controller(&self) -> &dyn Controller {
        self.controller.as_ref()
    }

    /// Shared handle to the controller
    pub fn handle(&self) -> &Rc<dyn Controller> {
        &self.controller
    }

    /// Whether `path` addresses this controller
    pub fn check_path(&self, path: &InputPath) -> bool {
        self.controller.check_path(path)
    }

    /// Resolve the control a path points at, typed for the caller.
    ///
    /// A missing control or one of an incompatible kind resolves to `None`.
    pub fn resolve<C: ControlValue>(&self, path: &InputPath) -> Option<BoundControl<C>> {
        let handle = self.controller.control(path.control_segments())?;
        match C::from_handle(&handle) {
            Some(control) => Some(BoundControl::new(self.id, control)),
            None => {
                log::warn!(
                    "Path {} resolves to a {} control on controller {}, expected {}",
                    path,
                    handle.kind(),
                    self.id,
                    C::KIND
                );
                None
            }
        }
    }
}

impl fmt::Debug for ConnectedController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedController")
            .field("id", &self.id)
            .field("path", &self.controller.path())
            .finish()
    }
}

/// Connected controllers, most recently activated first.
///
/// The manager owns the list; attached actions hold a clone of the handle so
/// they can re-run arbitration when enabled or rebound.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    connected: Rc<RefCell<Vec<ConnectedController>>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current list; arbitration iterates this so the registry
    /// itself is never borrowed while bindings run
    pub fn snapshot(&self) -> Vec<ConnectedController> {
        self.connected.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.connected.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected.borrow().is_empty()
    }

    /// Look up a connected controller by id
    pub fn get(&self, id: ControllerId) -> Option<ConnectedController> {
        self.connected.borrow().iter().find(|c| c.id == id).cloned()
    }

    /// The controller at the front of the list
    pub fn first(&self) -> Option<ControllerId> {
        self.connected.borrow().first().map(ConnectedController::id)
    }

    pub(crate) fn with_list<R>(&self, f: impl FnOnce(&mut Vec<ConnectedController>) -> R) -> R {
        f(&mut self.connected.borrow_mut())
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.connected.borrow().iter()).finish()
    }
}
