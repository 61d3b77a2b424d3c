// Bindings - associate an action with the physical controls that can drive it
//
// A binding owns one path (single) or a fixed tuple of paths (composite),
// the controls currently resolved from connected controllers, and the value
// pipeline that turns those controls into the action's value.
//
// Bindings never reach back into their action. Mutations that need the
// action to re-run arbitration (new path, new activator, new trigger) are
// recorded as pending changes and applied by the action as soon as the
// mutation returns (see `Action::modify_binding`).

mod composite;
mod single;

pub use composite::CompositeBinding;
pub use single::SingleBinding;

use super::activator::ControlActivator;
use super::control::BoundControl;
use super::controller::{ConnectedController, ControllerId};
use super::modifier::{Modifier, ModifierChain};
use super::trigger::Trigger;
use std::any::Any;
use std::fmt;

/// Identifier of a binding within its action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

/// Mutations the owning action has to react to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Paths changed: bound controls were dropped and arbitration must re-run
    pub rebind: bool,
    /// The state flag may have flipped: re-partition the active list
    pub state: bool,
    /// The private trigger was replaced or removed
    pub trigger: bool,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        !(self.rebind || self.state || self.trigger)
    }
}

/// Behaviour shared by single and composite bindings, as seen by an action
pub trait Binding<T>: Any {
    fn name(&self) -> Option<&str>;

    /// All slots have at least one bound control
    fn is_active(&self) -> bool;

    /// Driven by a continuous state control rather than discrete events
    fn is_state(&self) -> bool;

    /// Highest priority across the binding's paths
    fn max_priority(&self) -> i32;

    /// Highest priority among paths matching `controller`, or -1
    fn controller_priority(&self, controller: &ConnectedController) -> i32;

    /// Resolve and store the controls `controller` offers for matching paths
    fn bind_controls(&mut self, controller: &ConnectedController);

    /// Drop every control from `controller`. Returns `true` if this
    /// deactivated the binding.
    fn unbind_controls(&mut self, controller: ControllerId) -> bool;

    fn holds_controls_from(&self, controller: ControllerId) -> bool;

    /// Become active if every slot is populated. Returns `true` only on the
    /// inactive to active transition.
    fn try_activate(&mut self) -> bool;

    /// Drop all bound controls and deactivate
    fn reset(&mut self);

    /// Per-frame activation check; also moves the selected control of each
    /// slot to the front
    fn check_controls_activation(&mut self) -> bool;

    /// Current value through converter and modifiers, `None` while inactive
    fn read_value(&mut self) -> Option<T>;

    fn has_trigger(&self) -> bool;

    fn trigger_mut(&mut self) -> Option<&mut dyn Trigger<T>>;

    /// Controller supplying the front control
    fn active_controller(&self) -> Option<ControllerId>;

    /// Front control of the first slot, as a `BoundControl<C>`
    fn front_control(&self) -> Option<&dyn Any>;

    fn take_changes(&mut self) -> PendingChanges;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Fields every binding kind carries
pub(crate) struct BindingCore<T> {
    pub(crate) name: Option<String>,
    pub(crate) active: bool,
    pub(crate) is_state: bool,
    pub(crate) max_priority: i32,
    pub(crate) modifiers: ModifierChain<T>,
    pub(crate) trigger: Option<Box<dyn Trigger<T>>>,
    pub(crate) changes: PendingChanges,
}

impl<T> BindingCore<T> {
    pub(crate) fn new(max_priority: i32) -> Self {
        Self {
            name: None,
            active: false,
            is_state: false,
            max_priority,
            modifiers: ModifierChain::new(),
            trigger: None,
            changes: PendingChanges::default(),
        }
    }

    pub(crate) fn set_state(&mut self, is_state: bool) {
        if self.is_state != is_state {
            self.is_state = is_state;
            self.changes.state = true;
        }
    }

    pub(crate) fn add_modifier(&mut self, modifier: impl Modifier<T> + 'static) {
        self.modifiers.push(modifier);
    }

    pub(crate) fn set_trigger(&mut self, trigger: impl Trigger<T> + 'static) {
        let mut trigger: Box<dyn Trigger<T>> = Box::new(trigger);
        trigger.reset();
        self.trigger = Some(trigger);
        self.changes.trigger = true;
    }

    pub(crate) fn remove_trigger(&mut self) -> bool {
        let removed = self.trigger.take().is_some();
        if removed {
            self.changes.trigger = true;
        }
        removed
    }

    pub(crate) fn trigger_mut(&mut self) -> Option<&mut dyn Trigger<T>> {
        match self.trigger.as_mut() {
            Some(trigger) => Some(trigger.as_mut()),
            None => None,
        }
    }

    pub(crate) fn take_changes(&mut self) -> PendingChanges {
        std::mem::take(&mut self.changes)
    }
}

/// Find the first control that passes the activator (or is actuated, when
/// there is no activator) and move it to the front of the slot
pub(crate) fn select_active_control<C>(
    controls: &mut [BoundControl<C>],
    activator: Option<&mut (dyn ControlActivator<C> + 'static)>,
) -> bool {
    let found = match activator {
        Some(activator) => controls.iter().position(|c| activator.check(c)),
        None => controls.iter().position(BoundControl::is_activated),
    };
    match found {
        Some(index) => {
            if index > 0 {
                controls[..=index].rotate_right(1);
            }
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::activator;
    use crate::input::control::{Control, ValueControl};
    use std::rc::Rc;

    fn button(pressed: bool) -> (Rc<ValueControl<bool>>, BoundControl<bool>) {
        let control = Rc::new(ValueControl::new("buttonA", pressed));
        let dyn_control: Rc<dyn Control<bool>> = control.clone();
        (control, BoundControl::new(ControllerId::new(0), dyn_control))
    }

    #[test]
    fn test_select_moves_activated_to_front() {
        let (_, idle) = button(false);
        let (_, other_idle) = button(false);
        let (pressed, bound_pressed) = button(true);
        let mut controls = vec![idle, other_idle, bound_pressed];

        assert!(select_active_control(&mut controls, None));
        assert!(controls[0].is_activated());

        pressed.set(false);
        assert!(!select_active_control(&mut controls, None));
    }

    #[test]
    fn test_select_with_activator() {
        let (_, idle) = button(false);
        let (_, bound_pressed) = button(true);
        let mut controls = vec![bound_pressed, idle];

        // The toggle activator prefers released controls
        let mut toggle = activator::toggle();
        assert!(select_active_control(&mut controls, Some(&mut toggle)));
        assert!(!controls[0].is_activated());
    }

    #[test]
    fn test_pending_changes() {
        let mut core: BindingCore<bool> = BindingCore::new(0);
        assert!(core.take_changes().is_empty());

        core.set_state(true);
        core.set_state(true);
        let changes = core.take_changes();
        assert!(changes.state && !changes.rebind);
        assert!(core.take_changes().is_empty());

        core.set_trigger(crate::input::trigger::hold(0.5));
        assert!(core.take_changes().trigger);
        assert!(core.remove_trigger());
        assert!(!core.remove_trigger());
    }
}
