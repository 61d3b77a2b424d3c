// Actions - named semantic values with a per-frame lifecycle
//
// An action keeps its bindings sorted by descending priority and tracks the
// subset that is currently active. Active event bindings form a prefix of
// `active_bindings` (up to `state_binding_index`); active state bindings
// follow. Each frame the first actuated event binding wins, otherwise the
// first state binding supplies the value.

use super::binding::{Binding, BindingId, PendingChanges};
use super::control::{BoundControl, ControlValue};
use super::controller::{ConnectedController, ControllerId, ControllerRegistry};
use super::modifier::{Modifier, ModifierChain};
use super::trigger::{DefaultTrigger, Trigger};
use std::any::Any;
use std::fmt;

/// Values an action can carry
pub trait ActionValue: Clone + PartialEq + fmt::Debug + 'static {}

impl<T: Clone + PartialEq + fmt::Debug + 'static> ActionValue for T {}

/// Lifecycle of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionState {
    Waiting,
    Started,
    Performing,
    Ended,
    /// Disabled, paused or detached
    Inactive,
}

impl ActionState {
    /// One transition of the state machine
    pub fn advance(self, triggered: bool) -> Self {
        match (self, triggered) {
            (ActionState::Waiting, true) => ActionState::Started,
            (ActionState::Started, true) => ActionState::Performing,
            (ActionState::Started, false) => ActionState::Ended,
            (ActionState::Performing, false) => ActionState::Ended,
            (ActionState::Ended, true) => ActionState::Started,
            (ActionState::Ended, false) => ActionState::Waiting,
            (state, _) => state,
        }
    }
}

/// Events raised after the update pass, one set per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionEvent {
    Waiting,
    Started,
    Performing,
    Ended,
}

/// Handle returned by [`Action::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<T> {
    id: ListenerId,
    event: ActionEvent,
    callback: Box<dyn FnMut(&Action<T>, f32)>,
}

struct BindingEntry<T> {
    id: BindingId,
    binding: Box<dyn Binding<T>>,
}

/// Which trigger currently drives the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerSource {
    Action,
    Binding(BindingId),
}

/// What a node knows about its parent group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParentState {
    pub(crate) enabled_in_hierarchy: bool,
    pub(crate) active: bool,
}

impl ParentState {
    /// Parent of a root group attached to a manager
    pub(crate) const ROOT: Self = Self {
        enabled_in_hierarchy: true,
        active: true,
    };

    pub(crate) const DETACHED: Self = Self {
        enabled_in_hierarchy: false,
        active: false,
    };
}

/// Type-erased view of an action, used by groups
pub(crate) trait ActionNode: Any {
    fn name(&self) -> &str;
    fn attach(&mut self, registry: &ControllerRegistry, parent: ParentState);
    fn detach(&mut self);
    fn on_parent_enable(&mut self, parent: ParentState);
    fn on_parent_disable(&mut self);
    fn on_parent_active(&mut self);
    fn on_parent_inactive(&mut self);
    fn update(&mut self, delta_time: f32);
    fn handle_events(&mut self, delta_time: f32);
    fn on_controller_connected(&mut self, controller: &ConnectedController);
    fn on_controller_disconnected(&mut self, controller: ControllerId);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A named input value driven by its bindings
pub struct Action<T> {
    name: String,
    default_value: T,
    value: T,

    bindings: Vec<BindingEntry<T>>,
    next_binding_id: u64,
    active_bindings: Vec<BindingId>,
    state_binding_index: usize,
    current_binding: Option<BindingId>,

    trigger: Box<dyn Trigger<T>>,
    trigger_source: TriggerSource,
    state: ActionState,
    modifiers: ModifierChain<T>,

    listeners: Vec<Listener<T>>,
    next_listener_id: u64,

    enabled: bool,
    updated: bool,
    enabled_in_hierarchy: bool,
    active: bool,
    parent: ParentState,
    registry: Option<ControllerRegistry>,
}

impl<T: ActionValue> Action<T> {
    /// Create an action that rests at `default_value`
    pub fn new(name: impl Into<String>, default_value: T) -> Self {
        Self {
            name: name.into(),
            value: default_value.clone(),
            trigger: Box::new(DefaultTrigger::new(default_value.clone())),
            default_value,
            bindings: Vec::new(),
            next_binding_id: 0,
            active_bindings: Vec::new(),
            state_binding_index: 0,
            current_binding: None,
            trigger_source: TriggerSource::Action,
            state: ActionState::Inactive,
            modifiers: ModifierChain::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            enabled: true,
            updated: true,
            enabled_in_hierarchy: false,
            active: false,
            parent: ParentState::DETACHED,
            registry: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value the action rests at when no binding drives it
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Value computed by the last update
    pub fn value(&self) -> &T {
        &self.value
    }

    /// State reached by the last update
    pub fn state(&self) -> ActionState {
        self.state
    }

    /// The action's own enabled flag
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Paused actions keep their bound controls
    pub fn is_paused(&self) -> bool {
        !self.updated
    }

    /// Enabled, and so is every group above it
    pub fn is_enabled_in_hierarchy(&self) -> bool {
        self.enabled_in_hierarchy
    }

    /// Whether the action is updated this frame
    pub fn is_active(&self) -> bool {
        self.active
    }

    // --- Bindings ---

    /// Add a binding, keeping the list sorted by descending priority.
    /// Equal priorities keep insertion order.
    pub fn add_binding(&mut self, binding: impl Binding<T>) -> BindingId {
        let mut binding: Box<dyn Binding<T>> = Box::new(binding);
        binding.take_changes();

        let id = BindingId::new(self.next_binding_id);
        self.next_binding_id += 1;
        self.insert_entry(BindingEntry { id, binding });

        if self.can_bind() {
            self.check_binding_activation(id);
        }
        id
    }

    /// Remove the first binding matching `predicate`
    pub fn remove_binding(&mut self, predicate: impl FnMut(&dyn Binding<T>) -> bool) -> bool {
        self.take_binding(predicate).is_some()
    }

    /// Remove and return the first binding matching `predicate`, unbound
    pub fn take_binding(
        &mut self,
        mut predicate: impl FnMut(&dyn Binding<T>) -> bool,
    ) -> Option<Box<dyn Binding<T>>> {
        let index = self
            .bindings
            .iter()
            .position(|entry| predicate(entry.binding.as_ref()))?;
        let mut entry = self.bindings.remove(index);
        self.remove_active(entry.id);
        entry.binding.reset();
        Some(entry.binding)
    }

    /// Id of the first binding matching `predicate`
    pub fn find_binding(
        &self,
        mut predicate: impl FnMut(&dyn Binding<T>) -> bool,
    ) -> Option<BindingId> {
        self.bindings
            .iter()
            .find(|entry| predicate(entry.binding.as_ref()))
            .map(|entry| entry.id)
    }

    /// Id of the binding with the given name
    pub fn binding_by_name(&self, name: &str) -> Option<BindingId> {
        self.find_binding(|binding| binding.name() == Some(name))
    }

    /// Look up a binding by id
    pub fn binding(&self, id: BindingId) -> Option<&dyn Binding<T>> {
        self.entry(id).map(|entry| entry.binding.as_ref())
    }

    /// Concrete view of a binding
    pub fn binding_as<B: Binding<T>>(&self, id: BindingId) -> Option<&B> {
        self.entry(id)?.binding.as_any().downcast_ref::<B>()
    }

    /// Bindings in priority order
    pub fn binding_ids(&self) -> impl Iterator<Item = BindingId> + '_ {
        self.bindings.iter().map(|entry| entry.id)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Mutate a binding in place.
    ///
    /// Path, activator and trigger changes made inside `f` are applied as
    /// soon as it returns: new paths are re-arbitrated against every
    /// connected controller, state changes re-partition the active list.
    /// Returns `None` if the id is unknown or the binding is not a `B`.
    pub fn modify_binding<B: Binding<T>, R>(
        &mut self,
        id: BindingId,
        f: impl FnOnce(&mut B) -> R,
    ) -> Option<R> {
        let entry = self.bindings.iter_mut().find(|entry| entry.id == id)?;
        entry.binding.take_changes();
        let binding = entry.binding.as_any_mut().downcast_mut::<B>()?;
        let result = f(binding);
        let changes = entry.binding.take_changes();
        self.apply_changes(id, changes);
        Some(result)
    }

    /// Binding currently supplying the value
    pub fn active_binding(&self) -> Option<BindingId> {
        self.current_binding
    }

    /// Controller behind the current binding's front control
    pub fn active_controller(&self) -> Option<ControllerId> {
        let id = self.current_binding?;
        self.entry(id)?.binding.active_controller()
    }

    /// Front control of the current binding, if its controls carry `C` values
    pub fn active_control<C: ControlValue>(&self) -> Option<&BoundControl<C>> {
        let id = self.current_binding?;
        self.entry(id)?
            .binding
            .front_control()?
            .downcast_ref::<BoundControl<C>>()
    }

    // --- Pipeline ---

    /// Append a modifier applied to the selected binding's value
    pub fn add_modifier(&mut self, modifier: impl Modifier<T> + 'static) {
        self.modifiers.push(modifier);
    }

    /// Remove the modifier at `index`
    pub fn remove_modifier(&mut self, index: usize) -> bool {
        self.modifiers.remove(index)
    }

    /// Swap the modifier at `index`
    pub fn replace_modifier(&mut self, index: usize, modifier: impl Modifier<T> + 'static) -> bool {
        self.modifiers.replace(index, modifier)
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Modifier at `index`
    pub fn modifier(&self, index: usize) -> Option<&(dyn Modifier<T> + 'static)> {
        self.modifiers.get(index)
    }

    pub fn modifier_mut(&mut self, index: usize) -> Option<&mut (dyn Modifier<T> + 'static)> {
        self.modifiers.get_mut(index)
    }

    /// The action's own trigger, used whenever the current binding has none
    pub fn trigger(&self) -> &(dyn Trigger<T> + 'static) {
        &*self.trigger
    }

    pub fn trigger_mut(&mut self) -> &mut (dyn Trigger<T> + 'static) {
        &mut *self.trigger
    }

    /// Replace the action's trigger. Bindings with their own trigger keep
    /// using it while they are current.
    pub fn set_trigger(&mut self, trigger: impl Trigger<T> + 'static) {
        let mut trigger: Box<dyn Trigger<T>> = Box::new(trigger);
        trigger.reset();
        self.trigger = trigger;
    }

    /// Go back to firing whenever the value differs from the default
    pub fn reset_trigger(&mut self) {
        self.trigger = Box::new(DefaultTrigger::new(self.default_value.clone()));
    }

    // --- Events ---

    /// Register a listener for `event`
    pub fn on(
        &mut self,
        event: ActionEvent,
        listener: impl FnMut(&Action<T>, f32) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push(Listener {
            id,
            event,
            callback: Box::new(listener),
        });
        id
    }

    /// Unregister a listener, returning whether it existed
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    fn raise(&mut self, event: ActionEvent, delta_time: f32) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in listeners.iter_mut().filter(|l| l.event == event) {
            (listener.callback)(self, delta_time);
        }
        self.listeners = listeners;
    }

    // --- Lifecycle ---

    /// Enable the action and rebind it against connected controllers
    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;

        if self.parent.enabled_in_hierarchy {
            self.enabled_in_hierarchy = true;
            if self.updated && self.parent.active {
                self.activate();
            }
            self.set_bound_controls();
        }
    }

    /// Disable the action and drop its bound controls
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.enabled_in_hierarchy = false;
        self.deactivate();
        self.disable_bindings();
    }

    /// Stop updating without dropping bound controls
    pub fn pause(&mut self) {
        if !self.updated {
            return;
        }
        self.updated = false;
        self.deactivate();
        self.value = self.default_value.clone();
        self.current_binding = None;
        self.trigger_source = TriggerSource::Action;
        self.trigger.reset();
    }

    /// Resume updating after [`pause`](Self::pause)
    pub fn resume(&mut self) {
        if self.updated {
            return;
        }
        self.updated = true;
        if self.enabled && self.parent.active {
            self.activate();
        }
    }

    fn activate(&mut self) {
        self.active = true;
        self.state = ActionState::Waiting;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.state = ActionState::Inactive;
    }

    // --- Frame ---

    /// Select the effective binding, read its value and advance the state
    /// machine by one transition
    pub(crate) fn update_value(&mut self, delta_time: f32) {
        if !self.active {
            return;
        }

        if !self.active_bindings.is_empty() {
            let mut next_active = 0;
            for index in 0..self.state_binding_index {
                let id = self.active_bindings[index];
                let activated = find_entry_mut(&mut self.bindings, id)
                    .is_some_and(|entry| entry.binding.check_controls_activation());
                if activated {
                    if index > next_active {
                        self.active_bindings[next_active..=index].rotate_right(1);
                    }
                    next_active += 1;
                }
            }

            let selected = if next_active > 0 {
                self.active_bindings.first().copied()
            } else {
                self.active_bindings.get(self.state_binding_index).copied()
            };

            match selected {
                Some(id) => {
                    if self.current_binding != Some(id) {
                        self.select_binding(id);
                    }
                    let raw = find_entry_mut(&mut self.bindings, id)
                        .and_then(|entry| entry.binding.read_value());
                    self.value = match raw {
                        Some(raw) => self.modifiers.apply(raw),
                        None => self.default_value.clone(),
                    };
                }
                None => self.value = self.default_value.clone(),
            }
        }

        let triggered = self.execute_trigger(delta_time);
        self.state = self.state.advance(triggered);
    }

    /// Raise the events for the current state
    pub(crate) fn raise_events(&mut self, delta_time: f32) {
        if !self.active {
            return;
        }
        match self.state {
            ActionState::Waiting => self.raise(ActionEvent::Waiting, delta_time),
            ActionState::Started => {
                self.raise(ActionEvent::Started, delta_time);
                self.raise(ActionEvent::Performing, delta_time);
            }
            ActionState::Performing => self.raise(ActionEvent::Performing, delta_time),
            ActionState::Ended => {
                self.raise(ActionEvent::Ended, delta_time);
                self.raise(ActionEvent::Waiting, delta_time);
            }
            ActionState::Inactive => {}
        }
    }

    fn execute_trigger(&mut self, delta_time: f32) -> bool {
        if let TriggerSource::Binding(id) = self.trigger_source {
            let trigger = find_entry_mut(&mut self.bindings, id)
                .and_then(|entry| entry.binding.trigger_mut());
            if let Some(trigger) = trigger {
                return trigger.execute(&self.value, delta_time);
            }
        }
        self.trigger.execute(&self.value, delta_time)
    }

    /// Make `id` the current binding and switch to its trigger, if any
    fn select_binding(&mut self, id: BindingId) {
        self.current_binding = Some(id);
        let private = find_entry_mut(&mut self.bindings, id).and_then(|entry| entry.binding.trigger_mut());
        match private {
            Some(trigger) => {
                trigger.reset();
                self.trigger_source = TriggerSource::Binding(id);
            }
            None => {
                self.trigger.reset();
                self.trigger_source = TriggerSource::Action;
            }
        }
    }

    // --- Arbitration ---

    fn can_bind(&self) -> bool {
        self.enabled_in_hierarchy && self.registry.as_ref().is_some_and(|r| !r.is_empty())
    }

    fn entry(&self, id: BindingId) -> Option<&BindingEntry<T>> {
        self.bindings.iter().find(|entry| entry.id == id)
    }

    fn insert_entry(&mut self, entry: BindingEntry<T>) {
        let priority = entry.binding.max_priority();
        let index = self
            .bindings
            .iter()
            .position(|e| e.binding.max_priority() < priority)
            .unwrap_or(self.bindings.len());
        self.bindings.insert(index, entry);
    }

    /// Bind a freshly added or rebound binding against every connected
    /// controller it may claim
    fn check_binding_activation(&mut self, id: BindingId) {
        let Some(registry) = self.registry.clone() else {
            return;
        };
        for controller in registry.snapshot() {
            if self.check_for_controller(id, &controller) {
                if let Some(entry) = find_entry_mut(&mut self.bindings, id) {
                    entry.binding.bind_controls(&controller);
                }
            }
        }
        let activated = find_entry_mut(&mut self.bindings, id).and_then(|entry| {
            entry
                .binding
                .try_activate()
                .then(|| entry.binding.is_state())
        });
        if let Some(is_state) = activated {
            self.add_active(id, is_state);
        }
    }

    /// Whether binding `id` may claim `controller`. Claiming evicts bindings
    /// of lower priority that currently hold its controls.
    fn check_for_controller(&mut self, id: BindingId, controller: &ConnectedController) -> bool {
        let Some(priority) = self
            .entry(id)
            .map(|entry| entry.binding.controller_priority(controller))
        else {
            return false;
        };
        if priority < 0 {
            return false;
        }

        let best_other = self
            .bindings
            .iter()
            .filter(|entry| entry.id != id)
            .map(|entry| entry.binding.controller_priority(controller))
            .max()
            .unwrap_or(-1);
        if best_other < 0 || priority == best_other {
            return true;
        }
        if priority < best_other {
            return false;
        }

        let evicted = evict_lower(&mut self.bindings, Some(id), priority, controller);
        self.settle_unbound(evicted);
        true
    }

    fn add_active(&mut self, id: BindingId, is_state: bool) {
        if self.active_bindings.is_empty() {
            self.select_binding(id);
        }
        if is_state {
            self.active_bindings.push(id);
        } else {
            self.active_bindings.insert(self.state_binding_index, id);
            self.state_binding_index += 1;
        }
    }

    fn remove_active(&mut self, id: BindingId) {
        let Some(index) = self.active_bindings.iter().position(|&active| active == id) else {
            return;
        };
        self.active_bindings.remove(index);
        if index < self.state_binding_index {
            self.state_binding_index -= 1;
        }
        // The next update selects a new current binding among those left
        if self.current_binding == Some(id) {
            self.current_binding = None;
            self.trigger_source = TriggerSource::Action;
            self.trigger.reset();
        }
        if self.active_bindings.is_empty() {
            self.value = self.default_value.clone();
        }
    }

    /// Bindings that just lost controls either dropped out of the active
    /// list or may have flipped between event and state
    fn settle_unbound(&mut self, touched: Vec<BindingId>) {
        for id in touched {
            if self.entry(id).is_some_and(|entry| entry.binding.is_active()) {
                self.update_binding_state(id);
            } else {
                self.remove_active(id);
            }
        }
    }

    /// Move a binding across the event/state boundary after its state flag flipped
    fn update_binding_state(&mut self, id: BindingId) {
        let Some(index) = self.active_bindings.iter().position(|&active| active == id) else {
            return;
        };
        let is_state = self.entry(id).is_some_and(|entry| entry.binding.is_state());
        if is_state && index < self.state_binding_index {
            self.active_bindings.remove(index);
            self.active_bindings.push(id);
            self.state_binding_index -= 1;
        } else if !is_state && index >= self.state_binding_index {
            self.active_bindings.remove(index);
            self.active_bindings.insert(self.state_binding_index, id);
            self.state_binding_index += 1;
        }
    }

    /// Re-sort and re-arbitrate a binding whose paths changed
    fn reset_binding(&mut self, id: BindingId) {
        let Some(index) = self.bindings.iter().position(|entry| entry.id == id) else {
            return;
        };
        self.remove_active(id);
        let entry = self.bindings.remove(index);
        self.insert_entry(entry);
        if self.can_bind() {
            self.check_binding_activation(id);
        }
    }

    fn apply_changes(&mut self, id: BindingId, changes: PendingChanges) {
        if changes.rebind {
            self.reset_binding(id);
        } else if changes.state {
            self.update_binding_state(id);
        }
        if changes.trigger && self.current_binding == Some(id) {
            self.select_binding(id);
        }
    }

    /// Reset every binding and forget the active set
    fn disable_bindings(&mut self) {
        for entry in &mut self.bindings {
            entry.binding.reset();
        }
        self.active_bindings.clear();
        self.state_binding_index = 0;
        self.current_binding = None;
        self.trigger_source = TriggerSource::Action;
        self.value = self.default_value.clone();
    }

    /// Rebind from scratch against every connected controller
    fn set_bound_controls(&mut self) {
        self.disable_bindings();
        let Some(registry) = self.registry.clone() else {
            return;
        };
        for controller in registry.snapshot() {
            self.connect_controller(&controller);
        }
    }

    /// Bind `controller` to the bindings that match it best
    fn connect_controller(&mut self, controller: &ConnectedController) {
        let best = self
            .bindings
            .iter()
            .map(|entry| entry.binding.controller_priority(controller))
            .max()
            .unwrap_or(-1);
        if best < 0 {
            return;
        }

        let evicted = evict_lower(&mut self.bindings, None, best, controller);
        self.settle_unbound(evicted);

        let mut activated = Vec::new();
        for entry in &mut self.bindings {
            if entry.binding.controller_priority(controller) == best {
                entry.binding.bind_controls(controller);
                if entry.binding.try_activate() {
                    activated.push((entry.id, entry.binding.is_state()));
                }
            }
        }
        for (id, is_state) in activated {
            self.add_active(id, is_state);
        }
    }

    fn disconnect_controller(&mut self, controller: ControllerId) {
        let mut touched = Vec::new();
        for entry in &mut self.bindings {
            if entry.binding.holds_controls_from(controller) {
                entry.binding.unbind_controls(controller);
                touched.push(entry.id);
            }
        }
        self.settle_unbound(touched);
    }
}

impl<T: ActionValue> ActionNode for Action<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, registry: &ControllerRegistry, parent: ParentState) {
        self.registry = Some(registry.clone());
        self.parent = parent;
        self.trigger.reset();
        self.trigger_source = TriggerSource::Action;
        if self.enabled && parent.enabled_in_hierarchy {
            self.enabled_in_hierarchy = true;
            if self.updated && parent.active {
                self.activate();
            }
            self.set_bound_controls();
        }
    }

    fn detach(&mut self) {
        self.registry = None;
        self.parent = ParentState::DETACHED;
        self.enabled_in_hierarchy = false;
        self.deactivate();
        self.disable_bindings();
    }

    fn on_parent_enable(&mut self, parent: ParentState) {
        self.parent = parent;
        if self.enabled {
            self.enabled_in_hierarchy = true;
            if self.updated && parent.active {
                self.activate();
            }
            self.set_bound_controls();
        }
    }

    fn on_parent_disable(&mut self) {
        self.parent = ParentState::DETACHED;
        self.enabled_in_hierarchy = false;
        self.deactivate();
        self.disable_bindings();
    }

    fn on_parent_active(&mut self) {
        self.parent.active = true;
        if self.enabled && self.updated {
            self.activate();
        }
    }

    fn on_parent_inactive(&mut self) {
        self.parent.active = false;
        if self.enabled && self.updated {
            self.deactivate();
        }
    }

    fn update(&mut self, delta_time: f32) {
        self.update_value(delta_time);
    }

    fn handle_events(&mut self, delta_time: f32) {
        self.raise_events(delta_time);
    }

    fn on_controller_connected(&mut self, controller: &ConnectedController) {
        if self.enabled && self.enabled_in_hierarchy {
            self.connect_controller(controller);
        }
    }

    fn on_controller_disconnected(&mut self, controller: ControllerId) {
        if self.enabled && self.enabled_in_hierarchy {
            self.disconnect_controller(controller);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: ActionValue> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("value", &self.value)
            .field("bindings", &self.bindings.len())
            .field("active_bindings", &self.active_bindings)
            .finish()
    }
}

fn find_entry_mut<T>(bindings: &mut [BindingEntry<T>], id: BindingId) -> Option<&mut BindingEntry<T>> {
    bindings.iter_mut().find(|entry| entry.id == id)
}

/// Strip `controller`'s controls from bindings that match it below
/// `priority`. Returns the bindings that lost controls.
fn evict_lower<T: 'static>(
    bindings: &mut [BindingEntry<T>],
    skip: Option<BindingId>,
    priority: i32,
    controller: &ConnectedController,
) -> Vec<BindingId> {
    let mut evicted = Vec::new();
    for entry in bindings.iter_mut().filter(|entry| Some(entry.id) != skip) {
        let own = entry.binding.controller_priority(controller);
        if own < 0 || own >= priority || !entry.binding.holds_controls_from(controller.id()) {
            continue;
        }
        log::debug!(
            "Evicting controller {} from {} (priority {} < {})",
            controller.id(),
            entry.id,
            own,
            priority
        );
        entry.binding.unbind_controls(controller.id());
        evicted.push(entry.id);
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::VirtualController;
    use crate::input::binding::SingleBinding;
    use crate::input::control::ValueControl;
    use crate::input::control::ControlHandle;
    use crate::input::{activator, converter, modifier, trigger};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f32 = 1.0 / 60.0;

    fn attached<T: ActionValue>(action: &mut Action<T>) -> ControllerRegistry {
        let registry = ControllerRegistry::new();
        action.attach(&registry, ParentState::ROOT);
        registry
    }

    fn connect<T: ActionValue>(
        registry: &ControllerRegistry,
        action: &mut Action<T>,
        controller: VirtualController,
        id: u32,
    ) -> ConnectedController {
        let connected = ConnectedController::new(ControllerId::new(id), Rc::new(controller));
        registry.with_list(|list| list.push(connected.clone()));
        action.on_controller_connected(&connected);
        connected
    }

    fn gamepad(path: &[&str]) -> (VirtualController, Rc<ValueControl<bool>>) {
        let pad = VirtualController::new(path);
        let button = pad.add_button("buttonA");
        (pad, button)
    }

    #[test]
    fn test_state_machine_transitions() {
        use ActionState::*;
        assert_eq!(Waiting.advance(false), Waiting);
        assert_eq!(Waiting.advance(true), Started);
        assert_eq!(Started.advance(true), Performing);
        assert_eq!(Started.advance(false), Ended);
        assert_eq!(Performing.advance(true), Performing);
        assert_eq!(Performing.advance(false), Ended);
        assert_eq!(Ended.advance(true), Started);
        assert_eq!(Ended.advance(false), Waiting);
        assert_eq!(Inactive.advance(true), Inactive);
    }

    #[test]
    fn test_button_press_lifecycle() {
        let mut action = Action::new("jump", false);
        action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (pad, button) = gamepad(&["gamepad"]);
        connect(&registry, &mut action, pad, 0);

        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Waiting);

        button.set(true);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Started);
        assert!(*action.value());
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Performing);

        button.set(false);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Ended);
        assert!(!*action.value());
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Waiting);
    }

    #[test]
    fn test_events_follow_state() {
        let mut action = Action::new("jump", false);
        action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (pad, button) = gamepad(&["gamepad"]);
        connect(&registry, &mut action, pad, 0);

        let log = Rc::new(RefCell::new(Vec::new()));
        for event in [
            ActionEvent::Waiting,
            ActionEvent::Started,
            ActionEvent::Performing,
            ActionEvent::Ended,
        ] {
            let log = log.clone();
            action.on(event, move |_, _| log.borrow_mut().push(event));
        }

        button.set(true);
        action.update_value(DT);
        action.raise_events(DT);
        assert_eq!(
            *log.borrow(),
            vec![ActionEvent::Started, ActionEvent::Performing]
        );

        log.borrow_mut().clear();
        button.set(false);
        action.update_value(DT);
        action.raise_events(DT);
        assert_eq!(*log.borrow(), vec![ActionEvent::Ended, ActionEvent::Waiting]);
    }

    #[test]
    fn test_remove_listener() {
        let mut action = Action::new("jump", false);
        let id = action.on(ActionEvent::Started, |_, _| {});
        assert!(action.remove_listener(id));
        assert!(!action.remove_listener(id));
    }

    #[test]
    fn test_bindings_sorted_by_priority() {
        let mut action = Action::new("jump", false);
        let generic = action.add_binding(SingleBinding::<bool>::new("<*>/buttonA").unwrap());
        let specific =
            action.add_binding(SingleBinding::<bool>::new("<gamepad/xbox>/buttonA").unwrap());
        let tied = action.add_binding(SingleBinding::<bool>::new("<gamepad/sony>/buttonA").unwrap());

        let order: Vec<_> = action.binding_ids().collect();
        assert_eq!(order, vec![specific, tied, generic]);
    }

    #[test]
    fn test_higher_priority_claims_controller() {
        let mut action = Action::new("jump", false);
        let generic = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let specific =
            action.add_binding(SingleBinding::<bool>::new("<gamepad/xbox>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (pad, _button) = gamepad(&["gamepad", "xbox"]);
        connect(&registry, &mut action, pad, 3);

        assert!(action.binding(specific).unwrap().is_active());
        assert!(!action.binding(generic).unwrap().is_active());
        assert_eq!(action.active_binding(), Some(specific));
        assert_eq!(action.active_controller(), Some(ControllerId::new(3)));
    }

    #[test]
    fn test_added_binding_evicts_lower_priority() {
        let mut action = Action::new("jump", false);
        let generic = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (pad, _button) = gamepad(&["gamepad", "xbox"]);
        connect(&registry, &mut action, pad, 0);
        assert!(action.binding(generic).unwrap().is_active());

        let specific =
            action.add_binding(SingleBinding::<bool>::new("<gamepad/xbox>/buttonA").unwrap());
        let generic_binding = action.binding(generic).unwrap();
        assert!(!generic_binding.is_active());
        assert!(!generic_binding.holds_controls_from(ControllerId::new(0)));
        assert!(action.binding(specific).unwrap().is_active());
        assert_eq!(action.active_binding(), Some(specific));
    }

    #[test]
    fn test_equal_priority_first_registered_wins() {
        let mut action = Action::new("jump", false);
        let first = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let second = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonB").unwrap());
        let registry = attached(&mut action);
        let (pad, a) = gamepad(&["gamepad"]);
        let b = pad.add_button("buttonB");
        connect(&registry, &mut action, pad, 0);

        a.set(true);
        b.set(true);
        action.update_value(DT);
        assert_eq!(action.active_binding(), Some(first));

        // The other binding takes over once it is the only one actuated
        a.set(false);
        action.update_value(DT);
        assert_eq!(action.active_binding(), Some(second));
    }

    #[test]
    fn test_disconnect_resets_value() {
        let mut action = Action::new("throttle", 0.0f32);
        action.add_binding(SingleBinding::<f32>::new("<gamepad>/rightTrigger").unwrap());
        let registry = attached(&mut action);
        let pad = VirtualController::new(&["gamepad"]);
        let trigger = pad.add_axis("rightTrigger");
        connect(&registry, &mut action, pad, 0);

        trigger.set(0.75);
        action.update_value(DT);
        assert_eq!(*action.value(), 0.75);

        action.on_controller_disconnected(ControllerId::new(0));
        assert_eq!(*action.value(), 0.0);
        assert_eq!(action.active_binding(), None);
    }

    #[test]
    fn test_state_binding_supplies_value_when_idle() {
        let mut action = Action::new("aim", glam::Vec3::ZERO);
        let stick = action.add_binding(SingleBinding::<glam::Vec3>::new("<xr>/aim").unwrap());
        let tracked = action.add_binding(SingleBinding::<glam::Vec3>::new("<xr>/position").unwrap());
        let registry = attached(&mut action);
        let xr = VirtualController::new(&["xr"]);
        let position = xr.add_vector3("position");
        position.set(glam::Vec3::new(0.0, 1.5, 0.0));
        let aim = Rc::new(ValueControl::new("aim", glam::Vec3::ZERO));
        xr.insert("aim", ControlHandle::Vector3(aim.clone()));
        connect(&registry, &mut action, xr, 0);

        assert!(!action.binding(stick).unwrap().is_state());
        assert!(action.binding(tracked).unwrap().is_state());

        action.update_value(DT);
        assert_eq!(action.active_binding(), Some(tracked));
        assert_eq!(*action.value(), glam::Vec3::new(0.0, 1.5, 0.0));

        aim.set(glam::Vec3::X);
        action.update_value(DT);
        assert_eq!(action.active_binding(), Some(stick));
        assert_eq!(*action.value(), glam::Vec3::X);
    }

    #[test]
    fn test_lifecycle_idempotence() {
        let mut action = Action::new("jump", false);
        action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (pad, _button) = gamepad(&["gamepad"]);
        connect(&registry, &mut action, pad, 0);

        action.disable();
        action.disable();
        assert_eq!(action.state(), ActionState::Inactive);
        assert!(!action.is_enabled_in_hierarchy());
        assert_eq!(action.active_binding(), None);

        action.enable();
        action.enable();
        assert_eq!(action.state(), ActionState::Waiting);
        assert!(action.active_binding().is_some());
        assert!(!*action.value());

        action.pause();
        action.pause();
        assert!(action.is_paused());
        assert_eq!(action.state(), ActionState::Inactive);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Inactive);

        action.resume();
        action.resume();
        assert_eq!(action.state(), ActionState::Waiting);
    }

    #[test]
    fn test_modify_binding_rebinds_immediately() {
        let mut action = Action::new("jump", false);
        let id = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonZ").unwrap());
        let registry = attached(&mut action);
        let (pad, button) = gamepad(&["gamepad"]);
        connect(&registry, &mut action, pad, 0);
        assert!(!action.binding(id).unwrap().is_active());

        let result = action.modify_binding::<SingleBinding<bool>, _>(id, |binding| {
            binding.set_path("<gamepad>/buttonA")
        });
        assert!(matches!(result, Some(Ok(()))));
        assert!(action.binding(id).unwrap().is_active());

        button.set(true);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Started);

        // Wrong concrete type
        assert!(action
            .modify_binding::<SingleBinding<f32, bool>, _>(id, |_| ())
            .is_none());
    }

    #[test]
    fn test_binding_trigger_overrides_action_trigger() {
        let mut action = Action::new("charge", false);
        action.add_binding(
            SingleBinding::<bool>::new("<gamepad>/buttonA")
                .unwrap()
                .with_trigger(trigger::hold(0.1)),
        );
        let registry = attached(&mut action);
        let (pad, button) = gamepad(&["gamepad"]);
        connect(&registry, &mut action, pad, 0);

        // The hold timer only fires on the frame after it has run out
        button.set(true);
        action.update_value(0.05);
        assert_eq!(action.state(), ActionState::Waiting);
        action.update_value(0.1);
        assert_eq!(action.state(), ActionState::Waiting);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Started);
    }

    #[test]
    fn test_remove_binding_and_lookup() {
        let mut action = Action::new("jump", false);
        action.add_binding(
            SingleBinding::<bool>::new("<gamepad>/buttonA")
                .unwrap()
                .named("primary"),
        );
        let registry = attached(&mut action);
        let (pad, _button) = gamepad(&["gamepad"]);
        connect(&registry, &mut action, pad, 0);

        let id = action.binding_by_name("primary").unwrap();
        assert_eq!(action.active_binding(), Some(id));
        assert!(action.binding_as::<SingleBinding<bool>>(id).is_some());

        assert!(action.remove_binding(|b| b.name() == Some("primary")));
        assert_eq!(action.active_binding(), None);
        assert_eq!(action.binding_count(), 0);
        assert!(!action.remove_binding(|_| true));
    }

    #[test]
    fn test_modifiers_and_custom_trigger() {
        let mut action = Action::new("throttle", 0.0f32);
        action.add_binding(SingleBinding::<f32>::new("<gamepad>/rightTrigger").unwrap());
        action.add_modifier(|v: f32| v * 2.0);
        action.set_trigger(converter::greater(1.0f32));
        let registry = attached(&mut action);
        let pad = VirtualController::new(&["gamepad"]);
        let axis = pad.add_axis("rightTrigger");
        connect(&registry, &mut action, pad, 0);

        axis.set(0.4);
        action.update_value(DT);
        assert_relative_eq!(*action.value(), 0.8);
        assert_eq!(action.state(), ActionState::Waiting);

        axis.set(0.6);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Started);

        assert!(action.replace_modifier(0, |v: f32| v));
        assert_eq!(action.modifier_count(), 1);
        assert!(action.remove_modifier(0));
        assert!(!action.remove_modifier(0));

        action.reset_trigger();
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Performing);
    }

    #[test]
    fn test_removing_current_binding_hands_over() {
        let mut action = Action::new("jump", false);
        action.add_binding(
            SingleBinding::<bool>::new("<gamepad>/buttonA")
                .unwrap()
                .named("first"),
        );
        let second = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonB").unwrap());
        let registry = attached(&mut action);
        let (pad, a) = gamepad(&["gamepad"]);
        let b = pad.add_button("buttonB");
        connect(&registry, &mut action, pad, 0);

        a.set(true);
        action.update_value(DT);
        let first = action.binding_by_name("first").unwrap();
        assert_eq!(action.active_binding(), Some(first));

        a.set(false);
        assert!(action.remove_binding(|binding| binding.name() == Some("first")));
        assert_eq!(action.active_binding(), None);
        assert_eq!(action.trigger_source, TriggerSource::Action);

        action.update_value(DT);
        assert_ne!(action.active_binding(), Some(first));

        b.set(true);
        action.update_value(DT);
        assert_eq!(action.active_binding(), Some(second));
        assert!(*action.value());
    }

    #[test]
    fn test_activator_change_repartitions_active_list() {
        let mut action = Action::new("aim", glam::Vec3::ZERO);
        let stick = action.add_binding(SingleBinding::<glam::Vec3>::new("<xr>/aim").unwrap());
        let tracked = action.add_binding(SingleBinding::<glam::Vec3>::new("<xr>/position").unwrap());
        let registry = attached(&mut action);
        let xr = VirtualController::new(&["xr"]);
        let position = xr.add_vector3("position");
        position.set(glam::Vec3::Y);
        xr.insert(
            "aim",
            ControlHandle::Vector3(Rc::new(ValueControl::new("aim", glam::Vec3::ZERO))),
        );
        connect(&registry, &mut action, xr, 0);
        assert_eq!(action.active_bindings, vec![stick, tracked]);
        assert_eq!(action.state_binding_index, 1);

        // An activator turns the tracked binding into an event binding
        action
            .modify_binding::<SingleBinding<glam::Vec3>, _>(tracked, |binding| {
                binding.set_control_activator(activator::toggle())
            })
            .unwrap();
        assert!(!action.binding(tracked).unwrap().is_state());
        assert_eq!(action.state_binding_index, 2);
        action.update_value(DT);
        assert_eq!(*action.value(), glam::Vec3::ZERO);

        action
            .modify_binding::<SingleBinding<glam::Vec3>, _>(tracked, |binding| {
                binding.remove_control_activator()
            })
            .unwrap();
        assert_eq!(action.active_bindings, vec![stick, tracked]);
        assert_eq!(action.state_binding_index, 1);
        action.update_value(DT);
        assert_eq!(action.active_binding(), Some(tracked));
        assert_eq!(*action.value(), glam::Vec3::Y);
    }

    #[test]
    fn test_trigger_change_on_current_binding() {
        let mut action = Action::new("charge", false);
        let id = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (pad, button) = gamepad(&["gamepad"]);
        connect(&registry, &mut action, pad, 0);
        assert_eq!(action.active_binding(), Some(id));
        assert_eq!(action.trigger_source, TriggerSource::Action);

        action.modify_binding::<SingleBinding<bool>, _>(id, |binding| {
            binding.set_trigger(trigger::hold(0.1))
        });
        assert_eq!(action.trigger_source, TriggerSource::Binding(id));

        button.set(true);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Waiting);

        let removed =
            action.modify_binding::<SingleBinding<bool>, _>(id, |binding| binding.remove_trigger());
        assert_eq!(removed, Some(true));
        assert_eq!(action.trigger_source, TriggerSource::Action);
        action.update_value(DT);
        assert_eq!(action.state(), ActionState::Started);
    }

    #[test]
    fn test_take_and_find_binding() {
        let mut action = Action::new("jump", false);
        let primary = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let alt = action.add_binding(
            SingleBinding::<bool>::new("<gamepad>/buttonB")
                .unwrap()
                .named("alt"),
        );
        let registry = attached(&mut action);
        let (pad, _a) = gamepad(&["gamepad"]);
        pad.add_button("buttonB");
        connect(&registry, &mut action, pad, 0);

        assert_eq!(action.find_binding(|b| b.name() == Some("alt")), Some(alt));
        assert_eq!(action.find_binding(|b| b.name() == Some("missing")), None);

        let taken = action.take_binding(|b| b.name() == Some("alt")).unwrap();
        assert!(!taken.is_active());
        assert!(!taken.holds_controls_from(ControllerId::new(0)));
        assert!(taken.as_any().downcast_ref::<SingleBinding<bool>>().is_some());

        assert_eq!(action.binding_count(), 1);
        assert_eq!(action.active_bindings, vec![primary]);
        assert!(action.take_binding(|b| b.name() == Some("alt")).is_none());
    }

    #[test]
    fn test_connect_evicts_lower_priority_holder() {
        let mut action = Action::new("jump", false);
        let generic = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (pad, _button) = gamepad(&["gamepad", "xbox"]);
        let pad = connect(&registry, &mut action, pad, 0);
        assert_eq!(action.active_binding(), Some(generic));

        // A more specific binding that has not claimed anything yet
        let specific = BindingId::new(100);
        action.insert_entry(BindingEntry {
            id: specific,
            binding: Box::new(SingleBinding::<bool>::new("<gamepad/xbox>/buttonA").unwrap()),
        });
        action.on_controller_connected(&pad);

        let generic_binding = action.binding(generic).unwrap();
        assert!(!generic_binding.is_active());
        assert!(!generic_binding.holds_controls_from(ControllerId::new(0)));
        assert!(action.binding(specific).unwrap().is_active());
        assert_eq!(action.active_bindings, vec![specific]);
        assert_eq!(action.active_binding(), Some(specific));
    }

    #[test]
    fn test_connect_leaves_other_controllers_bound() {
        let mut action = Action::new("jump", false);
        let generic = action.add_binding(SingleBinding::<bool>::new("<gamepad>/buttonA").unwrap());
        let specific =
            action.add_binding(SingleBinding::<bool>::new("<gamepad/xbox>/buttonA").unwrap());
        let registry = attached(&mut action);
        let (plain, _) = gamepad(&["gamepad", "other"]);
        connect(&registry, &mut action, plain, 0);
        let (xbox, _) = gamepad(&["gamepad", "xbox"]);
        connect(&registry, &mut action, xbox, 1);

        let generic_binding = action.binding(generic).unwrap();
        assert!(generic_binding.holds_controls_from(ControllerId::new(0)));
        assert!(!generic_binding.holds_controls_from(ControllerId::new(1)));
        assert!(action
            .binding(specific)
            .unwrap()
            .holds_controls_from(ControllerId::new(1)));
        assert_eq!(action.active_bindings, vec![generic, specific]);
    }

    #[test]
    fn test_pipeline_and_control_accessors() {
        let mut action = Action::new("throttle", 0.0f32);
        action.add_binding(SingleBinding::<f32>::new("<gamepad>/rightTrigger").unwrap());
        action.add_modifier(modifier::scale(2.0f32));
        assert!(action.modifier(0).is_some());
        assert!(action.modifier(1).is_none());
        assert_relative_eq!(action.modifier_mut(0).unwrap().modify(0.5), 1.0);
        assert!(!action.trigger_mut().execute(&0.0, DT));
        assert!(action.trigger_mut().execute(&0.3, DT));

        assert!(action.active_control::<f32>().is_none());
        let registry = attached(&mut action);
        let pad = VirtualController::new(&["gamepad"]);
        pad.add_axis("rightTrigger");
        connect(&registry, &mut action, pad, 5);

        let control = action.active_control::<f32>().unwrap();
        assert_eq!(control.path(), "rightTrigger");
        assert_eq!(control.controller(), ControllerId::new(5));
        assert!(action.active_control::<bool>().is_none());
    }
}
