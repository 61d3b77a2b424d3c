// Action groups - named tree nodes that propagate enable and pause state
//
// A group is active when it is enabled, not paused and its parent is
// active. Children cache their parent's state and are told whenever it
// changes; per-frame calls walk actions first, then nested groups.

use super::action::{Action, ActionNode, ActionValue, ParentState};
use super::controller::{ConnectedController, ControllerId, ControllerRegistry};

pub struct ActionGroup {
    name: String,
    actions: Vec<Box<dyn ActionNode>>,
    groups: Vec<ActionGroup>,
    enabled: bool,
    updated: bool,
    enabled_in_hierarchy: bool,
    active: bool,
    parent: ParentState,
    registry: Option<ControllerRegistry>,
}

impl ActionGroup {
    /// Create an empty, enabled group. It stays inert until attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            groups: Vec::new(),
            enabled: true,
            updated: true,
            enabled_in_hierarchy: false,
            active: false,
            parent: ParentState::DETACHED,
            registry: None,
        }
    }

    /// The group's name, unique among its siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group's own enabled flag
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Paused groups keep their bindings but stop updating
    pub fn is_paused(&self) -> bool {
        !self.updated
    }

    /// Enabled, and so is every ancestor up to the manager
    pub fn is_enabled_in_hierarchy(&self) -> bool {
        self.enabled_in_hierarchy
    }

    /// Whether the group's actions are updated this frame
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn child_state(&self) -> ParentState {
        ParentState {
            enabled_in_hierarchy: self.enabled_in_hierarchy,
            active: self.active,
        }
    }

    // --- Actions ---

    /// Add an action. An action with the same name is detached and replaced
    /// in place.
    pub fn add_action<T: ActionValue>(&mut self, action: Action<T>) {
        let mut node: Box<dyn ActionNode> = Box::new(action);
        if let Some(registry) = &self.registry {
            node.attach(registry, self.child_state());
        }
        match self.actions.iter().position(|a| a.name() == node.name()) {
            Some(index) => {
                log::warn!("Replacing action '{}' in group '{}'", node.name(), self.name);
                self.actions[index].detach();
                self.actions[index] = node;
            }
            None => self.actions.push(node),
        }
    }

    /// Check for an action by name, whatever its value type
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name() == name)
    }

    /// Typed lookup; `None` if missing or of another value type
    pub fn action<T: ActionValue>(&self, name: &str) -> Option<&Action<T>> {
        self.actions
            .iter()
            .find(|a| a.name() == name)?
            .as_any()
            .downcast_ref::<Action<T>>()
    }

    /// Typed mutable lookup
    pub fn action_mut<T: ActionValue>(&mut self, name: &str) -> Option<&mut Action<T>> {
        self.actions
            .iter_mut()
            .find(|a| a.name() == name)?
            .as_any_mut()
            .downcast_mut::<Action<T>>()
    }

    /// Detach and drop an action
    pub fn remove_action(&mut self, name: &str) -> bool {
        match self.actions.iter().position(|a| a.name() == name) {
            Some(index) => {
                self.actions.remove(index).detach();
                true
            }
            None => false,
        }
    }

    /// Action names in insertion order
    pub fn action_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.actions.iter().map(|a| a.name())
    }

    // --- Nested groups ---

    /// Add a nested group, replacing one with the same name
    pub fn add_action_group(&mut self, mut group: ActionGroup) {
        if let Some(registry) = &self.registry {
            group.attach(registry, self.child_state());
        }
        match self.groups.iter().position(|g| g.name == group.name) {
            Some(index) => {
                log::warn!("Replacing group '{}' in group '{}'", group.name, self.name);
                self.groups[index].detach();
                self.groups[index] = group;
            }
            None => self.groups.push(group),
        }
    }

    /// Child group by name
    pub fn action_group(&self, name: &str) -> Option<&ActionGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Child group by name, mutably
    pub fn action_group_mut(&mut self, name: &str) -> Option<&mut ActionGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    /// Child group by name, created if missing
    pub fn get_or_create_action_group(&mut self, name: &str) -> &mut ActionGroup {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.add_action_group(ActionGroup::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Detach and drop a child group
    pub fn remove_action_group(&mut self, name: &str) -> bool {
        match self.groups.iter().position(|g| g.name == name) {
            Some(index) => {
                self.groups.remove(index).detach();
                true
            }
            None => false,
        }
    }

    /// Child group names in insertion order
    pub fn group_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.iter().map(|g| g.name.as_str())
    }

    // --- Lifecycle ---

    /// Enable the group; children follow if the parent is enabled
    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;

        if !self.parent.enabled_in_hierarchy {
            return;
        }
        self.enabled_in_hierarchy = true;
        self.active = self.updated && self.parent.active;
        let state = self.child_state();
        for action in &mut self.actions {
            action.on_parent_enable(state);
        }
        for group in &mut self.groups {
            group.on_parent_enable(state);
        }
    }

    /// Disable the group and everything below it, paused or not
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.enabled_in_hierarchy = false;
        self.active = false;
        self.propagate_disable();
    }

    /// Pause the group
    pub fn pause(&mut self) {
        if !self.updated {
            return;
        }
        self.updated = false;
        if self.active {
            self.active = false;
            self.propagate_inactive();
        }
    }

    /// Resume the group
    pub fn resume(&mut self) {
        if self.updated {
            return;
        }
        self.updated = true;
        if self.enabled && self.parent.active {
            self.active = true;
            self.propagate_active();
        }
    }

    fn propagate_disable(&mut self) {
        for action in &mut self.actions {
            action.on_parent_disable();
        }
        for group in &mut self.groups {
            group.on_parent_disable();
        }
    }

    fn propagate_active(&mut self) {
        for action in &mut self.actions {
            action.on_parent_active();
        }
        for group in &mut self.groups {
            group.on_parent_active();
        }
    }

    fn propagate_inactive(&mut self) {
        for action in &mut self.actions {
            action.on_parent_inactive();
        }
        for group in &mut self.groups {
            group.on_parent_inactive();
        }
    }

    // --- Tree plumbing, driven by the parent or the manager ---

    pub(crate) fn attach(&mut self, registry: &ControllerRegistry, parent: ParentState) {
        self.registry = Some(registry.clone());
        self.parent = parent;
        self.enabled_in_hierarchy = self.enabled && parent.enabled_in_hierarchy;
        self.active = self.enabled_in_hierarchy && self.updated && parent.active;

        let state = self.child_state();
        for action in &mut self.actions {
            action.attach(registry, state);
        }
        for group in &mut self.groups {
            group.attach(registry, state);
        }
    }

    pub(crate) fn detach(&mut self) {
        self.registry = None;
        self.parent = ParentState::DETACHED;
        self.enabled_in_hierarchy = false;
        self.active = false;
        for action in &mut self.actions {
            action.detach();
        }
        for group in &mut self.groups {
            group.detach();
        }
    }

    fn on_parent_enable(&mut self, parent: ParentState) {
        self.parent = parent;
        if !self.enabled {
            return;
        }
        self.enabled_in_hierarchy = true;
        self.active = self.updated && parent.active;
        let state = self.child_state();
        for action in &mut self.actions {
            action.on_parent_enable(state);
        }
        for group in &mut self.groups {
            group.on_parent_enable(state);
        }
    }

    fn on_parent_disable(&mut self) {
        self.parent = ParentState::DETACHED;
        if self.enabled {
            self.enabled_in_hierarchy = false;
            self.active = false;
            self.propagate_disable();
        }
    }

    fn on_parent_active(&mut self) {
        self.parent.active = true;
        if self.enabled && self.updated {
            self.active = true;
            self.propagate_active();
        }
    }

    fn on_parent_inactive(&mut self) {
        self.parent.active = false;
        if self.enabled && self.updated {
            self.active = false;
            self.propagate_inactive();
        }
    }

    /// Value and state pass
    pub(crate) fn update(&mut self, delta_time: f32) {
        if !self.active {
            return;
        }
        for action in &mut self.actions {
            action.update(delta_time);
        }
        for group in &mut self.groups {
            group.update(delta_time);
        }
    }

    /// Event pass
    pub(crate) fn handle_events(&mut self, delta_time: f32) {
        if !self.active {
            return;
        }
        for action in &mut self.actions {
            action.handle_events(delta_time);
        }
        for group in &mut self.groups {
            group.handle_events(delta_time);
        }
    }

    pub(crate) fn on_controller_connected(&mut self, controller: &ConnectedController) {
        if !self.enabled {
            return;
        }
        for action in &mut self.actions {
            action.on_controller_connected(controller);
        }
        for group in &mut self.groups {
            group.on_controller_connected(controller);
        }
    }

    pub(crate) fn on_controller_disconnected(&mut self, controller: ControllerId) {
        if !self.enabled {
            return;
        }
        for action in &mut self.actions {
            action.on_controller_disconnected(controller);
        }
        for group in &mut self.groups {
            group.on_controller_disconnected(controller);
        }
    }
}

impl std::fmt::Debug for ActionGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionGroup")
            .field("name", &self.name)
            .field("actions", &self.actions.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("groups", &self.groups)
            .field("enabled", &self.enabled)
            .field("paused", &!self.updated)
            .field("active", &self.active)
            .finish()
    }
}
