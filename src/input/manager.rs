// Input manager - owns connected controllers and the root action groups
//
// Per frame: pre-update hooks, controller update and activation-based
// reordering, the value pass over every group, the event pass, post-update
// hooks. Connects and disconnects are routed into the group tree as soon as
// they happen.

use super::action::ParentState;
use super::config::InputSettings;
use super::controller::{ConnectedController, Controller, ControllerId, ControllerRegistry};
use super::group::ActionGroup;
use std::rc::Rc;

type UpdateHook = Box<dyn FnMut(f32)>;
type ControllerHook = Box<dyn FnMut(&ConnectedController)>;
type CurrentControllerHook = Box<dyn FnMut(Option<ControllerId>)>;

#[derive(Default)]
struct Hooks {
    pre_update: Vec<UpdateHook>,
    post_update: Vec<UpdateHook>,
    controller_connected: Vec<ControllerHook>,
    controller_disconnected: Vec<ControllerHook>,
    current_controller_changed: Vec<CurrentControllerHook>,
}

/// Entry point for hosts: feed it controllers and call [`update`](Self::update)
/// once per frame
pub struct InputManager {
    settings: InputSettings,
    registry: ControllerRegistry,
    /// Disconnected or preloaded controllers, kept for reconnection
    disconnected: Vec<Rc<dyn Controller>>,
    next_id: u32,
    current_controller: Option<ControllerId>,
    groups: Vec<ActionGroup>,
    delta_time: f32,
    hooks: Hooks,
}

impl InputManager {
    /// Create a manager with default settings
    pub fn new() -> Self {
        Self::with_settings(InputSettings::default())
    }

    /// Create a manager with custom settings
    pub fn with_settings(settings: InputSettings) -> Self {
        Self {
            settings,
            registry: ControllerRegistry::new(),
            disconnected: Vec::new(),
            next_id: 0,
            current_controller: None,
            groups: Vec::new(),
            delta_time: 0.0,
            hooks: Hooks::default(),
        }
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    /// Delta time of the last update, after clamping
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    // --- Frame ---

    pub fn update(&mut self, delta_time: f32) {
        let delta_time = self.settings.clamp_delta(delta_time);
        self.delta_time = delta_time;

        for hook in &mut self.hooks.pre_update {
            hook(delta_time);
        }

        for connected in self.registry.snapshot() {
            connected.controller().update(delta_time);
        }
        if self.settings.reorder_controllers {
            self.reorder_controllers();
        }

        let front = self.registry.first();
        if front != self.current_controller {
            self.current_controller = front;
            self.raise_current_changed(front);
        }

        for group in &mut self.groups {
            group.update(delta_time);
        }
        for group in &mut self.groups {
            group.handle_events(delta_time);
        }

        for hook in &mut self.hooks.post_update {
            hook(delta_time);
        }
    }

    /// Stable move-to-front of every actuated controller
    fn reorder_controllers(&self) {
        self.registry.with_list(|list| {
            let mut next_active = 0;
            for index in 0..list.len() {
                if list[index].controller().is_activated() {
                    if index > next_active {
                        log::trace!("Controller {} moved to front", list[index].id());
                        list[next_active..=index].rotate_right(1);
                    }
                    next_active += 1;
                }
            }
        });
    }

    // --- Controllers ---

    /// Connect a controller and bind it into every enabled action
    pub fn add_controller(&mut self, controller: Rc<dyn Controller>) -> ControllerId {
        let id = ControllerId::new(self.next_id);
        self.next_id += 1;

        let connected = ConnectedController::new(id, controller);
        connected.controller().on_connect(id);
        self.registry.with_list(|list| list.push(connected.clone()));
        log::info!(
            "Controller {} connected ({})",
            id,
            connected.controller().path().join("/")
        );

        for group in &mut self.groups {
            group.on_controller_connected(&connected);
        }
        for hook in &mut self.hooks.controller_connected {
            hook(&connected);
        }
        id
    }

    /// Disconnect a controller. It moves to the preloaded pool so it can be
    /// reconnected later.
    pub fn remove_controller(&mut self, id: ControllerId) -> bool {
        let removed = self.registry.with_list(|list| {
            let index = list.iter().position(|c| c.id() == id)?;
            Some((index, list.remove(index)))
        });
        let Some((index, connected)) = removed else {
            return false;
        };
        self.finish_disconnect(connected);
        if index == 0 {
            self.current_controller = None;
            self.raise_current_changed(None);
        }
        true
    }

    /// Disconnect every controller matching `predicate`
    pub fn remove_controllers(
        &mut self,
        mut predicate: impl FnMut(&ConnectedController) -> bool,
    ) -> bool {
        let removed = self.registry.with_list(|list| {
            let mut removed = Vec::new();
            let mut index = 0;
            while index < list.len() {
                if predicate(&list[index]) {
                    removed.push(list.remove(index));
                } else {
                    index += 1;
                }
            }
            removed
        });
        if removed.is_empty() {
            return false;
        }
        for connected in removed {
            self.finish_disconnect(connected);
        }
        let front = self.registry.first();
        if front != self.current_controller {
            self.current_controller = None;
            self.raise_current_changed(None);
        }
        true
    }

    fn finish_disconnect(&mut self, connected: ConnectedController) {
        log::info!("Controller {} disconnected", connected.id());
        connected.controller().on_disconnect();
        for group in &mut self.groups {
            group.on_controller_disconnected(connected.id());
        }
        for hook in &mut self.hooks.controller_disconnected {
            hook(&connected);
        }
        self.disconnected.push(connected.handle().clone());
    }

    /// Keep a controller ready without connecting it
    pub fn preload_controller(&mut self, controller: Rc<dyn Controller>) {
        self.disconnected.push(controller);
    }

    /// Connect the first preloaded controller matching `predicate`
    pub fn connect_preloaded(
        &mut self,
        mut predicate: impl FnMut(&dyn Controller) -> bool,
    ) -> Option<ControllerId> {
        let index = self
            .disconnected
            .iter()
            .position(|controller| predicate(controller.as_ref()))?;
        let controller = self.disconnected.swap_remove(index);
        Some(self.add_controller(controller))
    }

    /// Drop preloaded controllers matching `predicate`
    pub fn unload_controllers(&mut self, mut predicate: impl FnMut(&dyn Controller) -> bool) -> bool {
        let before = self.disconnected.len();
        self.disconnected
            .retain(|controller| !predicate(controller.as_ref()));
        self.disconnected.len() != before
    }

    /// Controllers waiting in the preload pool
    pub fn preloaded_count(&self) -> usize {
        self.disconnected.len()
    }

    /// Connected controllers, most recently actuated first
    pub fn controllers(&self) -> Vec<ConnectedController> {
        self.registry.snapshot()
    }

    /// Look up a connected controller by id
    pub fn controller(&self, id: ControllerId) -> Option<ConnectedController> {
        self.registry.get(id)
    }

    /// Number of connected controllers
    pub fn controller_count(&self) -> usize {
        self.registry.len()
    }

    /// Front of the connected list
    pub fn current_controller(&self) -> Option<ControllerId> {
        self.registry.first()
    }

    /// Move a controller to the front of the connected list
    pub fn set_current_controller(&mut self, id: ControllerId) -> bool {
        let moved = self.registry.with_list(|list| {
            let index = list.iter().position(|c| c.id() == id)?;
            list[..=index].rotate_right(1);
            Some(())
        });
        if moved.is_none() {
            return false;
        }
        if self.current_controller != Some(id) {
            self.current_controller = Some(id);
            self.raise_current_changed(Some(id));
        }
        true
    }

    fn raise_current_changed(&mut self, current: Option<ControllerId>) {
        log::debug!("Current controller changed to {:?}", current);
        for hook in &mut self.hooks.current_controller_changed {
            hook(current);
        }
    }

    // --- Groups ---

    /// Attach a root group, replacing one with the same name
    pub fn add_action_group(&mut self, mut group: ActionGroup) {
        group.attach(&self.registry, ParentState::ROOT);
        match self.groups.iter().position(|g| g.name() == group.name()) {
            Some(index) => {
                log::warn!("Replacing action group '{}'", group.name());
                self.groups[index].detach();
                self.groups[index] = group;
            }
            None => self.groups.push(group),
        }
    }

    /// Root group by name
    pub fn action_group(&self, name: &str) -> Option<&ActionGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// Root group by name, mutably
    pub fn action_group_mut(&mut self, name: &str) -> Option<&mut ActionGroup> {
        self.groups.iter_mut().find(|g| g.name() == name)
    }

    /// Root group by name, created and attached if missing
    pub fn get_or_create_action_group(&mut self, name: &str) -> &mut ActionGroup {
        let index = match self.groups.iter().position(|g| g.name() == name) {
            Some(index) => index,
            None => {
                self.add_action_group(ActionGroup::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Detach and drop a root group
    pub fn remove_action_group(&mut self, name: &str) -> bool {
        match self.groups.iter().position(|g| g.name() == name) {
            Some(index) => {
                self.groups.remove(index).detach();
                true
            }
            None => false,
        }
    }

    // --- Hooks ---

    /// Run before controllers are updated each frame
    pub fn on_pre_update(&mut self, hook: impl FnMut(f32) + 'static) {
        self.hooks.pre_update.push(Box::new(hook));
    }

    /// Run after action events have been raised each frame
    pub fn on_post_update(&mut self, hook: impl FnMut(f32) + 'static) {
        self.hooks.post_update.push(Box::new(hook));
    }

    /// Run after a controller is connected
    pub fn on_controller_connected(&mut self, hook: impl FnMut(&ConnectedController) + 'static) {
        self.hooks.controller_connected.push(Box::new(hook));
    }

    /// Run after a controller is disconnected
    pub fn on_controller_disconnected(
        &mut self,
        hook: impl FnMut(&ConnectedController) + 'static,
    ) {
        self.hooks.controller_disconnected.push(Box::new(hook));
    }

    /// Run when the front of the controller list changes
    pub fn on_current_controller_changed(
        &mut self,
        hook: impl FnMut(Option<ControllerId>) + 'static,
    ) {
        self.hooks.current_controller_changed.push(Box::new(hook));
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
