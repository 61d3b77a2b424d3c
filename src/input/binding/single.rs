// Single binding - one path, any number of candidate controls

use super::{select_active_control, Binding, BindingCore, PendingChanges};
use crate::input::activator::{ControlActivator, ConverterActivator};
use crate::input::control::{BoundControl, ControlValue};
use crate::input::controller::{ConnectedController, ControllerId};
use crate::input::converter::Converter;
use crate::input::modifier::{Modifier, ModifierChain};
use crate::input::path::InputPath;
use crate::input::trigger::Trigger;
use crate::input::InputError;
use std::any::Any;

/// Binds an action to the control(s) a single path resolves to.
///
/// `C` is the control's value type, `T` the action's; without a converter
/// they are the same.
pub struct SingleBinding<C: ControlValue, T = C> {
    core: BindingCore<T>,
    path: InputPath,
    controls: Vec<BoundControl<C>>,
    activator: Option<Box<dyn ControlActivator<C>>>,
    converter: Box<dyn Converter<C, T>>,
}

impl<C: ControlValue> SingleBinding<C, C> {
    /// Bind directly to a control's value
    pub fn new(path: &str) -> Result<Self, InputError> {
        Self::with_converter(path, |value: &C| *value)
    }
}

impl<C: ControlValue, T: 'static> SingleBinding<C, T> {
    /// Bind through a converter from the control's value type
    pub fn with_converter(
        path: &str,
        converter: impl Converter<C, T> + 'static,
    ) -> Result<Self, InputError> {
        let path = InputPath::parse(path)?;
        Ok(Self {
            core: BindingCore::new(path.priority()),
            path,
            controls: Vec::new(),
            activator: None,
            converter: Box::new(converter),
        })
    }

    /// Name used by `Action::binding_by_name`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.core.name = Some(name.into());
        self
    }

    /// Builder form of [`set_control_activator`](Self::set_control_activator)
    pub fn with_activator(mut self, activator: impl ControlActivator<C> + 'static) -> Self {
        self.set_control_activator(activator);
        self
    }

    /// Builder form of [`add_modifier`](Self::add_modifier)
    pub fn with_modifier(mut self, modifier: impl Modifier<T> + 'static) -> Self {
        self.core.add_modifier(modifier);
        self
    }

    /// Builder form of [`set_trigger`](Self::set_trigger)
    pub fn with_trigger(mut self, trigger: impl Trigger<T> + 'static) -> Self {
        self.core.set_trigger(trigger);
        self
    }

    pub fn path(&self) -> &InputPath {
        &self.path
    }

    /// Point the binding at a new path.
    ///
    /// Bound controls are dropped; the owning action re-runs arbitration
    /// against every connected controller straight away.
    pub fn set_path(&mut self, path: &str) -> Result<(), InputError> {
        self.set_input_path(InputPath::parse(path)?);
        Ok(())
    }

    /// Two-part form of [`set_path`](Self::set_path)
    pub fn set_path_parts(&mut self, controller: &str, control: &str) -> Result<(), InputError> {
        self.set_input_path(InputPath::from_parts(controller, control)?);
        Ok(())
    }

    fn set_input_path(&mut self, path: InputPath) {
        self.core.max_priority = path.priority();
        self.path = path;
        self.controls.clear();
        self.core.active = false;
        self.core.is_state = false;
        self.core.changes.rebind = true;
    }

    /// Use an activator to pick among candidate controls. A binding with an
    /// activator is never a state binding.
    pub fn set_control_activator(&mut self, activator: impl ControlActivator<C> + 'static) {
        self.activator = Some(Box::new(activator));
        self.core.set_state(false);
    }

    /// Drop the activator; the binding may become a state binding again
    pub fn remove_control_activator(&mut self) -> bool {
        if self.activator.take().is_none() {
            return false;
        }
        self.refresh_state();
        true
    }

    /// Replace the control-to-action value converter
    pub fn set_converter(&mut self, converter: impl Converter<C, T> + 'static) {
        self.converter = Box::new(converter);
    }

    /// Append a modifier applied after the converter
    pub fn add_modifier(&mut self, modifier: impl Modifier<T> + 'static) {
        self.core.add_modifier(modifier);
    }

    pub fn modifiers_mut(&mut self) -> &mut ModifierChain<T> {
        &mut self.core.modifiers
    }

    /// Private trigger, used instead of the action's while this binding is current
    pub fn set_trigger(&mut self, trigger: impl Trigger<T> + 'static) {
        self.core.set_trigger(trigger);
    }

    /// Fall back to the action's trigger
    pub fn remove_trigger(&mut self) -> bool {
        self.core.remove_trigger()
    }

    /// The control currently supplying the value
    pub fn active_control(&self) -> Option<&BoundControl<C>> {
        if self.core.active {
            self.controls.first()
        } else {
            None
        }
    }

    /// Every control bound from connected controllers, front first
    pub fn bound_controls(&self) -> &[BoundControl<C>] {
        &self.controls
    }

    fn refresh_state(&mut self) {
        let is_state =
            self.activator.is_none() && self.controls.first().is_some_and(BoundControl::is_state);
        self.core.set_state(is_state);
    }
}

impl<C: ControlValue> SingleBinding<C, bool> {
    /// Use a `C -> bool` converter as both the activator and the value.
    ///
    /// The binding activates on the first control the converter accepts and
    /// reads the converter's verdict as its value.
    pub fn set_converter_as_control_activator(
        &mut self,
        converter: impl Converter<C, bool> + 'static,
    ) {
        let activator = ConverterActivator::new(converter);
        self.converter = Box::new(activator.result());
        self.set_control_activator(activator);
    }
}

impl<C: ControlValue, T: 'static> Binding<T> for SingleBinding<C, T> {
    fn name(&self) -> Option<&str> {
        self.core.name.as_deref()
    }

    fn is_active(&self) -> bool {
        self.core.active
    }

    fn is_state(&self) -> bool {
        self.core.is_state
    }

    fn max_priority(&self) -> i32 {
        self.core.max_priority
    }

    fn controller_priority(&self, controller: &ConnectedController) -> i32 {
        if controller.check_path(&self.path) {
            self.core.max_priority
        } else {
            -1
        }
    }

    fn bind_controls(&mut self, controller: &ConnectedController) {
        if let Some(control) = controller.resolve::<C>(&self.path) {
            log::debug!("Bound {} from controller {}", self.path, controller.id());
            self.controls.push(control);
            self.refresh_state();
        }
    }

    fn unbind_controls(&mut self, controller: ControllerId) -> bool {
        self.controls.retain(|c| c.controller() != controller);
        self.refresh_state();
        if self.controls.is_empty() && self.core.active {
            self.core.active = false;
            return true;
        }
        false
    }

    fn holds_controls_from(&self, controller: ControllerId) -> bool {
        self.controls.iter().any(|c| c.controller() == controller)
    }

    fn try_activate(&mut self) -> bool {
        if self.core.active || self.controls.is_empty() {
            return false;
        }
        self.core.active = true;
        true
    }

    fn reset(&mut self) {
        self.core.active = false;
        self.core.is_state = false;
        self.controls.clear();
    }

    fn check_controls_activation(&mut self) -> bool {
        select_active_control(&mut self.controls, self.activator.as_deref_mut())
    }

    fn read_value(&mut self) -> Option<T> {
        let raw = self.controls.first()?.read_value();
        let value = self.converter.convert(&raw);
        Some(self.core.modifiers.apply(value))
    }

    fn has_trigger(&self) -> bool {
        self.core.trigger.is_some()
    }

    fn trigger_mut(&mut self) -> Option<&mut dyn Trigger<T>> {
        self.core.trigger_mut()
    }

    fn active_controller(&self) -> Option<ControllerId> {
        self.active_control().map(BoundControl::controller)
    }

    fn front_control(&self) -> Option<&dyn Any> {
        self.active_control().map(|control| control as &dyn Any)
    }

    fn take_changes(&mut self) -> PendingChanges {
        self.core.take_changes()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
