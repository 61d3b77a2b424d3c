// Composite binding - a fixed tuple of paths read together

use super::{select_active_control, Binding, BindingCore, PendingChanges};
use crate::input::activator::{
    ActiveControls, CompositeControlActivator, CompositeConverterActivator, ControlActivator,
};
use crate::input::control::{BoundControl, ControlValue};
use crate::input::controller::{ConnectedController, ControllerId};
use crate::input::converter::Converter;
use crate::input::modifier::{Modifier, ModifierChain};
use crate::input::path::InputPath;
use crate::input::trigger::Trigger;
use crate::input::InputError;
use std::any::Any;

type SlotActivator<C> = Option<Box<dyn ControlActivator<C>>>;

/// Binds an action to N paths at once. Active only while every slot has at
/// least one bound control; the converter turns the slot values into `T`.
pub struct CompositeBinding<C: ControlValue, T> {
    core: BindingCore<T>,
    paths: Vec<InputPath>,
    slots: Vec<Vec<BoundControl<C>>>,
    activators: Vec<SlotActivator<C>>,
    composite_activator: Option<Box<dyn CompositeControlActivator<C>>>,
    converter: Box<dyn Converter<[C], T>>,
    values: Vec<C>,
}

impl<C: ControlValue, T: 'static> CompositeBinding<C, T> {
    pub fn new(
        paths: &[&str],
        converter: impl Converter<[C], T> + 'static,
    ) -> Result<Self, InputError> {
        if paths.is_empty() {
            return Err(InputError::SlotOutOfRange { index: 0, slots: 0 });
        }
        let paths = paths
            .iter()
            .map(|path| InputPath::parse(path))
            .collect::<Result<Vec<_>, _>>()?;
        let slot_count = paths.len();
        let mut binding = Self {
            core: BindingCore::new(0),
            paths,
            slots: vec![Vec::new(); slot_count],
            activators: (0..slot_count).map(|_| None).collect(),
            composite_activator: None,
            converter: Box::new(converter),
            values: Vec::with_capacity(slot_count),
        };
        binding.refresh_priority();
        Ok(binding)
    }

    /// Name used by `Action::binding_by_name`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.core.name = Some(name.into());
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

    /// Builder form of [`set_composite_activator`](Self::set_composite_activator)
    pub fn with_composite_activator(
        mut self,
        activator: impl CompositeControlActivator<C> + 'static,
    ) -> Self {
        self.set_composite_activator(activator);
        self
    }

    /// Number of paths, one per slot
    pub fn slot_count(&self) -> usize {
        self.paths.len()
    }

    /// Slot paths in slot order
    pub fn paths(&self) -> &[InputPath] {
        &self.paths
    }

    /// Replace the path of one slot.
    ///
    /// Every slot is unbound; the owning action re-runs arbitration
    /// straight away.
    pub fn set_path(&mut self, index: usize, path: &str) -> Result<(), InputError> {
        let slots = self.paths.len();
        let parsed = InputPath::parse(path)?;
        let slot = self
            .paths
            .get_mut(index)
            .ok_or(InputError::SlotOutOfRange { index, slots })?;
        *slot = parsed;
        self.refresh_priority();
        for controls in &mut self.slots {
            controls.clear();
        }
        self.core.active = false;
        self.core.is_state = false;
        self.core.changes.rebind = true;
        Ok(())
    }

    fn refresh_priority(&mut self) {
        self.core.max_priority = self
            .paths
            .iter()
            .map(InputPath::priority)
            .max()
            .unwrap_or(0);
    }

    pub fn set_control_activator(
        &mut self,
        index: usize,
        activator: impl ControlActivator<C> + 'static,
    ) -> Result<(), InputError> {
        let slots = self.activators.len();
        let slot = self
            .activators
            .get_mut(index)
            .ok_or(InputError::SlotOutOfRange { index, slots })?;
        *slot = Some(Box::new(activator));
        self.core.set_state(false);
        Ok(())
    }

    /// Drop the activator of slot `index`
    pub fn remove_control_activator(&mut self, index: usize) -> bool {
        let removed = self
            .activators
            .get_mut(index)
            .and_then(Option::take)
            .is_some();
        if removed {
            self.refresh_state();
        }
        removed
    }

    pub fn set_composite_activator(
        &mut self,
        activator: impl CompositeControlActivator<C> + 'static,
    ) {
        self.composite_activator = Some(Box::new(activator));
        self.core.set_state(false);
    }

    /// Go back to requiring every slot to be activated
    pub fn remove_composite_activator(&mut self) -> bool {
        if self.composite_activator.take().is_none() {
            return false;
        }
        self.refresh_state();
        true
    }

    /// Replace the slot-values-to-action converter
    pub fn set_converter(&mut self, converter: impl Converter<[C], T> + 'static) {
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

    /// Front control of one slot
    pub fn active_control(&self, index: usize) -> Option<&BoundControl<C>> {
        self.slots.get(index).and_then(|slot| slot.first())
    }

    /// Front control of every slot
    pub fn active_controls(&self) -> ActiveControls<'_, C> {
        ActiveControls::new(&self.slots)
    }

    fn refresh_state(&mut self) {
        let is_state = self.composite_activator.is_none()
            && self
                .slots
                .iter()
                .zip(&self.activators)
                .all(|(slot, activator)| {
                    activator.is_none() && slot.first().is_some_and(BoundControl::is_state)
                });
        self.core.set_state(is_state);
    }
}

impl<C: ControlValue> CompositeBinding<C, bool> {
    /// Use a `[C] -> bool` converter as both the composite activator and
    /// the value
    pub fn set_converter_as_composite_activator(
        &mut self,
        converter: impl Converter<[C], bool> + 'static,
    ) {
        let activator = CompositeConverterActivator::new(converter);
        self.converter = Box::new(activator.result());
        self.set_composite_activator(activator);
    }
}

impl<C: ControlValue, T: 'static> Binding<T> for CompositeBinding<C, T> {
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
        self.paths
            .iter()
            .filter(|path| controller.check_path(path))
            .map(InputPath::priority)
            .max()
            .unwrap_or(-1)
    }

    fn bind_controls(&mut self, controller: &ConnectedController) {
        for (path, slot) in self.paths.iter().zip(self.slots.iter_mut()) {
            if !controller.check_path(path) {
                continue;
            }
            // A missing control leaves just this slot empty
            let Some(control) = controller.resolve::<C>(path) else {
                continue;
            };
            log::debug!("Bound {} from controller {}", path, controller.id());
            slot.push(control);
        }
        self.refresh_state();
    }

    fn unbind_controls(&mut self, controller: ControllerId) -> bool {
        let mut emptied = false;
        for slot in &mut self.slots {
            let before = slot.len();
            slot.retain(|c| c.controller() != controller);
            emptied |= before > 0 && slot.is_empty();
        }
        self.refresh_state();
        if emptied && self.core.active {
            self.core.active = false;
            return true;
        }
        false
    }

    fn holds_controls_from(&self, controller: ControllerId) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|c| c.controller() == controller)
    }

    fn try_activate(&mut self) -> bool {
        if self.core.active || self.slots.iter().any(Vec::is_empty) {
            return false;
        }
        self.core.active = true;
        true
    }

    fn reset(&mut self) {
        self.core.active = false;
        self.core.is_state = false;
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    fn check_controls_activation(&mut self) -> bool {
        let mut any = false;
        for (slot, activator) in self.slots.iter_mut().zip(self.activators.iter_mut()) {
            any |= select_active_control(slot, activator.as_deref_mut());
        }
        match self.composite_activator.as_mut() {
            Some(activator) => activator.check(&ActiveControls::new(&self.slots)),
            None => any,
        }
    }

    fn read_value(&mut self) -> Option<T> {
        if !self.core.active {
            return None;
        }
        ActiveControls::new(&self.slots).read_values(&mut self.values);
        if self.values.len() != self.slots.len() {
            return None;
        }
        let value = self.converter.convert(&self.values);
        Some(self.core.modifiers.apply(value))
    }

    fn has_trigger(&self) -> bool {
        self.core.trigger.is_some()
    }

    fn trigger_mut(&mut self) -> Option<&mut dyn Trigger<T>> {
        self.core.trigger_mut()
    }

    fn active_controller(&self) -> Option<ControllerId> {
        self.active_control(0).map(BoundControl::controller)
    }

    fn front_control(&self) -> Option<&dyn Any> {
        self.active_control(0).map(|control| control as &dyn Any)
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
