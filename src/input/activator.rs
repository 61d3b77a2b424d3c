// Control activators - pick the active candidate among the controls bound to a slot
//
// When several controls satisfy one path (two gamepads, left and right
// shift), a binding asks its activator which one counts. The first control
// that passes is moved to the front of the slot and supplies the value.

use super::control::{BoundControl, ControlValue};
use super::controller::ControllerId;
use super::converter::{self, CompareOp, Converter, Position};
use std::cell::Cell;
use std::rc::Rc;

/// Decides whether one bound control counts as active.
/// Closures `FnMut(&BoundControl<C>) -> bool` are activators too.
pub trait ControlActivator<C> {
    fn check(&mut self, control: &BoundControl<C>) -> bool;
}

impl<C, F> ControlActivator<C> for F
where
    F: FnMut(&BoundControl<C>) -> bool,
{
    fn check(&mut self, control: &BoundControl<C>) -> bool {
        self(control)
    }
}

/// The front control of every slot of a composite binding
pub struct ActiveControls<'a, C> {
    slots: &'a [Vec<BoundControl<C>>],
}

impl<'a, C> ActiveControls<'a, C> {
    pub(crate) fn new(slots: &'a [Vec<BoundControl<C>>]) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Front control of slot `index`
    pub fn get(&self, index: usize) -> Option<&'a BoundControl<C>> {
        self.slots.get(index).and_then(|slot| slot.first())
    }

    /// Front controls in slot order; empty slots are skipped
    pub fn iter(&self) -> impl Iterator<Item = &'a BoundControl<C>> + 'a {
        self.slots.iter().filter_map(|slot| slot.first())
    }

    /// Read one value per slot into `out`
    pub fn read_values(&self, out: &mut Vec<C>) {
        out.clear();
        out.extend(self.iter().map(BoundControl::read_value));
    }
}

/// Decides whether a composite binding counts as active as a whole.
/// Closures `FnMut(&ActiveControls<C>) -> bool` are composite activators too.
pub trait CompositeControlActivator<C> {
    fn check(&mut self, controls: &ActiveControls<'_, C>) -> bool;
}

impl<C, F> CompositeControlActivator<C> for F
where
    F: FnMut(&ActiveControls<'_, C>) -> bool,
{
    fn check(&mut self, controls: &ActiveControls<'_, C>) -> bool {
        self(controls)
    }
}

/// Active while the control is *not* actuated
#[derive(Debug, Clone, Copy, Default)]
pub struct NotActivated;

impl<C> ControlActivator<C> for NotActivated {
    fn check(&mut self, control: &BoundControl<C>) -> bool {
        !control.is_activated()
    }
}

/// Only controls from one controller may activate the slot
#[derive(Debug, Clone, Copy)]
pub struct FromController(pub ControllerId);

impl<C> ControlActivator<C> for FromController {
    fn check(&mut self, control: &BoundControl<C>) -> bool {
        control.is_activated() && control.controller() == self.0
    }
}

/// Every slot's front control is actuated
#[derive(Debug, Clone, Copy, Default)]
pub struct AllActivated;

impl<C> CompositeControlActivator<C> for AllActivated {
    fn check(&mut self, controls: &ActiveControls<'_, C>) -> bool {
        controls.iter().all(BoundControl::is_activated)
    }
}

/// Result of the last activation check, readable as a converter.
///
/// Lets a binding use its activator's verdict as its value.
#[derive(Debug, Clone, Default)]
pub struct ActivationResult(Rc<Cell<bool>>);

impl ActivationResult {
    pub fn get(&self) -> bool {
        self.0.get()
    }
}

impl<I: ?Sized> Converter<I, bool> for ActivationResult {
    fn convert(&mut self, _input: &I) -> bool {
        self.0.get()
    }
}

/// A `C -> bool` converter used as an activator
pub struct ConverterActivator<C> {
    converter: Box<dyn Converter<C, bool>>,
    result: ActivationResult,
}

impl<C> ConverterActivator<C> {
    pub fn new(converter: impl Converter<C, bool> + 'static) -> Self {
        Self {
            converter: Box::new(converter),
            result: ActivationResult::default(),
        }
    }

    /// Handle onto the verdict of the most recent check
    pub fn result(&self) -> ActivationResult {
        self.result.clone()
    }
}

impl<C> ControlActivator<C> for ConverterActivator<C> {
    fn check(&mut self, control: &BoundControl<C>) -> bool {
        let active = self.converter.convert(&control.read_value());
        self.result.0.set(active);
        active
    }
}

/// A `[C] -> bool` converter used as a composite activator
pub struct CompositeConverterActivator<C> {
    converter: Box<dyn Converter<[C], bool>>,
    values: Vec<C>,
    result: ActivationResult,
}

impl<C> CompositeConverterActivator<C> {
    pub fn new(converter: impl Converter<[C], bool> + 'static) -> Self {
        Self {
            converter: Box::new(converter),
            values: Vec::new(),
            result: ActivationResult::default(),
        }
    }

    pub fn result(&self) -> ActivationResult {
        self.result.clone()
    }
}

impl<C> CompositeControlActivator<C> for CompositeConverterActivator<C> {
    fn check(&mut self, controls: &ActiveControls<'_, C>) -> bool {
        controls.read_values(&mut self.values);
        let active = self.converter.convert(&self.values);
        self.result.0.set(active);
        active
    }
}

/// Accept released controls
pub fn toggle() -> NotActivated {
    NotActivated
}

/// Accept only controls from one controller
pub fn from_controller(id: ControllerId) -> FromController {
    FromController(id)
}

/// Require every slot to be activated
pub fn concurrent() -> AllActivated {
    AllActivated
}

/// Activate when the control's value compares true against `value`
pub fn compared<C: ControlValue + PartialOrd>(op: CompareOp, value: C) -> ConverterActivator<C> {
    ConverterActivator::new(converter::Compare { op, value })
}

/// Accept controls the converter maps to `true`
pub fn converted<C>(converter: impl Converter<C, bool> + 'static) -> ConverterActivator<C> {
    ConverterActivator::new(converter)
}

/// Activate when two slots are at least `distance` apart
pub fn greater_or_equal_distance<P: Position + 'static>(
    distance: f32,
    first: usize,
    second: usize,
) -> CompositeConverterActivator<P> {
    CompositeConverterActivator::new(converter::greater_or_equal_distance(distance, first, second))
}

/// Activate when two slots are at most `distance` apart
pub fn less_or_equal_distance<P: Position + 'static>(
    distance: f32,
    first: usize,
    second: usize,
) -> CompositeConverterActivator<P> {
    CompositeConverterActivator::new(converter::less_or_equal_distance(distance, first, second))
}
