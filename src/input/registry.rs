// Pipeline registry - build modifiers, triggers and activators by name
//
// Lets bindings be described in data (`"hold", [0.3]`) instead of code. Each
// entry carries default arguments; callers may pass fewer, never more.

use super::activator::{self, ControlActivator};
use super::control::BoundControl;
use super::converter::{self, CompareOp};
use super::modifier::{self, Modifier};
use super::trigger::{self, Trigger};
use super::InputError;
use std::collections::HashMap;

/// A pipeline object built from the registry
pub struct Registered<P: ?Sized>(Box<P>);

impl<P: ?Sized> Registered<P> {
    pub fn into_inner(self) -> Box<P> {
        self.0
    }
}

impl Modifier<f32> for Registered<dyn Modifier<f32>> {
    fn modify(&mut self, value: f32) -> f32 {
        self.0.modify(value)
    }
}

impl<T: ?Sized> Trigger<T> for Registered<dyn Trigger<T>> {
    fn execute(&mut self, value: &T, delta_time: f32) -> bool {
        self.0.execute(value, delta_time)
    }

    fn reset(&mut self) {
        self.0.reset();
    }
}

impl ControlActivator<f32> for Registered<dyn ControlActivator<f32>> {
    fn check(&mut self, control: &BoundControl<f32>) -> bool {
        self.0.check(control)
    }
}

type Factory<P> = Box<dyn Fn(&[f32]) -> Box<P>>;

struct Entry<P: ?Sized> {
    defaults: Vec<f32>,
    build: Factory<P>,
}

/// Name -> factory table for one kind of pipeline object
pub struct FactoryTable<P: ?Sized> {
    entries: HashMap<String, Entry<P>>,
}

impl<P: ?Sized> FactoryTable<P> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `build` under `name`. `build` always receives
    /// `defaults.len()` arguments.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        defaults: &[f32],
        build: impl Fn(&[f32]) -> Box<P> + 'static,
    ) {
        let name = name.into();
        if self.entries.contains_key(&name) {
            log::warn!("Replacing factory '{}'", name);
        }
        self.entries.insert(
            name,
            Entry {
                defaults: defaults.to_vec(),
                build: Box::new(build),
            },
        );
    }

    /// Check for a factory by name
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered factory names
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Build the object registered under `name`; missing trailing
    /// arguments take their defaults
    pub fn build(&self, name: &str, args: &[f32]) -> Result<Registered<P>, InputError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| InputError::UnknownFactory(name.to_string()))?;
        if args.len() > entry.defaults.len() {
            return Err(InputError::InvalidFactoryArguments {
                name: name.to_string(),
                expected: entry.defaults.len(),
                actual: args.len(),
            });
        }
        let mut full = entry.defaults.clone();
        full[..args.len()].copy_from_slice(args);
        Ok(Registered((entry.build)(&full)))
    }
}

/// Factory tables for the scalar pipeline objects
pub struct PipelineRegistry {
    pub modifiers: FactoryTable<dyn Modifier<f32>>,
    pub triggers: FactoryTable<dyn Trigger<bool>>,
    pub axis_triggers: FactoryTable<dyn Trigger<f32>>,
    pub activators: FactoryTable<dyn ControlActivator<f32>>,
}

impl PipelineRegistry {
    /// Registry with every built-in registered
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// A registry with no built-in factories
    pub fn empty() -> Self {
        Self {
            modifiers: FactoryTable::new(),
            triggers: FactoryTable::new(),
            axis_triggers: FactoryTable::new(),
            activators: FactoryTable::new(),
        }
    }

    /// Build an `f32` modifier by name
    pub fn modifier(&self, name: &str, args: &[f32]) -> Result<Registered<dyn Modifier<f32>>, InputError> {
        self.modifiers.build(name, args)
    }

    /// Build a button trigger by name
    pub fn trigger(&self, name: &str, args: &[f32]) -> Result<Registered<dyn Trigger<bool>>, InputError> {
        self.triggers.build(name, args)
    }

    /// Build an axis trigger by name
    pub fn axis_trigger(
        &self,
        name: &str,
        args: &[f32],
    ) -> Result<Registered<dyn Trigger<f32>>, InputError> {
        self.axis_triggers.build(name, args)
    }

    /// Build an axis control activator by name
    pub fn activator(
        &self,
        name: &str,
        args: &[f32],
    ) -> Result<Registered<dyn ControlActivator<f32>>, InputError> {
        self.activators.build(name, args)
    }

    fn register_builtins(&mut self) {
        let m = &mut self.modifiers;
        m.register("sign", &[], |_| Box::new(modifier::sign()));
        m.register("absolute", &[], |_| Box::new(modifier::absolute()));
        m.register("clamp", &[0.0, 1.0], |a| Box::new(modifier::clamp(a[0], a[1])));
        m.register("invert", &[], |_| Box::new(modifier::invert()));
        m.register("scale", &[1.0], |a| Box::new(modifier::scale(a[0])));
        m.register("normalize", &[0.0, 1.0], |a| {
            Box::new(modifier::normalize(a[0], a[1]))
        });
        m.register("axis_dead_zone", &[0.125, 0.925], |a| {
            Box::new(modifier::axis_dead_zone(a[0], a[1]))
        });

        let t = &mut self.triggers;
        t.register("always", &[], |_| Box::new(trigger::always()));
        t.register("never", &[], |_| Box::new(trigger::never()));
        t.register("toggle", &[], |_| Box::new(trigger::toggle()));
        t.register("hold", &[0.5], |a| Box::new(trigger::hold(a[0])));
        t.register("tap", &[0.1], |a| Box::new(trigger::tap(a[0])));
        t.register("multi_tap", &[0.2, 0.2, 2.0], |a| {
            Box::new(trigger::multi_tap(a[0], a[1], a[2].max(1.0) as usize))
        });

        let t = &mut self.axis_triggers;
        t.register("always", &[], |_| Box::new(trigger::always()));
        t.register("never", &[], |_| Box::new(trigger::never()));
        for (name, op) in COMPARISONS {
            t.register(name, &[0.0], move |a| {
                Box::new(converter::Compare { op, value: a[0] })
            });
        }

        let c = &mut self.activators;
        c.register("toggle", &[], |_| Box::new(activator::toggle()));
        for (name, op) in COMPARISONS {
            c.register(name, &[0.0], move |a| Box::new(activator::compared(op, a[0])));
        }
    }
}

const COMPARISONS: [(&str, CompareOp); 6] = [
    ("equal", CompareOp::Equal),
    ("not_equal", CompareOp::NotEqual),
    ("greater", CompareOp::Greater),
    ("greater_or_equal", CompareOp::GreaterOrEqual),
    ("less", CompareOp::Less),
    ("less_or_equal", CompareOp::LessOrEqual),
];

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::control::{Control, ValueControl};
    use crate::input::controller::ControllerId;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    #[test]
    fn test_builtin_modifier_with_defaults() {
        let registry = PipelineRegistry::default();
        let mut dead_zone = registry.modifier("axis_dead_zone", &[]).unwrap();
        assert_relative_eq!(dead_zone.modify(0.1), 0.0);
        assert_relative_eq!(dead_zone.modify(1.0), 1.0);

        let mut clamp = registry.modifier("clamp", &[-0.5]).unwrap();
        assert_relative_eq!(clamp.modify(-2.0), -0.5);
        assert_relative_eq!(clamp.modify(2.0), 1.0);
    }

    #[test]
    fn test_hold_trigger_by_name() {
        let registry = PipelineRegistry::new();
        let mut hold = registry.trigger("hold", &[0.1]).unwrap();
        assert!(!hold.execute(&true, 0.1));
        assert!(hold.execute(&true, 0.1));
        hold.reset();
        assert!(!hold.execute(&true, 0.1));
    }

    #[test]
    fn test_axis_comparison_trigger() {
        let registry = PipelineRegistry::new();
        let mut trigger = registry.axis_trigger("greater", &[0.5]).unwrap();
        assert!(trigger.execute(&0.75, 0.0));
        assert!(!trigger.execute(&0.25, 0.0));
    }

    #[test]
    fn test_activator_by_name() {
        let registry = PipelineRegistry::new();
        let mut activator = registry.activator("less_or_equal", &[-0.5]).unwrap();

        let axis = Rc::new(ValueControl::new("x", -1.0f32));
        let control: Rc<dyn Control<f32>> = axis.clone();
        let bound = BoundControl::new(ControllerId::new(0), control);
        assert!(activator.check(&bound));
        axis.set(0.0);
        assert!(!activator.check(&bound));
    }

    #[test]
    fn test_lookup_errors() {
        let registry = PipelineRegistry::new();
        assert!(matches!(
            registry.trigger("double_click", &[]),
            Err(InputError::UnknownFactory(name)) if name == "double_click"
        ));
        assert!(matches!(
            registry.modifier("sign", &[1.0]),
            Err(InputError::InvalidFactoryArguments { expected: 0, actual: 1, .. })
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = PipelineRegistry::empty();
        assert!(!registry.modifiers.contains("double"));
        registry
            .modifiers
            .register("double", &[], |_| Box::new(|v: f32| v * 2.0));
        let mut double = registry.modifier("double", &[]).unwrap();
        assert_relative_eq!(double.modify(1.5), 3.0);
        assert_eq!(registry.modifiers.names().collect::<Vec<_>>(), vec!["double"]);
    }
}
