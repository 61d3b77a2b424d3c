// Modifiers - same-type value transforms applied after value assembly

use crate::math;
use glam::{Vec2, Vec3};
use std::ops::{Mul, Neg};

/// A `T -> T` transform. Closures `FnMut(T) -> T` are modifiers too.
pub trait Modifier<T> {
    fn modify(&mut self, value: T) -> T;
}

impl<T, F> Modifier<T> for F
where
    F: FnMut(T) -> T,
{
    fn modify(&mut self, value: T) -> T {
        self(value)
    }
}

/// Ordered list of modifiers, applied first to last
pub struct ModifierChain<T> {
    modifiers: Vec<Box<dyn Modifier<T>>>,
}

impl<T> ModifierChain<T> {
    pub fn new() -> Self {
        Self {
            modifiers: Vec::new(),
        }
    }

    /// Append a modifier to the end of the chain
    pub fn push(&mut self, modifier: impl Modifier<T> + 'static) {
        self.modifiers.push(Box::new(modifier));
    }

    /// Remove the modifier at `index`, returning whether one was there
    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.modifiers.len() {
            self.modifiers.remove(index);
            true
        } else {
            false
        }
    }

    /// Swap the modifier at `index` for a new one
    pub fn replace(&mut self, index: usize, modifier: impl Modifier<T> + 'static) -> bool {
        match self.modifiers.get_mut(index) {
            Some(slot) => {
                *slot = Box::new(modifier);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&(dyn Modifier<T> + 'static)> {
        self.modifiers.get(index).map(|modifier| &**modifier)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Modifier<T> + 'static)> {
        self.modifiers.get_mut(index).map(|modifier| &mut **modifier)
    }

    pub fn clear(&mut self) {
        self.modifiers.clear();
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Run `value` through every modifier in order
    pub fn apply(&mut self, value: T) -> T {
        self.modifiers
            .iter_mut()
            .fold(value, |value, modifier| modifier.modify(value))
    }
}

impl<T> Default for ModifierChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Modifier<T> for ModifierChain<T> {
    fn modify(&mut self, value: T) -> T {
        self.apply(value)
    }
}

/// Logical not
#[derive(Debug, Clone, Copy, Default)]
pub struct Toggle;

impl Modifier<bool> for Toggle {
    fn modify(&mut self, value: bool) -> bool {
        !value
    }
}

/// -1, 0 or 1
#[derive(Debug, Clone, Copy, Default)]
pub struct Sign;

impl Modifier<f32> for Sign {
    fn modify(&mut self, value: f32) -> f32 {
        math::sign(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Absolute;

impl Modifier<f32> for Absolute {
    fn modify(&mut self, value: f32) -> f32 {
        value.abs()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Clamp {
    pub min: f32,
    pub max: f32,
}

impl Modifier<f32> for Clamp {
    fn modify(&mut self, value: f32) -> f32 {
        math::clamp(value, self.min, self.max)
    }
}

/// Negation for scalars and vectors
#[derive(Debug, Clone, Copy, Default)]
pub struct Invert;

impl<T: Neg<Output = T>> Modifier<T> for Invert {
    fn modify(&mut self, value: T) -> T {
        -value
    }
}

/// Multiplication by a factor (a scalar, or a vector for per-axis scaling)
#[derive(Debug, Clone, Copy)]
pub struct Scale<F> {
    pub factor: F,
}

impl<T, F> Modifier<T> for Scale<F>
where
    T: Mul<F, Output = T>,
    F: Copy,
{
    fn modify(&mut self, value: T) -> T {
        value * self.factor
    }
}

/// Map `[min, max]` onto `[0, 1]`, saturating outside the range
#[derive(Debug, Clone, Copy)]
pub struct Normalize {
    pub min: f32,
    pub max: f32,
}

impl Modifier<f32> for Normalize {
    fn modify(&mut self, value: f32) -> f32 {
        math::normalize(value, self.min, self.max)
    }
}

/// Unit-length direction; a zero vector stays zero
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeVector;

impl Modifier<Vec2> for NormalizeVector {
    fn modify(&mut self, value: Vec2) -> Vec2 {
        value.normalize_or_zero()
    }
}

impl Modifier<Vec3> for NormalizeVector {
    fn modify(&mut self, value: Vec3) -> Vec3 {
        value.normalize_or_zero()
    }
}

/// Dead zone for a single axis
#[derive(Debug, Clone, Copy)]
pub struct AxisDeadZone {
    pub min: f32,
    pub max: f32,
}

impl Default for AxisDeadZone {
    fn default() -> Self {
        Self {
            min: 0.125,
            max: 0.925,
        }
    }
}

impl Modifier<f32> for AxisDeadZone {
    fn modify(&mut self, value: f32) -> f32 {
        math::dead_zone(value, self.min, self.max)
    }
}

/// Radial dead zone for a two-axis stick
#[derive(Debug, Clone, Copy)]
pub struct StickDeadZone {
    pub min: f32,
    pub max: f32,
}

impl Default for StickDeadZone {
    fn default() -> Self {
        Self {
            min: 0.125,
            max: 0.925,
        }
    }
}

impl Modifier<Vec2> for StickDeadZone {
    fn modify(&mut self, value: Vec2) -> Vec2 {
        let magnitude = value.length();
        if magnitude < self.min {
            return Vec2::ZERO;
        }
        let direction = value / magnitude;
        if magnitude > self.max {
            return direction;
        }
        direction * math::normalize(magnitude, self.min, self.max)
    }
}

/// Logical not
pub fn toggle() -> Toggle {
    Toggle
}

/// -1, 0 or 1
pub fn sign() -> Sign {
    Sign
}

/// Absolute value
pub fn absolute() -> Absolute {
    Absolute
}

/// Clamp into `[min, max]`
pub fn clamp(min: f32, max: f32) -> Clamp {
    Clamp { min, max }
}

/// Negate
pub fn invert() -> Invert {
    Invert
}

/// Multiply by `factor`
pub fn scale<F: Copy>(factor: F) -> Scale<F> {
    Scale { factor }
}

/// Map `[min, max]` onto `[0, 1]`
pub fn normalize(min: f32, max: f32) -> Normalize {
    Normalize { min, max }
}

/// Unit length, zero stays zero
pub fn normalize_vector() -> NormalizeVector {
    NormalizeVector
}

/// Zero below `min`, rescaled between `min` and `max`
pub fn axis_dead_zone(min: f32, max: f32) -> AxisDeadZone {
    AxisDeadZone { min, max }
}

/// Radial dead zone for sticks
pub fn stick_dead_zone(min: f32, max: f32) -> StickDeadZone {
    StickDeadZone { min, max }
}
