// Converters - value transforms that change the value type
//
// Composite bindings hand their converter a slice with one value per slot;
// single bindings hand it the control's value.

use super::control::Pose;
use super::modifier::{Modifier, ModifierChain};
use glam::{Vec2, Vec3};

/// An `I -> O` transform. Closures `FnMut(&I) -> O` are converters too.
pub trait Converter<I: ?Sized, O> {
    fn convert(&mut self, input: &I) -> O;
}

impl<I: ?Sized, O, F> Converter<I, O> for F
where
    F: FnMut(&I) -> O,
{
    fn convert(&mut self, input: &I) -> O {
        self(input)
    }
}

/// Comparison operators shared by converters, triggers and activators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl CompareOp {
    pub fn eval<T: PartialOrd>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            CompareOp::Equal => lhs == rhs,
            CompareOp::NotEqual => lhs != rhs,
            CompareOp::Greater => lhs > rhs,
            CompareOp::GreaterOrEqual => lhs >= rhs,
            CompareOp::Less => lhs < rhs,
            CompareOp::LessOrEqual => lhs <= rhs,
        }
    }
}

/// Compare the input against a fixed operand
#[derive(Debug, Clone, Copy)]
pub struct Compare<T> {
    pub op: CompareOp,
    pub value: T,
}

impl<T: PartialOrd> Compare<T> {
    pub fn test(&self, input: &T) -> bool {
        self.op.eval(input, &self.value)
    }
}

impl<T: PartialOrd> Converter<T, bool> for Compare<T> {
    fn convert(&mut self, input: &T) -> bool {
        self.test(input)
    }
}

/// Ignores its input and always yields the same answer
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub bool);

impl<I: ?Sized> Converter<I, bool> for Constant {
    fn convert(&mut self, _input: &I) -> bool {
        self.0
    }
}

/// True when every element is true
#[derive(Debug, Clone, Copy, Default)]
pub struct Concurrent;

impl Converter<[bool], bool> for Concurrent {
    fn convert(&mut self, input: &[bool]) -> bool {
        input.iter().all(|&value| value)
    }
}

/// Two slots `[negative, positive]` to one axis
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeAxis;

impl Converter<[f32], f32> for CompositeAxis {
    fn convert(&mut self, input: &[f32]) -> f32 {
        slot(input, 1) - slot(input, 0)
    }
}

/// Four slots `[left, right, down, up]` to a 2D vector
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeVector2;

impl Converter<[f32], Vec2> for CompositeVector2 {
    fn convert(&mut self, input: &[f32]) -> Vec2 {
        Vec2::new(
            slot(input, 1) - slot(input, 0),
            slot(input, 3) - slot(input, 2),
        )
    }
}

/// Slots taken as vector components
#[derive(Debug, Clone, Copy, Default)]
pub struct ToVector;

impl Converter<[f32], Vec2> for ToVector {
    fn convert(&mut self, input: &[f32]) -> Vec2 {
        Vec2::new(slot(input, 0), slot(input, 1))
    }
}

impl Converter<[f32], Vec3> for ToVector {
    fn convert(&mut self, input: &[f32]) -> Vec3 {
        Vec3::new(slot(input, 0), slot(input, 1), slot(input, 2))
    }
}

fn slot(input: &[f32], index: usize) -> f32 {
    input.get(index).copied().unwrap_or(0.0)
}

/// Vector length
#[derive(Debug, Clone, Copy, Default)]
pub struct Magnitude;

impl Converter<Vec2, f32> for Magnitude {
    fn convert(&mut self, input: &Vec2) -> f32 {
        input.length()
    }
}

impl Converter<Vec3, f32> for Magnitude {
    fn convert(&mut self, input: &Vec3) -> f32 {
        input.length()
    }
}

impl Converter<[f32], f32> for Magnitude {
    fn convert(&mut self, input: &[f32]) -> f32 {
        input.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

/// Something with a position in space
pub trait Position: Copy {
    fn position(&self) -> Vec3;
}

impl Position for Vec2 {
    fn position(&self) -> Vec3 {
        self.extend(0.0)
    }
}

impl Position for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }
}

impl Position for Pose {
    fn position(&self) -> Vec3 {
        self.position
    }
}

/// Compare the distance between two slots against a threshold
#[derive(Debug, Clone, Copy)]
pub struct DistanceCompare {
    pub op: CompareOp,
    pub distance: f32,
    pub first: usize,
    pub second: usize,
}

impl DistanceCompare {
    /// Read the two slots this comparison looks at
    pub fn test<P: Position>(&self, input: &[P]) -> bool {
        match (input.get(self.first), input.get(self.second)) {
            (Some(a), Some(b)) => {
                let squared = a.position().distance_squared(b.position());
                self.op.eval(&squared, &(self.distance * self.distance))
            }
            _ => false,
        }
    }
}

impl<P: Position> Converter<[P], bool> for DistanceCompare {
    fn convert(&mut self, input: &[P]) -> bool {
        self.test(input)
    }
}

/// The composite tuple itself, as a `Vec`
#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

impl<C: Clone> Converter<[C], Vec<C>> for Collect {
    fn convert(&mut self, input: &[C]) -> Vec<C> {
        input.to_vec()
    }
}

/// A converter preceded by a chain of input modifiers
pub struct Modified<I, O> {
    modifiers: ModifierChain<I>,
    converter: Box<dyn Converter<I, O>>,
}

impl<I, O> Modified<I, O> {
    pub fn new(converter: impl Converter<I, O> + 'static) -> Self {
        Self {
            modifiers: ModifierChain::new(),
            converter: Box::new(converter),
        }
    }

    /// Add a modifier run before conversion
    pub fn with_modifier(mut self, modifier: impl Modifier<I> + 'static) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn modifiers_mut(&mut self) -> &mut ModifierChain<I> {
        &mut self.modifiers
    }
}

impl<I: Clone, O> Converter<I, O> for Modified<I, O> {
    fn convert(&mut self, input: &I) -> O {
        let modified = self.modifiers.apply(input.clone());
        self.converter.convert(&modified)
    }
}

/// Constant `true`
pub fn always_true() -> Constant {
    Constant(true)
}

/// Constant `false`
pub fn always_false() -> Constant {
    Constant(false)
}

pub fn concurrent() -> Concurrent {
    Concurrent
}

pub fn equal<T>(value: T) -> Compare<T> {
    Compare {
        op: CompareOp::Equal,
        value,
    }
}

pub fn not_equal<T>(value: T) -> Compare<T> {
    Compare {
        op: CompareOp::NotEqual,
        value,
    }
}

pub fn greater<T>(value: T) -> Compare<T> {
    Compare {
        op: CompareOp::Greater,
        value,
    }
}

pub fn greater_or_equal<T>(value: T) -> Compare<T> {
    Compare {
        op: CompareOp::GreaterOrEqual,
        value,
    }
}

pub fn less<T>(value: T) -> Compare<T> {
    Compare {
        op: CompareOp::Less,
        value,
    }
}

pub fn less_or_equal<T>(value: T) -> Compare<T> {
    Compare {
        op: CompareOp::LessOrEqual,
        value,
    }
}

/// `[negative, positive]` slots to one axis
pub fn composite_axis() -> CompositeAxis {
    CompositeAxis
}

/// `[left, right, down, up]` slots to a vector
pub fn composite_vector2() -> CompositeVector2 {
    CompositeVector2
}

pub fn to_vector() -> ToVector {
    ToVector
}

/// Length of a vector
pub fn magnitude() -> Magnitude {
    Magnitude
}

pub fn collect() -> Collect {
    Collect
}

/// True when the two slots are at least `distance` apart
pub fn greater_or_equal_distance(distance: f32, first: usize, second: usize) -> DistanceCompare {
    DistanceCompare {
        op: CompareOp::GreaterOrEqual,
        distance,
        first,
        second,
    }
}

/// True when the two slots are at most `distance` apart
pub fn less_or_equal_distance(distance: f32, first: usize, second: usize) -> DistanceCompare {
    DistanceCompare {
        op: CompareOp::LessOrEqual,
        distance,
        first,
        second,
    }
}
