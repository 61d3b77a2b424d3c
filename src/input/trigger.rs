// Triggers - decide each frame whether an action's value counts as "on"
//
// Timed triggers accumulate the frame delta and are reset whenever the
// action switches to a different binding or trigger.

use super::converter::{Compare, Concurrent, Constant, Converter, DistanceCompare, Position};
use super::modifier::{Modifier, ModifierChain, Toggle};

/// `(value, delta_time) -> bool`. Closures `FnMut(&T, f32) -> bool` are triggers too.
pub trait Trigger<T: ?Sized> {
    fn execute(&mut self, value: &T, delta_time: f32) -> bool;

    /// Clear accumulated timers and counters
    fn reset(&mut self) {}
}

impl<T: ?Sized, F> Trigger<T> for F
where
    F: FnMut(&T, f32) -> bool,
{
    fn execute(&mut self, value: &T, delta_time: f32) -> bool {
        self(value, delta_time)
    }
}

/// Fires whenever the value differs from the action's default.
///
/// Comparison is structural, so composite values (`Vec`, arrays) are
/// compared element by element.
#[derive(Debug, Clone)]
pub struct DefaultTrigger<T> {
    default_value: T,
}

impl<T> DefaultTrigger<T> {
    pub fn new(default_value: T) -> Self {
        Self { default_value }
    }
}

impl<T: PartialEq> Trigger<T> for DefaultTrigger<T> {
    fn execute(&mut self, value: &T, _delta_time: f32) -> bool {
        *value != self.default_value
    }
}

impl<T: ?Sized> Trigger<T> for Constant {
    fn execute(&mut self, _value: &T, _delta_time: f32) -> bool {
        self.0
    }
}

/// Fires while the button is released
impl Trigger<bool> for Toggle {
    fn execute(&mut self, value: &bool, _delta_time: f32) -> bool {
        !*value
    }
}

impl<T: PartialOrd> Trigger<T> for Compare<T> {
    fn execute(&mut self, value: &T, _delta_time: f32) -> bool {
        self.test(value)
    }
}

impl<P: Position> Trigger<[P]> for DistanceCompare {
    fn execute(&mut self, value: &[P], _delta_time: f32) -> bool {
        self.test(value)
    }
}

impl<P: Position> Trigger<Vec<P>> for DistanceCompare {
    fn execute(&mut self, value: &Vec<P>, _delta_time: f32) -> bool {
        self.test(value.as_slice())
    }
}

impl<T: AsRef<[bool]> + ?Sized> Trigger<T> for Concurrent {
    fn execute(&mut self, value: &T, _delta_time: f32) -> bool {
        value.as_ref().iter().all(|&v| v)
    }
}

/// Fires once the button has been held for `hold_time` seconds, and keeps
/// firing until it is released
#[derive(Debug, Clone)]
pub struct Hold {
    pub hold_time: f32,
    timer: f32,
}

impl Hold {
    pub fn new(hold_time: f32) -> Self {
        Self {
            hold_time,
            timer: 0.0,
        }
    }
}

impl Default for Hold {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Trigger<bool> for Hold {
    fn execute(&mut self, value: &bool, delta_time: f32) -> bool {
        if *value {
            if self.timer >= self.hold_time {
                return true;
            }
            self.timer += delta_time;
            return false;
        }
        self.timer = 0.0;
        false
    }

    fn reset(&mut self) {
        self.timer = 0.0;
    }
}

/// Fires for one frame on release, if the press lasted at most `tap_time`
#[derive(Debug, Clone)]
pub struct Tap {
    pub tap_time: f32,
    timer: f32,
}

impl Tap {
    pub fn new(tap_time: f32) -> Self {
        Self {
            tap_time,
            timer: 0.0,
        }
    }
}

impl Default for Tap {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl Trigger<bool> for Tap {
    fn execute(&mut self, value: &bool, delta_time: f32) -> bool {
        if *value {
            self.timer += delta_time;
            return false;
        }
        if self.timer == 0.0 {
            return false;
        }
        let tapped = self.timer <= self.tap_time;
        self.timer = 0.0;
        tapped
    }

    fn reset(&mut self) {
        self.timer = 0.0;
    }
}

/// Shared counter for multi-press gestures.
///
/// Each press must be released within `tap_time` and the next press must
/// follow within `delay_time`; the gesture fires while the final press is
/// held.
#[derive(Debug, Clone, Default)]
struct TapSequence {
    count: usize,
    last_value: bool,
    timer: f32,
}

impl TapSequence {
    /// `step(i)` is the value of the i-th press of the gesture
    fn advance(
        &mut self,
        steps: usize,
        step: impl Fn(usize) -> bool,
        tap_time: f32,
        delay_time: f32,
        delta_time: f32,
    ) -> bool {
        if self.count == 0 {
            if step(0) {
                self.last_value = true;
                self.count = 1;
            }
            return false;
        }
        if self.count < steps {
            self.timer += delta_time;
            if self.last_value {
                if !step(self.count - 1) {
                    self.last_value = false;
                    if self.timer > tap_time {
                        self.count = 0;
                    }
                    self.timer = 0.0;
                }
            } else if self.timer <= delay_time {
                if step(self.count) {
                    self.last_value = true;
                    self.count += 1;
                    self.timer = 0.0;
                }
            } else {
                self.count = 0;
                self.timer = 0.0;
            }
            return false;
        }
        if step(self.count - 1) {
            return true;
        }
        self.count = 0;
        false
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Fires when the button is pressed `tap_count` times in quick succession
#[derive(Debug, Clone)]
pub struct MultiTap {
    pub tap_time: f32,
    pub delay_time: f32,
    pub tap_count: usize,
    sequence: TapSequence,
}

impl MultiTap {
    pub fn new(tap_time: f32, delay_time: f32, tap_count: usize) -> Self {
        Self {
            tap_time,
            delay_time,
            tap_count,
            sequence: TapSequence::default(),
        }
    }
}

impl Default for MultiTap {
    fn default() -> Self {
        Self::new(0.2, 0.2, 2)
    }
}

impl Trigger<bool> for MultiTap {
    fn execute(&mut self, value: &bool, delta_time: f32) -> bool {
        let pressed = *value;
        self.sequence.advance(
            self.tap_count,
            |_| pressed,
            self.tap_time,
            self.delay_time,
            delta_time,
        )
    }

    fn reset(&mut self) {
        self.sequence.reset();
    }
}

/// Fires when the slots of a composite are pressed one after another, in order
#[derive(Debug, Clone)]
pub struct Sequence {
    pub tap_time: f32,
    pub delay_time: f32,
    state: TapSequence,
}

impl Sequence {
    pub fn new(tap_time: f32, delay_time: f32) -> Self {
        Self {
            tap_time,
            delay_time,
            state: TapSequence::default(),
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(0.2, 0.2)
    }
}

impl<T: AsRef<[bool]> + ?Sized> Trigger<T> for Sequence {
    fn execute(&mut self, value: &T, delta_time: f32) -> bool {
        let values = value.as_ref();
        if values.is_empty() {
            return false;
        }
        self.state.advance(
            values.len(),
            |i| values.get(i).copied().unwrap_or(false),
            self.tap_time,
            self.delay_time,
            delta_time,
        )
    }

    fn reset(&mut self) {
        self.state.reset();
    }
}

/// Converts the action value, runs modifiers on the result, then defers to
/// an inner trigger (e.g. hold an analog trigger past a threshold)
pub struct ConvertedTrigger<T, U> {
    converter: Box<dyn Converter<T, U>>,
    modifiers: ModifierChain<U>,
    trigger: Box<dyn Trigger<U>>,
}

impl<T, U> ConvertedTrigger<T, U> {
    pub fn new(
        converter: impl Converter<T, U> + 'static,
        trigger: impl Trigger<U> + 'static,
    ) -> Self {
        Self {
            converter: Box::new(converter),
            modifiers: ModifierChain::new(),
            trigger: Box::new(trigger),
        }
    }

    /// Add a modifier applied to the converted value
    pub fn with_modifier(mut self, modifier: impl Modifier<U> + 'static) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn modifiers_mut(&mut self) -> &mut ModifierChain<U> {
        &mut self.modifiers
    }

    /// Swap the inner trigger; the new one starts from a clean state
    pub fn set_trigger(&mut self, trigger: impl Trigger<U> + 'static) {
        let mut trigger: Box<dyn Trigger<U>> = Box::new(trigger);
        trigger.reset();
        self.trigger = trigger;
    }
}

impl<T, U> Trigger<T> for ConvertedTrigger<T, U> {
    fn execute(&mut self, value: &T, delta_time: f32) -> bool {
        let converted = self.converter.convert(value);
        let converted = self.modifiers.apply(converted);
        self.trigger.execute(&converted, delta_time)
    }

    fn reset(&mut self) {
        self.trigger.reset();
    }
}

/// Fires every frame
pub fn always() -> Constant {
    Constant(true)
}

/// Never fires
pub fn never() -> Constant {
    Constant(false)
}

/// Fires while released
pub fn toggle() -> Toggle {
    Toggle
}

pub fn concurrent() -> Concurrent {
    Concurrent
}

/// Fires once the value has been on for `hold_time` seconds
pub fn hold(hold_time: f32) -> Hold {
    Hold::new(hold_time)
}

/// Fires on a release that comes at most `tap_time` after the press
pub fn tap(tap_time: f32) -> Tap {
    Tap::new(tap_time)
}

/// Fires after `tap_count` quick presses
pub fn multi_tap(tap_time: f32, delay_time: f32, tap_count: usize) -> MultiTap {
    MultiTap::new(tap_time, delay_time, tap_count)
}

/// Fires when composite slots are pressed one after another
pub fn sequence(tap_time: f32, delay_time: f32) -> Sequence {
    Sequence::new(tap_time, delay_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::converter;

    const DT: f32 = 0.1;

    #[test]
    fn test_default_trigger() {
        let mut trigger = DefaultTrigger::new(0.0f32);
        assert!(!trigger.execute(&0.0, DT));
        assert!(trigger.execute(&0.3, DT));

        // Structural comparison for composite values
        let mut trigger = DefaultTrigger::new(vec![false, false]);
        assert!(!trigger.execute(&vec![false, false], DT));
        assert!(trigger.execute(&vec![false, true], DT));
    }

    #[test]
    fn test_simple_triggers() {
        assert!(Trigger::<f32>::execute(&mut always(), &0.0, DT));
        assert!(!Trigger::<bool>::execute(&mut never(), &true, DT));
        assert!(toggle().execute(&false, DT));
        assert!(converter::greater(0.5f32).execute(&0.7, DT));
        assert!(concurrent().execute(&vec![true, true], DT));
        assert!(!concurrent().execute(&vec![true, false], DT));
    }

    #[test]
    fn test_hold() {
        let mut hold = hold(0.25);

        // Accumulates while held
        assert!(!hold.execute(&true, DT));
        assert!(!hold.execute(&true, DT));
        assert!(!hold.execute(&true, DT));
        assert!(hold.execute(&true, DT));
        assert!(hold.execute(&true, DT));

        // Release clears the timer
        assert!(!hold.execute(&false, DT));
        assert!(!hold.execute(&true, DT));
    }

    #[test]
    fn test_tap() {
        let mut tap = tap(0.15);

        // Short press then release
        assert!(!tap.execute(&true, DT));
        assert!(tap.execute(&false, DT));
        assert!(!tap.execute(&false, DT));

        // Long press is not a tap
        for _ in 0..3 {
            assert!(!tap.execute(&true, DT));
        }
        assert!(!tap.execute(&false, DT));
    }

    #[test]
    fn test_multi_tap_double_press() {
        let mut trigger = MultiTap::default();

        assert!(!trigger.execute(&true, DT)); // first press
        assert!(!trigger.execute(&false, DT)); // released in time
        assert!(!trigger.execute(&true, DT)); // second press
        assert!(trigger.execute(&true, DT)); // fires while held
        assert!(!trigger.execute(&false, DT)); // released, start over
        assert!(!trigger.execute(&false, DT));
    }

    #[test]
    fn test_multi_tap_too_slow() {
        let mut trigger = MultiTap::default();

        assert!(!trigger.execute(&true, DT));
        assert!(!trigger.execute(&false, DT));
        // Wait past the delay window
        for _ in 0..4 {
            assert!(!trigger.execute(&false, DT));
        }
        assert!(!trigger.execute(&true, DT));
        assert!(!trigger.execute(&true, DT));
    }

    #[test]
    fn test_multi_tap_reset() {
        let mut trigger = MultiTap::default();
        trigger.execute(&true, DT);
        trigger.execute(&false, DT);
        trigger.reset();

        // Counting starts over after a reset
        assert!(!trigger.execute(&true, DT));
        assert!(!trigger.execute(&true, DT));
    }

    #[test]
    fn test_sequence() {
        let mut trigger = Sequence::default();

        assert!(!trigger.execute(&vec![true, false], DT));
        assert!(!trigger.execute(&vec![false, false], DT));
        assert!(!trigger.execute(&vec![false, true], DT));
        assert!(trigger.execute(&vec![false, true], DT));
        assert!(!trigger.execute(&vec![false, false], DT));
    }

    #[test]
    fn test_sequence_wrong_order() {
        let mut trigger = Sequence::default();

        // Second slot first never starts the sequence
        assert!(!trigger.execute(&vec![false, true], DT));
        assert!(!trigger.execute(&vec![false, true], DT));
        assert!(!trigger.execute(&vec![false, false], DT));
    }

    #[test]
    fn test_converted_trigger() {
        let mut trigger: ConvertedTrigger<f32, bool> =
            ConvertedTrigger::new(converter::greater(0.5f32), hold(0.1))
            .with_modifier(|pressed: bool| pressed);

        assert!(!trigger.execute(&0.9, DT));
        assert!(trigger.execute(&0.9, DT));
        assert!(!trigger.execute(&0.2, DT));
    }

    #[test]
    fn test_closure_trigger() {
        let mut trigger = |v: &f32, _dt: f32| *v > 1.0;
        assert!(trigger.execute(&2.0, DT));
    }
}
