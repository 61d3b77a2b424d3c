// Keyboard controller - winit physical keys as button controls

use crate::input::control::{ControlHandle, ValueControl};
use crate::input::controller::Controller;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard addressed as `<keyboard>/KeyA`, `<keyboard>/Space`, ...
///
/// Control names are winit `KeyCode` variant names. Keys are created the
/// first time they are looked up or pressed.
pub struct KeyboardController {
    path: Vec<String>,
    keys: RefCell<HashMap<String, Rc<ValueControl<bool>>>>,
}

impl KeyboardController {
    /// Keyboard at `<keyboard>`
    pub fn new() -> Self {
        Self::with_path(&["keyboard"])
    }

    /// Keyboard under a custom path, e.g. `["keyboard", "laptop"]`
    pub fn with_path(path: &[&str]) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            keys: RefCell::new(HashMap::new()),
        }
    }

    fn key(&self, name: &str) -> Rc<ValueControl<bool>> {
        self.keys
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| Rc::new(ValueControl::new(name, false)))
            .clone()
    }

    /// Feed a winit key event. Repeats are ignored.
    pub fn process_keyboard_event(&self, event: &KeyEvent) {
        if event.repeat {
            return;
        }
        if let PhysicalKey::Code(key_code) = event.physical_key {
            self.set_key(key_code, event.state == ElementState::Pressed);
        }
    }

    /// Press or release a key
    pub fn set_key(&self, key_code: KeyCode, pressed: bool) {
        self.key(&key_name(key_code)).set(pressed);
    }

    /// Check if a key is held
    pub fn is_pressed(&self, key_code: KeyCode) -> bool {
        self.keys
            .borrow()
            .get(&key_name(key_code))
            .is_some_and(|key| key.get())
    }

    /// Release every key (e.g. when the window loses focus)
    pub fn release_all(&self) {
        for key in self.keys.borrow().values() {
            key.set(false);
        }
    }
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::new()
    }
}

fn key_name(key_code: KeyCode) -> String {
    format!("{:?}", key_code)
}

impl Controller for KeyboardController {
    fn path(&self) -> &[String] {
        &self.path
    }

    fn is_activated(&self) -> bool {
        self.keys.borrow().values().any(|key| key.get())
    }

    fn control(&self, segments: &[String]) -> Option<ControlHandle> {
        let [name] = segments else {
            return None;
        };
        Some(ControlHandle::Button(self.key(name)))
    }
}
