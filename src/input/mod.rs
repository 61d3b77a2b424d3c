// Input action system
//
// Maps controller input onto named, typed actions. Bindings address
// controls by path, arbitrate between controllers by path specificity, and
// feed values through a converter -> modifier -> trigger pipeline that drives
// each action's Waiting/Started/Performing/Ended state machine.
//
// ## Architecture
//
// - `path`: `<handedness/controller>/control` addresses with wildcard and pattern segments
// - `control`, `controller`: the device surface bindings read from
// - `modifier`, `converter`, `trigger`, `activator`: value pipeline stages
// - `registry`: build pipeline stages by name
// - `binding`: single-path and composite (multi-slot) bindings
// - `action`: value, state machine, binding arbitration and events
// - `group`: enable/pause hierarchy of actions
// - `manager`: controller connection and the per-frame update
// - `config`: manager settings
//
// ## Usage Example
//
// ```rust
// use input_actions::input::{Action, ActionEvent, InputManager, SingleBinding};
//
// let mut manager = InputManager::new();
// let mut jump = Action::new("jump", false);
// jump.add_binding(SingleBinding::<bool>::new("<keyboard>/Space")?);
// jump.on(ActionEvent::Started, |_, _| println!("jump!"));
// manager.get_or_create_action_group("player").add_action(jump);
//
// manager.add_controller(keyboard);
//
// // Once per frame
// manager.update(delta_time);
// ```

pub mod action;
pub mod activator;
pub mod binding;
pub mod config;
pub mod control;
pub mod controller;
pub mod converter;
pub mod group;
pub mod manager;
pub mod modifier;
pub mod path;
pub mod registry;
pub mod trigger;

pub use action::{Action, ActionEvent, ActionState, ActionValue, ListenerId};
pub use binding::{Binding, BindingId, CompositeBinding, SingleBinding};
pub use config::InputSettings;
pub use control::{Control, ControlHandle, ControlValue, Pose, ValueControl};
pub use controller::{ConnectedController, Controller, ControllerId};
pub use group::ActionGroup;
pub use manager::InputManager;
pub use path::{Handedness, InputPath};
pub use registry::PipelineRegistry;

/// Input configuration errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Malformed input path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Unknown factory: {0}")]
    UnknownFactory(String),

    #[error("Invalid arguments for '{name}': expected at most {expected}, got {actual}")]
    InvalidFactoryArguments {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Slot {index} out of range for a binding with {slots} slots")]
    SlotOutOfRange { index: usize, slots: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = InputError::MalformedPath {
            path: "gamepad/buttonA".to_string(),
            reason: "missing '<'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed input path 'gamepad/buttonA': missing '<'"
        );

        let err = InputError::SlotOutOfRange { index: 3, slots: 2 };
        assert_eq!(
            err.to_string(),
            "Slot 3 out of range for a binding with 2 slots"
        );
    }

    #[test]
    fn test_regex_error_converts() {
        let err: InputError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, InputError::InvalidPattern(_)));
    }
}
