// Reference controllers
//
// - `VirtualController`: controls set from code (scripted input, tests)
// - `KeyboardController`: winit keyboard events

mod keyboard;
mod virtual_controller;

pub use keyboard::KeyboardController;
pub use virtual_controller::VirtualController;
