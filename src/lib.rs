// Input actions: controller-agnostic action/binding resolution
//
// - `input`: actions, bindings, groups and the manager driving them
// - `devices`: reference controllers
// - `clock`: frame delta source for hosts without their own timing
// - `math`: scalar helpers used by the value pipeline

pub mod clock;
pub mod devices;
pub mod input;
pub mod math;
