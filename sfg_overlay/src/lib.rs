pub mod console;
pub mod controller;

pub use console::{Console, ConsoleCommandFn, ConsoleState};
pub use controller::{DrawCall, OverlayController, OverlayFrame};
