pub mod assembler;
pub mod controller;
pub mod editor;
pub mod store;

#[cfg(feature = "desktop")]
pub mod commands;

pub use assembler::assemble;
pub use controller::{RosterController, RosterView};
pub use editor::RosterEditor;
pub use store::{RosterSnapshot, RosterStore};
