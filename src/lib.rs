pub mod catalog;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod roster;
pub mod session;
pub mod settings;
pub mod utils;
pub mod workflow;

#[cfg(feature = "desktop")]
mod app;

#[cfg(feature = "desktop")]
pub use app::run;
