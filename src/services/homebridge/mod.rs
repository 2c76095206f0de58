// Homebridge UI API module.
// Client, types and accessory operations for the upstream smart-home controller.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::HomebridgeClient;
pub use types::{BatchResult, ToggleResult};
