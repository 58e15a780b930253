//! Configuration for the registry and the demo push loop.

pub mod settings;

pub use settings::{PushSettings, RegistryConfig};
