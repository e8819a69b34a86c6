//! env-config-gen
//!
//! Writes WiFi credentials from the environment into a C header
//! (`env_config.h`) for inclusion by firmware sources.
//!
//! ```text
//! #define WIFI_SSID "<ssid>"
//! #define WIFI_PASSWORD "<password>"
//! ```

pub mod emitter;
pub mod env_source;
pub mod error;
pub mod header;
pub mod settings;

pub use emitter::{emit, emit_with, EmitOptions, EmitReport, MissingPolicy};
pub use env_source::{EnvSource, LayeredEnv, MapEnv, ProcessEnv};
pub use error::{EmitError, SettingsError};
