// OC Swapper - swap openvr_api.dll between SteamVR and OpenComposite
//
// This is the library crate containing the core logic and data structures.
// The binary crate (main.rs) provides a headless command line shell.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ConfigStore};
pub use models::{Configuration, InstalledState, ResolvedConfig, Variant};
pub use services::{DriftWarning, StartupReport, SwapError, SwapOutcome, VariantManager};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

const ABOUT_TEXT: &str = "OC Swapper - a tool by iAmMe\n\nOC Swapper offers a single click solution for swapping between SteamVR DLL binary and OpenComposite DLL binary for Skyrim VR setups";

/// Text for the shell's about box
pub fn about_text() -> &'static str {
    ABOUT_TEXT
}
