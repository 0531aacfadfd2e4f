//! LiveSocket Monitor - Main Library
//!
//! Wires the `livesocket` connection manager into a small command-line
//! monitor that connects to a push service and logs what it receives.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, settings, logging)
//! - **livesocket**: Resilient WebSocket connection manager (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use livesocket_monitor::bin_common::{resolve_config_path, MonitorConfig};
//! use livesocket_monitor::livesocket::ConnectionManager;
//! ```

// Re-export workspace libraries for convenience
pub use livesocket;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;
    pub mod settings;

    pub use cli::{load_config_from_env, parse_args, resolve_config_path, ConfigType};
    pub use logging::init_tracing;
    pub use settings::{ConfigError, MonitorConfig};
}
