//! Process-level wiring: configuration loading for the `nexusd` binary.
//!
//! Everything the core library needs to run is exposed generically through
//! [`crate::connection`], [`crate::session`], and [`crate::command`]; this
//! module only hosts the configuration surface specific to the bundled
//! binary entry point.

mod cli;

pub use cli::AppConfig;
