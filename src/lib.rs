//! `engine-setup` bootstraps the third-party dependencies of the engine
//! workspace: it downloads each one from a list of fallback sources, unpacks
//! it next to the download and reports what is still missing.

pub mod logger;
pub mod commands;
pub mod libs;
pub mod schemas;

// Used by the logging macros so callers do not need `colored` in scope.
#[doc(hidden)]
pub use colored as __colored;
