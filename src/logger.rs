// Logging for engine-setup.
// Every message goes to stderr with a colored level prefix, so stdout stays free
// for command output (the `check` table, `version`). Debug lines are gated on a
// process-wide switch flipped once by `init`.

use std::sync::atomic::{AtomicBool, Ordering};

// `log_info!` for normal progress messages ("Downloading ...", "Extracting ...").
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        use $crate::__colored::Colorize as _;
        eprintln!("{} {}", "[INFO]".bright_green(), format!($($arg)*))
    }};
}

// `log_warn!` for recoverable problems: a failed source that has a fallback,
// an archive that could not be removed.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        use $crate::__colored::Colorize as _;
        eprintln!("{} {}", "[WARN]".bright_yellow(), format!($($arg)*))
    }};
}

// `log_error!` for failures that end an operation.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        use $crate::__colored::Colorize as _;
        eprintln!("{} {}", "[ERROR]".bright_red(), format!($($arg)*))
    }};
}

// `log_debug!` is a no-op unless `--debug` was passed.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_debug_enabled() {
            use $crate::__colored::Colorize as _;
            eprintln!("{} {}", "[DEBUG]".dimmed(), format!($($arg)*));
        }
    };
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Sets the global debug switch. Called once from `main` before any command runs.
///
/// # Arguments
/// * `debug`: `true` to print `log_debug!` lines as well.
pub fn init(debug: bool) {
    DEBUG_ENABLED.store(debug, Ordering::Relaxed);
    log_debug!("[Logger] Debug output enabled");
}

/// Whether `log_debug!` lines are printed.
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}
