use std::error::Error;
use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};

#[doc(hidden)]
pub use anstream;
#[doc(hidden)]
pub use owo_colors;
use owo_colors::{AnsiColors, OwoColorize};

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Turn user-facing warnings on or off. They start off; `--quiet` keeps them off.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

#[doc(hidden)]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Print a bold `warning:` line to stderr, unless warnings are turned off.
#[macro_export]
macro_rules! warn_user {
    ($($arg:tt)*) => {{
        use $crate::owo_colors::OwoColorize;

        if $crate::is_enabled() {
            let message = format!($($arg)*);
            $crate::anstream::eprintln!("{}{} {}", "warning".yellow().bold(), ":".bold(), message.bold());
        }
    }};
}

/// Format an error and its chain of sources.
///
/// ```text
/// error: Failed to download `colander==0.9.9`
///   Caused by: No matching distribution found for colander==0.9.9
/// ```
pub fn write_error_chain(err: &dyn Error, mut stream: impl std::fmt::Write) -> std::fmt::Result {
    writeln!(
        &mut stream,
        "{}{} {}",
        "error".color(AnsiColors::Red).bold(),
        ":".bold(),
        err.to_string().trim()
    )?;
    for source in iter::successors(err.source(), |&err| err.source()) {
        writeln!(
            &mut stream,
            "  {}: {}",
            "Caused by".color(AnsiColors::Red).bold(),
            source.to_string().trim()
        )?;
    }
    Ok(())
}
