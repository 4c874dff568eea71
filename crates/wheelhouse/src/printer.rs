use anstream::eprint;
use indicatif::ProgressDrawTarget;

/// Where user-facing progress lines and the download spinner go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Printer {
    /// Progress lines and a spinner on stderr.
    Default,
    /// No output.
    Quiet,
    /// Progress lines on stderr, interleaved with debug logs, without a spinner.
    Verbose,
}

impl Printer {
    pub(crate) fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose > 0 {
            Self::Verbose
        } else {
            Self::Default
        }
    }

    /// Return the [`ProgressDrawTarget`] for the download spinner.
    pub(crate) fn target(self) -> ProgressDrawTarget {
        match self {
            Self::Default => ProgressDrawTarget::stderr(),
            Self::Quiet | Self::Verbose => ProgressDrawTarget::hidden(),
        }
    }
}

impl std::fmt::Write for Printer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        if *self != Self::Quiet {
            #[allow(clippy::print_stderr)]
            {
                eprint!("{s}");
            }
        }
        Ok(())
    }
}
