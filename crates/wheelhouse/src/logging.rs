use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    /// Only what `RUST_LOG` asks for.
    #[default]
    Default,
    /// `-v`: debug messages from the `wheelhouse` crates.
    Verbose,
    /// `-vv` and up: trace messages from the `wheelhouse` crates.
    ExtraVerbose,
}

impl Level {
    pub(crate) fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::Default,
            1 => Self::Verbose,
            _ => Self::ExtraVerbose,
        }
    }

    fn directive(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Verbose => Some("wheelhouse=debug"),
            Self::ExtraVerbose => Some("wheelhouse=trace"),
        }
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, replaces the level's filter.
///
/// Without `-v`, events are printed bare. With `-v`, they're nested by span and carry the
/// uptime and target.
pub(crate) fn setup_logging(level: Level) {
    let registry = tracing_subscriber::registry();

    let Some(directive) = level.directive() else {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::OFF.into())
            .from_env_lossy();
        registry
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    registry
        .with(filter)
        .with(
            HierarchicalLayer::default()
                .with_targets(true)
                .with_timer(Uptime::default())
                .with_writer(std::io::stderr),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity() {
        assert_eq!(Level::from_verbosity(0).directive(), None);
        assert_eq!(Level::from_verbosity(1).directive(), Some("wheelhouse=debug"));
        assert_eq!(Level::from_verbosity(3), Level::ExtraVerbose);
    }
}
