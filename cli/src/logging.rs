use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;

/// Map the `-v` count to a maximum log level.
pub fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries only the summary.
pub fn init_logging(verbose: u8) -> Result<()> {
    let stderr_layer = Layer::new()
        .with_writer(std::io::stderr.with_max_level(level_for(verbose)))
        .with_target(false);

    let subscriber = Registry::default().with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install log subscriber")
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::level_for;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), Level::WARN);
        assert_eq!(level_for(1), Level::INFO);
        assert_eq!(level_for(2), Level::DEBUG);
        assert_eq!(level_for(7), Level::TRACE);
    }
}
