// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::try_create_layers;
use tracing::subscriber::DefaultGuard;
use tracing_core::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Where formatted events go, and how verbose they are.
///
/// Fields:
/// - `writer_config`: [`WriterConfig`] - Zero, one, or two writers.
/// - `level_filter`: [`LevelFilter`] - Events above this level are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
}

/// The display half of a [`WriterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
}

/// The `String` payloads are the log file path, eg: `/tmp/dispatch.log`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriterConfig {
    #[default]
    None,
    Display(DisplayPreference),
    File(String),
    DisplayAndFile(DisplayPreference, String),
}

impl TracingConfig {
    /// Log to stderr at the given level. Stdout is left alone so it stays usable for the
    /// host program's own output.
    #[must_use]
    pub fn new_display(level_filter: impl Into<LevelFilter>) -> Self {
        Self {
            writer_config: WriterConfig::Display(DisplayPreference::Stderr),
            level_filter: level_filter.into(),
        }
    }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }

    /// Installs the layers as the process wide default subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file can't be created, or if a global subscriber has
    /// already been installed.
    pub fn install_global(self) -> miette::Result<()> {
        let layers = try_create_layers(self)?.unwrap_or_default();
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|err| miette::miette!("Failed to install global subscriber: {err}"))
    }

    /// Installs the layers for the current thread only, until the returned guard is
    /// dropped. Tests use this so they don't fight over the global default.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file can't be created.
    pub fn install_thread_local(self) -> miette::Result<DefaultGuard> {
        let layers = try_create_layers(self)?.unwrap_or_default();
        let subscriber = tracing_subscriber::registry().with(layers);
        Ok(tracing::subscriber::set_default(subscriber))
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            writer_config: WriterConfig::None,
            level_filter: LevelFilter::OFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    fn test_new_display_uses_stderr() {
        let config = TracingConfig::new_display(tracing::Level::DEBUG);
        assert_eq!(
            config.get_writer_config(),
            WriterConfig::Display(DisplayPreference::Stderr)
        );
        assert_eq!(config.get_level_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_default_is_silent() {
        let config = TracingConfig::default();
        assert_eq!(config.writer_config, WriterConfig::None);
        assert_eq!(config.level_filter, LevelFilter::OFF);
    }

    #[test]
    fn test_install_thread_local_scopes_subscriber() {
        let guard = TracingConfig::new_display(LevelFilter::TRACE)
            .install_thread_local()
            .unwrap();
        assert!(tracing::enabled!(tracing::Level::TRACE));
        drop(guard);
    }

    /// The only test in the crate that touches the process-wide subscriber.
    #[test]
    #[serial]
    fn test_install_global_only_once() {
        assert!(TracingConfig::default().install_global().is_ok());
        assert!(TracingConfig::default().install_global().is_err());
    }
}
