//! Pipeline assembly
//!
//! [`build`] runs the stages in order: validate, resolve the byte sinks for
//! the chosen mode, wrap them in buffers when asked, assemble one core per
//! destination into a [`Tee`], apply the logger options, and finally start
//! the level endpoint. Configuration errors surface before any file is opened.

use crate::config::{LoggerConfig, Mode};
use crate::core::{
    Encoder, LogCore, LogLevel, Logger, LoggerOptions, Result, SharedSink, Sink, Tee,
    DEFAULT_STACKTRACE_LEVEL,
};
use crate::level_server::LevelServer;
use crate::sinks::{BufferedSink, ConsoleSink, ReportSink, RotatingFileSink};

pub use crate::sinks::report::DEFAULT_REPORT_LEVEL;

/// Field carrying the configured project name
pub const PROJECT_KEY: &str = "project";

/// Destination sinks for the configured mode
pub struct ResolvedSinks {
    pub primary: Box<dyn Sink>,
    /// Receives error-and-above records only
    pub error: Option<Box<dyn Sink>>,
}

/// Open the sinks for `config.mode`
pub fn resolve_sinks(config: &LoggerConfig) -> Result<ResolvedSinks> {
    config.validate()?;

    match config.mode {
        Mode::Console => Ok(ResolvedSinks {
            primary: Box::new(ConsoleSink::new()),
            error: None,
        }),
        Mode::File => {
            let policy = config.rotation_policy();
            let primary = RotatingFileSink::with_policy(&config.file_name, policy.clone())?;

            let error: Option<Box<dyn Sink>> = if config.error_file_name.trim().is_empty() {
                None
            } else {
                Some(Box::new(RotatingFileSink::with_policy(
                    &config.error_file_name,
                    policy,
                )?))
            };

            Ok(ResolvedSinks {
                primary: Box::new(primary),
                error,
            })
        }
    }
}

/// Wrap the primary and error sinks, each on its own, in a [`BufferedSink`]
pub fn apply_buffering(sinks: ResolvedSinks, enabled: bool) -> ResolvedSinks {
    if !enabled {
        return sinks;
    }

    ResolvedSinks {
        primary: Box::new(BufferedSink::new(sinks.primary)),
        error: sinks
            .error
            .map(|sink| Box::new(BufferedSink::new(sink)) as Box<dyn Sink>),
    }
}

/// Build the cores in fixed order: primary, error, console copy, report
pub fn assemble(config: &LoggerConfig, sinks: ResolvedSinks) -> Result<Tee> {
    let encoder = Encoder::select(config.json, config.color);

    let mut cores = vec![LogCore::new(
        encoder,
        SharedSink::from_boxed(sinks.primary),
        config.level.clone(),
    )];

    if let Some(error) = sinks.error {
        cores.push(LogCore::new(
            encoder,
            SharedSink::from_boxed(error),
            LogLevel::Error,
        ));
    }

    if config.mode == Mode::File && config.console {
        cores.push(LogCore::new(
            encoder,
            SharedSink::new(ConsoleSink::new()),
            config.level.clone(),
        ));
    }

    if let Some(ref report) = config.report_config {
        cores.push(LogCore::new(
            Encoder::Json,
            SharedSink::new(ReportSink::new(report)?),
            report.level.clone(),
        ));
    }

    Ok(Tee::new(cores))
}

/// Options fixed on the logger for its lifetime
pub fn logger_options(config: &LoggerConfig) -> LoggerOptions {
    let skip = if config.add_caller { config.caller_skip } else { 0 };
    LoggerOptions::new()
        .with_caller(config.add_caller)
        .with_caller_skip(skip)
        .with_stacktrace(config.stacktrace.then_some(DEFAULT_STACKTRACE_LEVEL))
}

/// Wrap the tee in a logger carrying the configured options and project name
pub fn finalize(config: &LoggerConfig, tee: Tee) -> Logger {
    let logger = Logger::new(tee).with_options(logger_options(config));
    if config.name.is_empty() {
        logger
    } else {
        logger.with_field(PROJECT_KEY, config.name.as_str())
    }
}

/// Run every stage and start the level endpoint when a port is set
pub fn build(config: &LoggerConfig, server: &LevelServer) -> Result<Logger> {
    config.validate()?;

    let sinks = apply_buffering(resolve_sinks(config)?, config.async_write);
    let tee = assemble(config, sinks)?;
    let logger = finalize(config, tee);

    if config.port > 0 {
        server.start(config.port, config.level.clone(), &logger);
    }

    Ok(logger)
}
