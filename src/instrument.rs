//! Structured call instrumentation.
//!
//! [`Instrumentation::run`] wraps a fallible operation and emits a fixed
//! sequence of `tracing` events around it:
//!
//! ```text
//! INFO  >>> Starting accounts.change_photo
//! DEBUG >>> accounts.change_photo filename[0](&str): "me.png"
//! INFO  Successfully ended accounts.change_photo      (or the failure event)
//! DEBUG accounts.change_photo return value (String): "/media/avatars/jdoe.png"
//! INFO  <<< Exiting accounts.change_photo
//! ```
//!
//! All events are emitted inside an `op` span carrying the operation name and
//! the acting user (`-` when anonymous).

use std::error::Error as StdError;
use std::fmt::Debug;

use tracing::Level;

use crate::config::LoggingConfig;

/// One logged argument of an instrumented call.
pub struct Arg<'a> {
    name: &'a str,
    type_name: &'static str,
    value: &'a dyn Debug,
}

/// Capture a named argument together with its type name.
pub fn arg<'a, T: Debug>(name: &'a str, value: &'a T) -> Arg<'a> {
    Arg {
        name,
        type_name: std::any::type_name::<T>(),
        value,
    }
}

/// Emits start, argument, outcome and exit events around operations.
#[derive(Debug, Clone)]
pub struct Instrumentation {
    operations: Vec<String>,
    error_level: Level,
    trace: bool,
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::from_config(&LoggingConfig::default())
    }
}

impl Instrumentation {
    /// Create a wrapper for the listed operations (empty means all).
    pub fn new(operations: Vec<String>, error_level: Level, trace: bool) -> Self {
        Self {
            operations,
            error_level,
            trace,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(
            config.operations.clone(),
            config.error_level.into(),
            config.trace,
        )
    }

    /// Whether `op` is routed through the wrapper.
    pub fn is_instrumented(&self, op: &str) -> bool {
        self.operations.is_empty() || self.operations.iter().any(|o| o == op)
    }

    /// Run `work` as operation `op`, logging around it.
    ///
    /// The result of `work` is returned unchanged. Operations not listed in
    /// the configuration run without any events.
    pub fn run<T, E, F>(&self, op: &str, user: Option<&str>, args: &[Arg<'_>], work: F) -> Result<T, E>
    where
        T: Debug,
        E: StdError,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.is_instrumented(op) {
            return work();
        }

        let span = tracing::info_span!("op", operation = op, user = user.unwrap_or("-"));
        let _guard = span.enter();

        tracing::info!(">>> Starting {}", op);
        for (i, arg) in args.iter().enumerate() {
            tracing::debug!(
                ">>> {} {}[{}]({}):\n{:#?}\n",
                op,
                arg.name,
                i,
                arg.type_name,
                arg.value
            );
        }

        let result = work();

        match &result {
            Ok(value) => {
                tracing::info!(outcome = "success", "Successfully ended {}", op);
                tracing::debug!(
                    "{} return value ({}):\n{:#?}\n",
                    op,
                    std::any::type_name::<T>(),
                    value
                );
            }
            Err(err) => self.log_failure(op, err),
        }

        tracing::info!("<<< Exiting {}", op);

        result
    }

    fn log_failure(&self, op: &str, err: &dyn StdError) {
        let chain = if self.trace { error_chain(err) } else { String::new() };

        macro_rules! failure {
            ($macro:ident) => {
                tracing::$macro!(
                    outcome = "failure",
                    chain = %chain,
                    "Unhandled error in {}: \"{}\". It may be handled later",
                    op,
                    err
                )
            };
        }

        match self.error_level {
            Level::ERROR => failure!(error),
            Level::WARN => failure!(warn),
            Level::INFO => failure!(info),
            Level::DEBUG => failure!(debug),
            _ => failure!(trace),
        }
    }
}

/// Render an error and all of its sources, outermost first.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
