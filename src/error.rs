//! Error types used by the wakevisor runtime, its tasks and its configuration.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: errors raised while driving the scheduler and its workers.
//! - [`TaskError`]: abnormal termination of a single task's execution context.
//! - [`ConfigError`]: malformed or unusable startup parameters.
//!
//! All of them provide `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` (human-readable details).
//!
//! Logic errors (sleeping a task that was never registered) are not represented
//! here: they cannot happen under correct use and panic instead.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the wakevisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some task contexts did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks whose contexts were still running.
        stuck: Vec<String>,
    },

    /// The driver refused to start because its configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use wakevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Config(_) => "runtime_invalid_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
            RuntimeError::Config(e) => e.as_message(),
        }
    }
}

/// # Abnormal termination of a task's execution context.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task's cycle panicked; its context is gone.
    #[error("task {task} panicked: {reason}")]
    Panicked {
        /// Name of the task.
        task: String,
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use wakevisor::TaskError;
    ///
    /// let err = TaskError::Panicked { task: "worker-1".into(), reason: "boom".into() };
    /// assert_eq!(err.as_label(), "task_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Panicked { reason, .. } => format!("panic: {reason}"),
        }
    }
}

/// # Startup parameter errors.
///
/// Detected before any scheduler or worker is built.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The worker count must be positive.
    #[error("worker count must be positive")]
    NoWorkers,

    /// The sleep range can produce a zero target, which makes the error rate undefined.
    #[error("sleep range {min:?}..{max:?} can yield a zero target")]
    ZeroSleep {
        /// Configured lower bound.
        min: Duration,
        /// Configured upper bound.
        max: Duration,
    },

    /// A command-line argument could not be used.
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument {
        /// Argument name (`workers`, `min_ms`, `max_ms`, `argc`).
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NoWorkers => "config_no_workers",
            ConfigError::ZeroSleep { .. } => "config_zero_sleep",
            ConfigError::InvalidArgument { .. } => "config_invalid_argument",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConfigError::NoWorkers => "workers=0".to_string(),
            ConfigError::ZeroSleep { min, max } => format!("min={min:?} max={max:?}"),
            ConfigError::InvalidArgument { name, reason } => format!("{name}: {reason}"),
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_render_as_text() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }

    #[test]
    fn config_error_converts_into_runtime_error() {
        let err: RuntimeError = ConfigError::NoWorkers.into();
        assert_eq!(err.as_label(), "runtime_invalid_config");
        assert_eq!(err.as_message(), "workers=0");
    }

    #[test]
    fn labels_are_stable() {
        let zero = ConfigError::ZeroSleep {
            min: Duration::ZERO,
            max: Duration::ZERO,
        };
        assert_eq!(zero.as_label(), "config_zero_sleep");
        let arg = ConfigError::InvalidArgument {
            name: "workers",
            reason: "not a number".into(),
        };
        assert_eq!(arg.to_string(), "invalid argument workers: not a number");
    }
}
