use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result alias for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while launching the emulators, scraping their
/// addresses or running the test suite against them.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to spawn {0}")]
    ProcessStart(String),
    #[error("waited for a log line for longer than {0:?}")]
    LineTimeout(Duration),
    #[error("did not find emulator addresses within {0:?}")]
    AddressTimeout(Duration),
    #[error("could not parse emulator output for host addresses: {0}")]
    AddressParse(#[source] Box<HarnessError>),
    #[error("no address was discovered for the {0} emulator")]
    MissingAddress(String),
    #[error("`{command}` did not finish within {timeout:?} and was killed")]
    TestRunTimeout { command: String, timeout: Duration },
    #[error("`{command}` failed with {status}")]
    TestRunFailed { command: String, status: ExitStatus },
    #[error("interrupted before the run finished")]
    Interrupted,
    #[error("failed to install interrupt handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
    #[error("emulators terminated early with {0}")]
    EmulatorExited(ExitStatus),
    #[error("failed to serialize runtime config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl HarnessError {
    pub(crate) fn process_start(command: impl std::fmt::Display, err: io::Error) -> Self {
        HarnessError::ProcessStart(format!("{command}: {err}"))
    }

    pub(crate) fn address_parse(cause: HarnessError) -> Self {
        match cause {
            passthrough @ (HarnessError::AddressParse(_) | HarnessError::Interrupted) => {
                passthrough
            }
            other => HarnessError::AddressParse(Box::new(other)),
        }
    }

    /// Whether this error, or anything it wraps, was caused by a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            HarnessError::LineTimeout(_)
            | HarnessError::AddressTimeout(_)
            | HarnessError::TestRunTimeout { .. } => true,
            HarnessError::AddressParse(inner) => inner.is_timeout(),
            _ => false,
        }
    }
}
