use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{HarnessError, HarnessResult};

/// Shared flag tripped when the harness is asked to stop from outside.
///
/// Every waiting loop checks it, so an interrupted run still unwinds through
/// emulator cleanup instead of dying with the emulators left running.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip this flag on SIGINT, SIGTERM or SIGHUP.
    ///
    /// Only one handler can be installed per process.
    pub fn install_handler(&self) -> HarnessResult<()> {
        let flag = self.flag.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
        Ok(())
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`HarnessError::Interrupted`] once the flag is tripped.
    pub(crate) fn check(&self) -> HarnessResult<()> {
        if self.is_triggered() {
            return Err(HarnessError::Interrupted);
        }
        Ok(())
    }
}
