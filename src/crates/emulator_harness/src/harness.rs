use std::fmt::Write as _;
use std::fs::File;

use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::RunConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::extract::AddressExtractor;
use crate::interrupt::Interrupt;
use crate::runtime_config::RuntimeConfig;
use crate::supervisor::{BackgroundProcess, ProcessSupervisor};

/// Outcome of a run: whether anything went wrong and what.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub failed: bool,
    /// Every recorded failure, each followed by `"; "`.
    pub message: String,
}

impl RunReport {
    /// Mark the run as failed and append `cause` to the message.
    pub fn record(&mut self, cause: &HarnessError) {
        self.failed = true;
        let _ = write!(self.message, "{cause}; ");
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        u8::from(self.failed)
    }
}

/// Drives one full run: emulators up, addresses scraped, config written,
/// test suite executed, emulators torn down.
pub struct EmulatorHarness<C = SystemClock> {
    config: RunConfig,
    clock: C,
    interrupt: Interrupt,
}

impl EmulatorHarness<SystemClock> {
    pub fn new(config: RunConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock + Clone> EmulatorHarness<C> {
    pub fn with_clock(config: RunConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            interrupt: Interrupt::default(),
        }
    }

    /// Abort with [`HarnessError::Interrupted`] once `interrupt` trips.
    ///
    /// The emulators are still stopped before [`run`](Self::run) returns.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run.
    ///
    /// Test failures, a test timeout and emulators dying early are collected
    /// in the report. Anything else (failing to start the emulators or to find
    /// their addresses, an interrupt, I/O errors) aborts the run and is returned
    /// as an error.
    /// The emulators are stopped before this returns in every case.
    pub fn run(&self) -> HarnessResult<RunReport> {
        let config = &self.config;
        let supervisor = ProcessSupervisor::new(self.clock.clone())
            .with_poll_interval(config.poll_interval)
            .with_shutdown_grace(config.shutdown_grace)
            .with_interrupt(self.interrupt.clone());

        info!(command = %config.emulator, "starting emulators");
        let stdout = File::create(config.resolve(&config.stdout_log))?;
        let stderr = File::create(config.resolve(&config.stderr_log))?;
        let mut emulator = supervisor.start_background(
            &config.emulator,
            stdout,
            stderr,
            config.working_directory.as_deref(),
        )?;

        let outcome = self.drive(&supervisor, &mut emulator);

        info!("cleaning up");
        match emulator.shutdown() {
            Ok(status) => info!(?status, "emulators stopped"),
            Err(err) => warn!(%err, "failed to stop emulators"),
        }

        outcome
    }

    fn drive(
        &self,
        supervisor: &ProcessSupervisor<C>,
        emulator: &mut BackgroundProcess<C>,
    ) -> HarnessResult<RunReport> {
        let config = &self.config;
        let mut report = RunReport::default();

        let addresses = AddressExtractor::new(config.required_emulators.iter().cloned())
            .with_timeout(config.address_timeout)
            .with_interrupt(self.interrupt.clone())
            .extract_from_log(
                config.resolve(&config.stdout_log),
                config.tail,
                self.clock.clone(),
            )?;
        info!(%addresses, "emulators started");

        let env_file = config.resolve(&config.env_file);
        RuntimeConfig::from_addresses(&addresses)?.write_to(&env_file)?;
        self.interrupt.check()?;
        info!(
            path = %env_file.display(),
            command = %config.test_runner,
            "config written, running test suite"
        );

        match supervisor.run_with_timeout(
            &config.test_runner,
            config.test_timeout,
            config.working_directory.as_deref(),
        ) {
            Ok(status) if status.success() => info!("test suite passed"),
            Ok(status) => report.record(&HarnessError::TestRunFailed {
                command: config.test_runner.to_string(),
                status,
            }),
            Err(err @ HarnessError::TestRunTimeout { .. }) => report.record(&err),
            Err(err) => return Err(err),
        }

        // The emulators must outlive the test suite for its result to count.
        if let Some(status) = emulator.try_exit_status()? {
            report.record(&HarnessError::EmulatorExited(status));
        }

        Ok(report)
    }
}
