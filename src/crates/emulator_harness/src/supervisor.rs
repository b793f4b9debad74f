use std::fs::File;
use std::path::Path;
use std::process::{Child, ExitStatus, Stdio};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::CommandSpec;
use crate::error::{HarnessError, HarnessResult};
use crate::interrupt::Interrupt;
use crate::process_group::{self, GroupSignal};

/// Starts and stops child processes, each in its own process group.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor<C = SystemClock> {
    clock: C,
    poll_interval: Duration,
    shutdown_grace: Duration,
    interrupt: Interrupt,
}

impl<C: Clock + Clone> ProcessSupervisor<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            poll_interval: Duration::from_millis(50),
            shutdown_grace: Duration::from_secs(10),
            interrupt: Interrupt::default(),
        }
    }

    /// Stop waiting on a foreground process once `interrupt` trips.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Interval between exit checks while waiting on a child.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Time a background process gets between SIGTERM and SIGKILL.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Start a long-lived process with its output redirected to the given files.
    ///
    /// The returned handle stops the whole process group when shut down or dropped.
    pub fn start_background(
        &self,
        spec: &CommandSpec,
        stdout: File,
        stderr: File,
        working_directory: Option<&Path>,
    ) -> HarnessResult<BackgroundProcess<C>> {
        let mut cmd = spec.to_command();
        if let Some(dir) = working_directory {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(stdout));
        cmd.stderr(Stdio::from(stderr));
        process_group::isolate(&mut cmd);

        let child = cmd
            .spawn()
            .map_err(|err| HarnessError::process_start(spec, err))?;
        debug!(command = %spec, pid = child.id(), "started background process");

        Ok(BackgroundProcess {
            child: Some(child),
            command: spec.to_string(),
            clock: self.clock.clone(),
            poll_interval: self.poll_interval,
            shutdown_grace: self.shutdown_grace,
        })
    }

    /// Run `spec` to completion, killing its process group if it outlives `timeout`.
    ///
    /// Returns the exit status when the process finishes in time and
    /// [`HarnessError::TestRunTimeout`] when it had to be killed. The group is
    /// also killed and reaped when waiting fails or the run is interrupted.
    pub fn run_with_timeout(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
        working_directory: Option<&Path>,
    ) -> HarnessResult<ExitStatus> {
        let mut cmd = spec.to_command();
        if let Some(dir) = working_directory {
            cmd.current_dir(dir);
        }
        process_group::isolate(&mut cmd);

        let mut child = cmd
            .spawn()
            .map_err(|err| HarnessError::process_start(spec, err))?;

        self.wait_for(&mut child, spec, timeout).map_err(|err| {
            kill_and_reap(&mut child, spec);
            err
        })
    }

    fn wait_for(
        &self,
        child: &mut Child,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> HarnessResult<ExitStatus> {
        let started = self.clock.now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }

            if self.clock.now().duration_since(started) >= timeout {
                warn!(command = %spec, ?timeout, "did not finish in time, killing");
                return Err(HarnessError::TestRunTimeout {
                    command: spec.to_string(),
                    timeout,
                });
            }

            if let Err(err) = self.interrupt.check() {
                warn!(command = %spec, "interrupted, killing");
                return Err(err);
            }

            self.clock.sleep(self.poll_interval);
        }
    }
}

fn kill_and_reap(child: &mut Child, spec: &CommandSpec) {
    if let Err(err) = process_group::signal_group(child, GroupSignal::Kill) {
        warn!(command = %spec, %err, "failed to kill process group");
    }
    if let Err(err) = child.wait() {
        warn!(command = %spec, %err, "failed to reap process");
    }
}

/// Handle to a process started with [`ProcessSupervisor::start_background`].
///
/// The process group is stopped exactly once: by [`shutdown`](Self::shutdown),
/// or on drop if `shutdown` was never reached.
pub struct BackgroundProcess<C: Clock = SystemClock> {
    child: Option<Child>,
    command: String,
    clock: C,
    poll_interval: Duration,
    shutdown_grace: Duration,
}

impl<C: Clock> BackgroundProcess<C> {
    /// Pid of the group leader, while it is still owned by this handle.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Exit status if the process has already terminated on its own.
    pub fn try_exit_status(&mut self) -> HarnessResult<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => Ok(child.try_wait()?),
            None => Ok(None),
        }
    }

    /// Terminate the process group and wait for the leader to exit.
    pub fn shutdown(mut self) -> HarnessResult<Option<ExitStatus>> {
        self.stop()
    }

    fn stop(&mut self) -> HarnessResult<Option<ExitStatus>> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };

        info!(command = %self.command, "stopping process group");
        if let Err(err) = process_group::signal_group(&mut child, GroupSignal::Terminate) {
            warn!(command = %self.command, %err, "SIGTERM failed, killing");
            process_group::signal_group(&mut child, GroupSignal::Kill)?;
            return Ok(Some(child.wait()?));
        }

        let started = self.clock.now();
        loop {
            if let Some(status) = child.try_wait()? {
                debug!(command = %self.command, %status, "process group stopped");
                return Ok(Some(status));
            }

            if self.clock.now().duration_since(started) >= self.shutdown_grace {
                warn!(
                    command = %self.command,
                    grace = ?self.shutdown_grace,
                    "still running after SIGTERM, killing"
                );
                process_group::signal_group(&mut child, GroupSignal::Kill)?;
                return Ok(Some(child.wait()?));
            }

            self.clock.sleep(self.poll_interval);
        }
    }
}

impl<C: Clock> Drop for BackgroundProcess<C> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(command = %self.command, %err, "failed to stop process group");
        }
    }
}
