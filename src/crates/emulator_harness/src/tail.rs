use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::config::TailConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::interrupt::Interrupt;

/// Follows a file that another process keeps appending to and hands out
/// complete lines in the order they were written.
///
/// The read position only moves forward. Bytes of a line that is still being
/// written are kept until its newline shows up, so a multi-byte character
/// split across two writes is decoded correctly. Returned lines have their
/// terminator stripped.
pub struct LineTailer<R, C = SystemClock> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    config: TailConfig,
    clock: C,
    interrupt: Interrupt,
    failed: bool,
}

impl LineTailer<File, SystemClock> {
    /// Open `path` and start tailing from its beginning.
    pub fn open(path: impl AsRef<Path>, config: TailConfig) -> HarnessResult<Self> {
        Self::open_with_clock(path, config, SystemClock)
    }
}

impl<C: Clock> LineTailer<File, C> {
    pub fn open_with_clock(
        path: impl AsRef<Path>,
        config: TailConfig,
        clock: C,
    ) -> HarnessResult<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file, config, clock))
    }
}

impl<R: Read, C: Clock> LineTailer<R, C> {
    pub fn new(source: R, config: TailConfig, clock: C) -> Self {
        Self {
            reader: BufReader::new(source),
            pending: Vec::new(),
            config,
            clock,
            interrupt: Interrupt::default(),
            failed: false,
        }
    }

    /// Stop waiting with [`HarnessError::Interrupted`] once `interrupt` trips.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Block until the next complete line, failing with
    /// [`HarnessError::LineTimeout`] when none arrives within the line timeout.
    pub fn next_line(&mut self) -> HarnessResult<String> {
        match self.next_line_by(None)? {
            Some(line) => Ok(line),
            None => Err(HarnessError::LineTimeout(self.config.line_timeout)),
        }
    }

    /// Like [`next_line`](Self::next_line) but also gives up at `deadline`,
    /// returning `Ok(None)` if the deadline passes before a line completes.
    ///
    /// A partial line read before giving up is kept for the next call.
    pub fn next_line_by(&mut self, deadline: Option<Instant>) -> HarnessResult<Option<String>> {
        let started = self.clock.now();
        loop {
            if let Some(line) = self.read_complete_line()? {
                return Ok(Some(line));
            }

            let now = self.clock.now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                return Ok(None);
            }
            if now.duration_since(started) > self.config.line_timeout {
                return Err(HarnessError::LineTimeout(self.config.line_timeout));
            }
            self.interrupt.check()?;

            self.clock.sleep(self.config.wait_interval);
        }
    }

    /// Stop tailing and release the underlying file.
    pub fn close(self) {
        drop(self);
    }

    fn read_complete_line(&mut self) -> HarnessResult<Option<String>> {
        // At EOF this returns 0 and leaves any partial bytes in `pending`.
        self.reader.read_until(b'\n', &mut self.pending)?;
        if !self.pending.ends_with(b"\n") {
            return Ok(None);
        }

        let raw = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&raw);
        Ok(Some(text.trim_end_matches(['\n', '\r']).to_string()))
    }
}

impl<R: Read, C: Clock> Iterator for LineTailer<R, C> {
    type Item = HarnessResult<String>;

    /// Never ends on its own; after the first error the sequence is exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_line();
        self.failed = item.is_err();
        Some(item)
    }
}
