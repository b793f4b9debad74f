use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::{TailConfig, DEFAULT_REQUIRED_EMULATORS};
use crate::error::{HarnessError, HarnessResult};
use crate::interrupt::Interrupt;
use crate::tail::LineTailer;

/// Column separator of the emulator status table.
const CELL: char = '│';

/// One row of the emulator status table, e.g.
/// `│ Authentication │ localhost:9099 │ http://127.0.0.1:4000/auth │`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorRow<'a> {
    pub name: &'a str,
    pub host: &'a str,
}

/// Parse a status table row, ignoring anything that is not shaped like one.
///
/// The row must open and close with the cell separator and hold exactly three
/// cells. Cells are trimmed, name and host must be non-empty, and neither the
/// host nor the UI link may contain whitespace. That keeps the table header out.
pub fn parse_emulator_row(line: &str) -> Option<EmulatorRow<'_>> {
    let inner = line
        .trim()
        .strip_prefix(CELL)?
        .strip_suffix(CELL)?;

    let mut cells = inner.split(CELL).map(str::trim);
    let name = cells.next()?;
    let host = cells.next()?;
    let ui = cells.next()?;
    if cells.next().is_some() {
        return None;
    }

    let spaced = |cell: &str| cell.contains(char::is_whitespace);
    if name.is_empty() || host.is_empty() || spaced(host) || spaced(ui) {
        return None;
    }

    Some(EmulatorRow { name, host })
}

/// Emulator name to `host:port`, in the order the names were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorAddresses {
    entries: Vec<(String, String)>,
}

impl EmulatorAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an address. A name seen before keeps its position and takes the new host.
    pub fn insert(&mut self, name: impl Into<String>, host: impl Into<String>) {
        let name = name.into();
        let host = host.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = host,
            None => self.entries.push((name, host)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, host)| host.as_str())
    }

    pub fn contains_all<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|name| self.get(name.as_ref()).is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, host)| (name.as_str(), host.as_str()))
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

impl fmt::Display for EmulatorAddresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (name, host)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name:?}: {host:?}")?;
        }
        f.write_str("}")
    }
}

/// Scrapes emulator addresses out of the emulator suite's log output.
#[derive(Debug, Clone)]
pub struct AddressExtractor {
    required: Vec<String>,
    timeout: Duration,
    interrupt: Interrupt,
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_EMULATORS)
    }
}

impl AddressExtractor {
    /// Extractor that waits for every name in `required`, for up to a minute.
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            timeout: Duration::from_secs(60),
            interrupt: Interrupt::default(),
        }
    }

    /// Override the overall discovery timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Give up with [`HarnessError::Interrupted`] once `interrupt` trips.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Tail the log at `path` until every required emulator has reported its address.
    pub fn extract_from_log<C: Clock>(
        &self,
        path: impl AsRef<Path>,
        tail: TailConfig,
        clock: C,
    ) -> HarnessResult<EmulatorAddresses> {
        let mut tailer = LineTailer::open_with_clock(path, tail, clock)
            .map_err(HarnessError::address_parse)?
            .with_interrupt(self.interrupt.clone());
        let addresses = self.extract(&mut tailer);
        tailer.close();
        addresses
    }

    /// Consume lines from `tailer` until every required emulator is known.
    ///
    /// Returns as soon as the last required row is read; later lines stay
    /// unread in the tailer. Every failure, including the overall timeout and
    /// the tailer's per-line timeout, comes back as
    /// [`HarnessError::AddressParse`] wrapping the cause. Interruption is the
    /// exception and comes back as [`HarnessError::Interrupted`].
    pub fn extract<R: Read, C: Clock>(
        &self,
        tailer: &mut LineTailer<R, C>,
    ) -> HarnessResult<EmulatorAddresses> {
        self.scan(tailer).map_err(HarnessError::address_parse)
    }

    fn scan<R: Read, C: Clock>(
        &self,
        tailer: &mut LineTailer<R, C>,
    ) -> HarnessResult<EmulatorAddresses> {
        let deadline = tailer.clock().now() + self.timeout;
        let mut addresses = EmulatorAddresses::new();

        if addresses.contains_all(&self.required) {
            return Ok(addresses);
        }

        loop {
            let Some(line) = tailer.next_line_by(Some(deadline))? else {
                return Err(HarnessError::AddressTimeout(self.timeout));
            };
            trace!(%line, "emulator output");

            if let Some(row) = parse_emulator_row(&line) {
                debug!(name = row.name, host = row.host, "found emulator row");
                addresses.insert(row.name, row.host);
                if addresses.contains_all(&self.required) {
                    return Ok(addresses);
                }
            }

            if tailer.clock().now() >= deadline {
                return Err(HarnessError::AddressTimeout(self.timeout));
            }
        }
    }
}
