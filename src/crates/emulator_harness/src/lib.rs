//! Starts local auth/database emulators, scrapes the addresses they bind from
//! their log output, writes the runtime config the application reads, and
//! runs the test suite against them.
//!
//! Typical usage:
//! ```no_run
//! use emulator_harness::{CommandSpec, EmulatorHarness, RunConfig};
//! use std::time::Duration;
//!
//! let config = RunConfig::default()
//!     .with_test_runner(CommandSpec::new("cargo").with_args(["test", "--workspace"]))
//!     .with_test_timeout(Duration::from_secs(300));
//!
//! let report = EmulatorHarness::new(config).run().expect("emulators should start");
//! if report.failed {
//!     println!("{}", report.message);
//! }
//! std::process::exit(report.exit_code().into());
//! ```

mod clock;
mod config;
mod error;
mod extract;
mod harness;
mod interrupt;
mod process_group;
mod runtime_config;
mod supervisor;
mod tail;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CommandSpec, RunConfig, TailConfig, DEFAULT_REQUIRED_EMULATORS};
pub use error::{HarnessError, HarnessResult};
pub use extract::{parse_emulator_row, AddressExtractor, EmulatorAddresses, EmulatorRow};
pub use harness::{EmulatorHarness, RunReport};
pub use interrupt::Interrupt;
pub use runtime_config::{RuntimeConfig, AUTH_EMULATOR};
pub use supervisor::{BackgroundProcess, ProcessSupervisor};
pub use tail::LineTailer;
