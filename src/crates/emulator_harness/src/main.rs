//! Runs the test suite against freshly started Firebase emulators.

use std::process::ExitCode;

use emulator_harness::{EmulatorHarness, Interrupt, RunConfig, RunReport};
use tracing::warn;

fn main() -> ExitCode {
    // Logs go to stderr; stdout only carries the failure summary.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let interrupt = Interrupt::new();
    if let Err(err) = interrupt.install_handler() {
        warn!(%err, "Ctrl-C will not stop the emulators cleanly");
    }

    let report = EmulatorHarness::new(RunConfig::default())
        .with_interrupt(interrupt)
        .run()
        .unwrap_or_else(|err| {
            let mut report = RunReport::default();
            report.record(&err);
            report
        });

    if report.failed {
        println!("{}", report.message);
    }
    ExitCode::from(report.exit_code())
}
