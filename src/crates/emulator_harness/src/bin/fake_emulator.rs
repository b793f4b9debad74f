//! Stand-in for `firebase emulators:start` used by the integration tests.
//!
//! Prints the same status table the real emulator suite prints, then idles
//! until it is signalled or its configured lifetime runs out.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, ExitCode, Stdio};
use std::thread;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Parser)]
struct Args {
    /// Port reported for the Authentication emulator.
    #[arg(long, default_value_t = 9099)]
    auth_port: u16,
    /// Port reported for the Database emulator.
    #[arg(long, default_value_t = 9000)]
    database_port: u16,
    /// Leave the Database row out of the table.
    #[arg(long)]
    skip_database: bool,
    /// Delay before the table is printed.
    #[arg(long, default_value_t = 0)]
    startup_delay_ms: u64,
    /// Exit on our own after this long instead of waiting to be killed.
    #[arg(long)]
    exit_after_ms: Option<u64>,
    /// Exit code used together with `--exit-after-ms`.
    #[arg(long, default_value_t = 0)]
    exit_code: u8,
    /// Start a long-running child in the same process group.
    #[arg(long)]
    spawn_child: bool,
    /// Write our pid (and the child's, if any) to this file, one per line.
    #[arg(long)]
    pid_file: Option<PathBuf>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut pids = vec![std::process::id()];
    if args.spawn_child {
        let child = Command::new("sleep")
            .arg("300")
            .stdout(Stdio::null())
            .spawn()?;
        pids.push(child.id());
    }
    if let Some(path) = &args.pid_file {
        let contents: String = pids.iter().map(|pid| format!("{pid}\n")).collect();
        fs::write(path, contents)?;
    }

    thread::sleep(Duration::from_millis(args.startup_delay_ms));

    let mut out = io::stdout().lock();
    writeln!(out, "i  emulators: Starting emulators: auth, database")?;
    writeln!(out, "i  ui: Emulator UI logging to ui-debug.log")?;
    writeln!(out)?;
    writeln!(out, "┌────────────────┬────────────────┬─────────────────────────────────┐")?;
    writeln!(out, "│ Emulator       │ Host:Port      │ View in Emulator UI             │")?;
    writeln!(out, "├────────────────┼────────────────┼─────────────────────────────────┤")?;
    writeln!(
        out,
        "│ Authentication │ {:<14} │ http://127.0.0.1:4000/auth      │",
        format!("localhost:{}", args.auth_port)
    )?;
    out.flush()?;
    if !args.skip_database {
        writeln!(
            out,
            "│ Database       │ {:<14} │ http://127.0.0.1:4000/database  │",
            format!("localhost:{}", args.database_port)
        )?;
    }
    writeln!(out, "└────────────────┴────────────────┴─────────────────────────────────┘")?;
    out.flush()?;
    drop(out);

    match args.exit_after_ms {
        Some(ms) => {
            thread::sleep(Duration::from_millis(ms));
            Ok(ExitCode::from(args.exit_code))
        }
        None => loop {
            thread::sleep(Duration::from_secs(60));
        },
    }
}
