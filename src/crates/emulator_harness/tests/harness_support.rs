#![cfg(feature = "test-support")]
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use emulator_harness::{CommandSpec, RunConfig, TailConfig};
use tempfile::TempDir;

pub fn fake_emulator_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_fake_emulator") {
        return PathBuf::from(path);
    }

    // Fallback to the workspace target directory.
    let mut path = std::env::current_exe().expect("current exe");
    path.pop(); // deps
    path.pop(); // debug or release
    path.push("fake_emulator");
    if cfg!(windows) {
        path.set_extension("exe");
    }
    path
}

pub fn fake_emulator<I, S>(args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandSpec::new(fake_emulator_path().display().to_string()).with_args(args)
}

pub fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").with_args(["-c", script])
}

/// Run config with short timeouts rooted in a fresh temporary directory.
pub fn quick_config(emulator: CommandSpec, test_runner: CommandSpec) -> (RunConfig, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = RunConfig::default()
        .with_working_directory(dir.path())
        .with_emulator(emulator)
        .with_test_runner(test_runner)
        .with_tail(
            TailConfig::default()
                .with_wait_interval(Duration::from_millis(20))
                .with_line_timeout(Duration::from_secs(5)),
        )
        .with_address_timeout(Duration::from_secs(10))
        .with_test_timeout(Duration::from_secs(10))
        .with_poll_interval(Duration::from_millis(10))
        .with_shutdown_grace(Duration::from_secs(2));
    (config, dir)
}

pub fn read_pids(path: &Path) -> Vec<u32> {
    fs::read_to_string(path)
        .expect("pid file should be written")
        .lines()
        .map(|line| line.trim().parse().expect("pid should be numeric"))
        .collect()
}

/// Whether `pid` names a live process. Zombies count as dead.
#[cfg(target_os = "linux")]
pub fn is_alive(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z" && state != "X"),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
pub fn wait_until_dead(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !is_alive(pid) {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    !is_alive(pid)
}
