#![cfg(all(feature = "test-support", target_os = "linux"))]

#[path = "harness_support.rs"]
mod support;

use std::thread;
use std::time::{Duration, Instant};

use emulator_harness::{EmulatorHarness, HarnessError, Interrupt};
use nix::sys::signal::{kill, Signal};
use nix::unistd::getpid;
use support::{fake_emulator, quick_config, read_pids, sh, wait_until_dead};

// Installs a process-wide SIGINT handler, so it lives alone in this binary.
#[test]
fn sigint_during_test_run_stops_the_emulators() {
    let (config, dir) = quick_config(
        fake_emulator(["--spawn-child", "--pid-file", "emulator.pids"]),
        sh("sleep 30"),
    );
    let config = config.with_test_timeout(Duration::from_secs(60));
    let env_file = dir.path().join(".env");

    let interrupt = Interrupt::new();
    interrupt.install_handler().expect("handler should install");

    let sender = thread::spawn(move || {
        let start = Instant::now();
        while !env_file.exists() && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(20));
        }
        // Let the test suite get going before interrupting it.
        thread::sleep(Duration::from_millis(300));
        kill(getpid(), Signal::SIGINT).expect("SIGINT should be delivered");
    });

    let started = Instant::now();
    let err = EmulatorHarness::new(config)
        .with_interrupt(interrupt.clone())
        .run()
        .unwrap_err();
    sender.join().unwrap();

    assert!(matches!(err, HarnessError::Interrupted), "{err:?}");
    assert!(interrupt.is_triggered());
    assert!(started.elapsed() < Duration::from_secs(20));

    let pids = read_pids(&dir.path().join("emulator.pids"));
    assert_eq!(pids.len(), 2);
    for pid in pids {
        assert!(
            wait_until_dead(pid, Duration::from_secs(2)),
            "process {pid} survived the interrupt"
        );
    }
}
