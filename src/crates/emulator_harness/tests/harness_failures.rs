#![cfg(feature = "test-support")]

#[path = "harness_support.rs"]
mod support;

use std::time::Duration;

use emulator_harness::{EmulatorHarness, HarnessError};
use support::{fake_emulator, quick_config, sh};

#[test]
fn failing_test_suite_fails_the_run() {
    let (config, _dir) = quick_config(fake_emulator(Vec::<String>::new()), sh("exit 2"));

    let report = EmulatorHarness::new(config).run().expect("run should complete");

    assert!(report.failed);
    assert!(report.message.contains('2'), "message: {}", report.message);
    assert!(report.message.contains("sh -c exit 2"), "message: {}", report.message);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn emulators_dying_mid_run_fail_the_run() {
    let (config, _dir) = quick_config(
        fake_emulator(["--exit-after-ms", "100", "--exit-code", "1"]),
        sh("sleep 1"),
    );

    let report = EmulatorHarness::new(config).run().expect("run should complete");

    assert!(report.failed);
    assert!(
        report.message.contains("emulators terminated early"),
        "message: {}",
        report.message
    );
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn both_failures_are_reported_together() {
    let (config, _dir) = quick_config(
        fake_emulator(["--exit-after-ms", "50", "--exit-code", "1"]),
        sh("sleep 0.5; exit 3"),
    );

    let report = EmulatorHarness::new(config).run().expect("run should complete");

    assert!(report.failed);
    assert!(report.message.contains("`sh -c sleep 0.5; exit 3` failed"));
    assert!(report.message.contains("emulators terminated early"));
}

#[test]
fn hung_test_suite_is_killed_and_reported() {
    let (config, _dir) = quick_config(fake_emulator(Vec::<String>::new()), sh("sleep 30"));
    let config = config.with_test_timeout(Duration::from_millis(300));

    let report = EmulatorHarness::new(config).run().expect("run should complete");

    assert!(report.failed);
    assert!(
        report.message.contains("did not finish within"),
        "message: {}",
        report.message
    );
}

#[test]
fn missing_database_row_aborts_with_parse_error() {
    let (config, dir) = quick_config(fake_emulator(["--skip-database"]), sh("true"));
    let config = config.with_address_timeout(Duration::from_millis(500));

    let err = EmulatorHarness::new(config).run().unwrap_err();

    match &err {
        HarnessError::AddressParse(cause) => {
            assert!(matches!(**cause, HarnessError::AddressTimeout(_)), "{cause:?}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_timeout());
    assert!(!dir.path().join(".env").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn emulator_group_is_stopped_when_extraction_fails() {
    use support::{read_pids, wait_until_dead};

    let (config, dir) = quick_config(
        fake_emulator([
            "--skip-database",
            "--spawn-child",
            "--pid-file",
            "emulator.pids",
        ]),
        sh("true"),
    );
    let config = config.with_address_timeout(Duration::from_millis(500));

    EmulatorHarness::new(config).run().unwrap_err();

    let pids = read_pids(&dir.path().join("emulator.pids"));
    assert_eq!(pids.len(), 2);
    for pid in pids {
        assert!(
            wait_until_dead(pid, Duration::from_secs(2)),
            "process {pid} survived cleanup"
        );
    }
}

#[cfg(target_os = "linux")]
#[test]
fn emulator_group_is_stopped_after_successful_run() {
    use support::{read_pids, wait_until_dead};

    let (config, dir) = quick_config(
        fake_emulator(["--spawn-child", "--pid-file", "emulator.pids"]),
        sh("true"),
    );

    let report = EmulatorHarness::new(config).run().expect("run should complete");
    assert!(!report.failed, "unexpected failure: {}", report.message);

    for pid in read_pids(&dir.path().join("emulator.pids")) {
        assert!(
            wait_until_dead(pid, Duration::from_secs(2)),
            "process {pid} survived cleanup"
        );
    }
}

#[cfg(target_os = "linux")]
#[test]
fn emulator_group_is_stopped_when_test_runner_cannot_start() {
    use emulator_harness::CommandSpec;
    use support::{read_pids, wait_until_dead};

    let (config, dir) = quick_config(
        fake_emulator(["--spawn-child", "--pid-file", "emulator.pids"]),
        CommandSpec::new("/nonexistent/test-runner"),
    );

    let err = EmulatorHarness::new(config).run().unwrap_err();

    assert!(matches!(err, HarnessError::ProcessStart(_)), "{err:?}");
    let pids = read_pids(&dir.path().join("emulator.pids"));
    assert_eq!(pids.len(), 2);
    for pid in pids {
        assert!(
            wait_until_dead(pid, Duration::from_secs(2)),
            "process {pid} survived cleanup"
        );
    }
}

#[cfg(target_os = "linux")]
#[test]
fn emulator_group_is_stopped_after_test_timeout() {
    use support::{read_pids, wait_until_dead};

    let (config, dir) = quick_config(
        fake_emulator(["--spawn-child", "--pid-file", "emulator.pids"]),
        sh("sleep 30"),
    );
    let config = config.with_test_timeout(Duration::from_millis(300));

    let report = EmulatorHarness::new(config).run().expect("run should complete");

    assert!(report.failed);
    assert!(report.message.contains("did not finish within"), "message: {}", report.message);
    let pids = read_pids(&dir.path().join("emulator.pids"));
    assert_eq!(pids.len(), 2);
    for pid in pids {
        assert!(
            wait_until_dead(pid, Duration::from_secs(2)),
            "process {pid} survived cleanup"
        );
    }
}
