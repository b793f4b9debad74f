//! Process-group isolation and group-wide signalling.
//!
//! Every child the harness starts leads its own process group so the
//! emulators, and anything they fork, can be stopped with one signal. All
//! platform-specific code for that lives here.

use std::io;
use std::process::{Child, Command};

/// Signal delivered to a whole process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSignal {
    /// Ask politely (SIGTERM).
    Terminate,
    /// Force (SIGKILL).
    Kill,
}

/// Make the command's child the leader of a new process group.
#[cfg(unix)]
pub(crate) fn isolate(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    cmd.process_group(0);
}

/// Send `signal` to the process group led by `child`.
///
/// A group that no longer exists counts as success.
#[cfg(unix)]
pub(crate) fn signal_group(child: &mut Child, signal: GroupSignal) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(child.id())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    let signal = match signal {
        GroupSignal::Terminate => Signal::SIGTERM,
        GroupSignal::Kill => Signal::SIGKILL,
    };

    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(io::Error::from(err)),
    }
}

#[cfg(not(unix))]
pub(crate) fn isolate(_cmd: &mut Command) {}

// Without process groups the best available action is killing the direct child.
#[cfg(not(unix))]
pub(crate) fn signal_group(child: &mut Child, _signal: GroupSignal) -> io::Result<()> {
    match child.kill() {
        Err(err) if err.kind() != io::ErrorKind::InvalidInput => Err(err),
        _ => Ok(()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn killing_the_group_stops_the_leader() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        isolate(&mut cmd);
        let mut child = cmd.spawn().expect("sleep should start");

        signal_group(&mut child, GroupSignal::Kill).expect("signal should be delivered");
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(nix::libc::SIGKILL));
    }

    #[test]
    fn signalling_a_reaped_group_is_not_an_error() {
        let mut cmd = Command::new("true");
        isolate(&mut cmd);
        let mut child = cmd.spawn().expect("true should start");
        child.wait().unwrap();

        signal_group(&mut child, GroupSignal::Terminate).expect("missing group is fine");
    }
}
