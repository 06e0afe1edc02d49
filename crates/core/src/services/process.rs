//! Deadline-bounded child processes.
//!
//! The child gets its own process group so that a forced termination also takes
//! down anything it spawned; otherwise a surviving grandchild would keep the
//! output pipes open and block the readers. The group is only signalled while
//! the child is still unreaped, since afterwards its id may be reused.
//! On Linux that also covers a normal exit, observed without reaping.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::HarnessError;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Captured result of one bounded run.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status as reaped; after a forced kill this reflects the kill signal.
    pub status: std::process::ExitStatus,
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Signal that terminated the process, if any.
    pub fn signal(&self) -> Option<i32> {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt as _;
            self.status.signal()
        }
        #[cfg(not(unix))]
        {
            None
        }
    }
}

/// Run `cmd` to completion or until `deadline` elapses, capturing at most
/// `output_cap` bytes of each output stream.
pub fn run_with_deadline(
    mut cmd: Command,
    deadline: Duration,
    output_cap: usize,
) -> Result<ProcessOutput, HarnessError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;
        cmd.process_group(0);
    }

    let start = Instant::now();
    let mut child =
        cmd.spawn().map_err(|source| HarnessError::Spawn { program: program.clone(), source })?;
    debug!(program = %program, pid = child.id(), "spawned child process");

    let stdout = child.stdout.take().map(|s| spawn_reader(s, output_cap));
    let stderr = child.stderr.take().map(|s| spawn_reader(s, output_cap));

    let (status, timed_out) = wait_with_deadline(&mut child, start, deadline)
        .map_err(|source| HarnessError::Wait { program: program.clone(), source })?;
    let elapsed = start.elapsed();

    let stdout = stdout.map(join_reader).unwrap_or_default();
    let stderr = stderr.map(join_reader).unwrap_or_default();
    debug!(program = %program, ?status, timed_out, elapsed_ms = elapsed.as_millis() as u64, "child finished");

    Ok(ProcessOutput { status, timed_out, stdout, stderr, elapsed })
}

fn wait_with_deadline(
    child: &mut Child,
    start: Instant,
    deadline: Duration,
) -> std::io::Result<(std::process::ExitStatus, bool)> {
    loop {
        if let Some(status) = poll_exit(child)? {
            return Ok((status, false));
        }
        if start.elapsed() >= deadline {
            // Not yet reaped, so the group id still belongs to this child.
            kill_group(child);
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Reap the child if it has exited. Stray descendants left in its group are
/// killed first, while the unreaped child still pins the group id.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn poll_exit(child: &mut Child) -> std::io::Result<Option<std::process::ExitStatus>> {
    use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        return child.try_wait();
    };
    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    match waitid(Id::Pid(Pid::from_raw(pid)), flags)? {
        WaitStatus::StillAlive => Ok(None),
        _ => {
            kill_group(child);
            child.wait().map(Some)
        }
    }
}

/// Without a non-reaping wait the group is left alone after a normal exit.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn poll_exit(child: &mut Child) -> std::io::Result<Option<std::process::ExitStatus>> {
    child.try_wait()
}

#[cfg(unix)]
fn kill_group(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Ok(pid) = i32::try_from(child.id()) {
        // ESRCH just means the group is already gone.
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    cap: usize,
) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || read_to_end_capped(reader, cap))
}

fn join_reader(handle: thread::JoinHandle<std::io::Result<Vec<u8>>>) -> Vec<u8> {
    handle.join().ok().and_then(Result::ok).unwrap_or_default()
}

/// Drain `reader` fully, keeping the first `cap` bytes.
pub fn read_to_end_capped<R: Read>(mut reader: R, cap: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    loop {
        let n = reader.read(&mut tmp)?;
        if n == 0 {
            break;
        }
        let remaining = cap.saturating_sub(buf.len());
        buf.extend_from_slice(&tmp[..n.min(remaining)]);
    }
    Ok(buf)
}
