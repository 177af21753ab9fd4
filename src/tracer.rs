//! Launching the build under ptrace and supervising every descendant.
//!
//! One tracer process, one wait-then-classify loop. Attachment uses the
//! seize discipline with the clone/fork/vfork/exec trace options, so the
//! kernel hands every new descendant to the loop automatically and kills
//! the whole tree if the tracer dies. Compilers are detached as soon as
//! their exec is recorded; keeping them attached would serialise the
//! build behind this single thread.

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{self, Command};

use anyhow::{bail, Context, Result};
use nix::errno::Errno;
use nix::libc;
use nix::sys::ptrace::{self, Options};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{wait, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use tracing::debug;

use crate::database::CompilationDatabase;
use crate::matcher::CompilerMatcher;
use crate::procfs;
use crate::rendezvous::Rendezvous;

/// What the build root came to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Exited(i32),
    Signaled(Signal),
}

pub struct TracerConfig {
    /// Database path, read before the build and rewritten after it.
    pub output: PathBuf,
    /// The build command, argv[0] first.
    pub command: Vec<String>,
}

/// Run the configured build under the tracer and return how it ended.
/// The database at `config.output` is merged and persisted on the way.
pub fn trace_build(config: &TracerConfig) -> Result<BuildStatus> {
    if config.command.is_empty() {
        bail!("build command is empty");
    }

    let compilers = CompilerMatcher::new()?;
    let mut database = CompilationDatabase::new();
    database.load(&config.output)?;

    let mut gate = Rendezvous::new()?;

    match unsafe { fork() }.context("cannot fork()")? {
        ForkResult::Child => run_build_root(&mut gate, &config.command),
        ForkResult::Parent { child } => {
            let options = Options::PTRACE_O_TRACECLONE
                | Options::PTRACE_O_TRACEFORK
                | Options::PTRACE_O_TRACEVFORK
                | Options::PTRACE_O_TRACEEXEC
                | Options::PTRACE_O_EXITKILL;
            ptrace::seize(child, options).context("cannot ptrace(PTRACE_SEIZE)")?;
            gate.release()?;
            debug!(pid = %child, "build root released");

            let status = supervise(child, &compilers, &mut database)?;
            database.save(&config.output)?;
            Ok(status)
        }
    }
}

/// Child side of the fork: hold at the gate until the tracer is attached,
/// then become the build command. Never returns.
fn run_build_root(gate: &mut Rendezvous, command: &[String]) -> ! {
    if let Err(err) = gate.wait() {
        eprintln!("basset: {err:#}");
        process::exit(1);
    }

    let err = Command::new(&command[0]).args(&command[1..]).exec();
    // exec only returns on failure
    eprintln!("basset: cannot exec {}: {err}", command[0]);
    process::exit(127);
}

/// The wait-multiplex loop: reap any descendant, classify, act. Runs
/// until the root child terminates.
fn supervise(
    root: Pid,
    compilers: &CompilerMatcher,
    database: &mut CompilationDatabase,
) -> Result<BuildStatus> {
    loop {
        let status = wait().context("cannot wait()")?;

        match status {
            WaitStatus::Exited(pid, code) => {
                debug!(pid = %pid, code, "exited");
                if pid == root {
                    return Ok(BuildStatus::Exited(code));
                }
            }
            WaitStatus::Signaled(pid, signal, _core_dumped) => {
                debug!(pid = %pid, signal = %signal, "killed by signal");
                if pid == root {
                    return Ok(BuildStatus::Signaled(signal));
                }
            }
            WaitStatus::PtraceEvent(pid, _, event) => {
                handle_stop_event(pid, event, compilers, database)?;
            }
            WaitStatus::Stopped(pid, signal) => {
                // An ordinary signal-stop: deliver the signal on resume
                // rather than swallowing it.
                debug!(pid = %pid, signal = %signal, "forwarding signal");
                resume(pid, Some(signal))?;
            }
            WaitStatus::Continued(pid) => {
                debug!(pid = %pid, "continued");
            }
            other => bail!("unexpected wait status: {other:?}"),
        }
    }
}

/// Demultiplex a ptrace-synthesised stop. Only exec events carry work;
/// the rest exist so the kernel can hand over new descendants, and must
/// be resumed without re-delivering SIGTRAP.
fn handle_stop_event(
    pid: Pid,
    event: i32,
    compilers: &CompilerMatcher,
    database: &mut CompilationDatabase,
) -> Result<()> {
    match event {
        libc::PTRACE_EVENT_EXEC => match procfs::capture(pid, compilers)? {
            Some(invocation) => {
                // Everything we need is captured; let the compiler run
                // unobserved from here.
                detach(pid)?;
                debug!(
                    pid = %pid,
                    executable = %invocation.executable.display(),
                    "compiler detached after capture"
                );
                database.add(&invocation.directory, &invocation.arguments);
            }
            None => resume(pid, None)?,
        },
        libc::PTRACE_EVENT_CLONE
        | libc::PTRACE_EVENT_FORK
        | libc::PTRACE_EVENT_VFORK
        | libc::PTRACE_EVENT_STOP => {
            resume(pid, None)?;
        }
        unknown => bail!("unknown ptrace stop event {unknown} for pid {pid}"),
    }

    Ok(())
}

/// Continue a stopped tracee, optionally delivering a signal. A tracee
/// that died while we held it is not an error.
fn resume(pid: Pid, signal: Option<Signal>) -> Result<()> {
    match ptrace::cont(pid, signal) {
        Err(Errno::ESRCH) => Ok(()),
        result => result.context(format!("cannot ptrace(PTRACE_CONT) pid {pid}")),
    }
}

/// Drop a tracee from observation entirely.
fn detach(pid: Pid) -> Result<()> {
    match ptrace::detach(pid, None) {
        Err(Errno::ESRCH) => Ok(()),
        result => result.context(format!("cannot ptrace(PTRACE_DETACH) pid {pid}")),
    }
}

/// Mirror the build root's fate onto this process: its exit code, or its
/// killing signal re-raised so callers observe the same termination.
pub fn propagate(status: BuildStatus) -> ! {
    match status {
        BuildStatus::Exited(code) => process::exit(code),
        BuildStatus::Signaled(sig) => {
            // Restore the default disposition first, so the raise
            // actually terminates us.
            let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
            let _ = signal::raise(sig);
            // Still here: the signal killed the child but not us.
            eprintln!("basset: cannot re-raise {sig}");
            process::exit(1);
        }
    }
}
