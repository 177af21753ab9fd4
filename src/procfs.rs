//! Reading a tracee's image, working directory and argv at an exec-stop.
//!
//! Everything here runs while the tracee is frozen by ptrace, so the
//! three `/proc/<pid>/` reads observe the post-exec state atomically.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use nix::libc;
use nix::unistd::Pid;
use tracing::debug;

use crate::matcher::CompilerMatcher;

/// One observed compiler exec: the resolved image path, the working
/// directory at exec time and the full argv.
#[derive(Debug)]
pub struct CompilerInvocation {
    pub executable: PathBuf,
    pub directory: PathBuf,
    pub arguments: Vec<String>,
}

/// Inspect a pid stopped at an exec event. Returns `None` for images the
/// matcher rejects (without reading anything further) and for processes
/// that died before the reads completed; the caller resumes those.
pub fn capture(pid: Pid, compilers: &CompilerMatcher) -> Result<Option<CompilerInvocation>> {
    let executable = match fs::read_link(format!("/proc/{pid}/exe")) {
        Ok(path) => path,
        Err(err) if process_vanished(&err) => return Ok(None),
        Err(err) => return Err(err).context(format!("cannot readlink /proc/{pid}/exe")),
    };

    if !compilers.matches(&executable) {
        debug!(pid = %pid, executable = %executable.display(), "exec of a non-compiler");
        return Ok(None);
    }

    let directory = match fs::read_link(format!("/proc/{pid}/cwd")) {
        Ok(path) => path,
        Err(err) if process_vanished(&err) => return Ok(None),
        Err(err) => return Err(err).context(format!("cannot readlink /proc/{pid}/cwd")),
    };

    let raw = match fs::read(format!("/proc/{pid}/cmdline")) {
        Ok(raw) => raw,
        Err(err) if process_vanished(&err) => return Ok(None),
        Err(err) => return Err(err).context(format!("cannot read /proc/{pid}/cmdline")),
    };
    let arguments = parse_argv(&raw)
        .with_context(|| format!("cannot parse /proc/{pid}/cmdline"))?;

    Ok(Some(CompilerInvocation {
        executable,
        directory,
        arguments,
    }))
}

/// A tracee can still be killed while stopped; its `/proc` subtree then
/// reports ENOENT or ESRCH, which counts as normal termination.
fn process_vanished(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::ENOENT) | Some(libc::ESRCH))
}

/// Split a `/proc/<pid>/cmdline` image into argv. The kernel terminates
/// every argument with NUL, so anything else is a short read.
fn parse_argv(raw: &[u8]) -> Result<Vec<String>> {
    let Some((&last, rest)) = raw.split_last() else {
        bail!("empty cmdline");
    };
    if last != 0 {
        bail!("cmdline not NUL-terminated (short read)");
    }

    Ok(rest
        .split(|&byte| byte == 0)
        .map(|argument| String::from_utf8_lossy(argument).into_owned())
        .collect())
}
