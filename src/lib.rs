//! basset - compilation database generator built on ptrace.
//!
//! basset launches a build command as a traced child, follows every
//! descendant across fork/vfork/clone/exec, and records each exec of a
//! C-family compiler from the kernel's own view of the process
//! (`/proc/<pid>/{exe,cwd,cmdline}`). The captured invocations are merged
//! into a `compile_commands.json` database, and the build's exit status
//! (including death by signal) is mirrored by the tool itself.

pub mod cli;
pub mod database;
pub mod matcher;
pub mod procfs;
pub mod rendezvous;
pub mod source;
pub mod tracer;
