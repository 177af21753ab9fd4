//! Start gate between the tracer and the build root.
//!
//! The forked child must not exec until the parent has attached the
//! tracer, or the first exec (and anything it spawns) would escape
//! unobserved. A one-byte pipe write after attachment is the release.

use std::fs::File;
use std::io::{Read, Write};

use anyhow::{Context, Result};
use nix::fcntl::OFlag;
use nix::unistd::pipe2;

/// Unidirectional parent→child gate over a `O_CLOEXEC` pipe. Both ends
/// survive the fork; each side uses exactly one of them, once.
pub struct Rendezvous {
    reader: File,
    writer: File,
}

impl Rendezvous {
    pub fn new() -> Result<Self> {
        let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).context("cannot pipe2()")?;
        Ok(Self {
            reader: File::from(read_end),
            writer: File::from(write_end),
        })
    }

    /// Child side: block until the parent releases the gate. EOF means the
    /// parent died before attaching, which is fatal.
    pub fn wait(&mut self) -> Result<()> {
        let mut token = [0u8; 1];
        self.reader
            .read_exact(&mut token)
            .context("cannot read the start token from the tracer")?;
        Ok(())
    }

    /// Parent side: release the gate after the tracer is attached.
    pub fn release(&mut self) -> Result<()> {
        self.writer
            .write_all(&[0])
            .context("cannot write the start token to the build root")?;
        Ok(())
    }
}
