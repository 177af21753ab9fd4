//! Recognising C-family compiler executables by path.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

/// Matches the final path segment of a compiler driver: an optional
/// dash-separated target prefix (`x86_64-linux-gnu-`), one of the six
/// driver names, and an optional `-N`, `-N.N` or `-N.N.N` version suffix.
const COMPILER_PATTERN: &str =
    r"(^|/)([^/-]+-)*(cc|c\+\+|gcc|g\+\+|clang|clang\+\+)(-[0-9]+(\.[0-9]+){0,2})?$";

/// Predicate over executable paths, compiled once at startup.
pub struct CompilerMatcher {
    pattern: Regex,
}

impl CompilerMatcher {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(COMPILER_PATTERN).context("cannot compile the compiler pattern")?;
        Ok(Self { pattern })
    }

    /// Whether `executable` looks like a C-family compiler driver.
    pub fn matches(&self, executable: &Path) -> bool {
        self.pattern.is_match(&executable.to_string_lossy())
    }
}
