// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

use core::fmt;

use bitflags::bitflags;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    fn tag(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// One observation made by a check phase.
///
/// `code` is a stable dotted identifier (`chain.broken`, `part.leak`, ...)
/// that tests and tools match on; `msg` is for humans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub sev: Severity,
    pub code: &'static str,
    pub msg: String,
    /// Block the finding points at, when there is one
    pub block: Option<u32>,
}

impl Finding {
    pub fn new(sev: Severity, code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            sev,
            code,
            msg: msg.into(),
            block: None,
        }
    }

    pub fn info(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, msg)
    }

    pub fn warn(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(Severity::Warn, code, msg)
    }

    pub fn err(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, msg)
    }

    #[must_use]
    pub fn at(mut self, block: u32) -> Self {
        self.block = Some(block);
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.sev.tag(), self.code)?;
        if let Some(block) = self.block {
            write!(f, " @{block}")?;
        }
        write!(f, ": {}", self.msg)
    }
}

#[derive(Clone, Debug, Default)]
pub struct VerifyReport {
    pub findings: Vec<Finding>,
}

impl VerifyReport {
    pub fn push(&mut self, f: Finding) {
        self.findings.push(f)
    }

    pub fn ok(&self) -> bool {
        !self.has_error()
    }

    pub fn has_error(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.sev == Severity::Error)
    }

    /// Whether any finding carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// Blocks named by findings with `code`, in report order.
    pub fn blocks_for(&self, code: &str) -> Vec<u32> {
        self.findings
            .iter()
            .filter(|f| f.code == code)
            .filter_map(|f| f.block)
            .collect()
    }

    pub fn count(&self, s: Severity) -> usize {
        self.findings.iter().filter(|f| f.sev == s).count()
    }

    /// Warnings and errors followed by a one-line tally.
    pub fn warn_and_errors(&self) -> ReportDisplay<'_> {
        ReportDisplay {
            rep: self,
            min: Severity::Warn,
            summary: true,
        }
    }
}

pub struct ReportDisplay<'a> {
    rep: &'a VerifyReport,
    min: Severity,
    summary: bool,
}

impl fmt::Display for ReportDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for it in self.rep.findings.iter().filter(|it| it.sev >= self.min) {
            writeln!(f, "{it}")?;
        }
        if self.summary {
            writeln!(
                f,
                "{} error(s), {} warning(s)",
                self.rep.count(Severity::Error),
                self.rep.count(Severity::Warn)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ReportDisplay {
            rep: self,
            min: Severity::Info,
            summary: false,
        }
        .fmt(f)
    }
}

bitflags! {
    /// Check phases, run in declaration order.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VerifyPhases: u32 {
        /// Descriptor signature and checksum
        const BOOT     = 1 << 0;
        /// Descriptor fields against the device and each other
        const GEOMETRY = 1 << 1;
        /// Tree walk over every directory and file chain
        const CHAIN    = 1 << 2;
        /// Table entries against what the tree owns
        const CROSSREF = 1 << 3;
        const ALL      = Self::BOOT.bits()
            | Self::GEOMETRY.bits()
            | Self::CHAIN.bits()
            | Self::CROSSREF.bits();
    }
}

/// Options a checker reads to drive its phases.
pub trait VerifierOptionsLike {
    fn phases(&self) -> VerifyPhases {
        VerifyPhases::ALL
    }
    fn fail_fast(&self) -> bool {
        false
    }
}
