// SPDX-License-Identifier: MIT

mod types;

pub use types::{Finding, ReportDisplay, Severity, VerifierOptionsLike, VerifyPhases, VerifyReport};

pub use crate::core::errors::{FsCheckerError, FsCheckerResult};

type Phase<C, O> = fn(&mut C, &O, &mut VerifyReport) -> FsCheckerResult<()>;

/// Read-only integrity check of a volume.
///
/// Phases append findings to the report. An `Err` means the check itself
/// could not run (device failure), not that the volume is inconsistent.
pub trait FsChecker: Sized {
    type Options: VerifierOptionsLike + Default;

    fn check_with(&mut self, opt: &Self::Options) -> FsCheckerResult<VerifyReport> {
        let phases: [(VerifyPhases, Phase<Self, Self::Options>); 4] = [
            (VerifyPhases::BOOT, Self::check_boot),
            (VerifyPhases::GEOMETRY, Self::check_geometry),
            (VerifyPhases::CHAIN, Self::check_chain),
            (VerifyPhases::CROSSREF, Self::check_cross_reference),
        ];

        let mut rep = VerifyReport::default();
        for (phase, run) in phases {
            if !opt.phases().contains(phase) {
                continue;
            }
            // fail_fast: a phase never runs on top of an earlier error
            if opt.fail_fast() && rep.has_error() {
                break;
            }
            run(self, opt, &mut rep)?;
        }
        Ok(rep)
    }

    fn check_all(&mut self) -> FsCheckerResult<VerifyReport> {
        self.check_with(&Self::Options::default())
    }

    fn check_boot(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()>;

    fn check_geometry(&mut self, opt: &Self::Options, rep: &mut VerifyReport)
    -> FsCheckerResult<()>;

    fn check_chain(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()>;

    fn check_cross_reference(
        &mut self,
        opt: &Self::Options,
        rep: &mut VerifyReport,
    ) -> FsCheckerResult<()>;
}
