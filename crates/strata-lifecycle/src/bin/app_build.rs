//! `strata-app-build`: the unprivileged app build stage.
//!
//! Launched by `strata-build` as the build user after a stack build. It
//! can also be run directly when there are no stack buildpacks.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    strata_lifecycle::run_app_stage(std::env::args_os(), &mut stdout, &mut stderr)
}
