//! `strata-build`: the build phase entry point.
//!
//! Delegates to [`strata_lifecycle::run`], which loads configuration, runs
//! the stack and app groups, and maps the outcome onto the exit code.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    strata_lifecycle::run(std::env::args_os(), &mut stdout, &mut stderr)
}
