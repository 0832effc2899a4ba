//! Step isolation
//!
//! A step is one named unit of release work. Its failure is recorded in the
//! result tree and logged, and the release carries on with the next step.
//! Only failures of external effects are absorbed (see
//! [`ReleaseError::is_step_failure`]); configuration mistakes and internal
//! errors still abort the release.

use std::backtrace::Backtrace;
use std::error::Error as _;
use std::future::Future;

use crate::cli::output::status;
use crate::core::collector::Reporter;
use crate::core::result_tree::Status;
use crate::error::ReleaseError;

/// Tracing target of step failure details. The console shows the one-line
/// status instead; the build log gets the error chain and the stack trace.
pub const FAILURE_TARGET: &str = "shipyard::step::failure";

/// Run `work` as a step named `description` and record exactly one node for it
pub async fn step<F>(reporter: &Reporter, description: &str, work: F) -> Result<Status, ReleaseError>
where
    F: Future<Output = Result<(), ReleaseError>>,
{
    tracing::info!("Step '{description}' started");
    let outcome = match work.await {
        Ok(()) => Status::Ok,
        Err(e) if e.is_step_failure() => {
            report_failure(description, &e);
            Status::Failed
        }
        Err(e) => return Err(e),
    };
    tracing::info!("Step '{description}' finished: {outcome}");
    reporter.record_status(description, outcome.clone());
    Ok(outcome)
}

/// Run `work` with step isolation but without recording anything.
///
/// Returns `Ok(None)` when the work failed and the failure was absorbed.
pub async fn attempt<T, F>(description: &str, work: F) -> Result<Option<T>, ReleaseError>
where
    F: Future<Output = Result<T, ReleaseError>>,
{
    match work.await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_step_failure() => {
            report_failure(description, &e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn report_failure(description: &str, error: &ReleaseError) {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    let trace = Backtrace::force_capture();
    tracing::error!(target: FAILURE_TARGET, "Step '{description}' failed: {chain}\nstack backtrace:\n{trace}");
    eprintln!("{} {description} failed: {error}", status::ERROR);
}
