use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::assessor::AssessmentResult;
use crate::executor::AssessmentExecutor;

/// Monitor loop - re-runs the assessment on a fixed interval.
///
/// Each cycle starts from scratch; nothing carries over between runs.
pub struct MonitorLoop {
    executor: Arc<AssessmentExecutor>,
    interval: Duration,
}

impl MonitorLoop {
    pub fn new(executor: Arc<AssessmentExecutor>, interval: Duration) -> Self {
        Self { executor, interval }
    }

    /// Run cycles until `shutdown` resolves, handing each finished report to
    /// `on_report`. A cycle interrupted by shutdown produces no report.
    ///
    /// Returns the number of completed cycles.
    pub async fn run<S, F>(&self, shutdown: S, mut on_report: F) -> u64
    where
        S: Future<Output = ()>,
        F: FnMut(AssessmentResult),
    {
        tokio::pin!(shutdown);
        let mut completed = 0;

        loop {
            let report = tokio::select! {
                biased;
                () = &mut shutdown => break,
                report = self.executor.run_cycle() => report,
            };

            completed += 1;
            tracing::info!(cycle = completed, tier = %report.tier, "Monitor cycle finished");
            on_report(report);

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = sleep(self.interval) => {}
            }
        }

        tracing::info!(cycles = completed, "Monitor stopped");
        completed
    }
}
