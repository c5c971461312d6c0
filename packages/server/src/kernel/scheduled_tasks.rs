//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (MATCH_SCHEDULE, every three hours by default)
//!     │
//!     └─► RoundRunner::trigger(Scheduled)
//!             └─► run_round → pairs logged for the notification layer
//! ```
//!
//! Manual triggers go through the same `RoundRunner`, so a manual round and a
//! scheduled one never overlap inside this process.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::matching::{RoundRunner, RoundTrigger, TriggerSource};

/// Start the periodic matching job
pub async fn start_scheduler(runner: Arc<RoundRunner>, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let match_runner = runner.clone();
    let match_job = Job::new_async(schedule, move |_uuid, _lock| {
        let runner = match_runner.clone();
        Box::pin(async move {
            run_scheduled_round(&runner).await;
        })
    })
    .with_context(|| format!("Invalid match schedule '{}'", schedule))?;

    scheduler.add(match_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (matching rounds on '{}')", schedule);
    Ok(scheduler)
}

/// Run one scheduled round and log the result
///
/// Failures are logged and swallowed so the scheduler keeps firing.
async fn run_scheduled_round(runner: &RoundRunner) {
    tracing::info!("Running scheduled matching...");

    match runner.trigger(TriggerSource::Scheduled).await {
        Ok(RoundTrigger::Completed(outcome)) => {
            for pair in &outcome.pairs {
                tracing::info!(
                    participant_a = %pair.participant_a_id(),
                    participant_b = %pair.participant_b_id(),
                    "Matched participants: {} and {}",
                    pair.participant_a.display_name,
                    pair.participant_b.display_name
                );
            }
        }
        Ok(RoundTrigger::Skipped) => {}
        Err(e) => {
            tracing::error!("Error in scheduled matching: {}", e);
        }
    }
}
