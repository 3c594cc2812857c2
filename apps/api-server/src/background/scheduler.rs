//! Cron-style job scheduler using tokio-cron-scheduler.

use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use folio_core::services::AuthService;

/// Top of every hour.
pub const SESSION_CLEANUP_SCHEDULE: &str = "0 0 * * * *";

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    pub async fn new() -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner })
    }

    /// Add a cron job.
    ///
    /// # Example
    /// ```ignore
    /// scheduler.add_cron("0 0 * * * *", || async {
    ///     tracing::info!("Running hourly job");
    /// }).await?;
    /// ```
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Register the hourly removal of expired sessions.
    pub async fn add_session_cleanup(
        &self,
        auth: Arc<AuthService>,
    ) -> Result<uuid::Uuid, JobSchedulerError> {
        self.add_cron(SESSION_CLEANUP_SCHEDULE, move || {
            let auth = auth.clone();
            async move {
                if let Err(e) = auth.cleanup_expired().await {
                    tracing::error!(error = %e, "Session cleanup failed");
                }
            }
        })
        .await
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registers_cleanup_job() {
        let scheduler = Scheduler::new().await.unwrap();
        let id = scheduler
            .add_cron(SESSION_CLEANUP_SCHEDULE, || async {})
            .await
            .unwrap();
        assert!(!id.is_nil());
    }

    #[tokio::test]
    async fn test_rejects_bad_schedule() {
        let scheduler = Scheduler::new().await.unwrap();
        assert!(scheduler.add_cron("not a schedule", || async {}).await.is_err());
    }
}
