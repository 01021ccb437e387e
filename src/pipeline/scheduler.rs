//! Job scheduling over the pipeline driver
//!
//! Every front-end creates a [`Job`], then drives the same pipeline on a
//! spawned task that records progress into the job store. Blocking callers
//! await that task; streaming callers additionally receive each log entry
//! over a channel, followed by exactly one terminal event.

use super::driver::{PipelineDriver, PipelineError, PipelineFailure, PipelineOptions, PipelineResult};
use super::job::Job;
use super::progress::{LogEntry, ProgressEvent, ProgressHandler};
use super::store::{JobStore, RepositoryStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info};

/// Item of a streamed run
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Log(LogEntry),
    Complete(Box<PipelineResult>),
    Failed(String),
}

/// Appends progress to the job's log and forwards it to a stream, if any.
///
/// The run-level failure line stays out of the stream: the terminal
/// [`StreamEvent::Failed`] carries that message.
struct JobProgress {
    jobs: Arc<dyn JobStore>,
    job_id: String,
    stream: Option<mpsc::UnboundedSender<StreamEvent>>,
}

impl ProgressHandler for JobProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        let entry = event.to_log_entry();
        let mut stored = None;
        self.jobs.update(&self.job_id, &mut |job: &mut Job| {
            stored = job.push_log(entry.clone());
        });
        if matches!(event, ProgressEvent::PipelineFailed { .. }) {
            return;
        }
        if let (Some(stream), Some(entry)) = (&self.stream, stored) {
            // a closed receiver only means the client stopped listening
            let _ = stream.send(StreamEvent::Log(entry));
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    driver: Arc<PipelineDriver>,
    jobs: Arc<dyn JobStore>,
    repos: Arc<dyn RepositoryStore>,
}

impl Scheduler {
    pub fn new(
        driver: Arc<PipelineDriver>,
        jobs: Arc<dyn JobStore>,
        repos: Arc<dyn RepositoryStore>,
    ) -> Self {
        Self {
            driver,
            jobs,
            repos,
        }
    }

    pub fn driver(&self) -> &Arc<PipelineDriver> {
        &self.driver
    }

    pub fn repositories(&self) -> &Arc<dyn RepositoryStore> {
        &self.repos
    }

    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    /// Starts a background job and returns its id without waiting
    pub fn submit(&self, urls: Vec<String>, options: PipelineOptions) -> Result<String, PipelineError> {
        let (job_id, _) = self.spawn(urls, options, None)?;
        Ok(job_id)
    }

    pub fn get_status(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id)
    }

    pub fn list(&self) -> Vec<Job> {
        self.jobs.list()
    }

    /// Runs a job to its terminal state and returns the final record
    pub async fn run_blocking(
        &self,
        urls: Vec<String>,
        options: PipelineOptions,
    ) -> Result<Job, PipelineError> {
        let (job_id, handle) = self.spawn(urls, options, None)?;
        // the task records its own outcome, including panics
        let _ = handle.await;
        self.jobs
            .get(&job_id)
            .ok_or_else(|| PipelineError::Aborted(format!("job {} disappeared", job_id)))
    }

    /// Runs a job and streams its log followed by one terminal event
    pub fn run_streaming(
        &self,
        urls: Vec<String>,
        options: PipelineOptions,
    ) -> Result<(String, UnboundedReceiverStream<StreamEvent>), PipelineError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (job_id, _) = self.spawn(urls, options, Some(tx))?;
        Ok((job_id, UnboundedReceiverStream::new(rx)))
    }

    /// Forgets every job and registration; running jobs finish unobserved
    pub fn reset(&self) {
        self.jobs.clear();
        self.repos.clear();
        info!("Scheduler state reset");
    }

    fn spawn(
        &self,
        urls: Vec<String>,
        options: PipelineOptions,
        stream: Option<mpsc::UnboundedSender<StreamEvent>>,
    ) -> Result<(String, JoinHandle<()>), PipelineError> {
        if urls.is_empty() {
            return Err(PipelineError::NoRepositories);
        }
        if options.publish && self.driver.publisher().is_none() {
            return Err(PipelineError::PublishNotConfigured);
        }

        let job = Job::new(urls.clone());
        let job_id = job.id.clone();
        self.jobs.insert(job);
        info!(job_id = %job_id, repos = urls.len(), "Job submitted");

        let scheduler = self.clone();
        let id = job_id.clone();
        let handle = tokio::spawn(async move {
            scheduler.execute(id, urls, options, stream).await;
        });
        Ok((job_id, handle))
    }

    async fn execute(
        &self,
        job_id: String,
        urls: Vec<String>,
        options: PipelineOptions,
        stream: Option<mpsc::UnboundedSender<StreamEvent>>,
    ) {
        self.jobs.update(&job_id, &mut |job: &mut Job| {
            job.start();
        });

        let progress = JobProgress {
            jobs: self.jobs.clone(),
            job_id: job_id.clone(),
            stream: stream.clone(),
        };
        let driver = self.driver.clone();
        let outcome =
            tokio::spawn(async move { driver.run(&urls, options, &progress).await }).await;

        let terminal = match outcome {
            Ok(Ok(result)) => {
                for summary in &result.repos {
                    self.repos.set_summary(summary.clone());
                }
                let event = StreamEvent::Complete(Box::new(result.clone()));
                self.jobs.update(&job_id, &mut |job: &mut Job| {
                    job.complete(result.clone());
                });
                info!(job_id = %job_id, "Job completed");
                event
            }
            Ok(Err(PipelineFailure { error, partial })) => {
                let message = error.to_string();
                let mut partial = Some(partial);
                self.jobs.update(&job_id, &mut |job: &mut Job| {
                    job.fail(message.clone(), partial.take());
                });
                info!(job_id = %job_id, error = %message, "Job failed");
                StreamEvent::Failed(message)
            }
            Err(join_error) => {
                let message = PipelineError::Aborted(join_error.to_string()).to_string();
                error!(job_id = %job_id, error = %message, "Pipeline task panicked");
                self.jobs.update(&job_id, &mut |job: &mut Job| {
                    job.fail(message.clone(), None);
                });
                StreamEvent::Failed(message)
            }
        };

        if let Some(stream) = stream {
            let _ = stream.send(terminal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{LocalCloner, RepositoryAnalyzer};
    use crate::enrichment::Enricher;
    use crate::pipeline::job::JobStatus;
    use crate::pipeline::progress::LogKind;
    use crate::pipeline::store::{InMemoryJobStore, InMemoryRepositoryStore};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_stream::StreamExt;

    fn scheduler(dirs: &(TempDir, TempDir)) -> Scheduler {
        let api = dirs.0.path().join("api");
        fs::create_dir_all(&api).unwrap();
        fs::write(api.join("package.json"), r#"{"dependencies":{"express":"^4"}}"#).unwrap();
        fs::write(api.join("index.js"), "app.get('/users', list);").unwrap();

        let cloner = LocalCloner::new().with_repo("https://github.com/acme/api", &api);
        let analyzer = RepositoryAnalyzer::new(
            Arc::new(cloner),
            Enricher::disabled(),
            dirs.1.path().to_path_buf(),
        );
        Scheduler::new(
            Arc::new(PipelineDriver::new(analyzer, Enricher::disabled())),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryRepositoryStore::new()),
        )
    }

    fn dirs() -> (TempDir, TempDir) {
        (TempDir::new().unwrap(), TempDir::new().unwrap())
    }

    fn api_url() -> Vec<String> {
        vec!["https://github.com/acme/api".to_string()]
    }

    #[tokio::test]
    async fn test_run_blocking_completes() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        scheduler
            .repositories()
            .register("https://github.com/acme/api")
            .unwrap();

        let job = scheduler
            .run_blocking(api_url(), PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.completed_at.is_some());
        assert!(job.logs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(scheduler.repositories().summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_job_keeps_message() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        let job = scheduler
            .run_blocking(
                vec!["https://github.com/acme/missing".to_string()],
                PipelineOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error.as_deref(),
            Some("none of the 1 repositories could be analyzed")
        );
        assert!(job.result.is_none());
        assert!(job.partial.is_some());
    }

    #[tokio::test]
    async fn test_submit_and_poll() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        let job_id = scheduler.submit(api_url(), PipelineOptions::default()).unwrap();
        assert!(scheduler.get_status(&job_id).is_some());

        let mut status = JobStatus::Pending;
        for _ in 0..200 {
            status = scheduler.get_status(&job_id).unwrap().status;
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, JobStatus::Completed);
        assert_eq!(scheduler.list().len(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_creates_independent_jobs() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        let first = scheduler.submit(api_url(), PipelineOptions::default()).unwrap();
        let second = scheduler.submit(api_url(), PipelineOptions::default()).unwrap();
        assert_ne!(first, second);
        assert_eq!(scheduler.list().len(), 2);
    }

    #[tokio::test]
    async fn test_streaming_ends_with_single_terminal_event() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        let (job_id, stream) = scheduler
            .run_streaming(api_url(), PipelineOptions::default())
            .unwrap();

        let events: Vec<StreamEvent> = stream.collect().await;
        let terminal = events
            .iter()
            .filter(|e| !matches!(e, StreamEvent::Log(_)))
            .count();
        assert_eq!(terminal, 1);
        assert!(matches!(events.last(), Some(StreamEvent::Complete(_))));

        let logs: Vec<&LogEntry> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Log(entry) => Some(entry),
                _ => None,
            })
            .collect();
        let job = scheduler.get_status(&job_id).unwrap();
        assert_eq!(logs.len(), job.logs.len());
    }

    #[tokio::test]
    async fn test_failed_stream_has_one_error() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        let (job_id, stream) = scheduler
            .run_streaming(
                vec!["https://github.com/acme/missing".to_string()],
                PipelineOptions::default(),
            )
            .unwrap();

        let events: Vec<StreamEvent> = stream.collect().await;
        let error_logs = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Log(entry) if entry.kind == LogKind::Error))
            .count();
        assert_eq!(error_logs, 0);
        match events.last() {
            Some(StreamEvent::Failed(message)) => {
                assert_eq!(message, "none of the 1 repositories could be analyzed")
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // the job record still has the failure line
        let job = scheduler.get_status(&job_id).unwrap();
        assert_eq!(job.logs.last().map(|l| l.kind), Some(LogKind::Error));
    }

    #[tokio::test]
    async fn test_dropped_stream_does_not_affect_job() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        let (job_id, stream) = scheduler
            .run_streaming(api_url(), PipelineOptions::default())
            .unwrap();
        drop(stream);

        let mut status = JobStatus::Pending;
        for _ in 0..200 {
            status = scheduler.get_status(&job_id).unwrap().status;
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_reset_clears_jobs_and_registrations() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        scheduler
            .repositories()
            .register("https://github.com/acme/api")
            .unwrap();
        scheduler
            .run_blocking(api_url(), PipelineOptions::default())
            .await
            .unwrap();

        scheduler.reset();
        assert!(scheduler.list().is_empty());
        assert!(scheduler.repositories().list().is_empty());
    }

    #[tokio::test]
    async fn test_empty_submission_rejected() {
        let dirs = dirs();
        let scheduler = scheduler(&dirs);
        assert_eq!(
            scheduler.submit(Vec::new(), PipelineOptions::default()),
            Err(PipelineError::NoRepositories)
        );
        assert!(scheduler.list().is_empty());
    }
}
