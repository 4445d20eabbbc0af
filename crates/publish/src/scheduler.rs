//! Batched upload scheduler for one platform.
//!
//! State machine: `Idle → Uploading → Idle`.
//!
//! [`execute`](UploadScheduler::execute) uploads the version manifest
//! before returning and queues the asset files. Each
//! [`tick`](UploadScheduler::tick) then either waits for the running
//! batch, launches the next batch of up to `batch_size` concurrent
//! transfers, or returns to idle once the queue is drained. A new batch
//! never starts while a task of the previous one is unfinished.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bundlepub_protocol::Platform;
use bundlepub_transfer::{Credentials, TransferError, TransferTask, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::PublishError;
use crate::types::{FailurePolicy, PublishEvent, SchedulerConfig, ServerConfig, UploadSummary};

/// Input of one [`UploadScheduler::execute`] call.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub server: ServerConfig,
    /// Serialized version manifest, uploaded verbatim.
    pub manifest_json: String,
    /// Absolute bundle paths, uploaded in this order.
    pub files: Vec<PathBuf>,
}

/// Result of one [`UploadScheduler::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not uploading.
    Idle,
    /// The current batch still has unfinished transfers.
    Waiting,
    /// A batch of this many transfers was launched.
    BatchStarted(usize),
    /// The queue is drained; the scheduler is idle again.
    Completed(UploadSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Idle,
    Uploading,
}

struct Session {
    base_url: String,
    credentials: Arc<Credentials>,
}

struct InFlight {
    url: String,
    handle: JoinHandle<Result<(), TransferError>>,
}

/// Moves a manifest and its bundle files to the server for one platform.
pub struct UploadScheduler {
    platform: Platform,
    transport: Arc<dyn Transport>,
    config: SchedulerConfig,
    state: SchedulerState,
    queue: VecDeque<PathBuf>,
    in_flight: Vec<InFlight>,
    session: Option<Session>,
    summary: UploadSummary,
    events: Option<mpsc::Sender<PublishEvent>>,
}

impl UploadScheduler {
    pub fn new(platform: Platform, transport: Arc<dyn Transport>, config: SchedulerConfig) -> Self {
        Self {
            platform,
            transport,
            config,
            state: SchedulerState::Idle,
            queue: VecDeque::new(),
            in_flight: Vec::new(),
            session: None,
            summary: UploadSummary::default(),
            events: None,
        }
    }

    /// Sends progress events to `events`. Events are dropped when the
    /// channel is full or closed.
    pub fn with_events(mut self, events: mpsc::Sender<PublishEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// True from `execute` until the queue is drained and nothing is in
    /// flight.
    pub fn is_in_upload(&self) -> bool {
        self.state == SchedulerState::Uploading
    }

    /// Files not yet handed to a transfer task.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Starts an upload: validates the request, uploads the manifest and
    /// queues `request.files`.
    ///
    /// Refused while an upload is running; the running queue is left
    /// untouched.
    pub async fn execute(&mut self, request: UploadRequest) -> Result<(), PublishError> {
        if self.is_in_upload() {
            return Err(PublishError::AlreadyUploading(self.platform));
        }
        if self.config.batch_size == 0 {
            return Err(PublishError::Config("batch size must be at least 1".into()));
        }
        request.server.validate()?;

        let UploadRequest {
            server,
            manifest_json,
            files,
        } = request;

        self.state = SchedulerState::Uploading;
        self.queue = files.into();
        self.summary = UploadSummary::default();
        let session = Session {
            base_url: server.base_url,
            credentials: Arc::new(server.credentials),
        };

        info!(
            platform = %self.platform,
            files = self.queue.len(),
            batch_size = self.config.batch_size,
            "starting upload"
        );

        let mut task = TransferTask::version_file(&session.base_url, self.platform, manifest_json);
        let result = task
            .execute(self.transport.as_ref(), &session.credentials)
            .await;
        let error = result.err().map(|e| e.to_string());
        self.summary.record(task.url(), error.clone());
        self.emit(PublishEvent::ManifestUploaded {
            platform: self.platform,
            url: task.url().to_string(),
            error,
        });

        self.session = Some(session);
        Ok(())
    }

    /// Advances the state machine by one step.
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.is_in_upload() {
            return TickOutcome::Idle;
        }

        if self.in_flight.iter().any(|t| !t.handle.is_finished()) {
            return TickOutcome::Waiting;
        }

        self.harvest().await;

        if self.config.failure_policy == FailurePolicy::FailFast
            && self.summary.failed > 0
            && !self.queue.is_empty()
        {
            warn!(
                platform = %self.platform,
                dropped = self.queue.len(),
                "transfer failed, dropping remaining uploads"
            );
            self.queue.clear();
            self.summary.aborted = true;
        }

        if self.queue.is_empty() {
            return self.finish();
        }

        TickOutcome::BatchStarted(self.launch_batch())
    }

    /// Ticks every `interval` until the scheduler is idle and returns
    /// the summary of the run. Returns an empty summary if no upload was
    /// running.
    pub async fn run_until_idle(&mut self, interval: Duration) -> UploadSummary {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match self.tick().await {
                TickOutcome::Completed(summary) => return summary,
                TickOutcome::Idle => return UploadSummary::default(),
                TickOutcome::Waiting | TickOutcome::BatchStarted(_) => {}
            }
        }
    }

    fn launch_batch(&mut self) -> usize {
        let Some(session) = self.session.as_ref() else {
            return 0;
        };

        let size = self.config.batch_size.min(self.queue.len());
        for path in self.queue.drain(..size) {
            let mut task = TransferTask::asset_file(&session.base_url, self.platform, path);
            let url = task.url().to_string();
            let transport = Arc::clone(&self.transport);
            let credentials = Arc::clone(&session.credentials);

            let handle =
                tokio::spawn(async move { task.execute(transport.as_ref(), &credentials).await });
            self.in_flight.push(InFlight { url, handle });
        }

        self.summary.batch_sizes.push(size);
        debug!(
            platform = %self.platform,
            size,
            remaining = self.queue.len(),
            "batch started"
        );
        self.emit(PublishEvent::BatchStarted {
            platform: self.platform,
            size,
            remaining: self.queue.len(),
        });
        size
    }

    /// Collects the results of a finished batch.
    async fn harvest(&mut self) {
        for InFlight { url, handle } in std::mem::take(&mut self.in_flight) {
            let error = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(join_err) => {
                    error!(url = %url, error = %join_err, "transfer task panicked");
                    Some(format!("task join error: {join_err}"))
                }
            };
            self.summary.record(&url, error.clone());
            self.emit(PublishEvent::TaskFinished {
                platform: self.platform,
                url,
                error,
            });
        }
    }

    fn finish(&mut self) -> TickOutcome {
        self.state = SchedulerState::Idle;
        self.session = None;
        let summary = std::mem::take(&mut self.summary);

        info!(
            platform = %self.platform,
            succeeded = summary.succeeded,
            failed = summary.failed,
            aborted = summary.aborted,
            "finished uploading bundles"
        );
        self.emit(PublishEvent::Completed {
            platform: self.platform,
            summary: summary.clone(),
        });
        TickOutcome::Completed(summary)
    }

    fn emit(&self, event: PublishEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(event);
        }
    }
}
