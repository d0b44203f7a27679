//! Task poller
//!
//! Registers the runner, then polls the task server for task events and feeds
//! them to a fixed pool of workers over a bounded queue. The queue holds as
//! many events as there are workers, so polling stalls instead of claiming
//! more work than the pool can run.

use anyhow::{Context, Result};
use courier_client::TaskClient;
use courier_core::domain::runner::RunnerInfo;
use courier_core::domain::task::{TaskEvent, TaskResult};
use courier_core::dto::runner::RegisterRequest;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::in_flight::InFlight;
use super::{bounded, heartbeat};
use crate::config::Config;
use crate::host;
use crate::router::Router;

/// Predicate deciding whether a task event is handed to the workers
pub type FilterFn = Arc<dyn Fn(&TaskEvent) -> bool + Send + Sync>;

type EventQueue = Arc<Mutex<mpsc::Receiver<TaskEvent>>>;

/// Runner lifecycle: registration, heartbeats, polling and task execution
#[derive(Clone)]
pub struct Poller {
    config: Config,
    client: Arc<dyn TaskClient>,
    router: Arc<dyn Router>,
    filter: Option<FilterFn>,
    in_flight: Arc<InFlight>,
}

impl Poller {
    /// Creates a new poller
    pub fn new(config: Config, client: Arc<dyn TaskClient>, router: Arc<dyn Router>) -> Self {
        Self {
            config,
            client,
            router,
            filter: None,
            in_flight: InFlight::new(),
        }
    }

    /// Only hand events matching `filter` to the workers
    pub fn set_filter(&mut self, filter: impl Fn(&TaskEvent) -> bool + Send + Sync + 'static) {
        self.filter = Some(Arc::new(filter));
    }

    /// Task IDs currently claimed by a worker
    pub fn in_flight(&self) -> &Arc<InFlight> {
        &self.in_flight
    }

    // =============================================================================
    // Registration
    // =============================================================================

    /// Registers the runner and starts the heartbeat loop
    ///
    /// This is the one call whose failure stops the runner: it is retried on
    /// transient errors only until `register_timeout` runs out.
    ///
    /// # Returns
    /// Identity of the registered runner, including the server-assigned ID
    pub async fn register(&self, cancel: &CancellationToken) -> Result<RunnerInfo> {
        let host = host::host_name();
        let ip = host::outbound_ip();

        let mut req = RegisterRequest::new(
            &self.config.account_id,
            &self.config.name,
            &self.config.account_secret,
        );
        req.host_name = host.clone();
        req.ip = ip.clone();
        req.supported_task_types = self.router.routes();
        req.tags = self.config.tags.clone();

        let response = bounded(
            self.config.register_timeout,
            self.client.register(&req, cancel),
        )
        .await
        .inspect_err(|e| error!(ip = %ip, host = %host, "could not register runner: {}", e))
        .context("could not register the runner")?;

        req.id = response.resource.delegate_id;
        info!(id = %req.id, host = %req.host_name, ip = %req.ip, "registered runner successfully");

        let runner = RunnerInfo {
            id: req.id.clone(),
            host,
            ip,
            name: self.config.name.clone(),
        };

        let _heartbeat_handle = heartbeat::spawn(
            Arc::clone(&self.client),
            req,
            self.config.heartbeat_interval,
            self.config.heartbeat_timeout,
            cancel.clone(),
        );

        Ok(runner)
    }

    // =============================================================================
    // Polling
    // =============================================================================

    /// Polls for task events and executes them until `cancel` fires
    ///
    /// Spawns one poll loop and `parallel_workers` workers. Returns once all
    /// of them have stopped; tasks already executing run to completion first.
    ///
    /// # Arguments
    /// * `runner_id` - The server-assigned runner ID
    /// * `cancel` - Governing cancellation signal
    pub async fn poll(&self, runner_id: &str, cancel: &CancellationToken) -> Result<()> {
        let workers = self.config.parallel_workers.max(1);
        let (tx, rx) = mpsc::channel(workers);
        let rx: EventQueue = Arc::new(Mutex::new(rx));

        let mut pool = JoinSet::new();

        pool.spawn(
            self.clone()
                .produce(runner_id.to_string(), tx, cancel.clone()),
        );

        for worker in 0..workers {
            pool.spawn(self.clone().consume(
                worker,
                runner_id.to_string(),
                Arc::clone(&rx),
                cancel.clone(),
            ));
        }

        info!(
            "initialized {} workers successfully and starting polling for tasks (interval: {:?})",
            workers, self.config.poll_interval
        );

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!("poller task panicked: {}", e);
            }
        }

        info!("poller stopped");
        Ok(())
    }

    /// Poll loop: fetches task events and queues the ones that pass the filter
    async fn produce(self, runner_id: String, tx: mpsc::Sender<TaskEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            debug!("Polling for task events");

            let events = match bounded(
                self.config.task_events_timeout,
                self.client.get_task_events(&runner_id, &cancel),
            )
            .await
            {
                Ok(response) => response.events,
                Err(_) if cancel.is_cancelled() => break,
                Err(e) => {
                    error!("could not query for task events: {}", e);
                    continue;
                }
            };

            for event in events {
                if !self.accepts(&event) {
                    debug!(task_id = %event.task_id, "task event filtered out");
                    continue;
                }

                info!(task_id = %event.task_id, "trying to acquire task");

                // Blocks while every worker is busy and the queue is full.
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = tx.send(event) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        }

        debug!("poll loop stopped");
    }

    /// Worker loop: takes events off the queue and executes them one at a time
    async fn consume(
        self,
        worker: usize,
        runner_id: String,
        queue: EventQueue,
        cancel: CancellationToken,
    ) {
        loop {
            let event = {
                let mut rx = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    rx = queue.lock() => rx,
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                }
            };

            if let Err(e) = self.execute(&runner_id, &event, worker, &cancel).await {
                error!(
                    task_id = %event.task_id,
                    "[worker {}]: could not perform task execution: {:#}", worker, e
                );
            }
        }

        debug!("[worker {}]: stopped", worker);
    }

    fn accepts(&self, event: &TaskEvent) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(event))
    }

    // =============================================================================
    // Execution
    // =============================================================================

    /// Acquires, executes and reports a single task
    ///
    /// Acquisition failures are logged and swallowed: another runner may
    /// have claimed the task. A task type outside the advertised routes is a
    /// protocol violation; the task is dropped without a status report.
    async fn execute(
        &self,
        runner_id: &str,
        event: &TaskEvent,
        worker: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let task_id = event.task_id.as_str();

        let Some(_claim) = self.in_flight.try_claim(task_id) else {
            debug!(task_id, "[worker {}]: task already in flight, skipping", worker);
            return Ok(());
        };

        if cancel.is_cancelled() {
            return Ok(());
        }

        let task = match bounded(
            self.config.acquire_timeout,
            self.client.acquire(runner_id, task_id, cancel),
        )
        .await
        {
            Ok(task) => task,
            Err(e) => {
                warn!(task_id, "failed to acquire task: {}", e);
                return Ok(());
            }
        };

        info!(
            "[worker {}]: successfully acquired task {} of type {}",
            worker, task_id, task.task_type
        );

        let handler = match self.router.route(&task.task_type) {
            Some(handler) if self.router.supports(&task.task_type) => handler,
            _ => anyhow::bail!(
                "task of type {} was never meant to reach this runner",
                task.task_type
            ),
        };

        let result = match handler.handle(&task).await {
            Ok(output) => TaskResult::ok(&task, &output),
            Err(e) => {
                warn!(task_id, "[worker {}]: handler failed: {:#}", worker, e);
                TaskResult::failed(&task, format!("{:#}", e))
            }
        };

        // Reported even during shutdown: the work has already been done.
        bounded(
            self.config.status_timeout,
            self.client
                .send_status(runner_id, task_id, &result, &CancellationToken::new()),
        )
        .await
        .context("failed to send task status")?;

        info!(
            "[worker {}]: successfully completed task {} of type {} ({})",
            worker, task_id, task.task_type, result.status
        );
        Ok(())
    }
}
