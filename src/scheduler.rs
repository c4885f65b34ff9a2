//! Scheduler
//!
//! Dispatches execution requests to a bounded pool of worker tasks pulling from one insertion-ordered queue.
//! Workers report back over a channel to a single collector, which owns every case's state and records each
//! outcome exactly once.
//!
//! ## Notes
//!
//! - Per-case lifecycle: `discovered → queued → running → {completed | timed-out | errored | cancelled}`.
//! - No worker waits on another; a hung front end only occupies its own worker until its timeout fires.
//! - Cancellation stops dispatch, kills in-flight processes, and marks queued cases `cancelled`.
//! - Nothing is retried.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use svconform_core::CaseStatus;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::matcher;
use crate::outcome::CaseOutcome;
use crate::request::ExecutionRequest;
use crate::runner::CaseExecutor;

/// Lifecycle state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Discovered,
    Queued,
    Running,
    /// Ran to completion (any status decided from output).
    Completed,
    TimedOut,
    /// Could not run, or crashed.
    Errored,
    Cancelled,
}

/// An illegal state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: CaseState,
    pub to: CaseState,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal case state transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

impl CaseState {
    /// Whether the state is final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CaseState::Completed | CaseState::TimedOut | CaseState::Errored | CaseState::Cancelled
        )
    }

    /// Terminal state corresponding to a decided status.
    pub fn terminal_for(status: CaseStatus) -> CaseState {
        match status {
            CaseStatus::Timeout => CaseState::TimedOut,
            CaseStatus::ToolError | CaseStatus::Malformed => CaseState::Errored,
            CaseStatus::Cancelled => CaseState::Cancelled,
            CaseStatus::Pass | CaseStatus::Fail | CaseStatus::Skipped => CaseState::Completed,
        }
    }

    /// Move to `next`, rejecting anything the lifecycle does not allow.
    pub fn advance(self, next: CaseState) -> Result<CaseState, TransitionError> {
        let legal = match (self, next) {
            (CaseState::Discovered, CaseState::Queued) => true,
            (CaseState::Queued, CaseState::Running) => true,
            (CaseState::Queued, CaseState::Cancelled) => true,
            (CaseState::Running, to) => to.is_terminal(),
            _ => false,
        };
        if legal {
            Ok(next)
        } else {
            Err(TransitionError { from: self, to: next })
        }
    }
}

enum Event {
    Started(usize),
    Finished(usize, Box<CaseOutcome>),
}

type Queue = Arc<Mutex<VecDeque<(usize, ExecutionRequest)>>>;

fn pop(queue: &Queue) -> Option<(usize, ExecutionRequest)> {
    queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
}

/// Bounded worker pool over a [`CaseExecutor`].
pub struct Scheduler<E: CaseExecutor> {
    executor: Arc<E>,
    workers: usize,
}

impl<E: CaseExecutor> Scheduler<E> {
    pub fn new(executor: E, workers: usize) -> Self {
        Self {
            executor: Arc::new(executor),
            workers: workers.max(1),
        }
    }

    /// Run every request and return one outcome per request, in request order.
    ///
    /// `on_complete` is called from the collector as each outcome is recorded (completion order).
    #[tracing::instrument(skip_all, fields(requests = requests.len(), workers = self.workers))]
    pub async fn run(
        &self,
        requests: Vec<ExecutionRequest>,
        cancel: watch::Receiver<bool>,
        on_complete: &mut (dyn FnMut(&CaseOutcome) + Send),
    ) -> Vec<CaseOutcome> {
        let total = requests.len();
        let mut states = vec![CaseState::Discovered; total];
        let mut outcomes: Vec<Option<CaseOutcome>> = vec![None; total];

        for state in &mut states {
            *state = transition(*state, CaseState::Queued);
        }
        let pending: Vec<ExecutionRequest> = requests.clone();
        let queue: Queue = Arc::new(Mutex::new(requests.into_iter().enumerate().collect()));

        let (tx, mut rx) = mpsc::channel::<Event>(self.workers * 2);
        let mut pool = JoinSet::new();
        for worker in 0..self.workers.min(total) {
            let queue = Arc::clone(&queue);
            let executor = Arc::clone(&self.executor);
            let tx = tx.clone();
            let cancel = cancel.clone();
            pool.spawn(async move {
                tracing::trace!(worker, "worker started");
                loop {
                    if *cancel.borrow() {
                        break;
                    }
                    let Some((id, request)) = pop(&queue) else {
                        break;
                    };
                    if tx.send(Event::Started(id)).await.is_err() {
                        break;
                    }
                    let output = executor.execute(&request, cancel.clone()).await;
                    let outcome = matcher::decide(&request, output);
                    if tx.send(Event::Finished(id, Box::new(outcome))).await.is_err() {
                        break;
                    }
                }
                tracing::trace!(worker, "worker stopped");
            });
        }
        drop(tx);

        while let Some(event) = rx.recv().await {
            match event {
                Event::Started(id) => {
                    states[id] = transition(states[id], CaseState::Running);
                }
                Event::Finished(id, outcome) => {
                    states[id] = transition(states[id], CaseState::terminal_for(outcome.status));
                    on_complete(&outcome);
                    outcomes[id] = Some(*outcome);
                }
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "worker task failed");
            }
        }

        let mut cancelled = 0usize;
        let mut lost = 0usize;
        let results = outcomes
            .into_iter()
            .zip(pending.iter())
            .enumerate()
            .map(|(id, (outcome, request))| match outcome {
                Some(outcome) => outcome,
                None if states[id] == CaseState::Queued => {
                    cancelled += 1;
                    let outcome = CaseOutcome::cancelled_before_start(request);
                    on_complete(&outcome);
                    outcome
                }
                None => {
                    lost += 1;
                    let outcome = CaseOutcome::for_request(request, CaseStatus::ToolError)
                        .with_reason("worker stopped before the case finished");
                    on_complete(&outcome);
                    outcome
                }
            })
            .collect();

        if cancelled > 0 {
            tracing::info!(cancelled, "queued cases cancelled");
        }
        if lost > 0 {
            tracing::error!(lost, "cases lost by failed workers");
        }
        results
    }
}

/// Apply a transition, logging (not panicking) on a lifecycle violation.
fn transition(from: CaseState, to: CaseState) -> CaseState {
    match from.advance(to) {
        Ok(next) => next,
        Err(err) => {
            tracing::error!(%err, "case state machine violated");
            to
        }
    }
}
