//! Bounded worker pool for per-file operations.
//!
//! The coordinator drains a queue of jobs into at most `limit` running
//! tasks and collects their results as they finish. A slot is refilled only
//! while no job has failed, so the first failure stops dispatch: queued jobs
//! are dropped, jobs already running finish and their results are kept.
//! Nothing is rolled back.

use std::future::Future;

use tokio::task::{JoinError, JoinSet};

/// What happened to the jobs of one pool run.
#[derive(Debug)]
pub struct PhaseOutcome<O, E> {
  /// Results of jobs that succeeded, in completion order.
  pub completed: Vec<O>,
  /// Failures in the order they were observed. The first one stopped the run.
  pub errors: Vec<E>,
}

impl<O, E> PhaseOutcome<O, E> {
  /// A run that failed before any job was dispatched.
  pub fn failed(error: E) -> Self {
    Self {
      completed: Vec::new(),
      errors: vec![error],
    }
  }

  pub fn is_success(&self) -> bool {
    self.errors.is_empty()
  }

  /// Split into the completed results and the first error, if any.
  pub fn into_parts(self) -> (Vec<O>, Option<E>) {
    (self.completed, self.errors.into_iter().next())
  }
}

/// Run `op` over `jobs` with at most `limit` operations in flight.
pub async fn run_bounded<T, O, E, F, Fut>(jobs: Vec<T>, limit: usize, op: F) -> PhaseOutcome<O, E>
where
  O: Send + 'static,
  E: From<JoinError> + Send + 'static,
  F: Fn(T) -> Fut,
  Fut: Future<Output = Result<O, E>> + Send + 'static,
{
  let mut outcome = PhaseOutcome {
    completed: Vec::with_capacity(jobs.len()),
    errors: Vec::new(),
  };

  let mut queue = jobs.into_iter();
  let mut in_flight = JoinSet::new();
  for job in queue.by_ref().take(limit.max(1)) {
    in_flight.spawn(op(job));
  }

  while let Some(joined) = in_flight.join_next().await {
    match joined {
      Ok(Ok(value)) => outcome.completed.push(value),
      Ok(Err(e)) => outcome.errors.push(e),
      Err(e) => outcome.errors.push(E::from(e)),
    }

    if outcome.errors.is_empty()
      && let Some(job) = queue.next()
    {
      in_flight.spawn(op(job));
    }
  }

  outcome
}
