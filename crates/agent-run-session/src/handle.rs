//! Handle owning one task execution.

use std::sync::Arc;

use agent_run_core::{
    AgentTask, LifecycleEvent, LifecycleObserver, LogSink, RunContext, RunOutcome, RunStatus,
    StatusCell, StopSignal, TaskError,
};
use tokio::task::JoinHandle;

use crate::cancel::{CancelError, CancelPolicy, ForcefulCanceller};

/// Owns one task execution: spawns it, tracks its status, and exposes a
/// blocking forced-stop operation.
///
/// Task-internal errors are recovered here: the observer is notified and
/// the run marked `Failed`, while the join handle still resolves to an
/// error so the failure is surfaced rather than silently absorbed. The
/// orchestrating process is never crashed by a failing task.
pub struct RunHandle {
    status: Arc<StatusCell>,
    signal: StopSignal,
    observer: Arc<dyn LifecycleObserver>,
    canceller: ForcefulCanceller,
    join: JoinHandle<Result<(), TaskError>>,
}

impl RunHandle {
    /// Spawn the task and return its handle.
    ///
    /// The "Starting the run" notification is emitted before the task is
    /// scheduled, so it always precedes any output of the task itself.
    #[must_use]
    pub fn spawn(
        task: Arc<dyn AgentTask>,
        observer: Arc<dyn LifecycleObserver>,
        sink: LogSink,
        policy: CancelPolicy,
    ) -> Self {
        let status = Arc::new(StatusCell::new());
        let signal = StopSignal::new();

        observer.on_event(&LifecycleEvent::RunStarted);
        status.advance(RunStatus::Running);

        let ctx = RunContext {
            sink,
            observer: Arc::clone(&observer),
            stop: signal.clone(),
        };

        let join = tokio::spawn({
            let status = Arc::clone(&status);
            let observer = Arc::clone(&observer);
            async move {
                match task.run(&ctx).await {
                    Ok(()) => {
                        if status.advance(RunStatus::Finished) {
                            observer.on_event(&LifecycleEvent::RunFinished {
                                outcome: RunOutcome::Completed,
                            });
                        }
                        Ok(())
                    }
                    Err(TaskError::Interrupted) => {
                        tracing::debug!("task exited on stop request");
                        // Usually stop() is still polling and emits the
                        // terminal notification once the task is gone. If
                        // it already gave up on a deadline, the run must
                        // not be stranded in StopRequested: whoever wins
                        // the transition emits, never both.
                        if status.advance(RunStatus::Stopped) {
                            observer.on_event(&LifecycleEvent::RunFinished {
                                outcome: RunOutcome::Stopped,
                            });
                        }
                        Err(TaskError::Interrupted)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "agent run failed");
                        if status.advance(RunStatus::Failed) {
                            observer.on_event(&LifecycleEvent::RunFinished {
                                outcome: RunOutcome::Errored {
                                    message: e.to_string(),
                                    detail: error_chain(&e),
                                },
                            });
                        }
                        Err(e)
                    }
                }
            }
        });

        Self {
            status,
            signal,
            observer,
            canceller: ForcefulCanceller::new(policy),
            join,
        }
    }

    /// Whether the background execution is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.join.is_finished()
    }

    /// Current run status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status.get()
    }

    /// Forcefully stop the run, blocking until the task has exited.
    ///
    /// Re-delivers the stop signal at the configured cadence until the
    /// task is gone, then marks the run `Stopped` and emits the terminal
    /// notification. If the task finished naturally in the meantime, its
    /// own terminal state wins and no stop notification is emitted. A
    /// task that only observes the signal after a deadline error from
    /// this method still terminates the run itself.
    ///
    /// # Errors
    /// Returns `CancelError::DeadlineExceeded` if a deadline is configured
    /// and the task outlives it.
    pub async fn stop(&self) -> Result<(), CancelError> {
        self.status.advance(RunStatus::StopRequested);
        self.canceller
            .cancel(&self.signal, || self.is_alive())
            .await?;
        if self.status.advance(RunStatus::Stopped) {
            self.observer.on_event(&LifecycleEvent::RunFinished {
                outcome: RunOutcome::Stopped,
            });
        }
        Ok(())
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use agent_run_core::{EventBridge, EventStore, InstantEmptySubmit, LogLevel, RunEvent};
    use async_trait::async_trait;

    struct BlockUntilStopped;

    #[async_trait]
    impl AgentTask for BlockUntilStopped {
        async fn run(&self, ctx: &RunContext) -> Result<(), TaskError> {
            ctx.stop.cancelled().await;
            Err(TaskError::Interrupted)
        }
    }

    /// Task that only reaches its first checkpoint after a delay.
    struct SlowToNotice;

    #[async_trait]
    impl AgentTask for SlowToNotice {
        async fn run(&self, ctx: &RunContext) -> Result<(), TaskError> {
            tokio::time::sleep(Duration::from_millis(150)).await;
            ctx.stop.checkpoint()?;
            Ok(())
        }
    }

    struct FailingTask;

    #[async_trait]
    impl AgentTask for FailingTask {
        async fn run(&self, _ctx: &RunContext) -> Result<(), TaskError> {
            Err(TaskError::Failed("model quota exhausted".to_string()))
        }
    }

    fn fast_policy() -> CancelPolicy {
        CancelPolicy {
            poll_interval: Duration::from_millis(5),
            deadline: None,
        }
    }

    fn spawn_with_store(task: Arc<dyn AgentTask>) -> (RunHandle, Arc<EventStore>) {
        let store = Arc::new(EventStore::new());
        let observer = Arc::new(EventBridge::new(Arc::clone(&store)));
        let sink = LogSink::new(Arc::clone(&store));
        let handle = RunHandle::spawn(task, observer, sink, fast_policy());
        (handle, store)
    }

    #[tokio::test]
    async fn test_stop_leaves_handle_not_alive() {
        let (handle, store) = spawn_with_store(Arc::new(BlockUntilStopped));
        assert!(handle.is_alive());

        handle.stop().await.unwrap();

        assert!(!handle.is_alive());
        assert_eq!(handle.status(), RunStatus::Stopped);
        let history = store.get_history();
        assert!(history.contains(&RunEvent::AgentUpdate {
            text: "Run stopped by user".to_string()
        }));
    }

    #[tokio::test]
    async fn test_natural_completion_wins_over_later_stop() {
        let (handle, store) = spawn_with_store(Arc::new(InstantEmptySubmit));
        // Let the task run to completion first.
        while handle.is_alive() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        handle.stop().await.unwrap();

        assert_eq!(handle.status(), RunStatus::Finished);
        let finished = store
            .get_history()
            .iter()
            .filter(|e| matches!(e, RunEvent::RunFinished))
            .count();
        assert_eq!(finished, 1, "exactly one terminal event");
    }

    #[tokio::test]
    async fn test_failure_is_recovered_and_reported() {
        let (handle, store) = spawn_with_store(Arc::new(FailingTask));
        while handle.is_alive() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(handle.status(), RunStatus::Failed);
        let history = store.get_history();
        assert!(history.contains(&RunEvent::AgentUpdate {
            text: "Error (see log for details): model quota exhausted".to_string()
        }));
        assert!(history.contains(&RunEvent::LogUpdate {
            text: "model quota exhausted".to_string(),
            level: LogLevel::Critical,
        }));
        assert_eq!(*history.last().unwrap(), RunEvent::RunFinished);
    }

    #[tokio::test]
    async fn test_start_notification_precedes_task_output() {
        let (handle, store) = spawn_with_store(Arc::new(InstantEmptySubmit));
        while handle.is_alive() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let history = store.get_history();
        assert_eq!(
            history[0],
            RunEvent::AgentUpdate {
                text: "Starting the run".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_stub_run_stops_within_one_polling_interval() {
        let (handle, _store) = spawn_with_store(Arc::new(InstantEmptySubmit));
        let started = std::time::Instant::now();
        handle.stop().await.unwrap();
        assert!(started.elapsed() <= Duration::from_millis(100));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_deadline_exceeded_run_still_terminates() {
        let store = Arc::new(EventStore::new());
        let observer = Arc::new(EventBridge::new(Arc::clone(&store)));
        let sink = LogSink::new(Arc::clone(&store));
        let handle = RunHandle::spawn(
            Arc::new(SlowToNotice),
            observer,
            sink,
            CancelPolicy {
                poll_interval: Duration::from_millis(5),
                deadline: Some(Duration::from_millis(20)),
            },
        );

        // The task only checkpoints well after the deadline.
        assert!(matches!(
            handle.stop().await,
            Err(CancelError::DeadlineExceeded(_))
        ));
        assert_eq!(handle.status(), RunStatus::StopRequested);

        // Once it does observe the signal, the run must still reach its
        // terminal state and emit exactly one finished event.
        while handle.is_alive() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(handle.status(), RunStatus::Stopped);
        let history = store.get_history();
        let finished = history
            .iter()
            .filter(|e| matches!(e, RunEvent::RunFinished))
            .count();
        assert_eq!(finished, 1);
        assert!(history.contains(&RunEvent::AgentUpdate {
            text: "Run stopped by user".to_string()
        }));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let io = std::io::Error::other("disk full");
        let err = TaskError::Io(io);
        let chain = error_chain(&err);
        assert!(chain.contains("disk full"));
    }
}
