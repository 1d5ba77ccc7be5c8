//! Process lifecycle
//!
//! The [`Supervisor`] owns the shutdown path. It runs the transport as the
//! main task and waits for whichever comes first: a termination signal, the
//! main task ending, or any supervised task panicking. Then it closes every
//! session, cancels the shutdown token and lets the main task wind down.
//!
//! | Trigger | Outcome | Exit code |
//! |---------|---------|-----------|
//! | SIGINT / SIGTERM | `Signalled` | 0 |
//! | main task returned `Ok` | `Completed` | 0 |
//! | main task error or panic | `Failed` | 1 |
//! | supervised task panic | `Failed` | 1 |

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::session::SessionRegistry;

/// How long the main task may take to finish after shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Why the process is stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Signalled,
    Completed,
    Failed(String),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Signalled | Self::Completed => 0,
            Self::Failed(_) => 1,
        }
    }
}

/// A supervised task that panicked.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub task: String,
    pub message: String,
}

/// Spawns tasks whose panics are reported to the [`Supervisor`].
#[derive(Clone)]
pub struct TaskSpawner {
    failures: mpsc::UnboundedSender<TaskFailure>,
}

impl TaskSpawner {
    /// Spawn `future` under supervision.
    ///
    /// A panic is caught, logged and reported instead of silently ending
    /// the task.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let failures = self.failures.clone();

        tokio::spawn(async move {
            if let Err(panic) = AssertUnwindSafe(future).catch_unwind().await {
                let message = panic_message(panic.as_ref());
                tracing::error!(task = %name, %message, "Supervised task panicked");
                let _ = failures.send(TaskFailure {
                    task: name,
                    message,
                });
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Coordinates shutdown for the whole process.
pub struct Supervisor {
    sessions: Arc<SessionRegistry>,
    shutdown: CancellationToken,
    spawner: TaskSpawner,
    failures: mpsc::UnboundedReceiver<TaskFailure>,
}

impl Supervisor {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        let (tx, failures) = mpsc::unbounded_channel();
        Self {
            sessions,
            shutdown: CancellationToken::new(),
            spawner: TaskSpawner { failures: tx },
            failures,
        }
    }

    pub fn spawner(&self) -> TaskSpawner {
        self.spawner.clone()
    }

    /// Cancelled once shutdown starts; transports stop on it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run `main` until it ends, `signal` resolves or a task fails.
    pub async fn run<M, S>(mut self, main: M, signal: S) -> Outcome
    where
        M: Future<Output = Result<()>> + Send + 'static,
        S: Future<Output = ()>,
    {
        let mut main = tokio::spawn(main);
        let mut main_finished = false;

        let outcome = tokio::select! {
            _ = signal => {
                tracing::info!("Shutdown signal received");
                Outcome::Signalled
            }
            joined = &mut main => {
                main_finished = true;
                match joined {
                    Ok(Ok(())) => Outcome::Completed,
                    Ok(Err(e)) => Outcome::Failed(e.to_string()),
                    Err(e) => Outcome::Failed(format!("main task failed: {e}")),
                }
            }
            Some(failure) = self.failures.recv() => {
                Outcome::Failed(format!("task '{}' panicked: {}", failure.task, failure.message))
            }
        };

        let closed = self.sessions.close_all();
        self.shutdown.cancel();
        tracing::info!(sessions = closed, ?outcome, "Shutting down");

        if !main_finished {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut main).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "Main task failed during shutdown"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Main task panicked during shutdown"),
                Err(_) => {
                    tracing::warn!(grace = ?SHUTDOWN_GRACE, "Main task did not stop in time");
                    main.abort();
                }
            }
        }

        if let Outcome::Failed(reason) = &outcome {
            tracing::error!(%reason, "Server stopped on failure");
        }
        outcome
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn wait_for(token: CancellationToken) -> impl Future<Output = Result<()>> + Send + 'static {
        async move {
            token.cancelled().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn signal_closes_sessions_and_exits_zero() {
        let sessions = Arc::new(SessionRegistry::new());
        let supervisor = Supervisor::new(sessions.clone());
        let token = supervisor.shutdown_token();
        let (_a, mut ra) = sessions.open();
        let (_b, _rb) = sessions.open();

        let outcome = supervisor
            .run(wait_for(token.clone()), std::future::ready(()))
            .await;

        assert_eq!(outcome, Outcome::Signalled);
        assert_eq!(outcome.exit_code(), 0);
        assert!(sessions.is_empty());
        assert!(token.is_cancelled());
        assert!(ra.recv().await.is_none());
    }

    #[tokio::test]
    async fn panicking_task_fails_the_process() {
        let sessions = Arc::new(SessionRegistry::new());
        let supervisor = Supervisor::new(sessions.clone());
        let token = supervisor.shutdown_token();
        let (_a, _ra) = sessions.open();

        supervisor.spawner().spawn("exploder", async {
            panic!("boom");
        });

        let outcome = supervisor
            .run(wait_for(token.clone()), std::future::pending())
            .await;

        assert_eq!(outcome.exit_code(), 1);
        assert!(matches!(&outcome, Outcome::Failed(m) if m.contains("exploder") && m.contains("boom")));
        assert!(sessions.is_empty());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn main_returning_error_fails_the_process() {
        let supervisor = Supervisor::new(Arc::new(SessionRegistry::new()));

        let outcome = supervisor
            .run(
                async { Err(Error::Server("bind failed".to_string())) },
                std::future::pending(),
            )
            .await;

        assert_eq!(outcome, Outcome::Failed("server error: bind failed".to_string()));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn main_completing_exits_zero() {
        let supervisor = Supervisor::new(Arc::new(SessionRegistry::new()));
        let outcome = supervisor.run(async { Ok(()) }, std::future::pending()).await;
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn healthy_tasks_do_not_stop_the_process() {
        let supervisor = Supervisor::new(Arc::new(SessionRegistry::new()));
        let finished = supervisor.spawner().spawn("quiet", async {});
        finished.await.unwrap();

        let outcome = supervisor.run(async { Ok(()) }, std::future::pending()).await;
        assert_eq!(outcome, Outcome::Completed);
    }
}
