//! Supervised execution of one transfer invocation.
//!
//! The external process is the only concurrently running entity. Launch
//! returns as soon as the child is spawned; its captured output and the
//! terminal exit event are delivered over channels and consumed on the
//! caller's task, so mark state is never touched off the main loop.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};

use crate::command::CommandLine;
use crate::errors::SpawnError;
use crate::host::{Notifier, Severity};

/// Lifecycle of one session: `Idle -> Launching -> Running -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Launching,
    Running,
    Succeeded,
    /// Non-zero exit code; a child killed by a signal reports -1.
    Failed(i32),
}

/// Dimensions of the captured output surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

/// A spawned transfer: line-buffered captured output plus the exit event.
pub struct TransferChild {
    pub output: mpsc::UnboundedReceiver<String>,
    pub exit: oneshot::Receiver<Option<i32>>,
}

#[async_trait]
pub trait TransferBackend {
    async fn spawn(
        &self,
        command: &CommandLine,
        surface: SurfaceSize,
    ) -> Result<TransferChild, SpawnError>;
}

/// Production backend: `tokio::process` with stdout and stderr merged into
/// the captured surface.
pub struct SystemBackend;

fn pump_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

#[async_trait]
impl TransferBackend for SystemBackend {
    async fn spawn(
        &self,
        command: &CommandLine,
        surface: SurfaceSize,
    ) -> Result<TransferChild, SpawnError> {
        let mut child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("COLUMNS", surface.cols.to_string())
            .env("LINES", surface.rows.to_string())
            .spawn()?;

        let (tx, output) = mpsc::unbounded_channel();
        let stdout = child.stdout.take().ok_or(SpawnError::SurfaceUnavailable)?;
        let stderr = child.stderr.take().ok_or(SpawnError::SurfaceUnavailable)?;
        pump_lines(stdout, tx.clone());
        pump_lines(stderr, tx);

        let (exit_tx, exit) = oneshot::channel();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    tracing::error!(%err, "failed to reap transfer process");
                    None
                }
            };
            let _ = exit_tx.send(code);
        });

        Ok(TransferChild { output, exit })
    }
}

/// Something a running session produced: a captured output line, or the
/// terminal exit event.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionUpdate {
    Output(String),
    Finished(SessionState),
}

/// One supervised run of the transfer tool from spawn to exit. No timeout,
/// no cancellation, no queueing.
pub struct TransferSession {
    state: SessionState,
    output: mpsc::UnboundedReceiver<String>,
    output_closed: bool,
    exit: Option<oneshot::Receiver<Option<i32>>>,
}

impl TransferSession {
    /// Spawns the invocation and returns immediately. A launch failure never
    /// leaves a process behind.
    pub async fn launch(
        backend: &dyn TransferBackend,
        command: &CommandLine,
        surface: SurfaceSize,
    ) -> Result<Self, SpawnError> {
        tracing::debug!(command = %command.rendered(), "launching transfer");
        let child = backend.spawn(command, surface).await?;
        Ok(Self {
            state: SessionState::Running,
            output: child.output,
            output_closed: false,
            exit: Some(child.exit),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Next captured output line, or None once the surface closes.
    pub async fn next_line(&mut self) -> Option<String> {
        self.output.recv().await
    }

    /// Non-blocking variant for render loops.
    pub fn try_line(&mut self) -> Option<String> {
        self.output.try_recv().ok()
    }

    /// Non-blocking poll used by render loops: output lines first, then the
    /// exit event, None while the process is still quiet.
    pub fn try_update(&mut self) -> Option<SessionUpdate> {
        if let Ok(line) = self.output.try_recv() {
            return Some(SessionUpdate::Output(line));
        }
        let rx = self.exit.as_mut()?;
        let exited = match rx.try_recv() {
            Ok(code) => Ok(code),
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(()),
        };
        self.exit = None;
        self.state = match exited {
            Ok(Some(0)) => SessionState::Succeeded,
            Ok(Some(code)) => SessionState::Failed(code),
            Ok(None) | Err(()) => SessionState::Failed(-1),
        };
        Some(SessionUpdate::Finished(self.state))
    }

    /// Next session event. Output lines drain ahead of the exit event so
    /// the surface always shows the final lines; cancellation-safe, so the
    /// host can race it against input in its event loop.
    pub async fn update(&mut self) -> SessionUpdate {
        loop {
            let Self {
                state,
                output,
                output_closed,
                exit,
            } = &mut *self;
            let Some(rx) = exit.as_mut() else {
                return SessionUpdate::Finished(*state);
            };

            let exited = if *output_closed {
                rx.await
            } else {
                tokio::select! {
                    biased;
                    maybe = output.recv() => {
                        match maybe {
                            Some(line) => return SessionUpdate::Output(line),
                            None => {
                                *output_closed = true;
                                continue;
                            }
                        }
                    }
                    res = &mut *rx => res,
                }
            };

            self.exit = None;
            self.state = match exited {
                Ok(Some(0)) => SessionState::Succeeded,
                Ok(Some(code)) => SessionState::Failed(code),
                // Killed by a signal, or the reaper task died.
                Ok(None) | Err(_) => SessionState::Failed(-1),
            };
            return SessionUpdate::Finished(self.state);
        }
    }

    /// Drives the session to its terminal state, discarding remaining
    /// output.
    pub async fn wait(&mut self) -> SessionState {
        loop {
            if let SessionUpdate::Finished(state) = self.update().await {
                return state;
            }
        }
    }
}

/// Action run exactly once after a successful transfer.
pub type SuccessAction<'a> = Box<dyn FnOnce() -> anyhow::Result<()> + 'a>;

/// Drives a running session to its terminal state and dispatches the
/// outcome: the notification is emitted strictly after exit, and any
/// post-success action runs strictly after the notification. A failure
/// inside the action is caught and cannot mask the success notification.
pub async fn supervise(
    session: &mut TransferSession,
    notifier: &dyn Notifier,
    on_success: Option<SuccessAction<'_>>,
) -> SessionState {
    let state = session.wait().await;
    match state {
        SessionState::Succeeded => {
            tracing::info!("transfer completed");
            notifier.notify(Severity::Info, "Transfer completed");
            if let Some(action) = on_success {
                if let Err(err) = action() {
                    tracing::error!(%err, "post-transfer action failed");
                }
            }
        }
        SessionState::Failed(code) => {
            tracing::warn!(code, "transfer failed");
            notifier.notify(
                Severity::Error,
                &format!("Transfer failed with exit code {code}"),
            );
        }
        // wait() only returns terminal states for a launched session.
        other => {
            tracing::error!(?other, "session finished in a non-terminal state");
        }
    }
    state
}
