use std::future;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::emitter::{EVENT_QUEUE_CAPACITY, Emitter, EventSource, channel};
use crate::error::{ConsoleError, Result};
use crate::event::{Action, BuildEvent, Message};

/// Time the driver gets to exit after SIGTERM before it is killed
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// A running build driver as seen from the UI loop
pub struct Operation {
    action: Action,
    source: Option<EventSource>,
    done: Option<oneshot::Receiver<Result<()>>>,
    stop: CancellationToken,
}

impl Operation {
    /// Start `command` for `action` on the runtime
    pub fn spawn(action: Action, command: String) -> Self {
        let (emitter, source) = channel(EVENT_QUEUE_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let stop = source.stop_token();
        let token = stop.clone();

        tokio::spawn(async move {
            let result = run_driver(action, &command, &emitter, token).await;
            let dropped = emitter.dropped();
            if dropped > 0 {
                warn!(%action, dropped, "events dropped by full queue");
            }
            drop(emitter);
            let _ = done_tx.send(result);
        });

        Self {
            action,
            source: Some(source),
            done: Some(done_rx),
            stop,
        }
    }

    /// Assemble an operation from its halves, for a producer driven elsewhere
    pub fn from_parts(
        action: Action,
        source: EventSource,
        done: oneshot::Receiver<Result<()>>,
    ) -> Self {
        let stop = source.stop_token();
        Self {
            action,
            source: Some(source),
            done: Some(done),
            stop,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Signal stop: pending waits return and the driver is terminated
    pub fn cancel(&self) {
        self.stop.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Whether any message is still to come
    pub fn is_active(&self) -> bool {
        self.source.is_some() || self.done.is_some()
    }

    /// Next message from this operation
    ///
    /// Queued events are delivered before the completion result. Pending
    /// forever once both halves are spent.
    pub async fn next_message(&mut self) -> Message {
        tokio::select! {
            biased;
            event = next_event(&mut self.source) => match event {
                Some(event) => Message::Build(event),
                None => {
                    self.source = None;
                    Message::EventsClosed
                }
            },
            result = completion(&mut self.done) => {
                self.done = None;
                Message::OperationDone(result)
            }
        }
    }
}

async fn next_event(source: &mut Option<EventSource>) -> Option<BuildEvent> {
    match source {
        Some(source) => source.wait_for_event().await,
        None => future::pending().await,
    }
}

async fn completion(done: &mut Option<oneshot::Receiver<Result<()>>>) -> Result<()> {
    match done {
        Some(done) => done
            .await
            .unwrap_or_else(|_| Err(io::Error::other("build driver task ended").into())),
        None => future::pending().await,
    }
}

/// Run `command` under `sh -c` in its own process group, forwarding output
///
/// stdout lines become log events, stderr lines raw log events.
pub async fn run_driver(
    action: Action,
    command: &str,
    emitter: &Emitter,
    stop: CancellationToken,
) -> Result<()> {
    info!(%action, command, "starting operation");
    emitter.emit(BuildEvent::status(format!(
        "Starting {}",
        action.label().to_lowercase()
    )));

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| {
            warn!(%action, error = %source, "failed to spawn build driver");
            ConsoleError::Spawn {
                command: command.to_string(),
                source,
            }
        })?;

    let stdout = child.stdout.take().map(|out| {
        tokio::spawn(forward_lines(out, emitter.clone(), |line| {
            BuildEvent::log(line)
        }))
    });
    let stderr = child.stderr.take().map(|err| {
        tokio::spawn(forward_lines(err, emitter.clone(), |message| {
            BuildEvent::LogRaw { message }
        }))
    });

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = stop.cancelled() => {
            info!(%action, "canceling operation");
            terminate(&mut child).await;
            return Err(ConsoleError::Canceled);
        }
    };

    for task in [stdout, stderr].into_iter().flatten() {
        if let Err(err) = task.await {
            debug!(error = %err, "output reader ended abnormally");
        }
    }

    let result = outcome(status);
    let label = action.label();
    let line = match &result {
        Ok(()) => format!("{label} succeeded"),
        Err(ConsoleError::DriverFailed { exit_code }) => {
            format!("{label} failed (exit code {exit_code})")
        }
        Err(err) => format!("{label} failed: {err}"),
    };
    emitter.emit(BuildEvent::Result { message: line });
    info!(%action, ok = result.is_ok(), "operation finished");
    result
}

fn outcome(status: ExitStatus) -> Result<()> {
    match status.code() {
        Some(0) => Ok(()),
        Some(exit_code) => Err(ConsoleError::DriverFailed { exit_code }),
        None => Err(ConsoleError::Terminated),
    }
}

async fn forward_lines<R>(reader: R, emitter: Emitter, wrap: fn(String) -> BuildEvent)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        emitter.emit(wrap(line));
    }
}

/// SIGTERM the process group, then kill after the grace period
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id()
        && let Ok(raw) = i32::try_from(pid)
        && let Err(err) = killpg(Pid::from_raw(raw), Signal::SIGTERM)
    {
        debug!(error = %err, "SIGTERM to process group failed");
    }

    if tokio::time::timeout(TERMINATE_GRACE, child.wait())
        .await
        .is_err()
    {
        warn!("build driver ignored SIGTERM, killing");
        if let Err(err) = child.kill().await {
            warn!(error = %err, "failed to kill build driver");
        }
    }
}
