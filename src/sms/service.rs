/// SMS dispatch task
///
/// The IMS dispatcher is single-owner state. It lives inside one tokio task
/// and every send and result is serialized through a bounded command queue.
/// `SmsHandle` is the clonable front door.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatchers_controller::CsRetryHandler;
use super::error::{SmsError, SmsResult};
use super::ims_dispatcher::{ImsSmsDispatcher, SendOutcome, SendStatus};
use super::metrics::SmsStats;
use super::tracker::SmsTracker;
use super::transport::ImsTransport;

pub const DEFAULT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSnapshot {
    pub next_token: u32,
    pub pending: usize,
    pub stats: SmsStats,
}

enum Command {
    Send {
        tracker: SmsTracker,
        reply: oneshot::Sender<SmsResult<u32>>,
    },
    Result {
        token: u32,
        message_ref: u8,
        status: SendStatus,
        network_error_code: i32,
        reply: oneshot::Sender<SendOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<ServiceSnapshot>,
    },
}

#[derive(Clone)]
pub struct SmsHandle {
    tx: mpsc::Sender<Command>,
}

impl SmsHandle {
    async fn request<T>(&self, cmd: Command, rx: oneshot::Receiver<T>) -> SmsResult<T> {
        self.tx.send(cmd).await.map_err(|_| SmsError::ServiceStopped)?;
        rx.await.map_err(|_| SmsError::ServiceStopped)
    }

    pub async fn send_sms(&self, tracker: SmsTracker) -> SmsResult<u32> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Send { tracker, reply }, rx).await?
    }

    pub async fn on_send_sms_result(
        &self,
        token: u32,
        message_ref: u8,
        status: SendStatus,
        network_error_code: i32,
    ) -> SmsResult<SendOutcome> {
        let (reply, rx) = oneshot::channel();
        self.request(
            Command::Result {
                token,
                message_ref,
                status,
                network_error_code,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn snapshot(&self) -> SmsResult<ServiceSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Snapshot { reply }, rx).await
    }
}

pub struct SmsService {
    cancel_token: CancellationToken,
    task: JoinHandle<Vec<SmsTracker>>,
}

impl SmsService {
    /// Move the dispatcher into its own task.
    pub fn spawn<T, R>(
        dispatcher: ImsSmsDispatcher<T, R>,
        queue_depth: usize,
        cancel_token: CancellationToken,
    ) -> (Self, SmsHandle)
    where
        T: ImsTransport + Send + 'static,
        R: CsRetryHandler + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let task = tokio::spawn(run(dispatcher, rx, cancel_token.clone()));
        (Self { cancel_token, task }, SmsHandle { tx })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop the task and collect whatever was still waiting on a result.
    pub async fn shutdown(self) -> SmsResult<Vec<SmsTracker>> {
        self.cancel_token.cancel();
        self.join().await
    }

    /// Wait for the task to end, by cancellation or because every handle dropped.
    pub async fn join(self) -> SmsResult<Vec<SmsTracker>> {
        self.task.await.map_err(|e| {
            warn!("SMS task ended abnormally: {}", e);
            SmsError::ServiceStopped
        })
    }
}

async fn run<T: ImsTransport, R: CsRetryHandler>(
    mut dispatcher: ImsSmsDispatcher<T, R>,
    mut rx: mpsc::Receiver<Command>,
    cancel_token: CancellationToken,
) -> Vec<SmsTracker> {
    info!("SMS dispatcher started");
    loop {
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    Some(cmd) => handle(&mut dispatcher, cmd),
                    None => {
                        debug!("All SMS handles dropped");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("SMS dispatcher shutting down");
                break;
            }
        }
    }
    dispatcher.teardown()
}

fn handle<T: ImsTransport, R: CsRetryHandler>(dispatcher: &mut ImsSmsDispatcher<T, R>, cmd: Command) {
    // A dropped reply receiver only means the caller stopped waiting
    match cmd {
        Command::Send { tracker, reply } => {
            let _ = reply.send(dispatcher.send_sms(tracker));
        }
        Command::Result {
            token,
            message_ref,
            status,
            network_error_code,
            reply,
        } => {
            let outcome =
                dispatcher.on_send_sms_result(token, message_ref, status, network_error_code);
            let _ = reply.send(outcome);
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(ServiceSnapshot {
                next_token: dispatcher.next_token(),
                pending: dispatcher.pending_count(),
                stats: dispatcher.metrics().snapshot(),
            });
        }
    }
}
