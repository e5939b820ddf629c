/// IMS SMS dispatcher
///
/// Sends trackers over IMS, keyed by a per-dispatcher token, and decides on
/// every send result whether the message is done, retried over IMS with
/// TP-RD set, or handed to the circuit-switched path.

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::dispatchers_controller::CsRetryHandler;
use super::error::{SmsError, SmsResult};
use super::metrics::SmsMetrics;
use super::pdu::retry_pdu;
use super::tracker::SmsTracker;
use super::transport::{ImsSendRequest, ImsTransport};
use crate::redact;

/// Maximum IMS retransmissions before a retryable error becomes terminal
pub const DEFAULT_MAX_IMS_RETRIES: u32 = 3;

/// Result status reported by the IMS stack for one send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Ok,
    Error,
    ErrorRetry,
    ErrorFallback,
}

impl SendStatus {
    pub const CODE_OK: i32 = 1;
    pub const CODE_ERROR: i32 = 2;
    pub const CODE_ERROR_RETRY: i32 = 3;
    pub const CODE_ERROR_FALLBACK: i32 = 4;

    /// Map a raw status code; unknown codes are treated as permanent errors.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::CODE_OK => SendStatus::Ok,
            Self::CODE_ERROR_RETRY => SendStatus::ErrorRetry,
            Self::CODE_ERROR_FALLBACK => SendStatus::ErrorFallback,
            _ => SendStatus::Error,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            SendStatus::Ok => Self::CODE_OK,
            SendStatus::Error => Self::CODE_ERROR,
            SendStatus::ErrorRetry => Self::CODE_ERROR_RETRY,
            SendStatus::ErrorFallback => Self::CODE_ERROR_FALLBACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Network rejected the message outright
    Permanent { network_error_code: i32 },
    /// IMS retry ceiling reached
    RetriesExhausted { retry_count: u32 },
    /// Neither IMS nor the CS path would take the message
    FallbackRejected,
    /// Tracker reached a resend with no PDU to send
    MissingPdu,
}

/// What a send result did to the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    Delivered { token: u32, message_ref: u8 },
    RetriedOverIms { previous_token: u32, token: u32, retry_count: u32 },
    FellBackToCs { token: u32, retry_count: u32 },
    Failed { token: u32, reason: FailureReason },
    /// No tracker for this token: stale or duplicate result
    Ignored { token: u32 },
}

impl SendOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SendOutcome::RetriedOverIms { .. } | SendOutcome::Ignored { .. })
    }
}

pub struct ImsSmsDispatcher<T, R> {
    transport: T,
    cs_retry: R,
    next_token: u32,
    pending: HashMap<u32, SmsTracker>,
    max_retries: u32,
    metrics: Arc<SmsMetrics>,
}

impl<T: ImsTransport, R: CsRetryHandler> ImsSmsDispatcher<T, R> {
    pub fn new(transport: T, cs_retry: R) -> Self {
        Self {
            transport,
            cs_retry,
            next_token: 0,
            pending: HashMap::new(),
            max_retries: DEFAULT_MAX_IMS_RETRIES,
            metrics: Arc::new(SmsMetrics::new()),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Last token handed out (0 before the first send)
    pub fn next_token(&self) -> u32 {
        self.next_token
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self, token: u32) -> Option<&SmsTracker> {
        self.pending.get(&token)
    }

    pub fn metrics(&self) -> Arc<SmsMetrics> {
        self.metrics.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cs_retry(&self) -> &R {
        &self.cs_retry
    }

    /// Send a new message over IMS. Returns the token its result will carry.
    ///
    /// If the IMS stack refuses the request the message goes to the CS path
    /// instead; an error is returned only when that fails too.
    pub fn send_sms(&mut self, tracker: SmsTracker) -> SmsResult<u32> {
        if tracker.pdu().is_none() {
            return Err(SmsError::MissingPdu);
        }
        match self.dispatch(tracker) {
            Ok(token) => Ok(token),
            Err((token, tracker, reason)) => match self.fall_back(token, tracker) {
                SendOutcome::FellBackToCs { .. } => Ok(token),
                _ => Err(SmsError::Transport { token, reason }),
            },
        }
    }

    fn allocate_token(&mut self) -> u32 {
        loop {
            self.next_token = self.next_token.wrapping_add(1);
            if self.next_token != 0 && !self.pending.contains_key(&self.next_token) {
                return self.next_token;
            }
        }
    }

    /// Hand the tracker to the transport under a fresh token and register it.
    /// On refusal the tracker is returned unregistered.
    fn dispatch(&mut self, tracker: SmsTracker) -> Result<u32, (u32, SmsTracker, String)> {
        let token = self.allocate_token();
        let request = ImsSendRequest {
            token,
            message_ref: tracker.message_ref,
            format: tracker.format,
            sc_address: tracker.sc_address().map(str::to_string),
            dest_address: tracker.dest_address.clone(),
            retry: tracker.is_retry(),
            pdu: tracker.pdu().cloned().unwrap_or_default(),
        };

        if let Err(e) = self.transport.send_sms(&request) {
            warn!("IMS transport refused token {}: {}", token, e);
            return Err((token, tracker, e.to_string()));
        }
        self.pending.insert(token, tracker);

        self.metrics.record_sent();
        info!(
            "Sent SMS to {} over IMS (token {}, {}, retry {})",
            redact::phone_number(&request.dest_address),
            token,
            request.format,
            request.retry
        );
        debug!("PDU {}", redact::pdu(&request.pdu));
        Ok(token)
    }

    fn fall_back(&mut self, token: u32, mut tracker: SmsTracker) -> SendOutcome {
        tracker.retry_count += 1;
        let retry_count = tracker.retry_count;
        let age = tracker.age();
        match self.cs_retry.send_retry_sms(tracker) {
            Ok(()) => {
                self.metrics.record_fell_back();
                info!(
                    "Token {} handed to CS path (retry count {}, {} ms after first send)",
                    token,
                    retry_count,
                    age.num_milliseconds()
                );
                SendOutcome::FellBackToCs { token, retry_count }
            }
            Err(e) => {
                self.metrics.record_failed();
                error!("Token {} could not fall back to CS: {}", token, e);
                SendOutcome::Failed {
                    token,
                    reason: FailureReason::FallbackRejected,
                }
            }
        }
    }

    /// Handle the IMS stack's result for `token`.
    pub fn on_send_sms_result(
        &mut self,
        token: u32,
        message_ref: u8,
        status: SendStatus,
        network_error_code: i32,
    ) -> SendOutcome {
        let Some(mut tracker) = self.pending.remove(&token) else {
            warn!("Send result for unknown token {} ignored", token);
            self.metrics.record_ignored();
            return SendOutcome::Ignored { token };
        };
        tracker.message_ref = message_ref;

        match status {
            SendStatus::Ok => {
                self.metrics.record_delivered();
                info!(
                    "SMS token {} sent (message ref {}, {} ms after first send)",
                    token,
                    message_ref,
                    tracker.age().num_milliseconds()
                );
                SendOutcome::Delivered { token, message_ref }
            }
            SendStatus::Error => {
                self.metrics.record_failed();
                error!(
                    "SMS token {} failed permanently (network error {})",
                    token, network_error_code
                );
                SendOutcome::Failed {
                    token,
                    reason: FailureReason::Permanent { network_error_code },
                }
            }
            SendStatus::ErrorRetry => self.retry_over_ims(token, tracker),
            SendStatus::ErrorFallback => self.fall_back(token, tracker),
        }
    }

    fn retry_over_ims(&mut self, token: u32, mut tracker: SmsTracker) -> SendOutcome {
        if tracker.retry_count >= self.max_retries {
            self.metrics.record_failed();
            error!(
                "SMS token {} failed after {} IMS retries",
                token, tracker.retry_count
            );
            return SendOutcome::Failed {
                token,
                reason: FailureReason::RetriesExhausted {
                    retry_count: tracker.retry_count,
                },
            };
        }

        let pdu = match tracker.pdu() {
            Some(pdu) => retry_pdu(tracker.format, pdu, Some(tracker.message_ref)),
            None => {
                self.metrics.record_failed();
                error!("SMS token {} has no PDU to resend", token);
                return SendOutcome::Failed {
                    token,
                    reason: FailureReason::MissingPdu,
                };
            }
        };
        tracker.set_pdu(pdu);
        tracker.retry_count += 1;
        let retry_count = tracker.retry_count;

        match self.dispatch(tracker) {
            Ok(new_token) => {
                self.metrics.record_retried();
                info!(
                    "Retrying token {} over IMS as token {} (retry count {})",
                    token, new_token, retry_count
                );
                SendOutcome::RetriedOverIms {
                    previous_token: token,
                    token: new_token,
                    retry_count,
                }
            }
            Err((new_token, mut tracker, _)) => {
                // The refused resend never reached the network
                tracker.retry_count -= 1;
                self.fall_back(new_token, tracker)
            }
        }
    }

    /// End of life: drop every pending tracker and return them to the owner.
    pub fn teardown(&mut self) -> Vec<SmsTracker> {
        let mut trackers: Vec<(u32, SmsTracker)> = self.pending.drain().collect();
        trackers.sort_by_key(|(token, _)| *token);
        if !trackers.is_empty() {
            warn!("Tearing down with {} SMS still pending", trackers.len());
        }
        trackers.into_iter().map(|(_, tracker)| tracker).collect()
    }
}
