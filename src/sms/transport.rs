/// Seams to the radio side
///
/// `ImsTransport` is the IMS SMS stack, `CsSender` a circuit-switched
/// (GSM or CDMA) sender. Both report results asynchronously; a send call only
/// tells whether the request was accepted.

use anyhow::Result;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::tracker::SmsFormat;
use crate::redact;

/// Send request handed to the IMS stack
#[derive(Debug, Clone, PartialEq)]
pub struct ImsSendRequest {
    pub token: u32,
    pub message_ref: u8,
    pub format: SmsFormat,
    pub sc_address: Option<String>,
    pub dest_address: String,
    pub retry: bool,
    pub pdu: Bytes,
}

/// Send request handed to a circuit-switched dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct CsSendRequest {
    pub format: SmsFormat,
    pub dest_address: String,
    pub sc_address: Option<String>,
    pub message_ref: u8,
    pub retry_count: u32,
    pub pdu: Bytes,
}

pub trait ImsTransport {
    fn send_sms(&mut self, request: &ImsSendRequest) -> Result<()>;
}

pub trait CsSender {
    fn send_sms(&mut self, request: &CsSendRequest) -> Result<()>;
}

/// Transport that accepts every request and keeps a copy.
///
/// Clones share the same log, so a clone kept outside the dispatcher
/// observes what was sent.
#[derive(Debug, Clone)]
pub struct RecordingTransport<Req> {
    sent: Arc<Mutex<Vec<Req>>>,
    reject: Arc<Mutex<Option<String>>>,
}

impl<Req: Clone> Default for RecordingTransport<Req> {
    fn default() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            reject: Arc::new(Mutex::new(None)),
        }
    }
}

impl<Req: Clone> RecordingTransport<Req> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every following request with `reason`; `None` accepts again.
    pub fn set_reject(&self, reason: Option<&str>) {
        *self.reject.lock().unwrap_or_else(|e| e.into_inner()) = reason.map(str::to_string);
    }

    pub fn sent(&self) -> Vec<Req> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Req> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn record(&self, request: &Req) -> Result<()> {
        if let Some(reason) = self.reject.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            anyhow::bail!(reason);
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        Ok(())
    }
}

impl ImsTransport for RecordingTransport<ImsSendRequest> {
    fn send_sms(&mut self, request: &ImsSendRequest) -> Result<()> {
        debug!(
            "IMS send token={} retry={} pdu={}",
            request.token,
            request.retry,
            redact::pdu(&request.pdu)
        );
        self.record(request)
    }
}

impl CsSender for RecordingTransport<CsSendRequest> {
    fn send_sms(&mut self, request: &CsSendRequest) -> Result<()> {
        debug!(
            "CS send format={} retry_count={} pdu={}",
            request.format,
            request.retry_count,
            redact::pdu(&request.pdu)
        );
        self.record(request)
    }
}
