mod dispatchers_controller;
mod error;
mod ims_dispatcher;
mod metrics;
mod pdu;
mod service;
mod tracker;
mod transport;

#[cfg(test)]
mod model;

pub use dispatchers_controller::{CsRetryHandler, SmsDispatchersController};
pub use error::{SmsError, SmsResult};
pub use ims_dispatcher::{
    FailureReason, ImsSmsDispatcher, SendOutcome, SendStatus, DEFAULT_MAX_IMS_RETRIES,
};
pub use metrics::{SmsMetrics, SmsStats};
pub use pdu::{has_reject_duplicates, retry_pdu, set_message_reference, set_reject_duplicates};
pub use pdu::{TP_MR_OFFSET, TP_RD_MASK};
pub use service::{ServiceSnapshot, SmsHandle, SmsService, DEFAULT_QUEUE_DEPTH};
pub use tracker::{SmsFormat, SmsTracker, TrackerData, PDU_KEY, SMSC_KEY};
pub use transport::{CsSendRequest, CsSender, ImsSendRequest, ImsTransport, RecordingTransport};
