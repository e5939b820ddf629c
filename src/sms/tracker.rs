/// Outbound SMS tracker
///
/// One tracker per message, owned by whichever dispatcher currently holds it.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Data-map key holding the encoded TPDU
pub const PDU_KEY: &str = "pdu";
/// Data-map key holding the SMSC address, when the caller set one
pub const SMSC_KEY: &str = "smsc";

/// Encoding family of a PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsFormat {
    /// GSM/UMTS/LTE
    ThreeGpp,
    /// CDMA
    ThreeGpp2,
}

impl SmsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsFormat::ThreeGpp => "3gpp",
            SmsFormat::ThreeGpp2 => "3gpp2",
        }
    }
}

impl fmt::Display for SmsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value stored in a tracker's side-channel data map
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerData {
    Bytes(Bytes),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct SmsTracker {
    pub format: SmsFormat,
    pub dest_address: String,
    /// Number of retransmissions so far, over any path
    pub retry_count: u32,
    /// TP-MR last assigned by the network/modem
    pub message_ref: u8,
    pub created_at: DateTime<Utc>,
    pub data: HashMap<String, TrackerData>,
}

impl SmsTracker {
    pub fn new(format: SmsFormat, dest_address: &str, pdu: impl Into<Bytes>) -> Self {
        let mut data = HashMap::new();
        data.insert(PDU_KEY.to_string(), TrackerData::Bytes(pdu.into()));
        Self {
            format,
            dest_address: dest_address.to_string(),
            retry_count: 0,
            message_ref: 0,
            created_at: Utc::now(),
            data,
        }
    }

    pub fn with_sc_address(mut self, sc_address: &str) -> Self {
        self.data
            .insert(SMSC_KEY.to_string(), TrackerData::Text(sc_address.to_string()));
        self
    }

    /// Encoded TPDU, if the data map holds one
    pub fn pdu(&self) -> Option<&Bytes> {
        match self.data.get(PDU_KEY) {
            Some(TrackerData::Bytes(pdu)) if !pdu.is_empty() => Some(pdu),
            _ => None,
        }
    }

    pub fn set_pdu(&mut self, pdu: Bytes) {
        self.data.insert(PDU_KEY.to_string(), TrackerData::Bytes(pdu));
    }

    /// SMSC address; `None` means the modem default
    pub fn sc_address(&self) -> Option<&str> {
        match self.data.get(SMSC_KEY) {
            Some(TrackerData::Text(sc)) if !sc.is_empty() => Some(sc),
            _ => None,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }

    /// Time since the message was first handed to a dispatcher
    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }
}
