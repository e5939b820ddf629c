use thiserror::Error;

use super::tracker::SmsFormat;

pub type SmsResult<T> = Result<T, SmsError>;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("tracker has no PDU in its data map")]
    MissingPdu,

    #[error("IMS transport rejected send for token {token}: {reason}")]
    Transport { token: u32, reason: String },

    #[error("CS retry rejected: {0}")]
    CsRetry(String),

    #[error("no CS sender registered for format {0}")]
    UnsupportedFormat(SmsFormat),

    #[error("SMS service is not running")]
    ServiceStopped,
}
