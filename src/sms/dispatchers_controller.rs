/// Circuit-switched retry path
///
/// Receives trackers the IMS dispatcher gave up on and re-sends them through
/// the GSM or CDMA sender matching their format.

use tracing::{info, warn};

use super::error::{SmsError, SmsResult};
use super::pdu::retry_pdu;
use super::tracker::{SmsFormat, SmsTracker};
use super::transport::{CsSendRequest, CsSender};
use crate::redact;

/// Accepts a tracker for retransmission outside IMS
pub trait CsRetryHandler {
    fn send_retry_sms(&mut self, tracker: SmsTracker) -> SmsResult<()>;
}

pub struct SmsDispatchersController {
    gsm: Option<Box<dyn CsSender + Send>>,
    cdma: Option<Box<dyn CsSender + Send>>,
}

impl Default for SmsDispatchersController {
    fn default() -> Self {
        Self::new()
    }
}

impl SmsDispatchersController {
    pub fn new() -> Self {
        Self {
            gsm: None,
            cdma: None,
        }
    }

    pub fn with_gsm(mut self, sender: impl CsSender + Send + 'static) -> Self {
        self.gsm = Some(Box::new(sender));
        self
    }

    pub fn with_cdma(mut self, sender: impl CsSender + Send + 'static) -> Self {
        self.cdma = Some(Box::new(sender));
        self
    }

    fn sender_for(&mut self, format: SmsFormat) -> Option<&mut Box<dyn CsSender + Send>> {
        match format {
            SmsFormat::ThreeGpp => self.gsm.as_mut(),
            SmsFormat::ThreeGpp2 => self.cdma.as_mut(),
        }
    }
}

impl CsRetryHandler for SmsDispatchersController {
    fn send_retry_sms(&mut self, mut tracker: SmsTracker) -> SmsResult<()> {
        // Anything arriving here is a retransmission
        tracker.retry_count = tracker.retry_count.max(1);

        let format = tracker.format;
        let pdu = retry_pdu(format, tracker.pdu().ok_or(SmsError::MissingPdu)?, None);
        tracker.set_pdu(pdu.clone());

        let request = CsSendRequest {
            format,
            dest_address: tracker.dest_address.clone(),
            sc_address: tracker.sc_address().map(str::to_string),
            message_ref: tracker.message_ref,
            retry_count: tracker.retry_count,
            pdu,
        };

        let sender = self
            .sender_for(format)
            .ok_or(SmsError::UnsupportedFormat(format))?;

        sender.send_sms(&request).map_err(|e| {
            warn!("CS retry to {} failed: {}", redact::phone_number(&request.dest_address), e);
            SmsError::CsRetry(e.to_string())
        })?;

        info!(
            "Retrying SMS to {} over CS ({}), retry count {}",
            redact::phone_number(&request.dest_address),
            format,
            request.retry_count
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sms::pdu::has_reject_duplicates;
    use crate::sms::transport::RecordingTransport;

    fn tracker(format: SmsFormat) -> SmsTracker {
        SmsTracker::new(format, "5551234567", vec![0x01, 0x00, 0x0A])
    }

    #[test]
    fn test_gsm_retry_sets_tp_rd() {
        let gsm = RecordingTransport::<CsSendRequest>::new();
        let mut controller = SmsDispatchersController::new().with_gsm(gsm.clone());

        let mut t = tracker(SmsFormat::ThreeGpp);
        t.retry_count = 1;
        controller.send_retry_sms(t).unwrap();

        let sent = gsm.last().unwrap();
        assert_eq!(sent.retry_count, 1);
        assert!(has_reject_duplicates(&sent.pdu));
    }

    #[test]
    fn test_zero_retry_count_is_raised() {
        let gsm = RecordingTransport::<CsSendRequest>::new();
        let mut controller = SmsDispatchersController::new().with_gsm(gsm.clone());
        controller.send_retry_sms(tracker(SmsFormat::ThreeGpp)).unwrap();
        assert_eq!(gsm.last().unwrap().retry_count, 1);
    }

    #[test]
    fn test_cdma_goes_to_cdma_sender() {
        let gsm = RecordingTransport::<CsSendRequest>::new();
        let cdma = RecordingTransport::<CsSendRequest>::new();
        let mut controller = SmsDispatchersController::new()
            .with_gsm(gsm.clone())
            .with_cdma(cdma.clone());

        controller.send_retry_sms(tracker(SmsFormat::ThreeGpp2)).unwrap();

        assert_eq!(gsm.count(), 0);
        let sent = cdma.last().unwrap();
        // No TP-RD field in 3GPP2 PDUs
        assert_eq!(sent.pdu.as_ref(), &[0x01, 0x00, 0x0A]);
    }

    #[test]
    fn test_missing_sender_is_an_error() {
        let mut controller = SmsDispatchersController::new();
        let err = controller.send_retry_sms(tracker(SmsFormat::ThreeGpp2)).unwrap_err();
        assert!(matches!(err, SmsError::UnsupportedFormat(SmsFormat::ThreeGpp2)));
    }

    #[test]
    fn test_missing_pdu_is_an_error() {
        let gsm = RecordingTransport::<CsSendRequest>::new();
        let mut controller = SmsDispatchersController::new().with_gsm(gsm.clone());
        let t = SmsTracker::new(SmsFormat::ThreeGpp, "5551234567", Vec::new());
        assert!(matches!(controller.send_retry_sms(t), Err(SmsError::MissingPdu)));
        assert_eq!(gsm.count(), 0);
    }

    #[test]
    fn test_sender_rejection_surfaces() {
        let gsm = RecordingTransport::<CsSendRequest>::new();
        gsm.set_reject(Some("no service"));
        let mut controller = SmsDispatchersController::new().with_gsm(gsm);
        let err = controller.send_retry_sms(tracker(SmsFormat::ThreeGpp)).unwrap_err();
        assert!(err.to_string().contains("no service"));
    }
}
