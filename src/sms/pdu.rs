/// SMS-SUBMIT header bits touched by the retry path
///
/// Only the first two octets of a 3GPP (GSM) SMS-SUBMIT TPDU are ever
/// modified: TP-RD in the first octet and TP-MR in the second.
/// 3GPP2 PDUs carry neither field and pass through unchanged.

use bytes::{Bytes, BytesMut};

use super::tracker::SmsFormat;

/// TP-RD (reject duplicates), bit 2 of the first octet
pub const TP_RD_MASK: u8 = 0x04;

/// Offset of TP-MR (message reference) in an SMS-SUBMIT TPDU
pub const TP_MR_OFFSET: usize = 1;

/// Set TP-RD in place. Returns false when the PDU has no TP-RD field.
pub fn set_reject_duplicates(format: SmsFormat, pdu: &mut [u8]) -> bool {
    if format != SmsFormat::ThreeGpp {
        return false;
    }
    match pdu.first_mut() {
        Some(first) => {
            *first |= TP_RD_MASK;
            true
        }
        None => false,
    }
}

/// Check TP-RD on a 3GPP PDU
pub fn has_reject_duplicates(pdu: &[u8]) -> bool {
    pdu.first().is_some_and(|first| first & TP_RD_MASK == TP_RD_MASK)
}

/// Write TP-MR in place. Returns false when the PDU is too short or not 3GPP.
pub fn set_message_reference(format: SmsFormat, pdu: &mut [u8], message_ref: u8) -> bool {
    if format != SmsFormat::ThreeGpp {
        return false;
    }
    match pdu.get_mut(TP_MR_OFFSET) {
        Some(mr) => {
            *mr = message_ref;
            true
        }
        None => false,
    }
}

/// Copy of `pdu` marked as a retransmission, optionally with a new TP-MR.
pub fn retry_pdu(format: SmsFormat, pdu: &[u8], message_ref: Option<u8>) -> Bytes {
    let mut buf = BytesMut::from(pdu);
    set_reject_duplicates(format, &mut buf);
    if let Some(message_ref) = message_ref {
        set_message_reference(format, &mut buf, message_ref);
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    // SMS-SUBMIT, TP-VPF relative, TP-MR 0, dest 5551234567
    const SUBMIT: [u8; 12] = [0x11, 0x00, 0x0A, 0x81, 0x55, 0x15, 0x32, 0x54, 0x76, 0x00, 0x00, 0xAA];

    #[test]
    fn test_set_reject_duplicates_gsm() {
        let mut pdu = SUBMIT;
        assert!(!has_reject_duplicates(&pdu));
        assert!(set_reject_duplicates(SmsFormat::ThreeGpp, &mut pdu));
        assert_eq!(pdu[0] & TP_RD_MASK, TP_RD_MASK);
        // Other first-octet bits are preserved
        assert_eq!(pdu[0], 0x15);
        assert_eq!(&pdu[1..], &SUBMIT[1..]);
    }

    #[test]
    fn test_set_reject_duplicates_is_idempotent() {
        let mut pdu = SUBMIT;
        set_reject_duplicates(SmsFormat::ThreeGpp, &mut pdu);
        set_reject_duplicates(SmsFormat::ThreeGpp, &mut pdu);
        assert_eq!(pdu[0], 0x15);
    }

    #[test]
    fn test_cdma_pdu_untouched() {
        let mut pdu = SUBMIT;
        assert!(!set_reject_duplicates(SmsFormat::ThreeGpp2, &mut pdu));
        assert!(!set_message_reference(SmsFormat::ThreeGpp2, &mut pdu, 9));
        assert_eq!(pdu, SUBMIT);
    }

    #[test]
    fn test_empty_pdu() {
        let mut pdu: [u8; 0] = [];
        assert!(!set_reject_duplicates(SmsFormat::ThreeGpp, &mut pdu));
        assert!(!has_reject_duplicates(&pdu));
        assert!(!set_message_reference(SmsFormat::ThreeGpp, &mut pdu, 1));
    }

    #[test]
    fn test_message_reference_needs_two_octets() {
        let mut pdu = [0x01u8];
        assert!(!set_message_reference(SmsFormat::ThreeGpp, &mut pdu, 7));
        let mut pdu = [0x01u8, 0x00];
        assert!(set_message_reference(SmsFormat::ThreeGpp, &mut pdu, 7));
        assert_eq!(pdu[TP_MR_OFFSET], 7);
    }

    #[test]
    fn test_retry_pdu_copies() {
        let original = Bytes::from_static(&SUBMIT);
        let retried = retry_pdu(SmsFormat::ThreeGpp, &original, Some(0x42));
        assert_eq!(original[0], 0x11, "source PDU must not change");
        assert!(has_reject_duplicates(&retried));
        assert_eq!(retried[TP_MR_OFFSET], 0x42);
    }
}


/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    #[kani::proof]
    fn reject_duplicates_never_panics() {
        let mut pdu: [u8; 4] = kani::any();
        let len: usize = kani::any();
        kani::assume(len <= 4);
        let _ = set_reject_duplicates(SmsFormat::ThreeGpp, &mut pdu[..len]);
    }

    #[kani::proof]
    fn reject_duplicates_sets_bit() {
        let mut pdu: [u8; 2] = kani::any();
        set_reject_duplicates(SmsFormat::ThreeGpp, &mut pdu);
        kani::assert(pdu[0] & TP_RD_MASK == TP_RD_MASK, "TP-RD must be set");
    }
}
