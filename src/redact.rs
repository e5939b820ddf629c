/// Redaction helpers for logging
///
/// Destination and SMSC addresses are subscriber data and PDUs carry message
/// text. Logs only ever see masked forms.

/// Mask an address down to its last 4 digits.
/// Example: "+15551234567" -> "*******4567"
pub fn phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() <= 4 {
        return "*".repeat(digits.len());
    }

    let visible = &digits[digits.len() - 4..];
    format!("{}{}", "*".repeat(digits.len() - 4), visible)
}

/// Describe a PDU without its payload: length and first octet only.
/// The first octet holds the TP-MTI / TP-RD flags, which is what retry logs need.
/// Example: [0x05, 0x2A, ...] -> "len=11 first=0x05"
pub fn pdu(pdu: &[u8]) -> String {
    match pdu.first() {
        Some(first) => format!("len={} first=0x{:02X}", pdu.len(), first),
        None => "len=0".to_string(),
    }
}



#[cfg(kani)]
mod kani_proofs {
    use super::*;

    fn any_digit_string<const N: usize>() -> String {
        let mut s = String::new();
        for _ in 0..N {
            let digit: u8 = kani::any();
            kani::assume(digit < 10);
            s.push((b'0' + digit) as char);
        }
        s
    }

    /// Proves: redacted length equals digit count for a 10-digit address
    #[kani::proof]
    #[kani::unwind(12)]
    fn phone_redaction_10_digits() {
        let input = any_digit_string::<10>();
        let result = phone_number(&input);
        kani::assert(result.len() == 10, "output length must equal input digit count");
    }

    /// Proves: short codes are fully masked
    #[kani::proof]
    #[kani::unwind(6)]
    fn phone_short_fully_masked() {
        let input = any_digit_string::<4>();
        let result = phone_number(&input);
        for c in result.chars() {
            kani::assert(c == '*', "short numbers must be fully masked");
        }
    }
}
