//! Checksum validators returning (valid, confidence) tuples.
//!
//! Each validator confirms a candidate match found by a detector's regex
//! and reports a graduated confidence: full structural + checksum validity
//! scores highest, a plausible-but-checksum-failing candidate is still
//! reported (typo preservation) at a lower confidence rather than dropped.

use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref DIGITS_ONLY: Regex = Regex::new(r"[^0-9]").unwrap();
    static ref ASCII_DIGITS_SEPS: Regex = Regex::new(r"^[0-9\- ]+$").unwrap();
}

/// Strip non-digit characters from a string.
fn extract_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Luhn algorithm check (used internally by multiple validators).
fn luhn_check(digits: &[u32]) -> bool {
    if digits.len() < 2 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for &digit in digits.iter().rev() {
        let mut d = digit;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// Luhn check on a string of digits.
fn luhn_check_str(text: &str) -> bool {
    let digits: Vec<u32> = text
        .chars()
        .filter(|c| c.is_ascii_digit())
        .filter_map(|c| c.to_digit(10))
        .collect();
    luhn_check(&digits)
}

// =============================================================================
// Checksum validators
// =============================================================================

/// Validate SSN with graduated confidence.
/// Returns (is_valid, confidence).
///   0.99: Fully valid SSN
///   LOW (0.75): invalid area code (000, 666, 9xx) but otherwise valid structure
///   MINIMAL (0.65): invalid group or serial as well
pub fn checksum_ssn(ssn: &str) -> (bool, f64) {
    let trimmed = ssn.trim();

    // Only accept ASCII digits and standard separators
    if !ASCII_DIGITS_SEPS.is_match(trimmed) {
        return (false, 0.0);
    }

    let digits = extract_digits(trimmed);
    if digits.len() != 9 {
        return (false, 0.0);
    }

    let area = &digits[..3];
    let group = &digits[3..5];
    let serial = &digits[5..];
    let mut confidence: f64 = 0.99;

    // Invalid area numbers (000, 666, 900-999)
    if area == "000" || area == "666" || area.starts_with('9') {
        confidence = crate::constants::LOW;
    }

    // Invalid group (00)
    if group == "00" {
        confidence = confidence.min(crate::constants::MINIMAL);
    }

    // Invalid serial (0000)
    if serial == "0000" {
        confidence = confidence.min(crate::constants::MINIMAL);
    }

    (true, confidence)
}

/// Validate credit card using Luhn + prefix check.
/// Returns (is_valid, confidence).
///   0.99: Valid prefix AND valid Luhn
///   0.87: Valid prefix but invalid Luhn
pub fn checksum_credit_card(cc: &str) -> (bool, f64) {
    let digits = extract_digits(cc);

    if digits.len() < 13 || digits.len() > 19 {
        return (false, 0.0);
    }

    let prefix2: u32 = digits[..2].parse().unwrap_or(0);
    let prefix3: u32 = if digits.len() >= 3 {
        digits[..3].parse().unwrap_or(0)
    } else {
        0
    };
    let prefix4: u32 = if digits.len() >= 4 {
        digits[..4].parse().unwrap_or(0)
    } else {
        0
    };

    let valid_prefix = digits.starts_with('4')                          // Visa
        || (51..=55).contains(&prefix2)                                  // Mastercard
        || (2221..=2720).contains(&prefix4)                              // Mastercard (new)
        || digits.starts_with("34") || digits.starts_with("37")         // Amex
        || digits.starts_with("6011")                                    // Discover
        || digits.starts_with("65")                                      // Discover
        || (644..=649).contains(&prefix3)                                // Discover
        || digits.starts_with("35")                                      // JCB
        || digits.starts_with("36")                                      // Diners Club
        || (300..=305).contains(&prefix3)                                // Diners Club
        || digits.starts_with("38") || digits.starts_with("39");         // Diners Club

    if !valid_prefix {
        return (false, 0.0);
    }

    if !luhn_check_str(&digits) {
        return (true, 0.87); // Still detect for safety
    }

    (true, 0.99)
}

/// Validate NPI using Luhn with 80840 prefix.
pub fn checksum_npi(npi: &str) -> (bool, f64) {
    let digits = extract_digits(npi);

    if digits.len() != 10 {
        return (false, 0.0);
    }

    let first = digits.chars().next().unwrap_or('0');
    if first != '1' && first != '2' {
        return (false, 0.0);
    }

    let check_str = format!("80840{}", digits);
    if !luhn_check_str(&check_str) {
        return (false, 0.0);
    }

    (true, 0.99)
}

/// Validate DEA number using DEA checksum formula.
/// Format: 2 letters + 7 digits
pub fn checksum_dea(dea: &str) -> (bool, f64) {
    let cleaned: String = dea.to_uppercase().replace(' ', "");

    if cleaned.len() != 9 {
        return (false, 0.0);
    }

    let chars: Vec<char> = cleaned.chars().collect();
    if !chars[0].is_ascii_alphabetic() || !chars[1].is_ascii_alphabetic() {
        return (false, 0.0);
    }

    let digit_str: String = chars[2..].iter().collect();
    if !digit_str.chars().all(|c| c.is_ascii_digit()) {
        return (false, 0.0);
    }

    let d: Vec<u32> = digit_str
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    let checksum = d[0] + d[2] + d[4] + 2 * (d[1] + d[3] + d[5]);
    if checksum % 10 != d[6] {
        return (false, 0.0);
    }

    (true, 0.99)
}

/// Validate IBAN using Mod-97 algorithm.
pub fn checksum_iban(iban: &str) -> (bool, f64) {
    let cleaned: String = iban.to_uppercase().replace(' ', "");

    if cleaned.len() < 15 || cleaned.len() > 34 {
        return (false, 0.0);
    }

    let rearranged = format!("{}{}", &cleaned[4..], &cleaned[..4]);

    let mut numeric = String::new();
    for c in rearranged.chars() {
        if c.is_ascii_digit() {
            numeric.push(c);
        } else if c.is_ascii_alphabetic() {
            numeric.push_str(&((c as u32 - 'A' as u32 + 10).to_string()));
        } else {
            return (false, 0.0);
        }
    }

    // Mod 97 on large number
    let mut remainder = 0u64;
    for c in numeric.chars() {
        if let Some(digit) = c.to_digit(10) {
            remainder = (remainder * 10 + digit as u64) % 97;
        }
    }

    if remainder != 1 {
        return (false, 0.0);
    }

    (true, 0.99)
}

/// Validate VIN using check digit (position 9).
pub fn checksum_vin(vin: &str) -> (bool, f64) {
    let cleaned: String = vin.to_uppercase().replace(' ', "");

    if cleaned.len() != 17 {
        return (false, 0.0);
    }

    if cleaned.contains('I') || cleaned.contains('O') || cleaned.contains('Q') {
        return (false, 0.0);
    }

    let trans = |c: char| -> Option<u32> {
        match c {
            'A' => Some(1), 'B' => Some(2), 'C' => Some(3), 'D' => Some(4),
            'E' => Some(5), 'F' => Some(6), 'G' => Some(7), 'H' => Some(8),
            'J' => Some(1), 'K' => Some(2), 'L' => Some(3), 'M' => Some(4),
            'N' => Some(5), 'P' => Some(7), 'R' => Some(9),
            'S' => Some(2), 'T' => Some(3), 'U' => Some(4), 'V' => Some(5),
            'W' => Some(6), 'X' => Some(7), 'Y' => Some(8), 'Z' => Some(9),
            '0'..='9' => c.to_digit(10),
            _ => None,
        }
    };

    let weights: [u32; 17] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];
    let chars: Vec<char> = cleaned.chars().collect();

    let mut total = 0u32;
    for (i, &c) in chars.iter().enumerate() {
        match trans(c) {
            Some(val) => total += val * weights[i],
            None => return (false, 0.0),
        }
    }

    let check = total % 11;
    let check_char = if check == 10 { 'X' } else { char::from_digit(check, 10).unwrap_or('0') };

    if chars[8] != check_char {
        return (false, 0.0);
    }

    (true, 0.99)
}

/// Validate ABA routing number using prefix and checksum.
pub fn checksum_aba_routing(aba: &str) -> (bool, f64) {
    let digits = extract_digits(aba);

    if digits.len() != 9 {
        return (false, 0.0);
    }

    let prefix: u32 = digits[..2].parse().unwrap_or(999);
    let valid_prefix = (0..=12).contains(&prefix)
        || (21..=32).contains(&prefix)
        || (61..=72).contains(&prefix)
        || prefix == 80;

    if !valid_prefix {
        return (false, 0.0);
    }

    let d: Vec<u32> = digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    let checksum = 3 * (d[0] + d[3] + d[6])
        + 7 * (d[1] + d[4] + d[7])
        + d[2] + d[5] + d[8];

    if checksum % 10 != 0 {
        return (false, 0.0);
    }

    (true, 0.99)
}

/// Validate UPS tracking number (1Z + 16 alphanumeric).
pub fn checksum_ups_tracking(tracking: &str) -> (bool, f64) {
    let cleaned: String = tracking.to_uppercase().replace(' ', "");

    if !cleaned.starts_with("1Z") || cleaned.len() != 18 {
        return (false, 0.0);
    }

    let letter_val = |c: char| -> Option<u32> {
        match c {
            'A' => Some(2), 'B' => Some(3), 'C' => Some(4), 'D' => Some(5),
            'E' => Some(6), 'F' => Some(7), 'G' => Some(8), 'H' => Some(9),
            'J' => Some(1), 'K' => Some(2), 'L' => Some(3), 'M' => Some(4),
            'N' => Some(5), 'P' => Some(7), 'Q' => Some(8), 'R' => Some(9),
            'S' => Some(1), 'T' => Some(2), 'U' => Some(3), 'V' => Some(4),
            'W' => Some(5), 'X' => Some(6), 'Y' => Some(7), 'Z' => Some(8),
            '0'..='9' => c.to_digit(10),
            _ => None,
        }
    };

    let data = &cleaned[2..];
    let mut values = Vec::new();
    for c in data.chars() {
        match letter_val(c) {
            Some(v) => values.push(v),
            None => return (false, 0.0),
        }
    }

    let mut total = 0u32;
    for (i, &v) in values[..values.len() - 1].iter().enumerate() {
        if i % 2 == 1 {
            total += v * 2;
        } else {
            total += v;
        }
    }

    let expected_check = (10 - (total % 10)) % 10;
    if expected_check != *values.last().unwrap_or(&999) {
        return (false, 0.0);
    }

    (true, 0.99)
}

/// Validate FedEx tracking number (12, 15, 20, or 22 digits).
pub fn checksum_fedex_tracking(tracking: &str) -> (bool, f64) {
    let digits = extract_digits(tracking);

    match digits.len() {
        12 => {
            let weights = [1u32, 7, 3, 1, 7, 3, 1, 7, 3, 1, 7];
            let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
            let total: u32 = d[..11].iter().zip(weights.iter()).map(|(a, b)| a * b).sum();
            let check = (total % 11) % 10;
            if check != d[11] {
                return (false, 0.0);
            }
            (true, 0.99)
        }
        15 if digits.starts_with("96") => {
            let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
            let total: u32 = d[..14].iter().sum();
            let check = (10 - (total % 10)) % 10;
            if check != d[14] {
                return (false, 0.0);
            }
            (true, 0.99)
        }
        20 => {
            let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
            let weights: Vec<u32> = (0..19).map(|i| if i % 2 == 0 { 3 } else { 1 }).collect();
            let total: u32 = d[..19].iter().zip(weights.iter()).map(|(a, b)| a * b).sum();
            let check = (10 - (total % 10)) % 10;
            if check != d[19] {
                return (false, 0.0);
            }
            (true, 0.99)
        }
        22 if digits.starts_with("92") => {
            let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
            let weights: Vec<u32> = (0..21).map(|i| if i % 2 == 0 { 3 } else { 1 }).collect();
            let total: u32 = d[..21].iter().zip(weights.iter()).map(|(a, b)| a * b).sum();
            let check = (10 - (total % 10)) % 10;
            if check != d[21] {
                return (false, 0.0);
            }
            (true, 0.99)
        }
        _ => (false, 0.0),
    }
}

/// Validate USPS tracking number.
pub fn checksum_usps_tracking(tracking: &str) -> (bool, f64) {
    let cleaned: String = tracking.to_uppercase().replace(' ', "");

    // International format: 2 letters + 9 digits + 2 letters
    if cleaned.len() == 13 {
        let chars: Vec<char> = cleaned.chars().collect();
        if chars[..2].iter().all(|c| c.is_ascii_alphabetic())
            && chars[11..].iter().all(|c| c.is_ascii_alphabetic())
        {
            let digit_part: String = chars[2..11].iter().collect();
            if !digit_part.chars().all(|c| c.is_ascii_digit()) {
                return (false, 0.0);
            }
            let d: Vec<u32> = digit_part.chars().filter_map(|c| c.to_digit(10)).collect();
            let weights = [8u32, 6, 4, 2, 3, 5, 9, 7];
            let total: u32 = d[..8].iter().zip(weights.iter()).map(|(a, b)| a * b).sum();
            let mut check = 11 - (total % 11);
            if check == 10 {
                check = 0;
            } else if check == 11 {
                check = 5;
            }
            if check != d[8] {
                return (false, 0.0);
            }
            return (true, 0.99);
        }
    }

    // Numeric formats
    let digits = extract_digits(&cleaned);
    if digits.len() == 20 || digits.len() == 22 {
        let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
        let len = d.len();
        let weights: Vec<u32> = (0..len - 1).map(|i| if i % 2 == 0 { 3 } else { 1 }).collect();
        let total: u32 = d[..len - 1].iter().zip(weights.iter()).map(|(a, b)| a * b).sum();
        let check = (10 - (total % 10)) % 10;
        if check != d[len - 1] {
            return (false, 0.0);
        }
        return (true, 0.99);
    }

    (false, 0.0)
}

/// Validate CUSIP (9-character security identifier).
pub fn checksum_cusip(cusip: &str) -> (bool, f64) {
    let cleaned: String = cusip
        .to_uppercase()
        .replace(' ', "")
        .replace('-', "");

    if cleaned.len() != 9 {
        return (false, 0.0);
    }

    let chars: Vec<char> = cleaned.chars().collect();
    let mut total = 0u32;

    for (i, &c) in chars[..8].iter().enumerate() {
        let value = if c.is_ascii_digit() {
            c.to_digit(10).unwrap()
        } else if c.is_ascii_alphabetic() {
            c as u32 - 'A' as u32 + 10
        } else if c == '*' {
            36
        } else if c == '@' {
            37
        } else if c == '#' {
            38
        } else {
            return (false, 0.0);
        };

        let v = if i % 2 == 1 { value * 2 } else { value };
        total += v / 10 + v % 10;
    }

    let check = (10 - (total % 10)) % 10;
    match chars[8].to_digit(10) {
        Some(d) if d == check => (true, 0.99),
        _ => (false, 0.0),
    }
}

/// Validate ISIN (12-character international security identifier).
pub fn checksum_isin(isin: &str) -> (bool, f64) {
    let cleaned: String = isin.to_uppercase().replace(' ', "");

    if cleaned.len() != 12 {
        return (false, 0.0);
    }

    let chars: Vec<char> = cleaned.chars().collect();
    if !chars[0].is_ascii_alphabetic() || !chars[1].is_ascii_alphabetic() {
        return (false, 0.0);
    }

    // Convert all chars except last to numeric string
    let mut numeric = String::new();
    for &c in &chars[..11] {
        if c.is_ascii_digit() {
            numeric.push(c);
        } else if c.is_ascii_alphabetic() {
            numeric.push_str(&(c as u32 - 'A' as u32 + 10).to_string());
        } else {
            return (false, 0.0);
        }
    }
    // Append last character
    numeric.push(chars[11]);

    if !luhn_check_str(&numeric) {
        return (false, 0.0);
    }

    (true, 0.99)
}

/// Validate SEDOL (7-character UK security identifier) using its weighted
/// check digit: weights (1,3,1,7,3,9) over positions 0-5, mod 10.
pub fn checksum_sedol(sedol: &str) -> (bool, f64) {
    let cleaned: String = sedol.to_uppercase().replace(' ', "");

    if cleaned.len() != 7 {
        return (false, 0.0);
    }

    let chars: Vec<char> = cleaned.chars().collect();
    const WEIGHTS: [u32; 6] = [1, 3, 1, 7, 3, 9];
    let value = |c: char| -> Option<u32> {
        if c.is_ascii_digit() {
            c.to_digit(10)
        } else if c.is_ascii_alphabetic() {
            Some(c as u32 - 'A' as u32 + 10)
        } else {
            None
        }
    };

    let mut total = 0u32;
    for (i, &c) in chars[..6].iter().enumerate() {
        match value(c) {
            Some(v) => total += v * WEIGHTS[i],
            None => return (false, 0.0),
        }
    }

    let check = (10 - (total % 10)) % 10;
    match chars[6].to_digit(10) {
        Some(d) if d == check => (true, 0.99),
        _ => (false, 0.0),
    }
}

/// Validate a Bitcoin P2PKH/P2SH base58check address: decode, split off the
/// trailing 4-byte checksum, and confirm it matches the leading double-SHA256.
pub fn checksum_bitcoin_base58(address: &str) -> (bool, f64) {
    use sha2::{Digest, Sha256};

    let Ok(decoded) = bs58::decode(address).into_vec() else {
        return (false, 0.0);
    };
    if decoded.len() != 25 {
        return (false, 0.0);
    }
    let (payload, checksum) = decoded.split_at(21);
    let round1 = Sha256::digest(payload);
    let round2 = Sha256::digest(round1);
    if &round2[..4] == checksum {
        (true, 0.99)
    } else {
        (false, 0.0)
    }
}

/// Validate a Bitcoin bech32/bech32m SegWit address (`bc1...`). Decoding
/// itself performs the checksum verification.
pub fn checksum_bitcoin_bech32(address: &str) -> (bool, f64) {
    match bech32::decode(address) {
        Ok((hrp, _, _)) if hrp.eq_ignore_ascii_case("bc") || hrp.eq_ignore_ascii_case("tb") => (true, 0.99),
        _ => (false, 0.0),
    }
}

/// Validate an Ethereum address: 40 hex chars after `0x`. An all-lowercase
/// or all-uppercase address has no checksum to check (valid at lower
/// confidence); a mixed-case address must satisfy EIP-55 (each hex digit is
/// uppercased iff the corresponding nibble of `keccak256(lowercase hex)` is
/// >= 8) or it's not a real address, just a hex-looking string.
pub fn checksum_ethereum(address: &str) -> (bool, f64) {
    use sha3::{Digest, Keccak256};

    let Some(hex_part) = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) else {
        return (false, 0.0);
    };
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return (false, 0.0);
    }

    let all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
    if all_lower || all_upper {
        return (true, crate::constants::MEDIUM_HIGH);
    }

    let lower = hex_part.to_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());
    for (i, c) in lower.chars().enumerate() {
        if !c.is_ascii_alphabetic() {
            continue;
        }
        let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        let should_be_upper = nibble >= 8;
        let is_upper = hex_part.as_bytes()[i].is_ascii_uppercase();
        if should_be_upper != is_upper {
            return (false, 0.0);
        }
    }
    (true, 0.99)
}

/// Batch validate: run a named checksum on multiple values in parallel.
pub fn checksum_batch(validator_name: &str, values: &[String]) -> Vec<(bool, f64)> {
    use rayon::prelude::*;
    values
        .par_iter()
        .map(|v| match validator_name {
            "ssn" => checksum_ssn(v),
            "credit_card" => checksum_credit_card(v),
            "npi" => checksum_npi(v),
            "dea" => checksum_dea(v),
            "iban" => checksum_iban(v),
            "vin" => checksum_vin(v),
            "aba_routing" => checksum_aba_routing(v),
            "ups_tracking" => checksum_ups_tracking(v),
            "fedex_tracking" => checksum_fedex_tracking(v),
            "usps_tracking" => checksum_usps_tracking(v),
            "cusip" => checksum_cusip(v),
            "isin" => checksum_isin(v),
            "sedol" => checksum_sedol(v),
            "bitcoin_base58" => checksum_bitcoin_base58(v),
            "bitcoin_bech32" => checksum_bitcoin_bech32(v),
            "ethereum" => checksum_ethereum(v),
            _ => (false, 0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_ssn() {
        // Valid SSN
        let (valid, conf) = checksum_ssn("123-45-6789");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);

        // Invalid area code - still valid but lower confidence
        let (valid, conf) = checksum_ssn("000-12-3456");
        assert!(valid);
        assert!((conf - crate::constants::LOW).abs() < 0.001);

        // Invalid group
        let (valid, conf) = checksum_ssn("123-00-6789");
        assert!(valid);
        assert!((conf - crate::constants::MINIMAL).abs() < 0.001);
    }

    #[test]
    fn test_checksum_credit_card() {
        // Valid Visa with Luhn
        let (valid, conf) = checksum_credit_card("4532015112830366");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);

        // Valid Visa prefix but bad Luhn
        let (valid, conf) = checksum_credit_card("4532015112830367");
        assert!(valid);
        assert!((conf - 0.87).abs() < 0.001);

        // Not a valid prefix
        let (valid, _) = checksum_credit_card("1234567890123456");
        assert!(!valid);
    }

    #[test]
    fn test_checksum_iban() {
        let (valid, conf) = checksum_iban("GB82 WEST 1234 5698 7654 32");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);

        let (valid, conf) = checksum_iban("DE89370400440532013000");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);
    }

    #[test]
    fn test_checksum_cusip() {
        // Valid CUSIP: 037833100 (Apple Inc)
        let (valid, conf) = checksum_cusip("037833100");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);
    }

    #[test]
    fn test_checksum_sedol() {
        // Valid SEDOL: 0263494 (BAE Systems)
        let (valid, conf) = checksum_sedol("0263494");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);

        let (valid, _) = checksum_sedol("0263495");
        assert!(!valid);
    }

    #[test]
    fn test_checksum_bitcoin_base58() {
        // Genesis block coinbase address.
        let (valid, conf) = checksum_bitcoin_base58("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);

        let (valid, _) = checksum_bitcoin_base58("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb");
        assert!(!valid);
    }

    #[test]
    fn test_checksum_bitcoin_bech32() {
        let (valid, _) = checksum_bitcoin_bech32("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert!(valid);

        let (valid, _) = checksum_bitcoin_bech32("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5");
        assert!(!valid);
    }

    #[test]
    fn test_checksum_ethereum_eip55() {
        let (valid, conf) = checksum_ethereum("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(valid);
        assert!((conf - 0.99).abs() < 0.001);

        // Bad mixed-case checksum.
        let (valid, _) = checksum_ethereum("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAEd");
        assert!(!valid);

        // All-lowercase: no checksum to validate, accepted at reduced confidence.
        let (valid, conf) = checksum_ethereum("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert!(valid);
        assert!(conf < 0.99);
    }

    #[test]
    fn test_checksum_batch_dispatches_by_name() {
        let values = vec!["123-45-6789".to_string(), "000-12-3456".to_string()];
        let results = checksum_batch("ssn", &values);
        assert_eq!(results.len(), 2);
        assert!(results[0].0 && results[1].0);
    }
}
