//! Deterministic correction pass for OCR output, run ahead of the detector
//! fan-out when `Config::enable_ocr` is set. OCR engines reliably confuse a
//! small set of characters when the surrounding context is numeric — a
//! capital `O` read as `0`, a lowercase `l` or capital `I` read as `1`, a
//! capital `S` read as `5`, a capital `B` read as `8` — so a value like an
//! SSN or account number can come back with a letter standing in for a
//! digit. Correcting those in place (rather than relaxing the detector
//! patterns to accept letters) keeps every detector's regex simple and
//! keeps the correction logic in one auditable place.
//!
//! Every substitution is single-byte-for-single-byte, so the corrected text
//! stays the same length as the original and a position in one is a
//! position in the other — `char_map` is carried through anyway so future
//! substitutions aren't constrained to staying 1:1.

/// Maps a byte offset in the corrected text back to the original text.
pub type CharMap = Vec<usize>;

fn confusable_digit(c: char) -> Option<char> {
    Some(match c {
        'O' | 'o' => '0',
        'I' | 'l' => '1',
        'S' => '5',
        'B' => '8',
        'Z' => '2',
        _ => return None,
    })
}

fn is_digit_run_neighbor(bytes: &[u8], idx: usize, len: usize) -> bool {
    let before = idx.checked_sub(1).and_then(|i| bytes.get(i)).is_some_and(u8::is_ascii_digit);
    let after = bytes.get(idx + len).is_some_and(u8::is_ascii_digit);
    before || after
}

/// Corrects common OCR digit/letter confusions when the candidate character
/// sits directly next to a digit, and returns the corrected text alongside a
/// map from each corrected-text byte offset back to its source offset in
/// `text`. Returns `(text, identity map)` unchanged when nothing needed
/// correcting.
pub fn correct(text: &str) -> (String, CharMap) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut map = Vec::with_capacity(text.len());
    for (idx, c) in text.char_indices() {
        let replacement = if c.is_ascii() && is_digit_run_neighbor(bytes, idx, c.len_utf8()) {
            confusable_digit(c)
        } else {
            None
        };
        let resolved = replacement.unwrap_or(c);
        out.push(resolved);
        map.push(idx);
    }
    (out, map)
}

/// Remaps a `(start, end)` span found in corrected text back to the
/// original text's coordinates and returns the original (uncorrected)
/// slice at those coordinates — the span should report what the source
/// document actually contains, not the corrected reading. Returns `None`
/// if the mapped range isn't a valid char boundary slice of `original`
/// (a malformed map, or a span that crossed a correction in a way that
/// split a multi-byte character).
pub fn remap_span(original: &str, char_map: &CharMap, start: usize, end: usize) -> Option<(usize, usize, &str)> {
    if char_map.is_empty() {
        return original.get(start..end).map(|slice| (start, end, slice));
    }
    let orig_start = *char_map.get(start)?;
    let orig_end = if end < char_map.len() { char_map[end] } else { original.len() };
    original.get(orig_start..orig_end).map(|slice| (orig_start, orig_end, slice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrects_letter_o_inside_a_digit_run() {
        let (corrected, _) = correct("SSN: 123-O5-6789");
        assert_eq!(corrected, "SSN: 123-05-6789");
    }

    #[test]
    fn leaves_prose_letters_alone() {
        let (corrected, _) = correct("Social Security Office");
        assert_eq!(corrected, "Social Security Office");
    }

    #[test]
    fn corrected_text_is_same_length_so_map_is_identity() {
        let (corrected, map) = correct("Acct O123456");
        assert_eq!(corrected.len(), "Acct O123456".len());
        assert_eq!(map, (0.."Acct O123456".len()).collect::<Vec<_>>());
    }

    #[test]
    fn remap_reports_the_original_uncorrected_text() {
        let original = "Acct O123456";
        let (corrected, map) = correct(original);
        assert_eq!(&corrected[5..12], "0123456");
        let (start, end, slice) = remap_span(original, &map, 5, 12).unwrap();
        assert_eq!((start, end), (5, 12));
        assert_eq!(slice, "O123456");
    }
}
