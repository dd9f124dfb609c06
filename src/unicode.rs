/// Decodes up to `code_units` UTF-16LE code units from `raw`.
///
/// Trailing or embedded NUL code units inside the window are skipped, which
/// matches how volume labels and filename fragments pad their fixed-width
/// fields. Unpaired surrogates decode to U+FFFD.
pub(crate) fn utf16_from_bytes(raw: &[u8], code_units: usize) -> String {
    let available = raw.len() / 2;
    let take = code_units.min(available);

    let units = raw[..take * 2]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .filter(|&unit| unit != 0);

    char::decode_utf16(units)
        .map(|result| result.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn decodes_bounded_window() {
        let raw = encode("testvolumelabel");
        assert_eq!(utf16_from_bytes(&raw, 15), "testvolumelabel");
        assert_eq!(utf16_from_bytes(&raw, 4), "test");
    }

    #[test]
    fn skips_nul_padding() {
        let mut raw = encode("abc");
        raw.extend_from_slice(&[0u8; 24]);
        assert_eq!(utf16_from_bytes(&raw, 15), "abc");
    }

    #[test]
    fn short_buffer_is_not_overread() {
        let raw = encode("ab");
        assert_eq!(utf16_from_bytes(&raw, 15), "ab");
    }
}
