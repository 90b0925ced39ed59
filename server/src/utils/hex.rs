//! Lower-hex trace identifier helpers

/// Parse the low 64 bits of a hex trace id of 1 to 32 characters.
///
/// Ids longer than 16 characters keep only their rightmost 16. Returns `None`
/// for an empty id, more than 32 characters or a non-hex character.
pub fn trace_id_low_bits(trace_id: &str) -> Option<i64> {
    let len = trace_id.len();
    if len == 0 || len > 32 || !trace_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let low = &trace_id[len.saturating_sub(16)..];
    u64::from_str_radix(low, 16).ok().map(|v| v as i64)
}
