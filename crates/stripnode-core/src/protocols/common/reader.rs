pub(crate) fn optional_nonzero_u8(value: u8) -> Option<u8> {
    if value == 0 { None } else { Some(value) }
}

/// Number of channel bytes that may be read: never more than declared, the
/// protocol maximum, or what actually arrived.
pub(crate) fn clamped_len(declared: u16, max_slots: usize, available: usize) -> usize {
    usize::from(declared).min(max_slots).min(available)
}
