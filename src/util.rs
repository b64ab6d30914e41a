/// Trace log raw wire data, cut off at a max length.
pub(crate) fn log_data(data: &[u8]) {
    if !log_enabled!(log::Level::Trace) {
        return;
    }

    const MAX: usize = 1024;

    let cut = data.len().min(MAX);
    let text = String::from_utf8_lossy(&data[..cut]);

    if data.len() > MAX {
        trace!("{:?} ({} more bytes)", text, data.len() - MAX);
    } else {
        trace!("{:?}", text);
    }
}

/// Find `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Trim trailing ascii whitespace.
pub(crate) fn trim_end(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);
    &data[..end]
}
