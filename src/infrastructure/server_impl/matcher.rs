use memchr::memmem;

/// Sequence that ends the header section of a request.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
/// Sequence that ends a single request or header line.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Returns the offset of the first occurrence of `needle` inside `haystack`.
///
/// An empty needle never matches.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }

    memmem::find(haystack, needle)
}
