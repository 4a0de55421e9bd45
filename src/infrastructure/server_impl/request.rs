use bytes::Bytes;
use compact_str::CompactString;
use derive_more::Deref;
use memchr::memchr;

use crate::domain::runtime_class::{classify, RuntimeClass};
use crate::infrastructure::server_impl::matcher::{find, LINE_TERMINATOR};
use crate::infrastructure::server_impl::reader::ReadStatus;

/// Longest header name or value kept, in bytes.
pub const MAX_HEADER_FIELD_LEN: usize = 255;
/// Host values of this many bytes or more are rejected.
pub const MAX_HOST_LEN: usize = 256;

const HOST_HEADER: &str = "Host";
const HOST_MARKER: &[u8] = b"Host: ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct RawRequest(Bytes);

impl From<Bytes> for RawRequest {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: CompactString,
    pub value: CompactString,
}

impl HeaderEntry {
    pub fn new(name: &[u8], value: &[u8]) -> Self {
        Self {
            name: bounded_field(name),
            value: bounded_field(value),
        }
    }
}

/// Headers in wire order. Duplicate names are kept as separate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct HeaderSet(Vec<HeaderEntry>);

impl FromIterator<HeaderEntry> for HeaderSet {
    fn from_iter<T: IntoIterator<Item = HeaderEntry>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl HeaderSet {
    /// Case-sensitive, first match wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    pub fn host(&self) -> Option<&str> {
        self.get(HOST_HEADER)
    }

    pub fn without<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderEntry> + 'a {
        self.0.iter().filter(move |entry| entry.name != name)
    }
}

/// A request after ingestion: the raw bytes plus everything extracted from them.
#[derive(Debug)]
pub struct Request {
    pub raw: RawRequest,
    pub status: ReadStatus,
    pub headers: HeaderSet,
    pub host: Option<CompactString>,
    pub runtime_class: RuntimeClass,
}

impl Request {
    pub fn parse(raw: RawRequest, status: ReadStatus) -> Self {
        let headers = parse_headers(&raw);
        let host = resolve_host(&raw);
        let runtime_class = classify(host.as_deref());

        Self {
            raw,
            status,
            headers,
            host,
            runtime_class,
        }
    }
}

/// Splits on CRLF. The final segment is yielded even without a terminator,
/// an empty remainder is not.
#[derive(Debug, Clone)]
struct Lines<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let line = match find(self.rest, LINE_TERMINATOR) {
            Some(idx) => {
                let line = &self.rest[..idx];
                self.rest = &self.rest[idx + LINE_TERMINATOR.len()..];
                line
            }
            None => std::mem::take(&mut self.rest),
        };

        Some(line)
    }
}

fn non_empty_lines(raw: &[u8]) -> impl Iterator<Item = &[u8]> {
    Lines { rest: raw }.filter(|line| !line.is_empty())
}

fn bounded_field(bytes: &[u8]) -> CompactString {
    let text = String::from_utf8_lossy(bytes);
    let mut end = text.len().min(MAX_HEADER_FIELD_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    CompactString::from(&text[..end])
}

fn parse_header_line(line: &[u8]) -> Option<HeaderEntry> {
    let colon = memchr(b':', line)?;
    let value = &line[colon + 1..];
    let padding = value
        .iter()
        .take_while(|byte| matches!(byte, b' ' | b'\t'))
        .count();

    Some(HeaderEntry::new(&line[..colon], &value[padding..]))
}

/// Parses every header line after the request line.
///
/// The first line is skipped whatever it contains and lines without a colon
/// are dropped. Truncated or garbled input just yields fewer entries.
pub fn parse_headers(raw: &[u8]) -> HeaderSet {
    non_empty_lines(raw)
        .skip(1)
        .filter_map(parse_header_line)
        .collect()
}

/// Rescans the raw request for the first line containing `"Host: "` and
/// returns what follows the marker on that line.
///
/// Returns `None` when no line carries the marker or the value would not fit
/// in [MAX_HOST_LEN].
pub fn resolve_host(raw: &[u8]) -> Option<CompactString> {
    let value = non_empty_lines(raw)
        .find_map(|line| find(line, HOST_MARKER).map(|idx| &line[idx + HOST_MARKER.len()..]))?;

    if value.len() >= MAX_HOST_LEN {
        return None;
    }

    Some(CompactString::from(String::from_utf8_lossy(value).as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::server_impl::reader::PartialReason;

    const SAMPLE: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";

    fn pairs(headers: &HeaderSet) -> Vec<(&str, &str)> {
        headers
            .iter()
            .map(|entry| (entry.name.as_str(), entry.value.as_str()))
            .collect()
    }

    #[test]
    fn success_parse_headers() {
        let headers = parse_headers(SAMPLE);
        assert_eq!(pairs(&headers), [("Host", "example.com"), ("Accept", "*/*")]);

        let others: Vec<_> = headers
            .without("Host")
            .map(|entry| (entry.name.as_str(), entry.value.as_str()))
            .collect();
        assert_eq!(others, [("Accept", "*/*")]);
    }

    #[test]
    fn success_resolve_host_from_raw() {
        assert_eq!(resolve_host(SAMPLE).as_deref(), Some("example.com"));
    }

    #[test]
    fn success_resolve_host_from_parsed() {
        assert_eq!(parse_headers(SAMPLE).host(), Some("example.com"));
    }

    #[test]
    fn success_first_line_always_skipped() {
        let sample = b"Host: evil.example\r\nAccept: text/html\r\n\r\n";
        let headers = parse_headers(sample);
        assert_eq!(pairs(&headers), [("Accept", "text/html")]);
        assert_eq!(headers.host(), None);

        assert!(parse_headers(b"GET / HTTP/1.1\r\n\r\n").is_empty());
        assert!(parse_headers(b"").is_empty());
    }

    #[test]
    fn success_lines_without_colon_dropped() {
        let sample = b"GET / HTTP/1.1\r\nnot a header\r\nAccept: */*\r\n\r\n";
        assert_eq!(pairs(&parse_headers(sample)), [("Accept", "*/*")]);
    }

    #[test]
    fn success_duplicates_kept_in_order() {
        let sample = b"GET / HTTP/1.1\r\nCookie: a=1\r\nHost: one\r\nCookie: b=2\r\n\r\n";
        let headers = parse_headers(sample);
        assert_eq!(
            pairs(&headers),
            [("Cookie", "a=1"), ("Host", "one"), ("Cookie", "b=2")]
        );
        assert_eq!(headers.get_all("Cookie").collect::<Vec<_>>(), ["a=1", "b=2"]);
    }

    #[test]
    fn success_lookup_outlives_name() {
        let headers = parse_headers(SAMPLE);
        let accept = {
            let name = String::from("Accept");
            headers.get(&name)
        };
        assert_eq!(accept, Some("*/*"));
        assert_eq!(headers.host(), Some("example.com"));
    }

    #[test]
    fn success_lookup_is_case_sensitive() {
        let sample = b"GET / HTTP/1.1\r\nhost: lower.example\r\n\r\n";
        let headers = parse_headers(sample);
        assert_eq!(headers.get("host"), Some("lower.example"));
        assert_eq!(headers.host(), None);
        assert_eq!(resolve_host(sample), None);
    }

    #[test]
    fn success_value_whitespace_after_colon_skipped() {
        let sample = b"GET / HTTP/1.1\r\nA:tight\r\nB:   spaced \r\nC:\tTabbed\r\nD:\r\n\r\n";
        assert_eq!(
            pairs(&parse_headers(sample)),
            [("A", "tight"), ("B", "spaced "), ("C", "Tabbed"), ("D", "")]
        );
    }

    #[test]
    fn success_only_first_colon_splits() {
        let sample = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\n\r\n";
        assert_eq!(pairs(&parse_headers(sample)), [("Host", "localhost:8080")]);
        assert_eq!(resolve_host(sample).as_deref(), Some("localhost:8080"));
    }

    #[test]
    fn success_lines_after_blank_line_parsed() {
        let sample = b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\nX-After: yes\r\nHost: hellofc.late\r\n";
        let names: Vec<_> = parse_headers(sample)
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        assert_eq!(names, ["Accept", "X-After", "Host"]);
    }

    #[test]
    fn success_host_found_after_blank_line() {
        let sample = b"GET / HTTP/1.1\r\n\r\nHost: hellofc.late\r\n";
        assert_eq!(resolve_host(sample).as_deref(), Some("hellofc.late"));
        assert_eq!(parse_headers(sample).host(), Some("hellofc.late"));
    }

    #[test]
    fn success_leading_blank_lines_skipped() {
        let sample = b"\r\n\r\nGET http://a:80/ HTTP/1.1\r\nAccept: */*\r\n\r\n";
        assert_eq!(pairs(&parse_headers(sample)), [("Accept", "*/*")]);
    }

    #[test]
    fn success_partial_request() {
        let sample = b"GET / HTTP/1.1\r\nHost: hellofc.local\r\nUser-Ag";
        let headers = parse_headers(sample);
        assert_eq!(pairs(&headers), [("Host", "hellofc.local")]);

        let cut_in_host = b"GET / HTTP/1.1\r\nHost: hellocl";
        assert_eq!(resolve_host(cut_in_host).as_deref(), Some("hellocl"));
    }

    #[test]
    fn success_long_fields_truncated() {
        let name = "N".repeat(400);
        let value = "v".repeat(1000);
        let sample = format!("GET / HTTP/1.1\r\n{name}: {value}\r\n\r\n");
        let headers = parse_headers(sample.as_bytes());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].name.len(), MAX_HEADER_FIELD_LEN);
        assert_eq!(headers[0].value.len(), MAX_HEADER_FIELD_LEN);
    }

    #[test]
    fn success_truncation_respects_char_boundaries() {
        let value = "é".repeat(200);
        let entry = HeaderEntry::new(b"X", value.as_bytes());
        assert!(entry.value.len() <= MAX_HEADER_FIELD_LEN);
        assert!(entry.value.chars().all(|c| c == 'é'));
    }

    #[test]
    fn success_invalid_utf8_does_not_fail() {
        let sample = b"GET / HTTP/1.1\r\nX-Bin: \xff\xfe\r\n\r\n";
        let headers = parse_headers(sample);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].name, "X-Bin");
    }

    #[test]
    fn failure_no_host_marker() {
        let sample = b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
        assert_eq!(resolve_host(sample), None);
        assert_eq!(resolve_host(b""), None);
    }

    #[test]
    fn success_marker_matches_anywhere_in_line() {
        let sample = b"GET / HTTP/1.1\r\nX-Forwarded-Host: proxy\r\nHost: origin\r\n\r\n";
        assert_eq!(resolve_host(sample).as_deref(), Some("proxy"));
        assert_eq!(parse_headers(sample).host(), Some("origin"));
    }

    #[test]
    fn failure_host_too_long() {
        let fits = format!("GET / HTTP/1.1\r\nHost: {}\r\n\r\n", "a".repeat(MAX_HOST_LEN - 1));
        assert_eq!(
            resolve_host(fits.as_bytes()).map(|host| host.len()),
            Some(MAX_HOST_LEN - 1)
        );

        let too_long = format!("GET / HTTP/1.1\r\nHost: {}\r\n\r\n", "a".repeat(MAX_HOST_LEN));
        assert_eq!(resolve_host(too_long.as_bytes()), None);
    }

    #[test]
    fn success_request_parse() {
        let raw = RawRequest::from(Bytes::from_static(
            b"GET / HTTP/1.1\r\nHost: helloqemu.test\r\n\r\n",
        ));
        let request = Request::parse(raw, ReadStatus::Complete);
        assert_eq!(request.host.as_deref(), Some("helloqemu.test"));
        assert_eq!(request.runtime_class, RuntimeClass::Qemu);
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn success_request_parse_without_host() {
        let raw = RawRequest::from(Bytes::from_static(b"GET / HTTP/1.1\r\nAccept: */*"));
        let request = Request::parse(raw, ReadStatus::Partial(PartialReason::PeerClosed));
        assert_eq!(request.host, None);
        assert_eq!(request.runtime_class, RuntimeClass::Container);
    }
}
