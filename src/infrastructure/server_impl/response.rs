use std::fmt::Write;

use bytes::Bytes;
use compact_str::CompactString;
use enum_map::{Enum, EnumMap};
use strum::{EnumMessage, IntoStaticStr};
use time::macros::format_description;
use time::OffsetDateTime;

pub const SERVER_NAME: &str = "hello-runtimeclass";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoStaticStr, EnumMessage)]
pub enum StatusCode {
    #[strum(serialize = "200", message = "OK")]
    Ok,
}

/// Response headers, written in declaration order.
#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, IntoStaticStr)]
pub enum Header {
    #[strum(serialize = "Date")]
    DATE,
    #[strum(serialize = "Server")]
    SERVER,
    #[strum(serialize = "Content-Type")]
    CONTENT_TYPE,
    #[strum(serialize = "Connection")]
    CONNECTION,
}

#[derive(Debug)]
pub struct Response {
    pub headers: EnumMap<Header, Option<CompactString>>,
    pub status_code: StatusCode,
    pub body: Option<String>,
}

impl Response {
    pub fn from_status_code(value: StatusCode, body: impl Into<Option<String>>) -> Self {
        Self {
            headers: Default::default(),
            status_code: value,
            body: body.into(),
        }
    }

    pub fn html(body: String) -> Self {
        let mut response = Self::from_status_code(StatusCode::Ok, body);
        response.headers[Header::DATE] = http_date(OffsetDateTime::now_utc());
        response.headers[Header::SERVER] = Some(SERVER_NAME.into());
        response.headers[Header::CONTENT_TYPE] = Some("text/html".into());
        response.headers[Header::CONNECTION] = Some("close".into());
        response
    }

    pub fn into_http(self) -> Bytes {
        let body = self.body.unwrap_or_default();
        let mut buf = String::with_capacity(160 + body.len());
        let status_code: &str = self.status_code.into();
        let status_message = self.status_code.get_message().unwrap_or_default();

        write!(buf, "HTTP/1.1 {status_code} {status_message}\r\n").expect("No reason to fail.");
        for (header, value) in &self.headers {
            if let Some(value) = value {
                let name: &str = header.into();
                write!(buf, "{name}: {value}\r\n").expect("No reason to fail.");
            }
        }
        write!(buf, "Content-Length: {}\r\n\r\n{body}", body.len()).expect("No reason to fail.");

        buf.into()
    }
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date(at: OffsetDateTime) -> Option<CompactString> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.format(format).ok().map(CompactString::from)
}
