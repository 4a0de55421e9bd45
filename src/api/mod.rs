use std::fmt::Write;

use crate::domain::runtime_class::RuntimeClass;
use crate::infrastructure::server_impl::request::{HeaderSet, Request};
use crate::infrastructure::server_impl::response::Response;

/// Cap on the rendered header table. Rows that would cross it are left out.
pub const MAX_HEADERS_HTML_LEN: usize = 8192;

pub const GREETING_LOGO: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' width='160' height='60'><text x='0' y='45' font-family='sans-serif' font-size='40'>CAMAD</text></svg>";
pub const SPONSOR_LOGO_URL: &str = "https://s3.nbfc.io/hypervisor-logos/nubis-logo-scaled.png";

const STYLE: &str = "table {border-collapse: collapse; width: 50%;}\
th, td {border: 1px solid #dddddd; text-align: left; padding: 8px;}\
th {background-color: #f2f2f2;}";

/// The demo page: greeting, runtime class logo picked from the host, and the
/// request headers as a table.
pub fn hello_route(request: &Request) -> Response {
    Response::html(render_page(request.runtime_class, &request.headers))
}

pub fn render_page(runtime_class: RuntimeClass, headers: &HeaderSet) -> String {
    let rows = header_rows(headers, MAX_HEADERS_HTML_LEN);
    let runtime_image = runtime_class.image_url();
    let alt: &str = runtime_class.into();

    let mut page = String::with_capacity(1024 + rows.len());
    write!(
        page,
        "<!DOCTYPE html>\
         <html lang=\"en\">\
         <head><meta charset=\"UTF-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\
         <title>Serverless Demo</title>\
         <style>{STYLE}</style>\
         </head>\
         <body>\
         <h1> Hello <img src=\"{GREETING_LOGO}\" alt=\"CAMAD Logo\" height=\"60px\"/></h1>\
         <h2> RuntimeClass</h2>\
         <img src=\"{runtime_image}\" alt=\"{alt}\" height=\"100px\" />\
         <h1>Request Headers</h1>\
         <table><tr><th>Header</th><th>Value</th></tr>{rows}</table>\
         <h2> Brought to you by </h2>\
         <img src=\"{SPONSOR_LOGO_URL}\" width=200px alt=\"Nubis PC\"/>\
         </body></html>"
    )
    .expect("No reason to fail.");

    page
}

/// One `<tr>` per header in wire order, stopping before the first row that
/// would push the table past `max_len` bytes.
fn header_rows(headers: &HeaderSet, max_len: usize) -> String {
    let mut rows = String::new();
    let mut row = String::new();

    for entry in headers.iter() {
        row.clear();
        row.push_str("<tr><td>");
        escape_html(&entry.name, &mut row);
        row.push_str("</td><td>");
        escape_html(&entry.value, &mut row);
        row.push_str("</td></tr>");

        if rows.len() + row.len() > max_len {
            break;
        }
        rows.push_str(&row);
    }

    rows
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
