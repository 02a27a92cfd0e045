//! Parse curl header callback lines into protocol, reason phrase, and a header multimap.

use super::ResponseHeaders;

#[derive(Debug, Default, PartialEq)]
pub(crate) struct ResponseHead {
    pub protocol: String,
    pub status_message: String,
    pub headers: ResponseHeaders,
}

/// Parse the header lines of the final response.
///
/// Every status line (`HTTP/...`) starts a new response, so headers from
/// redirects and `100 Continue` are discarded.
pub(crate) fn parse_response_head(lines: &[String]) -> ResponseHead {
    let mut head = ResponseHead::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            head = parse_status_line(line);
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            head.headers
                .entry(name.trim().to_ascii_lowercase())
                .or_default()
                .push(value.trim().to_string());
        }
    }

    head
}

fn parse_status_line(line: &str) -> ResponseHead {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let _code = parts.next();
    let message = parts.next().unwrap_or_default().trim();

    ResponseHead {
        protocol: protocol_name(version),
        status_message: message.to_string(),
        headers: ResponseHeaders::new(),
    }
}

fn protocol_name(version: &str) -> String {
    match version {
        "HTTP/1.0" => "http/1.0".to_string(),
        "HTTP/1.1" => "http/1.1".to_string(),
        "HTTP/2" | "HTTP/2.0" => "h2".to_string(),
        "HTTP/3" => "h3".to_string(),
        other => other.to_ascii_lowercase(),
    }
}
