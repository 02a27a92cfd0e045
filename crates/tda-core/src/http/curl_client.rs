use std::time::Duration;

use curl::easy::{Auth, Easy, List};

use super::parse::parse_response_head;
use super::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// libcurl-backed client. A fresh handle per call keeps per-feed TLS and
/// auth settings from leaking between feeds.
#[derive(Debug, Clone)]
pub struct CurlHttpClient {
    user_agent: String,
    connect_timeout: Duration,
}

impl CurlHttpClient {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn configure(&self, easy: &mut Easy, request: &HttpRequest) -> Result<(), curl::Error> {
        easy.url(request.url.as_str())?;
        easy.useragent(&self.user_agent)?;
        easy.follow_location(true)?;
        easy.accept_encoding("")?;
        easy.timeout(request.timeout)?;
        easy.connect_timeout(self.connect_timeout.min(request.timeout))?;

        if request.ignore_tls_errors {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }

        if let Some(auth) = &request.basic_auth {
            easy.username(&auth.username)?;
            easy.password(auth.password.expose())?;
            let mut methods = Auth::new();
            methods.basic(true);
            easy.http_auth(&methods)?;
        }

        let mut list = List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !request.headers.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(())
    }
}

impl HttpClient for CurlHttpClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut easy = Easy::new();
        self.configure(&mut easy, request)
            .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;

        let mut body = Vec::new();
        let mut header_lines: Vec<String> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
            transfer
                .header_function(|line| {
                    header_lines.push(String::from_utf8_lossy(line).trim_end().to_string());
                    true
                })
                .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
            transfer
                .perform()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
        }

        let status_code = easy
            .response_code()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        let start_transfer = easy.starttransfer_time().unwrap_or_default();
        let pre_transfer = easy.pretransfer_time().unwrap_or_default();

        let head = parse_response_head(&header_lines);

        Ok(HttpResponse {
            status_code: u16::try_from(status_code).unwrap_or(0),
            status_message: head.status_message,
            protocol: head.protocol,
            headers: head.headers,
            body,
            response_time: start_transfer.saturating_sub(pre_transfer),
        })
    }
}
