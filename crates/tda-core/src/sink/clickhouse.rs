use std::time::Duration;

use curl::easy::{Easy, List};
use url::Url;

use super::{InsertSummary, PrimarySink, SinkError};
use crate::config::DatabaseConfig;
use crate::http::parse_response_head;

/// Longest error body kept from a rejected insert.
const MAX_ERROR_BODY: usize = 1024;

/// Inserts rows through the ClickHouse HTTP interface as `JSONEachRow`.
#[derive(Debug, Clone)]
pub struct ClickHouseSink {
    endpoint: Url,
    username: String,
    password: String,
    options: Vec<(String, String)>,
    user_agent: String,
    timeout: Duration,
}

impl ClickHouseSink {
    pub fn new(
        config: &DatabaseConfig,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            endpoint: Url::parse(&config.url)?,
            username: config.username.clone(),
            password: config.password.expose().to_string(),
            options: config
                .options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            user_agent: user_agent.into(),
            timeout,
        })
    }

    /// Full insert URL: the statement travels in `query`, settings as extra parameters.
    pub fn insert_url(&self, table: &str, columns: &[&str]) -> Url {
        let statement = format!(
            "INSERT INTO {} ({}) FORMAT JSONEachRow",
            table,
            columns.join(", ")
        );
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &statement);
            pairs.extend_pairs(&self.options);
        }
        url
    }

    fn configure(&self, easy: &mut Easy, url: &Url, rows: &[u8]) -> Result<(), curl::Error> {
        easy.url(url.as_str())?;
        easy.useragent(&self.user_agent)?;
        easy.timeout(self.timeout)?;
        easy.post(true)?;
        easy.post_fields_copy(rows)?;

        let mut list = List::new();
        list.append("Content-Type: application/x-ndjson")?;
        list.append("Expect:")?;
        list.append(&format!("X-ClickHouse-User: {}", self.username))?;
        if !self.password.is_empty() {
            list.append(&format!("X-ClickHouse-Key: {}", self.password))?;
        }
        easy.http_headers(list)?;
        Ok(())
    }
}

impl PrimarySink for ClickHouseSink {
    fn insert(&self, table: &str, columns: &[&str], rows: &[u8]) -> Result<InsertSummary, SinkError> {
        let url = self.insert_url(table, columns);
        let mut easy = Easy::new();
        self.configure(&mut easy, &url, rows)
            .map_err(|e| SinkError::InvalidRequest(e.to_string()))?;

        let mut body = Vec::new();
        let mut header_lines: Vec<String> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(|e| SinkError::InvalidRequest(e.to_string()))?;
            transfer
                .header_function(|line| {
                    header_lines.push(String::from_utf8_lossy(line).trim_end().to_string());
                    true
                })
                .map_err(|e| SinkError::InvalidRequest(e.to_string()))?;
            transfer
                .perform()
                .map_err(|e| SinkError::Transport(e.to_string()))?;
        }

        let status = easy
            .response_code()
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        let status = u16::try_from(status).unwrap_or(0);
        if !(200..300).contains(&status) {
            let mut message = String::from_utf8_lossy(&body).trim().to_string();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            return Err(SinkError::Rejected { status, message });
        }

        let head = parse_response_head(&header_lines);
        let written_rows = head
            .headers
            .get("x-clickhouse-summary")
            .and_then(|v| v.last())
            .and_then(|summary| written_rows(summary));
        Ok(InsertSummary { written_rows })
    }
}

/// `written_rows` from an `X-ClickHouse-Summary` header; ClickHouse quotes the numbers.
fn written_rows(summary: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(summary).ok()?;
    match value.get("written_rows")? {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use std::collections::BTreeMap;

    fn sink() -> ClickHouseSink {
        let mut options = BTreeMap::new();
        options.insert("async_insert".to_string(), "1".to_string());
        let config = DatabaseConfig {
            url: "http://db.example:8123/".to_string(),
            username: "archiver".to_string(),
            password: Secret::new("pw"),
            table: "feed_contents".to_string(),
            options,
        };
        ClickHouseSink::new(&config, "tda-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn insert_url_carries_statement_and_settings() {
        let url = sink().insert_url("feed_contents", &["producer", "feed"]);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "query".to_string(),
                    "INSERT INTO feed_contents (producer, feed) FORMAT JSONEachRow".to_string()
                ),
                ("async_insert".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(url.host_str(), Some("db.example"));
    }

    #[test]
    fn summary_written_rows_quoted_or_bare() {
        assert_eq!(
            written_rows(r#"{"read_rows":"0","written_rows":"3","written_bytes":"512"}"#),
            Some(3)
        );
        assert_eq!(written_rows(r#"{"written_rows":7}"#), Some(7));
        assert_eq!(written_rows("not json"), None);
        assert_eq!(written_rows(r#"{"read_rows":"1"}"#), None);
    }

    #[test]
    fn bad_url_rejected() {
        let config = DatabaseConfig {
            url: "not a url".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(ClickHouseSink::new(&config, "ua", Duration::from_secs(1)).is_err());
    }
}
