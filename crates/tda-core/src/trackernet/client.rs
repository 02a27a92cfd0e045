use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::model::{parse_detail, parse_summary, PredictionDetail, PredictionSummary};
use crate::config::TrackernetConfig;
use crate::http::{HttpClient, HttpError, HttpRequest};

#[derive(Debug, thiserror::Error)]
pub enum TrackernetError {
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("HTTP error {code} {message}")]
    Status { code: u16, message: String },
    #[error("response is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("failed to parse response: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Blocking Trackernet API client. Every request, from any line, draws on one
/// shared budget; callers block until the limiter admits them.
pub struct TrackernetClient {
    http: Arc<dyn HttpClient>,
    base_url: Url,
    app_key: String,
    timeout: Duration,
    limiter: DefaultDirectRateLimiter,
}

impl TrackernetClient {
    pub fn new(http: Arc<dyn HttpClient>, config: &TrackernetConfig) -> Result<Self, url::ParseError> {
        let period = config.request_period();
        let quota = Quota::with_period(period).unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        tracing::debug!("trackernet requests spaced at least {:?} apart", period);

        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
            app_key: config.app_key.expose().to_string(),
            timeout: config.call_timeout(),
            limiter: RateLimiter::direct(quota),
        })
    }

    pub fn prediction_summary(&self, line_code: &str) -> Result<PredictionSummary, TrackernetError> {
        let body = self.get(&format!("PredictionSummary/{}", line_code))?;
        Ok(parse_summary(&body)?)
    }

    pub fn prediction_detail(
        &self,
        line_code: &str,
        station_code: &str,
    ) -> Result<PredictionDetail, TrackernetError> {
        let body = self.get(&format!("PredictionDetailed/{}/{}", line_code, station_code))?;
        Ok(parse_detail(&body)?)
    }

    fn get(&self, path: &str) -> Result<String, TrackernetError> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut().append_pair("app_key", &self.app_key);

        self.wait_for_permit();
        let response = self.http.execute(&HttpRequest::get(url, self.timeout))?;
        if !response.is_success() {
            return Err(TrackernetError::Status {
                code: response.status_code,
                message: response.status_message,
            });
        }
        Ok(std::str::from_utf8(&response.body)?.to_string())
    }

    fn wait_for_permit(&self) {
        while let Err(not_until) = self.limiter.check() {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            tracing::trace!("rate limited; waiting {:?}", wait);
            std::thread::sleep(wait);
        }
    }
}
