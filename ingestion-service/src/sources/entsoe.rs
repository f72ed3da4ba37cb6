use reqwest::{Client, Request, StatusCode};
use time::{format_description::FormatItem, macros::format_description};

use super::{area, document, FetchWindow, MarketDataSource, SourceError};
use crate::config::ProviderConfig;
use crate::transform::{GenerationTable, LoadTable};

const PERIOD_FORMAT: &[FormatItem<'static>] = format_description!("[year][month][day][hour][minute]");

/// Actual generation per production type.
const DOC_ACTUAL_GENERATION: &str = "A75";
/// System total load.
const DOC_SYSTEM_LOAD: &str = "A65";
/// Realised (as opposed to forecast) values.
const PROCESS_REALISED: &str = "A16";

const GENERATION_DOMAIN: &str = "in_Domain";
const LOAD_DOMAIN: &str = "outBiddingZone_Domain";

/// Longest slice of an error body carried into log output.
const ERROR_BODY_PREVIEW: usize = 512;

/// Client for the ENTSO-E transparency platform REST API.
///
/// Built once and reused across market areas; every query is a single GET.
pub struct EntsoeClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EntsoeClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, SourceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SourceError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    /// The single GET for one query; no request is sent for an unknown area.
    fn request(
        &self,
        document_type: &str,
        domain_param: &str,
        area: &str,
        window: FetchWindow,
    ) -> Result<Request, SourceError> {
        let eic = area::resolve(area).ok_or_else(|| SourceError::UnknownArea(area.to_string()))?;
        let (start, end) = format_window(window)?;

        self.client
            .get(&self.base_url)
            .query(&[
                ("securityToken", self.api_key.as_str()),
                ("documentType", document_type),
                ("processType", PROCESS_REALISED),
                (domain_param, eic),
                ("periodStart", start.as_str()),
                ("periodEnd", end.as_str()),
            ])
            .build()
            .map_err(|e| SourceError::Transport(format!("failed to build request: {e}")))
    }

    async fn fetch(
        &self,
        document_type: &str,
        domain_param: &str,
        area: &str,
        window: FetchWindow,
    ) -> Result<String, SourceError> {
        let request = self.request(document_type, domain_param, area, window)?;

        tracing::debug!(area, document_type, start = %window.start, end = %window.end, "querying market data provider");

        let resp = self
            .client
            .execute(request)
            .await
            .map_err(|e| SourceError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::Transport(format!("failed to read response body: {e}")))?;

        classify_response(status, body)
    }
}

fn format_window(window: FetchWindow) -> Result<(String, String), SourceError> {
    let fmt = |ts: time::OffsetDateTime| {
        ts.to_offset(time::UtcOffset::UTC)
            .format(PERIOD_FORMAT)
            .map_err(|e| SourceError::Transport(format!("failed to format query window: {e}")))
    };
    Ok((fmt(window.start)?, fmt(window.end)?))
}

/// The provider reports empty result sets through an acknowledgement document,
/// sometimes with a 200 and sometimes with a 400, so the body wins over the status.
fn classify_response(status: StatusCode, body: String) -> Result<String, SourceError> {
    if document::is_acknowledgement(&body) {
        return Err(document::acknowledgement_error(&body));
    }

    if !status.is_success() {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        return Err(SourceError::Provider(format!("provider returned {status}: {preview}")));
    }

    Ok(body)
}

#[async_trait::async_trait]
impl MarketDataSource for EntsoeClient {
    async fn query_generation(&self, area: &str, window: FetchWindow) -> Result<GenerationTable, SourceError> {
        let body = self.fetch(DOC_ACTUAL_GENERATION, GENERATION_DOMAIN, area, window).await?;
        document::parse_generation(&body)
    }

    async fn query_load(&self, area: &str, window: FetchWindow) -> Result<LoadTable, SourceError> {
        let body = self.fetch(DOC_SYSTEM_LOAD, LOAD_DOMAIN, area, window).await?;
        document::parse_load(&body)
    }
}
