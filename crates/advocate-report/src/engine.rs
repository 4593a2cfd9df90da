//! Report retrieval: run → poll → fetch, fronted by a [`ReportCache`].
//!
//! The remote service executes reports as asynchronous jobs. A retrieval
//! starts a run, checks its status until the completion marker shows up or
//! the [`PollPolicy`] is exhausted, then fetches the delimited payload. Only
//! a fully successful sequence updates the cache.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::ReportCache;
use crate::config::{ClientConfig, PollPolicy, DEFAULT_COMPLETION_MARKER};
use crate::delimited;
use crate::request::{build_headers, Credentials, RequestTemplate, RequestTemplates};
use crate::response::extract_value;
use crate::transport::{HttpTransport, Method, Transport, TransportRequest};
use crate::types::{Document, Record, ReportError, ReportId, ReportResult, ReportStatus, RunId};

/// Retrieves, caches, and parses reports from the remote service.
pub struct ReportEngine {
    transport: Arc<dyn Transport>,
    templates: RequestTemplates,
    credentials: Credentials,
    host: String,
    cache: Arc<ReportCache>,
    poll: PollPolicy,
    completion_marker: String,
    bypass_cache: bool,
}

impl ReportEngine {
    /// Create an engine over `transport` that stores results in `cache`.
    ///
    /// `host` is sent as the `Host` header. Polling uses
    /// [`PollPolicy::default`] until overridden.
    pub fn new(
        transport: Arc<dyn Transport>,
        templates: RequestTemplates,
        credentials: Credentials,
        host: impl Into<String>,
        cache: Arc<ReportCache>,
    ) -> Self {
        Self {
            transport,
            templates,
            credentials,
            host: host.into(),
            cache,
            poll: PollPolicy::default(),
            completion_marker: DEFAULT_COMPLETION_MARKER.to_string(),
            bypass_cache: false,
        }
    }

    /// Build an engine with an HTTP transport and a fresh cache from `config`.
    pub fn from_config(config: &ClientConfig) -> ReportResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.api_url.clone(), config.request_timeout())?;
        let cache = Arc::new(ReportCache::new(config.cache_retention()));

        Ok(Self::new(
            Arc::new(transport),
            config.templates()?,
            config.require_credentials()?.clone(),
            config.host()?,
            cache,
        )
        .with_poll_policy(config.poll_policy()?)
        .with_completion_marker(config.completion_marker.as_str())
        .with_bypass_cache(config.bypass_cache))
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_completion_marker(mut self, marker: impl Into<String>) -> Self {
        self.completion_marker = marker.into();
        self
    }

    /// Default cache behaviour of the `report_as_*` accessors.
    pub fn with_bypass_cache(mut self, bypass_cache: bool) -> Self {
        self.bypass_cache = bypass_cache;
        self
    }

    pub fn cache(&self) -> &Arc<ReportCache> {
        &self.cache
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Start a new run of `report_id`.
    pub async fn run_report(&self, report_id: &ReportId) -> ReportResult<RunId> {
        let value = self
            .call("run", &self.templates.run, report_id.as_str())
            .await?;
        Ok(RunId::new(value.trim()))
    }

    /// Ask whether a run has completed.
    pub async fn check_status(&self, run_id: &RunId) -> ReportResult<ReportStatus> {
        let value = self
            .call("status", &self.templates.status, run_id.as_str())
            .await?;
        Ok(ReportStatus::from_marker(&value, &self.completion_marker))
    }

    /// Fetch the delimited payload of a completed run, verbatim.
    pub async fn fetch_data(&self, run_id: &RunId) -> ReportResult<String> {
        self.call("data", &self.templates.data, run_id.as_str())
            .await
    }

    /// Raw payload for `report_id`, from cache unless `bypass_cache` is set.
    ///
    /// On a miss this runs the report, makes at most `max_tries` status
    /// checks, and fetches the data on the first completed check.
    pub async fn retrieve(
        &self,
        report_id: &ReportId,
        bypass_cache: bool,
    ) -> ReportResult<Arc<str>> {
        if !bypass_cache {
            if let Some(payload) = self.cache.get(report_id) {
                debug!(report_id = %report_id, "report cache hit");
                return Ok(payload);
            }
        }

        let run_id = self.run_report(report_id).await?;
        info!(report_id = %report_id, run_id = %run_id, "report run started");

        for attempt in 0..self.poll.max_tries {
            if attempt > 0 {
                tokio::time::sleep(self.poll.sleep_between_tries).await;
            }

            match self.check_status(&run_id).await? {
                ReportStatus::Complete => {
                    let payload = self.fetch_data(&run_id).await?;
                    info!(
                        report_id = %report_id,
                        run_id = %run_id,
                        attempt = attempt + 1,
                        bytes = payload.len(),
                        "report retrieved"
                    );
                    return Ok(self.cache.put(report_id, payload));
                }
                ReportStatus::Pending(status) => {
                    debug!(
                        report_id = %report_id,
                        run_id = %run_id,
                        attempt = attempt + 1,
                        status = %status,
                        "report not complete yet"
                    );
                }
            }
        }

        warn!(
            report_id = %report_id,
            run_id = %run_id,
            attempts = self.poll.max_tries,
            "report never completed"
        );
        Err(ReportError::ReportTimeout {
            report_id: report_id.clone(),
            attempts: self.poll.max_tries,
        })
    }

    /// The report's raw delimited text.
    pub async fn report_as_text(&self, report_id: &ReportId) -> ReportResult<String> {
        Ok(self.retrieve(report_id, self.bypass_cache).await?.to_string())
    }

    /// The report as one header-keyed record per data row.
    pub async fn report_as_records(&self, report_id: &ReportId) -> ReportResult<Vec<Record>> {
        let payload = self.retrieve(report_id, self.bypass_cache).await?;
        delimited::to_records(&payload)
    }

    /// The report as a `Report` → rows → columns tree.
    pub async fn report_as_document(&self, report_id: &ReportId) -> ReportResult<Document> {
        let payload = self.retrieve(report_id, self.bypass_cache).await?;
        delimited::to_document(&payload)
    }

    async fn call(
        &self,
        operation: &'static str,
        template: &RequestTemplate,
        value: &str,
    ) -> ReportResult<String> {
        let body = template.render(value);
        let headers = build_headers(&body, &self.host, &self.credentials);
        debug!(operation, value, "sending report request");

        let response = self
            .transport
            .send(TransportRequest {
                method: Method::Post,
                headers,
                body,
            })
            .await?;

        if !response.is_success() {
            warn!(operation, status = response.status, "report request rejected");
            return Err(ReportError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }

        extract_value(&response.body)
    }
}
