//! Plain HTTP runner.
//!
//! Sends every request of a collection in document order. Script-based tests
//! are not evaluated; each response is checked with one built-in assertion on
//! its status code.

use super::{now_epoch_ms, CollectionRunner, RunCompletion, RunReport, RunnerEvent};
use crate::collection::{Collection, RequestSpec};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub(crate) const STATUS_ASSERTION: &str = "Status code is successful";

#[derive(Debug, Clone)]
pub struct HttpRunnerConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpRunnerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: format!("nmrunner/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct HttpRunner {
    client: reqwest::Client,
}

impl HttpRunner {
    pub fn new(cfg: &HttpRunnerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { client })
    }

    /// Send one request and return its status and elapsed milliseconds.
    async fn send(&self, request: &RequestSpec, vars: &HashMap<String, String>) -> Result<(u16, u64)> {
        if !request.is_supported() {
            anyhow::bail!("unsupported request format");
        }
        let raw_url = request.raw_url().context("request has no URL")?;
        let url = with_default_scheme(substitute(raw_url, vars));
        let method_name = request.method().to_ascii_uppercase();
        let method = reqwest::Method::from_bytes(method_name.as_bytes())
            .with_context(|| format!("invalid HTTP method {method_name}"))?;

        let mut builder = self.client.request(method, &url);
        for header in request.headers().iter().filter(|h| !h.key.is_empty()) {
            builder = builder.header(substitute(&header.key, vars), substitute(&header.value, vars));
        }
        if let Some(body) = request.raw_body() {
            builder = builder.body(substitute(body, vars));
        }

        let start = Instant::now();
        let resp = builder
            .send()
            .await
            .with_context(|| format!("{method_name} {url} failed"))?;
        let status = resp.status().as_u16();

        // Drain the body so elapsed time covers the whole exchange.
        let mut stream = resp.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => received += bytes.len() as u64,
                Err(e) => {
                    tracing::debug!(%url, error = %e, "response body interrupted");
                    break;
                }
            }
        }
        tracing::debug!(%url, status, bytes = received, "response received");
        Ok((status, start.elapsed().as_millis() as u64))
    }
}

#[async_trait]
impl CollectionRunner for HttpRunner {
    async fn execute(
        &self,
        collection: Arc<Collection>,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> RunCompletion {
        let started_ms = now_epoch_ms();
        let vars = collection.variables();
        let mut executed = 0u64;
        let mut failures = 0u64;

        for req in collection.requests() {
            executed += 1;
            let item = req.name.map(str::to_string);
            match self.send(req.request, &vars).await {
                Ok((status, elapsed_ms)) => {
                    let _ = events.send(RunnerEvent::RequestCompleted {
                        item: item.clone(),
                        status: Some(status),
                        elapsed_ms,
                    });
                    let error = check_status(status);
                    if error.is_some() {
                        failures += 1;
                    }
                    let _ = events.send(RunnerEvent::AssertionEvaluated {
                        item,
                        assertion: STATUS_ASSERTION.to_string(),
                        error,
                    });
                }
                Err(e) => {
                    failures += 1;
                    let _ = events.send(RunnerEvent::RequestFailed {
                        item,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        RunCompletion {
            error: None,
            report: Some(RunReport {
                requests_total: Some(executed),
                failures: Some(failures),
                started_ms: Some(started_ms),
                completed_ms: Some(now_epoch_ms()),
            }),
        }
    }
}

fn check_status(status: u16) -> Option<String> {
    (status >= 400).then(|| format!("expected a successful status code but got {status}"))
}

/// Replace `{{name}}` placeholders with collection variables.
/// Unknown placeholders are left untouched.
fn substitute(input: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = after[..close].trim();
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

fn with_default_scheme(url: String) -> String {
    if url.contains("://") {
        url
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_placeholders() {
        let v = vars(&[("host", "example.com"), ("id", "42")]);
        assert_eq!(
            substitute("https://{{host}}/items/{{ id }}", &v),
            "https://example.com/items/42"
        );
    }

    #[test]
    fn leaves_unknown_and_unterminated_placeholders() {
        let v = vars(&[("a", "1")]);
        assert_eq!(substitute("{{a}}-{{b}}-{{c", &v), "1-{{b}}-{{c");
    }

    #[test]
    fn adds_scheme_when_missing() {
        assert_eq!(with_default_scheme("example.com/x".into()), "http://example.com/x");
        assert_eq!(with_default_scheme("https://a.b".into()), "https://a.b");
    }

    #[test]
    fn status_check_fails_on_client_and_server_errors() {
        assert!(check_status(200).is_none());
        assert!(check_status(302).is_none());
        assert!(check_status(404).is_some());
        assert!(check_status(503).is_some());
    }

    #[tokio::test]
    async fn unreachable_request_is_reported_and_counted() {
        let doc = r#"{
            "item": [
                { "name": "no url", "request": { "method": "GET" } },
                { "name": "bad method", "request": { "method": "NOT A METHOD", "url": "http://127.0.0.1:9/" } },
                { "name": "odd shape", "request": [1, 2] }
            ]
        }"#;
        let collection = Arc::new(Collection::parse(doc).unwrap());
        let runner = HttpRunner::new(&HttpRunnerConfig::default()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let completion = runner.execute(collection, tx).await;

        let mut failed = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let RunnerEvent::RequestFailed { item, error } = ev {
                failed.push((item.unwrap_or_default(), error));
            }
        }
        let names: Vec<_> = failed.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["no url", "bad method", "odd shape"]);
        assert_eq!(failed[2].1, "unsupported request format");

        let report = completion.report.unwrap();
        assert_eq!(report.requests_total, Some(3));
        assert_eq!(report.failures, Some(3));
        assert!(report.completed_ms.unwrap() >= report.started_ms.unwrap());
        assert!(completion.error.is_none());
    }
}
