//! Single-site probing.
//!
//! A probe requests one profile URL and classifies the response according to
//! the site's detection rule. Every failure is folded into a
//! [`Verdict::Error`] outcome; nothing is raised to the dispatcher.

use crate::descriptor::{DetectionRule, SiteDescriptor};
use crate::error::HandleCheckError;
use crate::transport::{HttpResponse, HttpTransport};
use crate::types::{ProbeOutcome, Verdict};
use reqwest::Url;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Probe one site for one username.
///
/// # Arguments
///
/// * `transport` - Shared HTTP transport
/// * `descriptor` - The site to check
/// * `username` - The username to look for
/// * `timeout` - Deadline for the whole request, body included
///
/// # Returns
///
/// Exactly one `ProbeOutcome`. Transport failures and timeouts yield
/// `Verdict::Error` with the reason in `error_message`.
pub async fn probe(
    transport: &dyn HttpTransport,
    descriptor: &SiteDescriptor,
    username: &str,
    timeout: Duration,
) -> ProbeOutcome {
    let raw_url = descriptor.profile_url(username);

    let url = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(e) => {
            let message = HandleCheckError::invalid_url(&raw_url, e.to_string()).to_string();
            let outcome = failed(descriptor, raw_url, 0, message);
            log_outcome(&outcome);
            return outcome;
        }
    };

    if !descriptor.accepts_username(username) {
        let outcome = ProbeOutcome {
            site: descriptor.name().to_string(),
            url: url.to_string(),
            elapsed_millis: 0,
            verdict: Verdict::NotFound,
            http_status: None,
            error_message: None,
        };
        debug!(site = descriptor.name(), "username rejected by site pattern");
        return outcome;
    }

    let start = Instant::now();
    let result = tokio::time::timeout(timeout, transport.get(&url)).await;
    let elapsed_millis = start.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(Ok(response)) => ProbeOutcome {
            site: descriptor.name().to_string(),
            verdict: classify(descriptor.rule(), &url, &response),
            url: url.to_string(),
            elapsed_millis,
            http_status: Some(response.status),
            error_message: None,
        },
        Ok(Err(e)) => failed(descriptor, url.to_string(), elapsed_millis, e.to_string()),
        Err(_) => failed(
            descriptor,
            url.to_string(),
            elapsed_millis,
            HandleCheckError::timeout(format!("GET {}", url), timeout).to_string(),
        ),
    };

    log_outcome(&outcome);
    outcome
}

/// Decide whether a response means the account exists.
pub fn classify(rule: &DetectionRule, requested: &Url, response: &HttpResponse) -> Verdict {
    let exists = match rule {
        DetectionRule::StatusCode => response.status != 404,
        DetectionRule::BodyMessage { markers } => {
            !markers.iter().any(|m| response.body.contains(m.as_str()))
        }
        DetectionRule::FinalUrl => response.final_url == requested.as_str(),
    };

    if exists {
        Verdict::Found
    } else {
        Verdict::NotFound
    }
}

fn failed(
    descriptor: &SiteDescriptor,
    url: String,
    elapsed_millis: u64,
    message: String,
) -> ProbeOutcome {
    ProbeOutcome {
        site: descriptor.name().to_string(),
        url,
        elapsed_millis,
        verdict: Verdict::Error,
        http_status: None,
        error_message: Some(message),
    }
}

fn log_outcome(outcome: &ProbeOutcome) {
    match &outcome.error_message {
        Some(reason) => debug!(
            site = %outcome.site,
            elapsed_ms = outcome.elapsed_millis,
            %reason,
            "probe failed"
        ),
        None => debug!(
            site = %outcome.site,
            verdict = %outcome.verdict,
            status = ?outcome.http_status,
            elapsed_ms = outcome.elapsed_millis,
            "probe finished"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers every request with the same canned response.
    struct Canned(Result<HttpResponse, HandleCheckError>);

    #[async_trait]
    impl HttpTransport for Canned {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, HandleCheckError> {
            self.0.clone()
        }
    }

    /// Never answers.
    struct Hang;

    #[async_trait]
    impl HttpTransport for Hang {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, HandleCheckError> {
            std::future::pending().await
        }
    }

    fn response(status: u16, final_url: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            final_url: final_url.to_string(),
            body: body.to_string(),
        }
    }

    fn site(rule: DetectionRule) -> SiteDescriptor {
        SiteDescriptor::new("siteA", "https://a.test/{}", rule).unwrap()
    }

    #[test]
    fn test_classify_status_code() {
        let url = Url::parse("https://a.test/bob").unwrap();
        let rule = DetectionRule::StatusCode;
        for status in [200, 301, 403, 500] {
            assert_eq!(
                classify(&rule, &url, &response(status, url.as_str(), "")),
                Verdict::Found
            );
        }
        assert_eq!(
            classify(&rule, &url, &response(404, url.as_str(), "")),
            Verdict::NotFound
        );
    }

    #[test]
    fn test_classify_body_message() {
        let url = Url::parse("https://a.test/bob").unwrap();
        let rule = DetectionRule::BodyMessage {
            markers: vec!["User not found".to_string(), "No such page".to_string()],
        };
        assert_eq!(
            classify(&rule, &url, &response(200, url.as_str(), "<h1>Sorry, No such page</h1>")),
            Verdict::NotFound
        );
        assert_eq!(
            classify(&rule, &url, &response(200, url.as_str(), "<h1>bob's profile</h1>")),
            Verdict::Found
        );
    }

    #[test]
    fn test_classify_final_url() {
        let url = Url::parse("https://a.test/bob").unwrap();
        let rule = DetectionRule::FinalUrl;
        assert_eq!(
            classify(&rule, &url, &response(200, "https://a.test/bob", "")),
            Verdict::Found
        );
        assert_eq!(
            classify(&rule, &url, &response(200, "https://a.test/signup", "")),
            Verdict::NotFound
        );
    }

    #[tokio::test]
    async fn test_probe_found_records_url_and_status() {
        let transport = Canned(Ok(response(200, "https://a.test/bob", "hello")));
        let outcome = probe(
            &transport,
            &site(DetectionRule::StatusCode),
            "bob",
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.site, "siteA");
        assert_eq!(outcome.url, "https://a.test/bob");
        assert_eq!(outcome.verdict, Verdict::Found);
        assert_eq!(outcome.http_status, Some(200));
        assert!(outcome.error_message.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_becomes_error_verdict() {
        let transport = Canned(Err(HandleCheckError::transport(
            "https://a.test/bob",
            "connection reset",
        )));
        let outcome = probe(
            &transport,
            &site(DetectionRule::StatusCode),
            "bob",
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.verdict, Verdict::Error);
        assert!(outcome
            .error_message
            .as_deref()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_times_out() {
        let outcome = probe(
            &Hang,
            &site(DetectionRule::StatusCode),
            "bob",
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.verdict, Verdict::Error);
        assert!(outcome.elapsed_millis >= 5000);
        assert!(outcome.error_message.unwrap().starts_with("Timeout after 5s"));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_fast() {
        let descriptor =
            SiteDescriptor::new("Weird", "not a url {}", DetectionRule::StatusCode).unwrap();
        let outcome = probe(&Hang, &descriptor, "bob", Duration::from_secs(5)).await;
        assert_eq!(outcome.verdict, Verdict::Error);
        assert_eq!(outcome.url, "not a url bob");
        assert!(outcome.error_message.unwrap().starts_with("Invalid URL"));
    }

    #[tokio::test]
    async fn test_username_rejected_by_pattern_skips_network() {
        let descriptor = site(DetectionRule::StatusCode)
            .with_username_pattern("^[a-z]+$")
            .unwrap();
        // Hang would never return, so reaching an outcome proves no request was made.
        let outcome = probe(&Hang, &descriptor, "Bob_99", Duration::from_secs(5)).await;
        assert_eq!(outcome.verdict, Verdict::NotFound);
        assert!(outcome.http_status.is_none());
    }
}
