use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::{EventPage, EventSource};
use crate::error::{Error, Result};
use crate::types::{Event, RateLimit};

const USER_AGENT_VALUE: &str = "depfresh";

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    rate: RawRate,
}

#[derive(Deserialize)]
struct RawRate {
    limit: u32,
    remaining: u32,
    reset: i64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::Config("GitHub token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let exhausted = rate_from_headers(resp.headers()).is_some_and(|r| r.remaining == 0);
        if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted)
        {
            return Err(Error::RateLimited);
        }

        let message = match resp.json::<ErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

fn reset_time(epoch_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_secs, 0).unwrap_or_else(Utc::now)
}

/// Reads the `x-ratelimit-*` headers GitHub attaches to every response.
fn rate_from_headers(headers: &HeaderMap) -> Option<RateLimit> {
    Some(RateLimit {
        limit: header_value(headers, "x-ratelimit-limit")?,
        remaining: header_value(headers, "x-ratelimit-remaining")?,
        reset: reset_time(header_value(headers, "x-ratelimit-reset")?),
    })
}

#[async_trait]
impl EventSource for GitHubClient {
    async fn list_events(&self, page: u32, per_page: u32) -> Result<EventPage> {
        let resp = self
            .client
            .get(format!("{}/events", self.api_url))
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;

        let resp = Self::check(resp).await?;
        let rate = rate_from_headers(resp.headers());
        let events: Vec<Event> = resp.json().await?;

        Ok(EventPage { events, rate })
    }

    async fn rate_limits(&self) -> Result<RateLimit> {
        let resp = self
            .client
            .get(format!("{}/rate_limit", self.api_url))
            .send()
            .await?;

        let body: RateLimitResponse = Self::check(resp).await?.json().await?;
        Ok(RateLimit {
            limit: body.rate.limit,
            remaining: body.rate.remaining,
            reset: reset_time(body.rate.reset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rate_headers(template: ResponseTemplate, remaining: u32) -> ResponseTemplate {
        template
            .insert_header("x-ratelimit-limit", "5000")
            .insert_header("x-ratelimit-remaining", remaining.to_string().as_str())
            .insert_header("x-ratelimit-reset", "1700000000")
    }

    #[tokio::test]
    async fn test_list_events_parses_page_and_rate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("per_page", "100"))
            .and(query_param("page", "1"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(rate_headers(
                ResponseTemplate::new(200).set_body_json(json!([
                    {
                        "id": "1",
                        "type": "ReleaseEvent",
                        "repo": {"id": 7, "name": "foo/bar"},
                        "payload": {"action": "published", "release": {"tag_name": "v1.0.0"}}
                    },
                    {"id": "2", "type": "PushEvent", "repo": {"id": 8, "name": "baz/qux"}, "payload": {}}
                ])),
                4321,
            ))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), Some("secret")).unwrap();
        let page = client.list_events(1, 100).await.unwrap();

        assert_eq!(page.events.len(), 2);
        assert_eq!(page.events[0].id, "1");
        assert_eq!(page.events[1].kind, "PushEvent");

        let rate = page.rate.unwrap();
        assert_eq!(rate.limit, 5000);
        assert_eq!(rate.remaining, 4321);
        assert_eq!(rate.reset.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_exhausted_quota_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(rate_headers(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"message": "API rate limit exceeded"})),
                0,
            ))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), None).unwrap();
        let err = client.list_events(1, 100).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_too_many_requests_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), None).unwrap();
        assert!(client.list_events(1, 100).await.unwrap_err().is_rate_limited());
    }

    #[tokio::test]
    async fn test_forbidden_with_quota_left_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(rate_headers(
                ResponseTemplate::new(403).set_body_json(json!({"message": "Bad credentials"})),
                10,
            ))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), None).unwrap();
        match client.list_events(1, 100).await.unwrap_err() {
            Error::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rate_limit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": {"core": {"limit": 5000, "remaining": 4999, "reset": 1700000000}},
                "rate": {"limit": 5000, "remaining": 4999, "reset": 1700000000, "used": 1}
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), None).unwrap();
        let rate = client.rate_limits().await.unwrap();
        assert_eq!(rate.remaining, 4999);
        assert_eq!(rate.reset.timestamp(), 1_700_000_000);
    }
}
