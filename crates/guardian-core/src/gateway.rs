//! Target forwarding: re-issue an admitted request to its target model.
//!
//! Only called after the pipeline approves. The caller's method, headers and
//! body bytes go out unchanged; the response comes back unread so the API
//! layer can relay it as a stream.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, HOST};
use reqwest::{Method, Url};
use tracing::debug;

use crate::config::TargetConfig;
use crate::error::ForwardError;
use crate::models::TargetModel;

/// Proxies approved requests to target models.
#[derive(Debug, Clone)]
pub struct TargetForwarder {
    client: reqwest::Client,
}

impl TargetForwarder {
    pub fn new(config: &TargetConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Send `method`, `headers` and `body` to `target.address`.
    ///
    /// `Host` is taken from the target address. When the target carries a
    /// token it replaces the caller's `Authorization` header. Returns once
    /// the response head has arrived; the body is left unread.
    pub async fn forward(
        &self,
        method: Method,
        headers: &HeaderMap,
        body: impl Into<reqwest::Body>,
        target: &TargetModel,
    ) -> Result<reqwest::Response, ForwardError> {
        let url = Url::parse(&target.address).map_err(|e| ForwardError::InvalidTarget {
            address: target.address.clone(),
            reason: e.to_string(),
        })?;

        let mut outbound = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            if name == HOST {
                continue;
            }
            outbound.append(name.clone(), value.clone());
        }

        if let Some(token) = target.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                ForwardError::InvalidTarget {
                    address: target.address.clone(),
                    reason: format!("unusable token: {}", e),
                }
            })?;
            outbound.insert(AUTHORIZATION, value);
        }

        debug!(target = %target.name, address = %target.address, method = %method, "forwarding to target");

        let response = self
            .client
            .request(method, url)
            .headers(outbound)
            .body(body)
            .send()
            .await?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Protocol, ProtocolKind};
    use uuid::Uuid;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn target(address: String, token: Option<&str>) -> TargetModel {
        TargetModel {
            id: Uuid::new_v4(),
            provider: "local".to_string(),
            name: "echo".to_string(),
            address,
            status: 1,
            token: token.map(str::to_string),
            protocol: Protocol::new(ProtocolKind::Http),
        }
    }

    #[tokio::test]
    async fn test_forward_copies_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/chat"))
            .and(header("x-trace", "abc"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"prompt":"hi"}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert(HOST, HeaderValue::from_static("guardian.internal"));

        let response = TargetForwarder::with_client(reqwest::Client::new())
            .forward(
                Method::PUT,
                &headers,
                r#"{"prompt":"hi"}"#,
                &target(format!("{}/v1/chat", server.uri()), None),
            )
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 201);
        assert_eq!(response.text().await.unwrap(), "created");
    }

    #[tokio::test]
    async fn test_host_header_is_not_copied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(|req: &Request| {
                let host = req
                    .headers
                    .get("host")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                ResponseTemplate::new(200).set_body_string(host)
            })
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("guardian.internal"));

        let response = TargetForwarder::with_client(reqwest::Client::new())
            .forward(Method::POST, &headers, "", &target(server.uri(), None))
            .await
            .unwrap();

        assert_ne!(response.text().await.unwrap(), "guardian.internal");
    }

    #[tokio::test]
    async fn test_target_token_replaces_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer target-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer guardian-user"));

        let response = TargetForwarder::with_client(reqwest::Client::new())
            .forward(Method::POST, &headers, "{}", &target(server.uri(), Some("target-key")))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_invalid_target_address() {
        let err = TargetForwarder::with_client(reqwest::Client::new())
            .forward(Method::POST, &HeaderMap::new(), "", &target("not a url".to_string(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::InvalidTarget { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_target_is_transport_error() {
        let err = TargetForwarder::with_client(reqwest::Client::new())
            .forward(
                Method::POST,
                &HeaderMap::new(),
                "",
                &target("http://127.0.0.1:1/".to_string(), None),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::Transport(_)));
    }
}
