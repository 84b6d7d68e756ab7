//! HTTP transport used by [`crate::OpenDataClient`].
//!
//! The client only needs "GET this URL with these query parameters and
//! give me the body", so that is all [`SodaTransport`] asks for. Tests
//! swap in a canned implementation; production uses [`ReqwestTransport`].

use std::time::Duration;

use async_trait::async_trait;

use crate::SocrataError;

/// Header Socrata reads the application token from.
pub const APP_TOKEN_HEADER: &str = "X-App-Token";

/// Performs a single GET request against a SODA endpoint.
#[async_trait]
pub trait SodaTransport: Send + Sync {
    /// Sends a GET to `url` with `params` as the query string and returns
    /// the full response body.
    ///
    /// `app_token`, when present, is sent as [`APP_TOKEN_HEADER`].
    ///
    /// # Errors
    ///
    /// Returns a transport-kind [`SocrataError`] if the request fails,
    /// times out, or the server answers with a non-success status.
    async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
        app_token: Option<&str>,
    ) -> Result<String, SocrataError>;
}

/// [`SodaTransport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SocrataError::Http`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(timeout: Duration) -> Result<Self, SocrataError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SodaTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
        app_token: Option<&str>,
    ) -> Result<String, SocrataError> {
        let mut request = self.client.get(url).query(params);
        if let Some(token) = app_token {
            request = request.header(APP_TOKEN_HEADER, token);
        }

        let response = request.send().await.map_err(|e| classify(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SocrataError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        response.text().await.map_err(|e| classify(url, e))
    }
}

fn classify(url: &str, e: reqwest::Error) -> SocrataError {
    if e.is_timeout() {
        SocrataError::Timeout {
            url: url.to_string(),
        }
    } else {
        SocrataError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::{ClientConfig, ErrorKind, OpenDataClient, Phase};

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Answers one connection per canned response, in order, waiting
    /// `delay` before each reply. Yields the raw request heads.
    async fn serve(
        responses: Vec<String>,
        delay: Duration,
    ) -> (SocketAddr, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }
                requests.push(String::from_utf8_lossy(&head).into_owned());

                tokio::time::sleep(delay).await;
                socket.write_all(response.as_bytes()).await.ok();
                socket.shutdown().await.ok();
            }
            requests
        });

        (addr, handle)
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap_or_default()
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let (addr, server) = serve(
            vec![http_response("200 OK", r#"[{"count":"5"}]"#)],
            Duration::ZERO,
        )
        .await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let body = transport
            .get(&format!("http://{addr}/resource/x.json"), &[], None)
            .await
            .unwrap();

        assert_eq!(body, r#"[{"count":"5"}]"#);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_status_error() {
        let (addr, server) = serve(
            vec![http_response("500 Internal Server Error", "oops")],
            Duration::ZERO,
        )
        .await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let err = transport
            .get(&format!("http://{addr}/resource/x.json"), &[], None)
            .await
            .unwrap_err();

        assert!(matches!(err, SocrataError::Status { status: 500, .. }));
        assert_eq!(err.kind(), ErrorKind::Transport);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn slow_reply_is_timeout_error() {
        let (addr, server) = serve(
            vec![http_response("200 OK", "[]")],
            Duration::from_millis(1500),
        )
        .await;
        let transport = ReqwestTransport::new(Duration::from_millis(300)).unwrap();

        let err = transport
            .get(&format!("http://{addr}/resource/x.json"), &[], None)
            .await
            .unwrap_err();

        assert!(matches!(err, SocrataError::Timeout { .. }));
        assert_eq!(err.kind(), ErrorKind::Transport);
        server.abort();
    }

    #[tokio::test]
    async fn attaches_app_token_header_only_when_given() {
        let (addr, server) = serve(
            vec![
                http_response("200 OK", "[]"),
                http_response("200 OK", "[]"),
            ],
            Duration::ZERO,
        )
        .await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let url = format!("http://{addr}/resource/x.json");

        transport.get(&url, &[], Some("abc123")).await.unwrap();
        transport.get(&url, &[], None).await.unwrap();

        let requests = server.await.unwrap();
        let with_token = requests[0].to_ascii_lowercase();
        let without_token = requests[1].to_ascii_lowercase();
        assert!(with_token.contains("x-app-token: abc123"));
        assert!(!without_token.contains("x-app-token"));
    }

    #[tokio::test]
    async fn client_url_encodes_query_parameters() {
        let (addr, server) = serve(
            vec![
                http_response("200 OK", r#"[{"count":"1"}]"#),
                http_response(
                    "200 OK",
                    r#"[{"permitnum":"6700001-CN","originaladdress1":"1 A St"}]"#,
                ),
            ],
            Duration::ZERO,
        )
        .await;
        let config = ClientConfig::new(format!("http://{addr}/resource/x"));
        let client = OpenDataClient::new(config).unwrap();

        let result = client.fetch_permits("x = 1", 2).await.unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.permits.len(), 1);

        let requests = server.await.unwrap();
        assert_eq!(
            request_line(&requests[0]),
            "GET /resource/x.json?%24select=count%28*%29+AS+count&%24where=x+%3D+1 HTTP/1.1"
        );
        assert_eq!(
            request_line(&requests[1]),
            "GET /resource/x.json?%24where=x+%3D+1&%24limit=2 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn client_rejects_server_overshooting_limit() {
        let rows = r#"[
            {"originaladdress1":"1 A St"},
            {"originaladdress1":"2 B St"},
            {"originaladdress1":"3 C St"}
        ]"#;
        let (addr, server) = serve(
            vec![
                http_response("200 OK", r#"[{"count":"5"}]"#),
                http_response("200 OK", rows),
            ],
            Duration::ZERO,
        )
        .await;
        let config = ClientConfig::new(format!("http://{addr}/resource/x"));
        let client = OpenDataClient::new(config).unwrap();

        let err = client.fetch_permits("x = 1", 2).await.unwrap_err();

        assert!(matches!(
            err,
            SocrataError::UnexpectedShape {
                phase: Phase::Fetch,
                ..
            }
        ));
        server.await.unwrap();
    }
}
