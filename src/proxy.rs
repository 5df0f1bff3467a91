use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    response::Response,
};

use crate::error::GatewayError;
use crate::AppState;

/// HTTP client for the single configured upstream. The gateway is a
/// transparent reverse proxy: method, path, headers and body pass through
/// unchanged, and upstream status codes are never rewritten.
pub struct ProxyClient {
    client: reqwest::Client,
    upstream_url: String,
}

impl ProxyClient {
    pub fn new(upstream_url: String, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("failed to build upstream HTTP client");

        Self {
            client,
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn forward(&self, req: Request) -> Result<Response, GatewayError> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target_url = format!("{}{}", self.upstream_url, path_and_query);

        let method = req.method().clone();
        let headers = req.headers().clone();

        let (_parts, body) = req.into_parts();
        let body_bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| GatewayError::internal(format!("failed to read request body: {}", e)))?;

        let mut upstream_req = self.client.request(method, &target_url);
        for (name, value) in headers.iter() {
            if name != header::HOST {
                upstream_req = upstream_req.header(name, value);
            }
        }
        if !body_bytes.is_empty() {
            upstream_req = upstream_req.body(body_bytes);
        }

        let upstream_res = upstream_req.send().await?;

        let status = upstream_res.status();
        let res_headers = upstream_res.headers().clone();
        let res_body = upstream_res.bytes().await?;

        let mut builder = Response::builder().status(status);
        for (name, value) in res_headers.iter() {
            // The body is re-framed by this server; hop-by-hop framing
            // headers from upstream must not leak through.
            if name == header::TRANSFER_ENCODING || name == header::CONNECTION {
                continue;
            }
            builder = builder.header(name, value);
        }

        builder
            .body(Body::from(res_body))
            .map_err(|e| GatewayError::internal(format!("failed to build response: {}", e)))
    }
}

/// Terminal handler of the secured chain: reached only when every check has
/// passed.
pub async fn forward(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Response, GatewayError> {
    state.proxy.forward(req).await
}
