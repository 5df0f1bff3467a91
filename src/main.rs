use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::extract::Request;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tower::{Service, ServiceExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trustgate::{app, config::Config, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let idle_timeout = Duration::from_secs(config.idle_timeout_secs);

    let state = AppState::from_config(config).await?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(upstream = %state.config.upstream_url, "trustgate listening on {}", addr);

    let mut make_service = app(state).into_make_service_with_connect_info::<SocketAddr>();

    loop {
        let (socket, remote_addr) = listener.accept().await?;
        let tower_service = make_service.call(remote_addr).await?;

        tokio::spawn(async move {
            let socket = TokioIo::new(socket);
            let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                tower_service.clone().oneshot(request)
            });

            // Idle keep-alive connections are closed once no new request
            // headers arrive within the timeout.
            let mut builder = auto::Builder::new(TokioExecutor::new());
            builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(idle_timeout);

            if let Err(err) = builder.serve_connection(socket, hyper_service).await {
                tracing::debug!(error = %err, client = %remote_addr, "connection closed with error");
            }
        });
    }
}
