use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::Router;
use axum::routing::{get, post};
use tokio::signal;

mod handlers;

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/parse", post(handlers::post_parse))
}

pub async fn serve(addr: &str) -> std::io::Result<()> {
    let addr: SocketAddr = addr.parse().unwrap_or_else(|_| {
        log::warn!("Invalid address {}, using 127.0.0.1:8001", addr);
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8001)
    });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on {}", addr);
    axum::serve(listener, router())
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await
}
