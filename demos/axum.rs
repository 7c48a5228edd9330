/* demos/axum.rs */

use axum::{
    Router,
    extract::ConnectInfo,
    http::HeaderMap,
    response::Json,
    routing::get,
};
use realip::{ForwardedKeyMatch, HeaderSnapshot, RealIp, RealIpLayer, Resolver, is_private_address};
use serde_json::json;
use std::net::SocketAddr;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(LevelFilter::DEBUG)
        .init();

    let app = create_app();
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();

    println!("Server starting on http://localhost:3000");
    println!("Test endpoints:");
    println!("  • GET /        - JSON response with the resolved IP");
    println!("  • GET /exact/  - Same, with exact `for` key matching");
    println!("  • GET /debug   - Connection and forwarding header details");
    println!();
    println!("Test with headers:");
    println!("  curl -H 'X-Forwarded-For: 10.0.0.1, 198.51.100.1' http://localhost:3000/");
    println!("  curl -H 'Forwarded: for=\"[2001:db8::1]\"' http://localhost:3000/");
    println!("  curl -H 'X-Real-IP: 203.0.113.42' http://localhost:3000/");
    println!();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

fn create_app() -> Router {
    let default_router = Router::new()
        .route("/", get(ip_handler))
        .layer(RealIpLayer::default());

    let exact_layer =
        RealIpLayer::with_resolver(Resolver::new().forwarded_key_match(ForwardedKeyMatch::Exact));
    let exact_router = Router::new()
        .route("/", get(ip_handler))
        .layer(exact_layer);

    Router::new()
        .merge(default_router)
        .nest("/exact", exact_router)
        .route("/debug", get(debug_handler))
}

/// Handler that returns the resolved IP in JSON format
async fn ip_handler(real_ip: RealIp) -> Json<serde_json::Value> {
    Json(json!({
        "real_ip": real_ip.ip(),
        "is_reserved": is_private_address(real_ip.ip()).ok(),
    }))
}

/// Debug handler showing what the resolver saw
async fn debug_handler(
    real_ip: RealIp,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let snapshot = HeaderSnapshot::from(&headers);

    Json(json!({
        "resolved_ip": real_ip.ip(),
        "connection_info": {
            "remote_addr": addr.to_string(),
            "remote_ip": addr.ip().to_string(),
            "remote_port": addr.port(),
        },
        "forwarding_headers": {
            "x-real-ip": snapshot.x_real_ip,
            "x-forwarded-for": snapshot.x_forwarded_for,
            "forwarded": snapshot.forwarded,
        },
        "ip_source": if snapshot.is_empty() {
            "connection_fallback"
        } else {
            "header_resolution"
        },
    }))
}
