//! Liveness endpoint.
//!
//! A minimal HTTP responder for external health probes. Runs on its own
//! thread, shares nothing with the collection path, and has no effect on
//! cycle semantics.
//!
//! Endpoints:
//! - GET /health - Service health check

use log::{info, warn};
use tiny_http::{Response, Server};

/// Starts the health server on the given port and serves until the process
/// exits. Intended to be called from a background thread.
pub fn start_health_server(port: u16) -> Result<(), String> {
    let server = Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start health server: {}", e))?;

    info!("Health endpoint listening on http://0.0.0.0:{}/health", port);

    for request in server.incoming_requests() {
        let response = if request.url() == "/health" {
            health_response()
        } else {
            create_response(
                404,
                serde_json::json!({
                    "error": "Not found",
                    "available_endpoints": ["/health"]
                }),
            )
        };

        if let Err(e) = request.respond(response) {
            warn!("Failed to send health response: {}", e);
        }
    }

    Ok(())
}

fn health_response() -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    create_response(
        200,
        serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }),
    )
}

/// Create HTTP response with JSON body
fn create_response(
    status_code: u16,
    json: serde_json::Value,
) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string(&json).unwrap_or_default();

    Response::from_data(body.into_bytes())
        .with_status_code(status_code)
        .with_header(
            tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("static header"),
        )
}
