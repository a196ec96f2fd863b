//! Local HTTP settings API
//!
//! Listens on 127.0.0.1 (port 9877 by default) for the options UI and
//! other local clients:
//! - GET /ping
//! - GET /settings, PATCH /settings (partial update)
//! - POST /settings/reset
//! - GET /settings/export, POST /settings/import
//! - GET /features

mod handlers;

pub use handlers::{route, ApiResponse, ApiState};

use std::io::Read;

use anyhow::{Context, Result};
use tiny_http::{Response, Server};
use tracing::{debug, error, info};

pub const AUTH_HEADER: &str = "X-BetterHub-Token";
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024; // 2 MiB

/// Serve requests until the process exits
pub fn serve(state: ApiState, port: u16, auth_token: Option<String>) -> Result<()> {
    let bind_addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&bind_addr)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Failed to start server on {}", bind_addr))?;
    let auth_enabled = auth_token.as_deref().is_some_and(|t| !t.trim().is_empty());
    info!(
        "[betterhub:http] Server listening on http://{} (auth: {})",
        bind_addr,
        if auth_enabled { "enabled" } else { "disabled" }
    );

    for mut request in server.incoming_requests() {
        let method = request.method().to_string();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or(url.as_str()).to_string();
        debug!(%method, %path, "Request");

        if !is_authorized(&request, auth_token.as_deref()) {
            respond(request, ApiResponse::error(401, "unauthorized"));
            continue;
        }

        let body = match read_request_body(&mut request) {
            Ok(body) => body,
            Err(response) => {
                respond(request, response);
                continue;
            }
        };
        let response = route(&state, &method, &path, &body);
        respond(request, response);
    }
    Ok(())
}

fn is_authorized(request: &tiny_http::Request, expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|t| !t.trim().is_empty()) else {
        return true;
    };

    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(AUTH_HEADER))
        .map(|h| h.value.as_str() == expected)
        .unwrap_or(false)
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}

fn read_request_body(request: &mut tiny_http::Request) -> Result<String, ApiResponse> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[betterhub:http] Failed to read body: {}", e);
        return Err(ApiResponse::error(400, "bad_request"));
    }

    if body.len() > MAX_BODY_BYTES {
        return Err(ApiResponse::error(413, "payload_too_large"));
    }

    Ok(body)
}

fn respond(request: tiny_http::Request, response: ApiResponse) {
    let body = serde_json::to_string(&response.body)
        .unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(response.status)
        .with_header(json_content_type());
    let _ = request.respond(response);
}
