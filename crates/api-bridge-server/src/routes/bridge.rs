//! The data-plane catch-all route: every client request the bridge mediates
//! passes through here on its way into [`RequestProcessor::process`].
//!
//! A single catch-all resource with a payload cap, handing off to one
//! shared handler that owns the actual request/response translation.

use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use api_bridge_core::models::request::Request;
use api_bridge_core::models::response::Response as BridgeResponse;
use api_bridge_core::services::processor::RequestProcessor;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 1MB payload cap on the catch-all route.
const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

async fn bridge_handler(
    req: HttpRequest,
    body: web::Bytes,
    processor: web::Data<Arc<RequestProcessor>>,
) -> HttpResponse {
    let request = build_request(&req, body);
    let cancel = CancellationToken::new();

    match processor.process(&cancel, &request).await {
        Ok(response) => to_http_response(response),
        Err(error) => error.error_response(),
    }
}

fn build_request(req: &HttpRequest, body: web::Bytes) -> Request {
    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();

    let tail = req.match_info().query("tail");
    let path = format!("/{}", tail.trim_start_matches('/'));

    Request {
        id: Uuid::new_v4().to_string(),
        method: req.method().as_str().to_string(),
        path,
        headers,
        query_params: parse_query_string(req.query_string()),
        body: body.to_vec(),
        client_ip: req.connection_info().realip_remote_addr().map(|s| s.to_string()),
        timestamp: chrono::Utc::now(),
    }
}

/// Parses a raw query string into `(key, value)` pairs in wire order,
/// percent-decoding each component. Unlike `url::form_urlencoded` this
/// keeps duplicate keys and skips normalization the engine doesn't need.
fn parse_query_string(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match u8::from_str_radix(&s[i + 1..i + 3], 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn to_http_response(response: BridgeResponse) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(response.status_code)
        .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    for (name, value) in &response.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        builder.insert_header((name.as_str(), value.as_str()));
    }
    builder.body(response.body)
}

/// Headers that describe the hop between the bridge and its own client, not
/// the upstream response, and so must not be forwarded verbatim.
fn is_hop_by_hop(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection" | "transfer-encoding" | "content-length" | "content-encoding"
    )
}

pub fn configure_bridge(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
        .service(web::resource("/api/v1/bridge/{tail:.*}").to(bridge_handler));
}
