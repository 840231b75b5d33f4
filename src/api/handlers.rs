use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::time::{timeout, Duration};

use crate::bidding::engine::process_bid_request;
use crate::openrtb::request;
use crate::openrtb::response::BidResponse;
use crate::AppState;

const OPENRTB_VERSION: &str = "2.1";

/// **Handles one OpenRTB bid request.**
///
/// Requests that do not declare a JSON content type, fail to decode,
/// end in a no-bid decision, or miss the bidding deadline are all
/// answered the same way: HTTP 204 with a zero-length body. A priced
/// response goes out as HTTP 200 with the OpenRTB version header.
/// Exactly one reply per request, nothing written on the reject path.
pub async fn handle_bid_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !declares_json(&headers) {
        return no_bid();
    }

    // Bidding is latency-critical: a decision that misses the deadline
    // is worth exactly as much as no decision, so answer 204 and move on.
    let deadline = Duration::from_millis(state.config.bid_timeout_ms);
    let priced = match timeout(deadline, decode_and_price(&state, &body)).await {
        Ok(priced) => priced,
        Err(_) => {
            state
                .bid_logger
                .log(
                    "ERROR",
                    &json!({ "agent_log": "bid_deadline_exceeded" }).to_string(),
                )
                .await;
            return no_bid();
        }
    };

    let Some(response) = priced else {
        return no_bid();
    };

    match serde_json::to_vec(&response) {
        Ok(encoded) => {
            state
                .bid_logger
                .log(
                    "INFO",
                    &json!({
                        "request_id": response.id,
                        "agent_log": "bid_success",
                        "bid_count": response.seatbid.iter().map(|sb| sb.bid.len()).sum::<usize>(),
                    })
                    .to_string(),
                )
                .await;

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json"),
                    (HeaderName::from_static("x-openrtb-version"), OPENRTB_VERSION),
                ],
                encoded,
            )
                .into_response()
        }
        Err(_) => no_bid(),
    }
}

/// Decoding and pricing, shared by GET and POST. `None` covers both
/// rejected requests and deliberate no-bids; the caller answers 204.
async fn decode_and_price(state: &AppState, body: &[u8]) -> Option<BidResponse> {
    let bid_request = match request::parse(body) {
        Ok(bid_request) => bid_request,
        Err(e) => {
            state
                .bid_logger
                .log(
                    "ERROR",
                    &json!({
                        "agent_log": "bid_request_rejected",
                        "reason": e.to_string(),
                    })
                    .to_string(),
                )
                .await;
            return None;
        }
    };

    let throttle = state.pacer_state.throttle();
    let priced = process_bid_request(&bid_request, state.strategy.as_ref(), throttle);

    if priced.is_none() {
        state
            .bid_logger
            .log(
                "INFO",
                &json!({
                    "request_id": bid_request.id,
                    "agent_log": "no_bid",
                    "throttle": throttle,
                })
                .to_string(),
            )
            .await;
    }
    priced
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/json")
        })
        .unwrap_or(false)
}

fn no_bid() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
