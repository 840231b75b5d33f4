// src/bidding/engine.rs

use crate::bidding::builder::build_draft;
use crate::bidding::strategy::BidStrategy;
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::BidResponse;

/// Runs one bidding decision: shape the draft from the request, then
/// let the strategy price it under the given throttle.
///
/// Pure function of its inputs (no I/O, no shared mutable state): the
/// same request against the same strategy and throttle always yields
/// the same response. `None` is a no-bid decision.
pub fn process_bid_request(
    bid_request: &BidRequest,
    strategy: &dyn BidStrategy,
    throttle: f64,
) -> Option<BidResponse> {
    let draft = build_draft(bid_request);
    strategy.price(draft, throttle)
}
