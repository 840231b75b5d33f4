// src/bidding/builder.rs

use crate::openrtb::request::BidRequest;
use crate::openrtb::response::{Bid, BidExt, BidResponse, SeatBid};

/// Builds the unpriced draft response for a request: one bid per
/// impression, request order, under a single seat bid.
///
/// Bid ids are the 1-based position in string form. The first
/// `external-id` of the source impression is echoed when present.
/// Price and creative are left for the strategy to finalize, so
/// strategies can be swapped without touching response shaping.
pub fn build_draft(request: &BidRequest) -> BidResponse {
    let mut bids = Vec::with_capacity(request.imp.len());
    for (ndx, imp) in request.imp.iter().enumerate() {
        bids.push(Bid {
            id: (ndx + 1).to_string(),
            impid: imp.id.clone(),
            price: 0.0,
            crid: String::new(),
            ext: BidExt {
                priority: 1.0,
                external_id: imp.external_ids().first().copied(),
            },
        });
    }

    BidResponse {
        id: request.id.clone(),
        seatbid: vec![SeatBid { bid: bids }],
    }
}
