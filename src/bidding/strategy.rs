// src/bidding/strategy.rs

use std::sync::Arc;

use crate::config::config_manager::{AgentConfig, StrategyKind};
use crate::model::creative::CreativeCatalog;
use crate::openrtb::response::BidResponse;

/// Prices a draft response under the current pacing throttle.
///
/// Implementations must be infallible given a valid draft: `None` is a
/// deliberate no-bid decision (answered with HTTP 204), never an
/// error. Strategies are selected once at startup and shared read-only
/// across all concurrent requests.
pub trait BidStrategy: Send + Sync {
    fn price(&self, draft: BidResponse, throttle: f64) -> Option<BidResponse>;
}

/// Bids a constant price on every impression, ignoring the throttle.
///
/// Creatives are assigned round-robin over the catalog in catalog
/// order, wrapping modulo the catalog size. The rotation index is the
/// bid's position within the response, so it resets on every request
/// and creative exposure stays even regardless of impression count.
pub struct FixedPriceStrategy {
    price: f64,
    catalog: Arc<CreativeCatalog>,
}

impl FixedPriceStrategy {
    pub fn new(price: f64, catalog: Arc<CreativeCatalog>) -> Self {
        Self { price, catalog }
    }
}

impl BidStrategy for FixedPriceStrategy {
    fn price(&self, mut draft: BidResponse, _throttle: f64) -> Option<BidResponse> {
        for seatbid in &mut draft.seatbid {
            for (crndx, bid) in seatbid.bid.iter_mut().enumerate() {
                bid.price = self.price;
                bid.crid = self.catalog.pick(crndx).id.clone();
            }
        }
        Some(draft)
    }
}

/// Fixed-price bidding scaled by the pacer throttle.
///
/// The throttle is clamped to [0, 1]; an undefined (non-finite) value
/// is treated as 0, maximally conservative. At throttle 0 the strategy
/// drops all impressions and bids nothing rather than emitting
/// zero-price bids: a zero-price bid can still win and serve, which is
/// exactly what an exhausted budget must prevent.
pub struct PacedFixedPriceStrategy {
    base_price: f64,
    catalog: Arc<CreativeCatalog>,
}

impl PacedFixedPriceStrategy {
    pub fn new(base_price: f64, catalog: Arc<CreativeCatalog>) -> Self {
        Self {
            base_price,
            catalog,
        }
    }
}

impl BidStrategy for PacedFixedPriceStrategy {
    fn price(&self, mut draft: BidResponse, throttle: f64) -> Option<BidResponse> {
        let throttle = if throttle.is_finite() {
            throttle.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if throttle == 0.0 {
            return None;
        }

        for seatbid in &mut draft.seatbid {
            for (crndx, bid) in seatbid.bid.iter_mut().enumerate() {
                bid.price = self.base_price * throttle;
                bid.crid = self.catalog.pick(crndx).id.clone();
            }
        }
        Some(draft)
    }
}

/// Builds the strategy the config asks for.
pub fn from_config(config: &AgentConfig, catalog: Arc<CreativeCatalog>) -> Arc<dyn BidStrategy> {
    match config.strategy {
        StrategyKind::FixedPrice => Arc::new(FixedPriceStrategy::new(config.fixed_price, catalog)),
        StrategyKind::Paced => Arc::new(PacedFixedPriceStrategy::new(config.fixed_price, catalog)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::builder::build_draft;
    use crate::model::creative::Creative;
    use crate::openrtb::request::parse;
    use proptest::prelude::*;

    fn catalog(k: usize) -> Arc<CreativeCatalog> {
        let creatives = (0..k)
            .map(|i| Creative {
                id: i.to_string(),
                format: "300x250".to_string(),
                name: format!("creative-{}", i),
            })
            .collect();
        Arc::new(CreativeCatalog::new(creatives).unwrap())
    }

    fn draft(n: usize) -> BidResponse {
        let imps: Vec<String> = (0..n).map(|i| format!(r#"{{"id":"imp-{}"}}"#, i)).collect();
        let body = format!(r#"{{"id":"req","imp":[{}]}}"#, imps.join(","));
        build_draft(&parse(body.as_bytes()).unwrap())
    }

    #[test]
    fn fixed_price_assigns_constant_price() {
        let strategy = FixedPriceStrategy::new(1.5, catalog(2));
        let priced = strategy.price(draft(4), 0.0).unwrap();
        for bid in &priced.seatbid[0].bid {
            assert_eq!(bid.price, 1.5);
        }
    }

    #[test]
    fn fixed_price_never_declines() {
        let strategy = FixedPriceStrategy::new(1.0, catalog(1));
        assert!(strategy.price(draft(0), f64::NAN).is_some());
        assert!(strategy.price(draft(3), 0.0).is_some());
    }

    proptest! {
        /// Creative for bid i is catalog entry i mod K, reset on every
        /// request.
        #[test]
        fn round_robin_is_positional(n in 0usize..24, k in 1usize..6) {
            let strategy = FixedPriceStrategy::new(1.0, catalog(k));
            let priced = strategy.price(draft(n), 1.0).unwrap();
            for (ndx, bid) in priced.seatbid[0].bid.iter().enumerate() {
                prop_assert_eq!(&bid.crid, &(ndx % k).to_string());
            }
            // a second call starts over at the head of the catalog
            let again = strategy.price(draft(n), 1.0).unwrap();
            prop_assert_eq!(priced, again);
        }
    }

    #[test]
    fn paced_scales_price_by_throttle() {
        let strategy = PacedFixedPriceStrategy::new(2.0, catalog(2));
        let priced = strategy.price(draft(2), 0.5).unwrap();
        for bid in &priced.seatbid[0].bid {
            assert_eq!(bid.price, 1.0);
        }
        // round-robin applies here too
        assert_eq!(priced.seatbid[0].bid[0].crid, "0");
        assert_eq!(priced.seatbid[0].bid[1].crid, "1");
    }

    #[test]
    fn paced_clamps_overshooting_throttle() {
        let strategy = PacedFixedPriceStrategy::new(2.0, catalog(1));
        let priced = strategy.price(draft(1), 3.0).unwrap();
        assert_eq!(priced.seatbid[0].bid[0].price, 2.0);
    }

    #[test]
    fn paced_declines_at_zero_throttle() {
        let strategy = PacedFixedPriceStrategy::new(2.0, catalog(1));
        assert!(strategy.price(draft(2), 0.0).is_none());
        assert!(strategy.price(draft(2), -1.0).is_none());
    }

    #[test]
    fn paced_treats_undefined_throttle_as_zero() {
        let strategy = PacedFixedPriceStrategy::new(2.0, catalog(1));
        assert!(strategy.price(draft(2), f64::NAN).is_none());
        assert!(strategy.price(draft(2), f64::INFINITY).is_none());
    }
}
