use serde::{Deserialize, Serialize};

/// OpenRTB Bid Response
///
/// One seat bid per response; multi-seat bidding is out of scope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidResponse {
    pub id: String,
    pub seatbid: Vec<SeatBid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeatBid {
    pub bid: Vec<Bid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bid {
    /// Positional bid id, "1"-based within the response.
    pub id: String,
    /// Id of the impression this bid answers.
    pub impid: String,
    pub price: f64,
    /// Creative id from the configured catalog.
    pub crid: String,
    pub ext: BidExt,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidExt {
    pub priority: f64,
    /// Echo of the impression's first external id. Omitted, not null,
    /// when the impression carried none.
    #[serde(
        rename = "external-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_is_omitted_when_absent() {
        let bid = Bid {
            id: "1".to_string(),
            impid: "i1".to_string(),
            price: 1.0,
            crid: "0".to_string(),
            ext: BidExt {
                priority: 1.0,
                external_id: None,
            },
        };
        let json = serde_json::to_value(&bid).unwrap();
        assert!(json["ext"].get("external-id").is_none());
    }

    #[test]
    fn external_id_round_trips_under_its_wire_name() {
        let ext = BidExt {
            priority: 1.0,
            external_id: Some(42),
        };
        let json = serde_json::to_value(&ext).unwrap();
        assert_eq!(json["external-id"], 42);
        let back: BidExt = serde_json::from_value(json).unwrap();
        assert_eq!(back, ext);
    }
}
