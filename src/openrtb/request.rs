use once_cell::sync::OnceCell;
use simd_json::prelude::*;
use simd_json::OwnedValue;

use crate::errors::ParseError;

/// Inbound OpenRTB bid request, reduced to the fields the bid path
/// consumes. Everything else in the payload is ignored (full schema
/// validation is out of scope).
#[derive(Debug, Clone)]
pub struct BidRequest {
    /// Auction id, echoed back as the response id.
    pub id: String,
    /// Ad impressions up for auction, in request order. May be empty.
    pub imp: Vec<Impression>,
}

/// A single impression. The raw `ext` object is kept as an
/// `OwnedValue` and the `external-ids` entry is extracted lazily on
/// first access, cached in a `OnceCell`.
#[derive(Debug, Clone)]
pub struct Impression {
    pub id: String,
    pub ext: Option<Box<OwnedValue>>,
    external_ids: OnceCell<Vec<i64>>,
}

impl Impression {
    pub fn new(id: String, ext: Option<Box<OwnedValue>>) -> Self {
        Self {
            id,
            ext,
            external_ids: OnceCell::new(),
        }
    }

    /// External ids carried in `ext["external-ids"]`.
    ///
    /// An absent, malformed or empty entry yields an empty slice;
    /// non-integer array elements are skipped. A bad `ext` on one
    /// impression never fails the surrounding request.
    pub fn external_ids(&self) -> &[i64] {
        self.external_ids.get_or_init(|| {
            self.ext
                .as_deref()
                .and_then(|ext| ext.get("external-ids"))
                .and_then(|ids| ids.as_array())
                .map(|ids| ids.iter().filter_map(|v| v.as_i64()).collect())
                .unwrap_or_default()
        })
    }
}

/// Decodes a raw request body into a `BidRequest`.
///
/// Fails with `MalformedJson` when the payload is not valid JSON and
/// with `MissingField` when `id`, `imp` or an impression's `id` is
/// absent. An `imp` array that is present but empty parses fine and
/// produces a zero-bid response downstream.
pub fn parse(raw: &[u8]) -> Result<BidRequest, ParseError> {
    // simd-json parses in place, so the body is copied into a scratch
    // buffer first.
    let mut buf = raw.to_vec();
    let root = simd_json::to_owned_value(&mut buf).map_err(|_| ParseError::MalformedJson)?;

    let id = root
        .get_str("id")
        .ok_or(ParseError::MissingField("id"))?
        .to_string();
    let raw_imps = root
        .get_array("imp")
        .ok_or(ParseError::MissingField("imp"))?;

    let mut imp = Vec::with_capacity(raw_imps.len());
    for raw_imp in raw_imps {
        let imp_id = raw_imp
            .get_str("id")
            .ok_or(ParseError::MissingField("imp.id"))?
            .to_string();
        let ext = raw_imp.get("ext").map(|v| Box::new(v.clone()));
        imp.push(Impression::new(imp_id, ext));
    }

    Ok(BidRequest { id, imp })
}
