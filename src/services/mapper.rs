use crate::entities::cart_item::StockStatus;
use crate::services::pricing::{classify_stock, compute_item_pricing};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Requested quantities above this are treated as corrupt upstream data and
/// reset to 1 (not capped at the limit). Distinct from the persistence-time
/// cap of 3 applied when lines are written.
const QUANTITY_SANITY_LIMIT: f64 = 10.0;

/// One catalogue record resolved by an upstream service (AI matcher, search).
/// Fields are optional because upstream payloads are not trusted to be
/// complete; records without usable metadata are skipped, never errored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogMatch {
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub original_price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub available_quantity: Option<f64>,
    pub weight: Option<f64>,
    pub weight_unit: Option<String>,
}

/// Upstream sources resolve either a single best match or a list of
/// recommendations for one line. Both cardinalities normalize to a sequence
/// before mapping, so the mapper only ever sees lists.
#[derive(Debug, Clone)]
pub enum MatchSelection {
    Matching(Option<CatalogMatch>),
    Recommended(Vec<CatalogMatch>),
}

impl MatchSelection {
    fn into_records(self) -> Vec<CatalogMatch> {
        match self {
            MatchSelection::Matching(Some(record)) => vec![record],
            MatchSelection::Matching(None) => Vec::new(),
            MatchSelection::Recommended(records) => records,
        }
    }
}

/// Anything that carries a client-requested quantity for one cart line.
pub trait LineSource {
    fn requested_quantity(&self) -> f64;
}

/// Canonical cart-line shape produced by the mapper, ready for persistence.
#[derive(Debug, Clone)]
pub struct MappedItem {
    pub external_id: Option<String>,
    pub name: String,
    pub description: String,
    pub image_urls: Vec<String>,
    pub quantity: i32,
    pub original_price: Decimal,
    pub discounted_price: Decimal,
    pub stock_status: StockStatus,
    pub weight: f64,
    pub weight_unit: String,
    pub recommended: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MappedItems {
    pub items: Vec<MappedItem>,
    pub sub_total: Decimal,
    pub saved_amount: Decimal,
}

/// Maps heterogeneous upstream records into canonical cart lines.
///
/// Recommended lines are informational up-sells: they are tagged but never
/// accumulated into the running subtotal/savings, so `sub_total` and
/// `saved_amount` are zero by construction when `recommended` is true.
pub fn map_items<S, F>(sources: &[S], recommended: bool, selector: F) -> MappedItems
where
    S: LineSource,
    F: Fn(&S) -> MatchSelection,
{
    let mut mapped = MappedItems::default();

    for source in sources {
        let requested = source.requested_quantity();
        let quantity = if requested <= QUANTITY_SANITY_LIMIT {
            requested
        } else {
            1.0
        };

        for record in selector(source).into_records() {
            let (Some(name), Some(original), Some(discounted)) = (
                record.name.clone(),
                record.original_price,
                record.discounted_price,
            ) else {
                continue;
            };

            let pricing = compute_item_pricing(original, discounted, quantity);
            if !recommended {
                mapped.sub_total += pricing.item_total_price;
                mapped.saved_amount += pricing.item_saved_amount;
            }

            mapped.items.push(MappedItem {
                external_id: record.external_id,
                name,
                description: record.description.unwrap_or_default(),
                image_urls: record.image_urls,
                quantity: quantity as i32,
                original_price: Decimal::from_f64(original).unwrap_or(Decimal::ZERO),
                discounted_price: Decimal::from_f64(discounted).unwrap_or(Decimal::ZERO),
                stock_status: classify_stock(record.available_quantity.unwrap_or(0.0)),
                weight: record.weight.unwrap_or(0.0),
                weight_unit: record.weight_unit.unwrap_or_default(),
                recommended,
            });
        }
    }

    mapped
}

/// One line of an AI audio-to-cart (or search) response: the transcribed
/// query, the quantity heard, the best catalogue match, and any up-sell
/// recommendations resolved alongside it.
#[derive(Debug, Clone, Deserialize)]
pub struct AiCartLine {
    pub query: String,
    pub quantity: f64,
    pub matching_item: Option<CatalogMatch>,
    #[serde(default)]
    pub recommended_items: Vec<CatalogMatch>,
}

impl LineSource for AiCartLine {
    fn requested_quantity(&self) -> f64 {
        self.quantity
    }
}

/// Maps an AI response into confirmed lines and up-sell lines.
pub fn map_ai_lines(lines: &[AiCartLine]) -> (MappedItems, MappedItems) {
    let matched = map_items(lines, false, |line| {
        MatchSelection::Matching(line.matching_item.clone())
    });
    let upsells = map_items(lines, true, |line| {
        MatchSelection::Recommended(line.recommended_items.clone())
    });
    (matched, upsells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(external_id: &str, original: f64, discounted: f64) -> CatalogMatch {
        CatalogMatch {
            external_id: Some(external_id.to_string()),
            name: Some(format!("item {external_id}")),
            description: Some("desc".to_string()),
            image_urls: vec!["https://cdn.example/img.png".to_string()],
            original_price: Some(original),
            discounted_price: Some(discounted),
            available_quantity: Some(12.0),
            weight: Some(0.5),
            weight_unit: Some("kg".to_string()),
        }
    }

    fn line(quantity: f64, matching: Option<CatalogMatch>, recs: Vec<CatalogMatch>) -> AiCartLine {
        AiCartLine {
            query: "test".to_string(),
            quantity,
            matching_item: matching,
            recommended_items: recs,
        }
    }

    #[test]
    fn maps_matching_items_and_accumulates_totals() {
        let lines = vec![
            line(2.0, Some(record("a", 50.0, 45.0)), vec![]),
            line(1.0, Some(record("b", 100.0, 90.0)), vec![]),
        ];

        let mapped = map_items(&lines, false, |l| {
            MatchSelection::Matching(l.matching_item.clone())
        });

        assert_eq!(mapped.items.len(), 2);
        assert_eq!(mapped.sub_total, dec!(180));
        assert_eq!(mapped.saved_amount, dec!(20));
        assert!(!mapped.items[0].recommended);
        assert_eq!(mapped.items[0].quantity, 2);
    }

    #[test]
    fn recommended_items_do_not_accumulate() {
        let lines = vec![line(
            1.0,
            None,
            vec![record("r1", 100.0, 90.0), record("r2", 20.0, 18.0)],
        )];

        let mapped = map_items(&lines, true, |l| {
            MatchSelection::Recommended(l.recommended_items.clone())
        });

        assert_eq!(mapped.items.len(), 2);
        assert_eq!(mapped.sub_total, Decimal::ZERO);
        assert_eq!(mapped.saved_amount, Decimal::ZERO);
        assert!(mapped.items.iter().all(|i| i.recommended));
    }

    #[test]
    fn records_missing_metadata_are_skipped() {
        let mut incomplete = record("a", 50.0, 45.0);
        incomplete.name = None;
        let mut unpriced = record("b", 50.0, 45.0);
        unpriced.discounted_price = None;

        let lines = vec![
            line(1.0, Some(incomplete), vec![]),
            line(1.0, Some(unpriced), vec![]),
            line(1.0, Some(record("c", 50.0, 45.0)), vec![]),
            line(1.0, None, vec![]),
        ];

        let mapped = map_items(&lines, false, |l| {
            MatchSelection::Matching(l.matching_item.clone())
        });

        assert_eq!(mapped.items.len(), 1);
        assert_eq!(mapped.items[0].external_id.as_deref(), Some("c"));
    }

    #[test]
    fn quantity_above_sanity_limit_resets_to_one() {
        let lines = vec![
            line(11.0, Some(record("a", 50.0, 45.0)), vec![]),
            line(10.0, Some(record("b", 50.0, 45.0)), vec![]),
        ];

        let mapped = map_items(&lines, false, |l| {
            MatchSelection::Matching(l.matching_item.clone())
        });

        assert_eq!(mapped.items[0].quantity, 1);
        assert_eq!(mapped.items[1].quantity, 10);
        assert_eq!(mapped.sub_total, dec!(45) + dec!(450));
    }

    #[test]
    fn stock_status_classified_from_availability() {
        let mut scarce = record("a", 50.0, 45.0);
        scarce.available_quantity = Some(3.0);
        let mut missing = record("b", 50.0, 45.0);
        missing.available_quantity = None;

        let lines = vec![line(1.0, Some(scarce), vec![]), line(1.0, Some(missing), vec![])];
        let mapped = map_items(&lines, false, |l| {
            MatchSelection::Matching(l.matching_item.clone())
        });

        assert_eq!(mapped.items[0].stock_status, StockStatus::VeryLimitedStock);
        assert_eq!(mapped.items[1].stock_status, StockStatus::OutOfStock);
    }

    #[test]
    fn map_ai_lines_splits_matched_and_upsells() {
        let lines = vec![line(
            2.0,
            Some(record("a", 50.0, 45.0)),
            vec![record("r", 100.0, 90.0)],
        )];

        let (matched, upsells) = map_ai_lines(&lines);
        assert_eq!(matched.items.len(), 1);
        assert_eq!(matched.sub_total, dec!(90));
        assert_eq!(upsells.items.len(), 1);
        assert_eq!(upsells.sub_total, Decimal::ZERO);
    }
}
