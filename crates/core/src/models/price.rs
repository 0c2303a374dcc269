use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single daily close (date → price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }

    /// A usable quote: finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// One entry of the purchase-price cache: the close and the date it is for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedPrice {
    pub date: NaiveDate,
    pub price: f64,
}

impl CachedPrice {
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Persisted purchase prices: `symbol → {date, price}`.
pub type PurchaseCache = BTreeMap<String, CachedPrice>;

/// Which point in time a snapshot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// Closes on each symbol's (fixed, historical) purchase date
    Purchase,
    /// Latest available closes as of the run
    Current,
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotKind::Purchase => write!(f, "purchase"),
            SnapshotKind::Current => write!(f, "current"),
        }
    }
}

/// Outcome of looking up one symbol's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PriceResolution {
    Resolved(f64),
    Unresolved(String),
}

impl PriceResolution {
    pub fn price(&self) -> Option<f64> {
        match self {
            PriceResolution::Resolved(p) => Some(*p),
            PriceResolution::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, PriceResolution::Resolved(_))
    }
}

/// Per-symbol prices for one point in time.
///
/// Every symbol that was asked for has an entry; symbols the provider could
/// not price are kept as `Unresolved` with the reason, so downstream code
/// filters instead of branching on missing keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub kind: SnapshotKind,
    prices: BTreeMap<String, PriceResolution>,
}

impl PriceSnapshot {
    pub fn new(kind: SnapshotKind) -> Self {
        Self {
            kind,
            prices: BTreeMap::new(),
        }
    }

    /// Build a purchase snapshot from the persisted cache, taking only the
    /// entries whose date matches the purchase date wanted for that symbol.
    /// Entries for another date, or with an invalid price, are left out so
    /// the caller fetches them again.
    pub fn from_cache(cache: &PurchaseCache, wanted: &BTreeMap<String, NaiveDate>) -> Self {
        let mut snapshot = Self::new(SnapshotKind::Purchase);
        for (symbol, date) in wanted {
            if let Some(entry) = cache.get(symbol).filter(|e| e.date == *date && e.is_valid()) {
                snapshot.insert_price(symbol, entry.price);
            }
        }
        snapshot
    }

    /// Record a price. Non-finite or non-positive prices are stored as unresolved.
    pub fn insert_price(&mut self, symbol: &str, price: f64) {
        let resolution = if price.is_finite() && price > 0.0 {
            PriceResolution::Resolved(price)
        } else {
            PriceResolution::Unresolved(format!("invalid price {price}"))
        };
        self.prices.insert(symbol.to_uppercase(), resolution);
    }

    pub fn insert_unresolved(&mut self, symbol: &str, reason: impl Into<String>) {
        self.prices
            .insert(symbol.to_uppercase(), PriceResolution::Unresolved(reason.into()));
    }

    pub fn resolution(&self, symbol: &str) -> Option<&PriceResolution> {
        self.prices.get(&symbol.to_uppercase())
    }

    /// Resolved price for a symbol, `None` when unresolved or never requested.
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.resolution(symbol).and_then(PriceResolution::price)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.prices.contains_key(&symbol.to_uppercase())
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&str, f64)> {
        self.prices
            .iter()
            .filter_map(|(s, r)| r.price().map(|p| (s.as_str(), p)))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prices.iter().filter_map(|(s, r)| match r {
            PriceResolution::Unresolved(reason) => Some((s.as_str(), reason.as_str())),
            PriceResolution::Resolved(_) => None,
        })
    }

    pub fn resolved_count(&self) -> usize {
        self.prices.values().filter(|r| r.is_resolved()).count()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Merge another snapshot in. A resolved price is never replaced by an
    /// unresolved one.
    pub fn merge(&mut self, other: PriceSnapshot) {
        for (symbol, resolution) in other.prices {
            let keep_existing = !resolution.is_resolved()
                && self.prices.get(&symbol).is_some_and(PriceResolution::is_resolved);
            if !keep_existing {
                self.prices.insert(symbol, resolution);
            }
        }
    }

    /// Resolved prices stamped with the purchase date they were fetched for.
    /// Symbols without a known date are not cached.
    pub fn to_cache(&self, dates: &BTreeMap<String, NaiveDate>) -> PurchaseCache {
        self.resolved()
            .filter_map(|(s, price)| {
                dates
                    .get(s)
                    .map(|date| (s.to_string(), CachedPrice { date: *date, price }))
            })
            .collect()
    }
}
