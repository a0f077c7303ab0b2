use crate::models::CanonicalCategory;
use std::collections::HashMap;

/// Immutable lookup table translating raw merchant/place category labels
/// onto the canonical category set.
///
/// Owned by the engine rather than kept as module-level state so it can be
/// unit-tested in isolation and swapped for locale-specific tables later.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: HashMap<&'static str, CanonicalCategory>,
}

impl CategoryTable {
    /// Builds the default table covering the labels emitted by the place
    /// lookup (OSM amenity/shop tags) and common free-text entries.
    pub fn new() -> Self {
        use CanonicalCategory::*;

        let mut entries = HashMap::new();
        let labeled: [(&'static str, CanonicalCategory); 26] = [
            ("restaurant", Dining),
            ("cafe", Dining),
            ("bar", Dining),
            ("pub", Dining),
            ("fast_food", Dining),
            ("food", Dining),
            ("bakery", Dining),
            ("supermarket", Groceries),
            ("grocery", Groceries),
            ("grocery_store", Groceries),
            ("convenience", Groceries),
            ("fuel", Gas),
            ("gas_station", Gas),
            ("cinema", Entertainment),
            ("theatre", Entertainment),
            ("movie_theater", Entertainment),
            ("bowling_alley", Entertainment),
            ("hotel", Travel),
            ("airport", Travel),
            ("lodging", Travel),
            ("aerodrome", Travel),
            ("shop", Shopping),
            ("mall", Shopping),
            ("store", Shopping),
            ("retail", Shopping),
            ("department_store", Shopping),
        ];
        for (label, category) in labeled {
            entries.insert(label, category);
        }

        // Canonical names map to themselves so already-normalized input
        // passes through.
        for category in CanonicalCategory::ALL {
            entries.insert(category.as_str(), category);
        }

        Self { entries }
    }

    /// Maps a raw category label onto a canonical category.
    ///
    /// Input is lower-cased and trimmed before lookup. Unknown or empty
    /// labels degrade to `Other`; this function is total and never fails.
    pub fn normalize(&self, raw: &str) -> CanonicalCategory {
        let key = raw.trim().to_lowercase();
        self.entries
            .get(key.as_str())
            .copied()
            .unwrap_or(CanonicalCategory::Other)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new()
    }
}
