// 🔤 Standardizer - Canonical forms for names and neighborhoods
//
// Last names: text before the first comma, lower-cased.
// Given names: the canonical spelling most often used for this raw spelling
// in the alias table (ties broken by canonical name, ascending).
// Neighborhoods: identity.

use crate::record::{ComponentRecord, Field};
use crate::store::{RecordStore, StoreResult};
use tracing::info;

/// A raw given name with no alias-table entry. Informational, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecognizedName {
    pub field: &'static str,
    pub raw: String,
}

/// Standardized form of a raw last name
pub fn standardize_last_name(raw: &str) -> String {
    raw.split(',').next().unwrap_or(raw).to_lowercase()
}

pub struct Standardizer;

impl Standardizer {
    pub fn new() -> Self {
        Standardizer
    }

    pub fn standardize_last_name(&self, field: &mut Field<String>) {
        field.standardized = field.raw.as_deref().map(standardize_last_name);
    }

    /// Look up the alias table. Returns the raw spelling when it is unknown.
    pub fn standardize_given_name<S: RecordStore>(
        &self,
        store: &S,
        field: &mut Field<String>,
    ) -> StoreResult<Option<String>> {
        let Some(raw) = field.raw.as_deref() else {
            field.standardized = None;
            return Ok(None);
        };

        match store.lookup_standard_names(raw)?.into_iter().next() {
            Some(name) => {
                field.standardized = Some(name.canonical.to_lowercase());
                Ok(None)
            }
            None => {
                field.standardized = None;
                Ok(Some(raw.to_string()))
            }
        }
    }

    pub fn standardize_neighborhood(&self, field: &mut Field<i32>) {
        field.standardized = field.raw;
    }

    /// Standardize every field of the record in place.
    /// Returns the given names the alias table does not know.
    pub fn standardize_all<S: RecordStore>(
        &self,
        store: &S,
        record: &mut ComponentRecord,
    ) -> StoreResult<Vec<UnrecognizedName>> {
        self.standardize_last_name(&mut record.last_name);

        let mut unrecognized = Vec::new();
        for (label, field) in [
            ("first name", &mut record.first_name),
            ("middle name", &mut record.middle_name),
            ("second middle name", &mut record.second_middle_name),
        ] {
            if let Some(raw) = self.standardize_given_name(store, field)? {
                info!(line_num = record.line_num, field = label, "No standardized name for '{}'", raw);
                unrecognized.push(UnrecognizedName { field: label, raw });
            }
        }

        self.standardize_neighborhood(&mut record.neighborhood);

        Ok(unrecognized)
    }
}

impl Default for Standardizer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(first: Option<&str>, last: Option<&str>) -> ComponentRecord {
        let mut record = ComponentRecord::new(1, 1458);
        record.first_name = Field::text(first.map(String::from));
        record.last_name = Field::text(last.map(String::from));
        record
    }

    #[test]
    fn test_last_name_prefix_before_comma() {
        assert_eq!(standardize_last_name("Medici, de'"), "medici");
        assert_eq!(standardize_last_name("Strozzi"), "strozzi");
        assert_eq!(standardize_last_name("Del Bene,di,x"), "del bene");
        assert_eq!(standardize_last_name(",Rucellai"), "");
    }

    #[test]
    fn test_absent_last_name_stays_absent() {
        let standardizer = Standardizer::new();
        let mut field = Field::text(None);
        standardizer.standardize_last_name(&mut field);
        assert_eq!(field.standardized, None);
    }

    #[test]
    fn test_given_name_uses_most_frequent_form() {
        let mut store = MemoryStore::new(1458);
        store.add_alias("Johanni", "Giovanni", 120);
        store.add_alias("Johanni", "Gianni", 4);

        let mut rec = record(Some("Johanni"), Some("Medici"));
        let unknown = Standardizer::new().standardize_all(&store, &mut rec).unwrap();

        assert!(unknown.is_empty());
        assert_eq!(rec.first_name.standardized_str(), Some("giovanni"));
        assert_eq!(rec.last_name.standardized_str(), Some("medici"));
    }

    #[test]
    fn test_unknown_given_name_is_reported_not_fatal() {
        let store = MemoryStore::new(1458);
        let mut rec = record(Some("Xyzzy"), None);
        rec.middle_name = Field::text(Some("Quux".to_string()));

        let unknown = Standardizer::new().standardize_all(&store, &mut rec).unwrap();

        assert_eq!(unknown.len(), 2);
        assert_eq!(unknown[0].field, "first name");
        assert_eq!(unknown[0].raw, "Xyzzy");
        assert_eq!(rec.first_name.standardized, None);
        assert_eq!(rec.middle_name.standardized, None);
    }

    #[test]
    fn test_alias_lookup_is_exact_spelling() {
        let mut store = MemoryStore::new(1458);
        store.add_alias("Piero", "piero", 10);

        let mut rec = record(Some("PIERO"), None);
        let unknown = Standardizer::new().standardize_all(&store, &mut rec).unwrap();

        assert_eq!(unknown.len(), 1);
        assert_eq!(rec.first_name.standardized, None);
    }

    #[test]
    fn test_neighborhood_identity() {
        let mut rec = ComponentRecord::new(1, 1458);
        rec.neighborhood = Field::new(Some(12));
        Standardizer::new()
            .standardize_all(&MemoryStore::new(1458), &mut rec)
            .unwrap();
        assert_eq!(rec.neighborhood.standardized, Some(12));
    }
}
