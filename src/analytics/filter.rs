use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Sale;

/// Inclusive creation-time window. Either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn is_unset(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesFilter {
    pub search: String,
    pub date_range: DateRange,
    /// Empty means "no payment filter", not "exclude everything".
    pub payment_methods: BTreeSet<String>,
}

impl SalesFilter {
    /// `needle` is the lowercased search text.
    fn passes(&self, sale: &Sale, needle: &str) -> bool {
        matches_text(sale, needle)
            && self.date_range.contains(sale.created_at)
            && matches_method(sale, &self.payment_methods)
    }
}

/// Apply search text, date range and payment-method predicates, preserving
/// input order.
pub fn filter_sales(sales: &[Sale], filter: &SalesFilter) -> Vec<Sale> {
    let needle = filter.search.to_lowercase();
    sales
        .iter()
        .filter(|sale| filter.passes(sale, &needle))
        .cloned()
        .collect()
}

fn matches_text(sale: &Sale, needle: &str) -> bool {
    needle.is_empty()
        || sale.customer_name.to_lowercase().contains(needle)
        || sale.product_name.to_lowercase().contains(needle)
        || sale.customer_email.to_lowercase().contains(needle)
}

fn matches_method(sale: &Sale, selected: &BTreeSet<String>) -> bool {
    selected.is_empty() || selected.contains(&sale.payment_method)
}

/// Distinct payment methods in first-seen order.
pub fn payment_methods(sales: &[Sale]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    sales
        .iter()
        .filter(|s| seen.insert(s.payment_method.as_str()))
        .map(|s| s.payment_method.clone())
        .collect()
}

/// Payment-method checkbox state. Selects every observed method the first
/// time a non-empty batch arrives; after that only `toggle` changes it.
#[derive(Debug, Clone, Default)]
pub struct MethodSelection {
    selected: BTreeSet<String>,
    initialized: bool,
}

impl MethodSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit choice; later batches do not override it.
    pub fn with_selected<I: IntoIterator<Item = String>>(methods: I) -> Self {
        Self {
            selected: methods.into_iter().collect(),
            initialized: true,
        }
    }

    pub fn sync(&mut self, observed: &[String]) {
        if !self.initialized && !observed.is_empty() {
            self.selected = observed.iter().cloned().collect();
            self.initialized = true;
        }
    }

    pub fn toggle(&mut self, method: &str) {
        if !self.selected.remove(method) {
            self.selected.insert(method.to_string());
        }
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }
}
