//! Two-tier transaction categorization.
//!
//! 1. When the feed supplies a category list, its first entry is looked up in
//!    the source table.
//! 2. Otherwise the merchant string is matched, case-insensitively, against an
//!    ordered keyword table; the first keyword contained in it wins.
//!
//! Rules are an immutable value. Changing them means building a new
//! [`CategoryRules`] and swapping it into a [`SharedCategoryRules`]; readers
//! keep whatever snapshot they already hold.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Category assigned when nothing matches.
pub const OTHER: &str = "other";

const SOURCE_TABLE: [(&str, &str); 10] = [
    ("Food and Drink", "food"),
    ("Transportation", "transportation"),
    ("Shops", "shopping"),
    ("Entertainment", "entertainment"),
    ("Healthcare", "healthcare"),
    ("Travel", "travel"),
    ("Financial", "financial"),
    ("Recreation", "recreation"),
    ("Service", "services"),
    ("Tax", "taxes"),
];

const KEYWORD_TABLE: [(&str, &str); 7] = [
    ("grocery", "food"),
    ("food", "food"),
    ("gas", "transportation"),
    ("fuel", "transportation"),
    ("shell", "transportation"),
    ("amazon", "shopping"),
    ("store", "shopping"),
];

/// A single `(pattern, category)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    pub category: String,
}

impl CategoryRule {
    pub fn new(pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            category: category.into(),
        }
    }
}

/// Immutable categorization tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRules {
    /// Exact source-category name → our category.
    source: Vec<CategoryRule>,
    /// Ordered, lowercase merchant keywords → our category.
    keywords: Vec<CategoryRule>,
    fallback: String,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::new(
            SOURCE_TABLE.iter().map(|(p, c)| CategoryRule::new(*p, *c)).collect(),
            KEYWORD_TABLE.iter().map(|(p, c)| CategoryRule::new(*p, *c)).collect(),
        )
    }
}

impl CategoryRules {
    /// Build rules from explicit tables. Keyword patterns are lowercased.
    pub fn new(source: Vec<CategoryRule>, keywords: Vec<CategoryRule>) -> Self {
        Self {
            source,
            keywords: keywords
                .into_iter()
                .map(|r| CategoryRule::new(r.pattern.to_lowercase(), r.category))
                .collect(),
            fallback: OTHER.to_string(),
        }
    }

    pub fn source_rules(&self) -> &[CategoryRule] {
        &self.source
    }

    pub fn keyword_rules(&self) -> &[CategoryRule] {
        &self.keywords
    }

    /// Add or replace a keyword rule. A new pattern goes to the end of the
    /// table; an existing one keeps its position.
    pub fn with_keyword(mut self, pattern: &str, category: impl Into<String>) -> Self {
        let pattern = pattern.to_lowercase();
        let category = category.into();
        match self.keywords.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => rule.category = category,
            None => self.keywords.push(CategoryRule::new(pattern, category)),
        }
        self
    }

    pub fn without_keyword(mut self, pattern: &str) -> Self {
        let pattern = pattern.to_lowercase();
        self.keywords.retain(|r| r.pattern != pattern);
        self
    }

    /// Categorize from the feed's category list, falling back to the merchant.
    pub fn categorize<'a>(&'a self, categories: &[String], merchant: &str) -> &'a str {
        match categories.first() {
            Some(primary) => self.by_source(primary),
            None => self.by_merchant(merchant),
        }
    }

    fn by_source(&self, source_category: &str) -> &str {
        self.source
            .iter()
            .find(|r| r.pattern == source_category)
            .map_or(self.fallback.as_str(), |r| r.category.as_str())
    }

    fn by_merchant(&self, merchant: &str) -> &str {
        let merchant = merchant.to_lowercase();
        self.keywords
            .iter()
            .find(|r| merchant.contains(r.pattern.as_str()))
            .map_or(self.fallback.as_str(), |r| r.category.as_str())
    }
}

/// Shared handle to the current rule snapshot.
#[derive(Debug, Default)]
pub struct SharedCategoryRules {
    current: RwLock<Arc<CategoryRules>>,
}

impl SharedCategoryRules {
    pub fn new(rules: CategoryRules) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    /// The rules in effect right now.
    pub fn snapshot(&self) -> Arc<CategoryRules> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, rules: CategoryRules) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(rules);
    }

    /// Derive a new snapshot from the current one and install it.
    pub fn update(&self, f: impl FnOnce(&CategoryRules) -> CategoryRules) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(f(&current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn source_category_wins_over_merchant() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize(&cats(&["Food and Drink"]), "Shell"), "food");
        assert_eq!(rules.categorize(&cats(&["Shops", "Food and Drink"]), "x"), "shopping");
        assert_eq!(rules.categorize(&cats(&["Bank Fees"]), "Amazon"), "other");
    }

    #[test]
    fn merchant_fallback_is_case_insensitive_substring() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize(&[], "Shell"), "transportation");
        assert_eq!(rules.categorize(&[], "AMAZON MKTPLACE"), "shopping");
        assert_eq!(rules.categorize(&[], "Corner Grocery"), "food");
        assert_eq!(rules.categorize(&[], "Random Business"), "other");
        assert_eq!(rules.categorize(&[], ""), "other");
    }

    #[test]
    fn first_matching_keyword_wins() {
        // "food store" contains both "food" and "store"; "food" comes first.
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize(&[], "Whole Food Store"), "food");

        let reordered = CategoryRules::new(
            vec![],
            vec![CategoryRule::new("store", "shopping"), CategoryRule::new("food", "food")],
        );
        assert_eq!(reordered.categorize(&[], "Whole Food Store"), "shopping");
    }

    #[test]
    fn keyword_rules_can_be_added_replaced_and_removed() {
        let rules = CategoryRules::default()
            .with_keyword("NETFLIX", "entertainment")
            .with_keyword("store", "retail");
        assert_eq!(rules.categorize(&[], "Netflix.com"), "entertainment");
        assert_eq!(rules.categorize(&[], "Dollar Store"), "retail");

        let rules = rules.without_keyword("Netflix");
        assert_eq!(rules.categorize(&[], "Netflix.com"), "other");
    }

    #[test]
    fn shared_rules_hand_out_stable_snapshots() {
        let shared = SharedCategoryRules::new(CategoryRules::default());
        let before = shared.snapshot();

        shared.update(|r| r.clone().with_keyword("uber", "transportation"));

        assert_eq!(before.categorize(&[], "Uber Trip"), "other");
        assert_eq!(shared.snapshot().categorize(&[], "Uber Trip"), "transportation");
    }
}
