//! Catalog browsing: category filter, text search, card excerpts.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::types::Product;

pub const TITLE_EXCERPT_CHARS: usize = 50;
pub const DESCRIPTION_EXCERPT_CHARS: usize = 100;

/// Category selector. `All` never filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => product.category == *category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(s.to_string())
        })
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(category) => f.write_str(category),
        }
    }
}

/// Search text plus category, applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: String,
    pub category: CategoryFilter,
}

impl ProductQuery {
    #[must_use]
    pub fn new(search: impl Into<String>, category: CategoryFilter) -> Self {
        Self {
            search: search.into(),
            category,
        }
    }

    /// Case-insensitive substring match on title or description.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !self.category.matches(product) {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || product.title.to_lowercase().contains(&needle)
            || product.description.to_lowercase().contains(&needle)
    }

    /// Matching products, in catalog order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Filter choices: `All` first, then each category once, in first-seen order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<CategoryFilter> {
    let mut seen: Vec<&str> = Vec::new();
    for product in products {
        let category = product.category.as_str();
        if !category.is_empty() && !seen.contains(&category) {
            seen.push(category);
        }
    }
    std::iter::once(CategoryFilter::All)
        .chain(seen.into_iter().map(|c| CategoryFilter::Only(c.to_string())))
        .collect()
}

/// Shorten `text` to `max` characters, appending "..." if anything was cut.
#[must_use]
pub fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}
