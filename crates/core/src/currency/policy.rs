//! Category to settlement currency policy.
//!
//! Smartphones are priced and settled in EUR, everything else in MKD. The rule
//! lives here and nowhere else: net-change, order creation, revenue and
//! invoice computations all ask a [`CurrencyPolicy`].

use std::collections::BTreeSet;
use std::fmt::Debug;

use kasa_shared::types::Currency;

/// Decides the settlement currency of a product category.
pub trait CurrencyPolicy: Debug + Send + Sync {
    /// Returns the currency products of `category` are settled in.
    fn currency_for_category(&self, category: &str) -> Currency;
}

/// Settles a configured set of categories in EUR and the rest in MKD.
///
/// Category names are compared case-insensitively, ignoring surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCurrencyPolicy {
    eur_categories: BTreeSet<String>,
}

impl CategoryCurrencyPolicy {
    /// Creates a policy settling the given categories in EUR.
    pub fn new<I, S>(eur_categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            eur_categories: eur_categories
                .into_iter()
                .map(|c| normalize(c.as_ref()))
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }
}

impl Default for CategoryCurrencyPolicy {
    fn default() -> Self {
        Self::new(["smartphones"])
    }
}

impl CurrencyPolicy for CategoryCurrencyPolicy {
    fn currency_for_category(&self, category: &str) -> Currency {
        if self.eur_categories.contains(&normalize(category)) {
            Currency::Eur
        } else {
            Currency::Mkd
        }
    }
}

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}
