//! Amounts keyed by currency.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kasa_shared::types::Currency;

/// A decimal amount per currency. Missing currencies read as zero.
///
/// Serializes as `{"EUR": "…", "MKD": "…"}` with every currency present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CurrencyTotals(BTreeMap<Currency, Decimal>);

impl CurrencyTotals {
    /// Creates empty totals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the amount for `currency`.
    #[must_use]
    pub fn get(&self, currency: Currency) -> Decimal {
        self.0.get(&currency).copied().unwrap_or(Decimal::ZERO)
    }

    /// Adds `amount` to `currency`.
    pub fn add(&mut self, currency: Currency, amount: Decimal) {
        *self.0.entry(currency).or_insert(Decimal::ZERO) += amount;
    }

    /// Currencies with a non-zero amount, in currency order.
    pub fn non_zero(&self) -> impl Iterator<Item = (Currency, Decimal)> + '_ {
        self.0
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(currency, amount)| (*currency, *amount))
    }

    /// Returns true if every currency is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.non_zero().next().is_none()
    }

    /// Sum across currencies. Only meaningful as a nominal figure.
    #[must_use]
    pub fn nominal_sum(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// Returns a copy with every amount negated.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self(self.0.iter().map(|(c, a)| (*c, -*a)).collect())
    }
}

impl Serialize for CurrencyTotals {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let full: BTreeMap<Currency, Decimal> =
            Currency::ALL.iter().map(|c| (*c, self.get(*c))).collect();
        full.serialize(serializer)
    }
}

impl FromIterator<(Currency, Decimal)> for CurrencyTotals {
    fn from_iter<T: IntoIterator<Item = (Currency, Decimal)>>(iter: T) -> Self {
        let mut totals = Self::new();
        for (currency, amount) in iter {
            totals.add(currency, amount);
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accumulates_per_currency() {
        let totals: CurrencyTotals = [
            (Currency::Mkd, dec!(10)),
            (Currency::Eur, dec!(100)),
            (Currency::Mkd, dec!(-5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(totals.get(Currency::Mkd), dec!(5));
        assert_eq!(totals.get(Currency::Eur), dec!(100));
        assert_eq!(totals.nominal_sum(), dec!(105));
    }

    #[test]
    fn test_non_zero_skips_cancelled_currency() {
        let totals: CurrencyTotals = [(Currency::Mkd, dec!(5)), (Currency::Mkd, dec!(-5))]
            .into_iter()
            .collect();
        assert!(totals.is_zero());
        assert_eq!(totals.non_zero().count(), 0);
    }

    #[test]
    fn test_serializes_every_currency() {
        let mut totals = CurrencyTotals::new();
        totals.add(Currency::Eur, dec!(60));
        let json = serde_json::to_value(&totals).unwrap();
        assert_eq!(json["EUR"], "60");
        assert_eq!(json["MKD"], "0");
    }
}
