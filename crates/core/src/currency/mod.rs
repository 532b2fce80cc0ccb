//! Settlement currency routing and per-currency totals.
//!
//! - `policy` - which currency a product category settles in
//! - `totals` - a small map of amounts keyed by currency

pub mod policy;
pub mod totals;

pub use policy::{CategoryCurrencyPolicy, CurrencyPolicy};
pub use totals::CurrencyTotals;
