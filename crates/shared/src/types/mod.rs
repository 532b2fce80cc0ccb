//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{Currency, MAX_AMOUNT, MONEY_SCALE, Money, fits_money_column};
pub use pagination::{PageMeta, PageRequest, PageResponse};
