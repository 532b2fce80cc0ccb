//! `SeaORM` entity prelude.

pub use super::ledger_entries::Entity as LedgerEntries;
pub use super::order_items::Entity as OrderItems;
pub use super::orders::Entity as Orders;
pub use super::products::Entity as Products;
pub use super::users::Entity as Users;
