//! `SeaORM` entities.

pub mod prelude;

pub mod ledger_entries;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod sea_orm_active_enums;
pub mod users;
