//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod dashboard;
pub mod ledger;
pub mod order;
pub mod product;
pub mod user;

pub use dashboard::{DashboardError, DashboardRepository};
pub use ledger::{DebtLogFilter, DebtLogItem, LedgerRepoError, LedgerRepository};
pub use order::{
    NewOrder, OrderDetails, OrderFilter, OrderItemDetails, OrderRepoError, OrderRepository,
};
pub use product::{
    CreateProductInput, ProductError, ProductFilter, ProductRepository, UpdateProductInput,
};
pub use user::{CreateUserInput, UpdateUserInput, UserError, UserFilter, UserRepository};

/// Escapes `LIKE` wildcards so user input matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds a case-insensitive substring pattern for `LIKE`.
pub(crate) fn contains_pattern(search: &str) -> String {
    format!("%{}%", escape_like(&search.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("c:\\"), "c:\\\\");
        assert_eq!(escape_like("ana"), "ana");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("USB_C"), "%usb\\_c%");
    }
}
