//! Authentication and password hashing.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Password verification
//! - Password strength rules for new accounts
//! - Ownership checks between an actor and a client's data

mod password;

pub use password::{
    MIN_PASSWORD_LENGTH, PasswordError, hash_password, validate_password_strength, verify_password,
};

use kasa_shared::Role;
use kasa_shared::types::UserId;

/// Returns true if `actor` may read data owned by `client`.
///
/// Admins see everything; clients only their own orders, balance and ledger.
#[must_use]
pub fn can_view_client(actor: UserId, role: Role, client: UserId) -> bool {
    role.is_admin() || actor == client
}
