//! User repository for database operations.

use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use kasa_shared::Role;
use kasa_shared::types::{Money, PageRequest, PageResponse, UserId};

use super::contains_pattern;
use super::ledger::LedgerRepository;
use crate::entities::{
    orders,
    sea_orm_active_enums::{OrderStatus, UserRole},
    users,
};

/// Error types for user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// User not found.
    #[error("User not found: {0}")]
    NotFound(UserId),

    /// Email is already registered.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Admin accounts cannot be deleted through the API.
    #[error("Admin users cannot be deleted")]
    CannotDeleteAdmin,

    /// The client still has pending orders.
    #[error("Client has {0} pending order(s); complete or delete them first")]
    HasPendingOrders(u64),

    /// The client's ledger does not net to zero.
    #[error("Client balance is not settled: {0} outstanding")]
    HasOutstandingDebt(Money),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Login email.
    pub email: String,
    /// Argon2id hash.
    pub password_hash: String,
    /// Display name.
    pub full_name: String,
    /// Phone.
    pub phone: Option<String>,
    /// Company.
    pub company: Option<String>,
    /// Role.
    pub role: Role,
}

/// Input for updating a user. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    /// Login email.
    pub email: Option<String>,
    /// New Argon2id hash.
    pub password_hash: Option<String>,
    /// Display name.
    pub full_name: Option<String>,
    /// Phone.
    pub phone: Option<Option<String>>,
    /// Company.
    pub company: Option<Option<String>>,
    /// Whether the user may log in.
    pub is_active: Option<bool>,
}

/// User list filters.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Restrict to one role.
    pub role: Option<Role>,
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id.into_inner()).one(&self.db).await
    }

    /// Lists users by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<PageResponse<users::Model>, DbErr> {
        let page = page.normalized();
        let mut query = users::Entity::find();
        if let Some(role) = filter.role {
            query = query.filter(users::Column::Role.eq(UserRole::from(role)));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(users::Column::FullName)))
                            .like(pattern.clone()),
                    )
                    .add(users::Column::Email.like(pattern)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(users::Column::FullName)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken` if the email is registered, or a database error.
    pub async fn create(&self, input: CreateUserInput) -> Result<users::Model, UserError> {
        let email = normalize_email(&input.email);
        if self.email_exists(&email).await? {
            return Err(UserError::EmailTaken(email));
        }

        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            email: Set(email),
            password_hash: Set(input.password_hash),
            full_name: Set(input.full_name.trim().to_string()),
            phone: Set(input.phone),
            company: Set(input.company),
            role: Set(input.role.into()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(user_id = %user.id, role = %input.role, "User created");
        Ok(user)
    }

    /// Updates a user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `EmailTaken` or a database error.
    pub async fn update(
        &self,
        id: UserId,
        input: UpdateUserInput,
    ) -> Result<users::Model, UserError> {
        let existing = self.find_by_id(id).await?.ok_or(UserError::NotFound(id))?;

        if let Some(email) = input.email.as_deref().map(normalize_email) {
            if email != existing.email && self.email_exists(&email).await? {
                return Err(UserError::EmailTaken(email));
            }
        }

        let mut user: users::ActiveModel = existing.into();
        if let Some(email) = input.email {
            user.email = Set(normalize_email(&email));
        }
        if let Some(hash) = input.password_hash {
            user.password_hash = Set(hash);
        }
        if let Some(name) = input.full_name {
            user.full_name = Set(name.trim().to_string());
        }
        if let Some(phone) = input.phone {
            user.phone = Set(phone);
        }
        if let Some(company) = input.company {
            user.company = Set(company);
        }
        if let Some(active) = input.is_active {
            user.is_active = Set(active);
        }
        user.updated_at = Set(chrono::Utc::now().into());

        Ok(user.update(&self.db).await?)
    }

    /// Deletes a client.
    ///
    /// Only a client with no pending orders and a settled balance in every
    /// currency can be deleted. Their ledger entries go with them; their past
    /// orders stay and lose the client reference.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `CannotDeleteAdmin`, `HasPendingOrders`,
    /// `HasOutstandingDebt` or a database error.
    pub async fn delete(&self, id: UserId) -> Result<(), UserError> {
        let txn = self.db.begin().await?;

        let user = users::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(UserError::NotFound(id))?;
        if user.role == UserRole::Admin {
            return Err(UserError::CannotDeleteAdmin);
        }

        let pending = orders::Entity::find()
            .filter(orders::Column::ClientId.eq(id.into_inner()))
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .count(&txn)
            .await?;
        if pending > 0 {
            return Err(UserError::HasPendingOrders(pending));
        }

        let balance = LedgerRepository::client_balance_with(&txn, id).await?;
        if let Some((currency, debt)) = balance.debt.non_zero().next() {
            return Err(UserError::HasOutstandingDebt(Money::new(debt, currency)));
        }

        users::Entity::delete_by_id(id.into_inner()).exec(&txn).await?;
        txn.commit().await?;

        info!(user_id = %id, "Client deleted");
        Ok(())
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Number of client accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_clients(&self) -> Result<u64, DbErr> {
        users::Entity::find()
            .filter(users::Column::Role.eq(UserRole::Client))
            .count(&self.db)
            .await
    }
}

/// Emails are stored trimmed and lowercase.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
