//! Debt ledger repository.
//!
//! Appends entries, derives balances with `SUM` queries and serves the
//! paginated debt log. Entries are never updated; the only delete is the
//! retention purge.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::info;

use kasa_core::currency::CurrencyTotals;
use kasa_core::ledger::{
    BalanceDeriver, ClientBalance, DebtSnapshot, LedgerEntry, LedgerError, LedgerService,
    ManualAdjustmentInput, NewLedgerEntry,
};
use kasa_shared::types::{Currency, PageRequest, PageResponse, UserId};

use super::contains_pattern;
use crate::entities::{
    ledger_entries,
    sea_orm_active_enums::{CurrencyCode, UserRole},
    users,
};
use crate::mapping;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerRepoError {
    /// Domain validation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Debt log filters. All are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct DebtLogFilter {
    /// Case-insensitive substring of the client's full name.
    pub client_name: Option<String>,
    /// Single UTC calendar day of creation.
    pub date: Option<NaiveDate>,
    /// Restrict to one client.
    pub client_id: Option<UserId>,
}

/// A debt log row with its before/after snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DebtLogItem {
    /// The entry.
    #[serde(flatten)]
    pub entry: LedgerEntry,
    /// Client's full name.
    pub client_name: String,
    /// Client's debt in the entry currency before the entry.
    pub debt_before: Decimal,
    /// Client's debt in the entry currency after the entry.
    pub debt_after: Decimal,
}

/// Repository for the client debt ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends one entry on `conn`, which may be an open transaction.
    ///
    /// The database assigns `created_at` with `clock_timestamp()`, so entries
    /// written in one transaction still get distinct, ordered timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn append_with<C: ConnectionTrait>(
        conn: &C,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, DbErr> {
        let model = ledger_entries::ActiveModel {
            id: Set(kasa_shared::types::LedgerEntryId::new().into_inner()),
            client_id: Set(entry.client_id.into_inner()),
            currency: Set(entry.currency.into()),
            amount: Set(entry.amount),
            kind: Set(entry.kind.into()),
            notes: Set(entry.notes),
            order_id: Set(entry.order_id.map(kasa_shared::types::OrderId::into_inner)),
            created_by: Set(entry.created_by.map(UserId::into_inner)),
            created_at: NotSet,
        }
        .insert(conn)
        .await?;

        Ok(mapping::ledger_entry(model))
    }

    /// Validates and appends a manual adjustment for a client.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` for invalid input, unknown users or non-client
    /// targets, and `Database` on query failure.
    pub async fn manual_adjustment(
        &self,
        input: ManualAdjustmentInput,
    ) -> Result<DebtLogItem, LedgerRepoError> {
        let client = users::Entity::find_by_id(input.client_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(LedgerError::ClientNotFound(input.client_id))?;
        if client.role != UserRole::Client {
            return Err(LedgerError::NotAClient(input.client_id).into());
        }

        let new_entry = LedgerService::manual_adjustment(input)?;
        let entry = Self::append_with(&self.db, new_entry).await?;
        let snapshot = self.snapshot(&entry).await?;

        info!(
            client_id = %entry.client_id,
            entry_id = %entry.id,
            currency = %entry.currency,
            amount = %entry.amount,
            "Manual debt adjustment recorded"
        );

        Ok(DebtLogItem {
            entry,
            client_name: client.full_name,
            debt_before: snapshot.before,
            debt_after: snapshot.after,
        })
    }

    /// Current debt of a client in every currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn client_balance(&self, client_id: UserId) -> Result<ClientBalance, DbErr> {
        Self::client_balance_with(&self.db, client_id).await
    }

    /// Like [`Self::client_balance`], on an arbitrary connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn client_balance_with<C: ConnectionTrait>(
        conn: &C,
        client_id: UserId,
    ) -> Result<ClientBalance, DbErr> {
        let sums = Self::sums_by_currency(
            conn,
            ledger_entries::Entity::find()
                .filter(ledger_entries::Column::ClientId.eq(client_id.into_inner())),
        )
        .await?;

        Ok(ClientBalance {
            client_id,
            debt: sums
                .non_zero()
                .map(|(c, sum)| (c, BalanceDeriver::debt_from_sum(sum)))
                .collect(),
        })
    }

    /// Outstanding debt across all clients, per currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn total_debt(&self) -> Result<CurrencyTotals, DbErr> {
        let sums = Self::sums_by_currency(&self.db, ledger_entries::Entity::find()).await?;
        Ok(sums.negated())
    }

    async fn sums_by_currency<C: ConnectionTrait>(
        conn: &C,
        query: sea_orm::Select<ledger_entries::Entity>,
    ) -> Result<CurrencyTotals, DbErr> {
        let rows: Vec<(CurrencyCode, Option<Decimal>)> = query
            .select_only()
            .column(ledger_entries::Column::Currency)
            .column_as(ledger_entries::Column::Amount.sum(), "total")
            .group_by(ledger_entries::Column::Currency)
            .into_tuple()
            .all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(code, total)| (Currency::from(code), total.unwrap_or(Decimal::ZERO)))
            .collect())
    }

    /// Debt before and after `entry`, from entries strictly older than it.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn snapshot(&self, entry: &LedgerEntry) -> Result<DebtSnapshot, DbErr> {
        let prior: Option<Decimal> = ledger_entries::Entity::find()
            .select_only()
            .column_as(ledger_entries::Column::Amount.sum(), "total")
            .filter(ledger_entries::Column::ClientId.eq(entry.client_id.into_inner()))
            .filter(ledger_entries::Column::Currency.eq(CurrencyCode::from(entry.currency)))
            .filter(ledger_entries::Column::CreatedAt.lt(entry.created_at))
            .into_tuple::<Option<Decimal>>()
            .one(&self.db)
            .await?
            .flatten();

        Ok(DebtSnapshot::from_prior_sum(
            prior.unwrap_or(Decimal::ZERO),
            entry.amount,
        ))
    }

    /// Lists entries newest first, each with its debt snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn debt_log(
        &self,
        filter: &DebtLogFilter,
        page: PageRequest,
    ) -> Result<PageResponse<DebtLogItem>, DbErr> {
        let page = page.normalized();
        let mut query = ledger_entries::Entity::find().find_also_related(users::Entity);

        if let Some(client_id) = filter.client_id {
            query = query.filter(ledger_entries::Column::ClientId.eq(client_id.into_inner()));
        }
        if let Some(name) = filter.client_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let pattern = contains_pattern(name);
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((users::Entity, users::Column::FullName))))
                    .like(pattern),
            );
        }
        if let Some(date) = filter.date {
            let (start, end) = day_bounds(date);
            query = query
                .filter(ledger_entries::Column::CreatedAt.gte(start))
                .filter(ledger_entries::Column::CreatedAt.lt(end));
        }

        let total = query.clone().count(&self.db).await?;

        let rows = query
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .order_by_desc(ledger_entries::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (model, client) in rows {
            let entry = mapping::ledger_entry(model);
            let snapshot = self.snapshot(&entry).await?;
            items.push(DebtLogItem {
                entry,
                client_name: client.map(|c| c.full_name).unwrap_or_default(),
                debt_before: snapshot.before,
                debt_after: snapshot.after,
            });
        }

        Ok(PageResponse::new(items, page.page, page.per_page, total))
    }

    /// Deletes entries created before `cutoff`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = ledger_entries::Entity::delete_many()
            .filter(ledger_entries::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        info!(
            cutoff = %cutoff,
            removed = result.rows_affected,
            "Debt log retention purge completed"
        );
        Ok(result.rows_affected)
    }

    /// Purges entries older than `retention_days` before `now`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidRetention` for a zero window, or a
    /// database error.
    pub async fn purge_expired(
        &self,
        now: DateTime<Utc>,
        retention_days: u32,
    ) -> Result<u64, LedgerRepoError> {
        let cutoff = LedgerService::retention_cutoff(now, retention_days)?;
        Ok(self.purge_older_than(cutoff).await?)
    }
}

/// UTC bounds `[start, end)` of a calendar day.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}
