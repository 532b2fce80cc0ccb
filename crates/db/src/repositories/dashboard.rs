//! Dashboard repository for admin summary figures.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};

use kasa_core::dashboard::{DashboardSummary, OrderCounts, RevenueCalculator};
use kasa_core::order::OrderError;

use crate::entities::{orders, sea_orm_active_enums::OrderStatus};
use crate::repositories::ledger::LedgerRepository;
use crate::repositories::order::OrderRepository;
use crate::repositories::product::ProductRepository;
use crate::repositories::user::UserRepository;

/// Error types for dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// A completed order references a product that no longer exists.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Dashboard repository.
#[derive(Debug, Clone)]
pub struct DashboardRepository {
    db: DatabaseConnection,
    orders: OrderRepository,
}

impl DashboardRepository {
    /// Creates a new dashboard repository. Revenue is routed through the
    /// order repository's currency policy.
    #[must_use]
    pub const fn new(db: DatabaseConnection, orders: OrderRepository) -> Self {
        Self { db, orders }
    }

    /// Order counts by status.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn order_counts(&self) -> Result<OrderCounts, DbErr> {
        let pending = orders::Entity::find()
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .count(&self.db)
            .await?;
        let completed = orders::Entity::find()
            .filter(orders::Column::Status.eq(OrderStatus::Completed))
            .count(&self.db)
            .await?;
        let total = orders::Entity::find().count(&self.db).await?;

        Ok(OrderCounts {
            pending,
            completed,
            total,
        })
    }

    /// Builds the full summary.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn summary(&self, low_stock_threshold: i32) -> Result<DashboardSummary, DashboardError> {
        let (completed, catalog) = self.orders.completed().await?;
        let revenue = RevenueCalculator::new(self.orders.policy()).revenue(&completed, &catalog)?;

        let debt = LedgerRepository::new(self.db.clone()).total_debt().await?;
        let orders = self.order_counts().await?;
        let client_count = UserRepository::new(self.db.clone()).count_clients().await?;
        let low_stock = ProductRepository::new(self.db.clone())
            .low_stock(low_stock_threshold)
            .await?;

        Ok(DashboardSummary {
            revenue,
            debt,
            orders,
            client_count,
            low_stock_threshold,
            low_stock,
        })
    }
}
