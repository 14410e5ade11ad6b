//! Opened expense store: pool, writer and repository wired together.

use std::sync::Arc;

use log::info;

use crate::config::StoreConfig;
use crate::db::{self, DbPool, WriteHandle};
use crate::expenses::ExpenseRepository;
use spendbook_core::errors::Result;

pub struct ExpenseStore {
    config: StoreConfig,
    pool: Arc<DbPool>,
    writer: WriteHandle,
    repository: Arc<ExpenseRepository>,
}

impl ExpenseStore {
    /// Opens (creating if needed) and migrates the database at `config.db_path`.
    ///
    /// Must be called from within a tokio runtime since it spawns the writer.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        db::init(&config)?;
        let pool = db::create_pool(&config)?;
        db::run_migrations(&pool, config.recreate_on_incompatible_schema)?;
        let writer = db::spawn_writer(&pool)?;
        let repository = Arc::new(ExpenseRepository::new(pool.clone(), writer.clone()));
        info!("Expense store opened at {}", config.db_path);

        Ok(Self {
            config,
            pool,
            writer,
            repository,
        })
    }

    pub fn repository(&self) -> Arc<ExpenseRepository> {
        self.repository.clone()
    }

    pub fn pool(&self) -> Arc<DbPool> {
        self.pool.clone()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Stops the writer once queued writes have committed. Reads keep
    /// working for holders of the repository; writes fail with `Closed`.
    pub async fn close(self) -> Result<()> {
        self.writer.shutdown().await?;
        info!("Expense store at {} closed", self.config.db_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use rust_decimal_macros::dec;
    use spendbook_core::errors::{DatabaseError, Error};
    use spendbook_core::events::ChangeFeed;
    use spendbook_core::expenses::{
        ExpenseRepositoryTrait, ExpenseService, ExpenseServiceTrait, NewExpense,
    };
    use spendbook_core::reports::{ReportPeriod, ReportsService, ReportsServiceTrait};
    use tempfile::tempdir;

    fn config_in(dir: &tempfile::TempDir) -> StoreConfig {
        StoreConfig::new(dir.path().join("store.db").to_string_lossy().into_owned())
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let result = ExpenseStore::open(config_in(&dir).with_pool_size(1));
        assert!(matches!(result, Err(Error::InvalidConfigValue(_))));
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let store = ExpenseStore::open(config_in(&dir)).unwrap();
        store
            .repository()
            .insert(NewExpense::new("Groceries", dec!(42.10)))
            .await
            .unwrap();
        store.close().await.unwrap();

        let reopened = ExpenseStore::open(config_in(&dir)).unwrap();
        let repo = reopened.repository();
        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(repo.total_amount().unwrap(), dec!(42.10));
    }

    #[tokio::test]
    async fn test_writes_fail_after_close() {
        let dir = tempdir().unwrap();
        let store = ExpenseStore::open(config_in(&dir)).unwrap();
        let repo = store.repository();
        store.close().await.unwrap();

        let result = repo.insert(NewExpense::new("Late", dec!(1))).await;
        assert!(matches!(
            result,
            Err(Error::Database(DatabaseError::Closed(_)))
        ));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_services_over_sqlite() {
        let dir = tempdir().unwrap();
        let store = ExpenseStore::open(config_in(&dir)).unwrap();
        let feed = Arc::new(ChangeFeed::new());
        let service = ExpenseService::new(store.repository()).with_event_sink(feed.clone());
        let reports = ReportsService::new(store.repository());

        service.add_expense("Coffee", dec!(3.25)).await.unwrap();
        let lunch = service.add_expense("Lunch", dec!(12.75)).await.unwrap();
        assert!(service.add_expense("", dec!(5)).await.is_err());
        assert_eq!(feed.version(), 2);

        let now = Local::now();
        let today = service.get_today_expenses(now).unwrap();
        assert_eq!(today.expenses.len(), 2);
        assert_eq!(today.total_amount, dec!(16.00));

        let summaries = reports.load_all_summaries(now);
        assert!(!summaries.has_failures());
        assert_eq!(summaries.yearly.len(), 1);
        assert_eq!(summaries.yearly[0].total_amount, dec!(16.00));

        service.delete_expense(&lunch).await.unwrap();
        let daily = reports.get_summary(ReportPeriod::Daily, now).unwrap();
        let stats = reports.get_period_stats(ReportPeriod::Daily, &daily).unwrap();
        let report = reports
            .get_current_period_report(ReportPeriod::Daily, stats, now)
            .unwrap();
        assert_eq!(report.stats.total_amount, dec!(3.25));
        assert_eq!(report.stats.total_expenses, 1);
        assert_eq!(feed.version(), 3);

        store.close().await.unwrap();
    }
}
