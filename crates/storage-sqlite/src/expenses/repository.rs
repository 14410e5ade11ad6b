use spendbook_core::expenses::{
    sum_amounts, DateRange, Expense, ExpenseRepositoryTrait, NewExpense,
};
use spendbook_core::Result;

use super::model::{parse_amount_tolerant, ExpenseDB, NewExpenseDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::expenses;
use crate::schema::expenses::dsl::*;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use rust_decimal::Decimal;

use std::sync::Arc;

pub struct ExpenseRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ExpenseRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ExpenseRepository { pool, writer }
    }

    fn load(&self, query: expenses::BoxedQuery<'static, Sqlite>) -> Result<Vec<Expense>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = query
            .order((created_at.desc(), id.desc()))
            .load::<ExpenseDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    fn sum_rows(rows: Vec<(i64, String)>) -> Result<Decimal> {
        sum_amounts(
            rows.iter()
                .map(|(row_id, raw)| parse_amount_tolerant(raw, *row_id)),
        )
    }
}

#[async_trait]
impl ExpenseRepositoryTrait for ExpenseRepository {
    fn list(&self) -> Result<Vec<Expense>> {
        self.load(expenses.into_boxed())
    }

    fn list_in_range(&self, range: DateRange) -> Result<Vec<Expense>> {
        self.load(
            expenses
                .filter(created_at.between(range.start, range.end))
                .into_boxed(),
        )
    }

    fn list_since(&self, start: i64) -> Result<Vec<Expense>> {
        self.load(expenses.filter(created_at.ge(start)).into_boxed())
    }

    fn get_by_id(&self, expense_id: i64) -> Result<Expense> {
        let mut conn = get_connection(&self.pool)?;
        let row = expenses
            .find(expense_id)
            .first::<ExpenseDB>(&mut conn)
            .into_core()?;
        Ok(Expense::from(row))
    }

    fn total_amount(&self) -> Result<Decimal> {
        let mut conn = get_connection(&self.pool)?;
        let rows = expenses
            .select((id, amount))
            .load::<(i64, String)>(&mut conn)
            .into_core()?;
        Self::sum_rows(rows)
    }

    fn total_amount_in_range(&self, range: DateRange) -> Result<Decimal> {
        let mut conn = get_connection(&self.pool)?;
        let rows = expenses
            .filter(created_at.between(range.start, range.end))
            .select((id, amount))
            .load::<(i64, String)>(&mut conn)
            .into_core()?;
        Self::sum_rows(rows)
    }

    fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        expenses.count().get_result::<i64>(&mut conn).into_core()
    }

    async fn insert(&self, new_expense: NewExpense) -> Result<Expense> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Expense> {
                let new_expense_db: NewExpenseDB = new_expense.into();
                // An explicit id replaces the existing row
                let result = if new_expense_db.id.is_some() {
                    diesel::replace_into(expenses::table)
                        .values(&new_expense_db)
                        .returning(ExpenseDB::as_returning())
                        .get_result(conn)
                } else {
                    diesel::insert_into(expenses::table)
                        .values(&new_expense_db)
                        .returning(ExpenseDB::as_returning())
                        .get_result(conn)
                };
                Ok(Expense::from(result.into_core()?))
            })
            .await
    }

    async fn update(&self, expense: Expense) -> Result<Expense> {
        let expense_db = ExpenseDB::from(expense);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Expense> {
                // id and created_at are immutable after insert
                let result_db = diesel::update(expenses.find(expense_db.id))
                    .set((
                        description.eq(expense_db.description),
                        amount.eq(expense_db.amount),
                    ))
                    .returning(ExpenseDB::as_returning())
                    .get_result(conn)
                    .into_core()?;
                Ok(Expense::from(result_db))
            })
            .await
    }

    async fn delete(&self, expense_id: i64) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(expenses.find(expense_id))
                    .execute(conn)
                    .into_core()
            })
            .await
    }

    async fn delete_all(&self) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(expenses::table).execute(conn).into_core()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::db::{create_pool, init, run_migrations, spawn_writer};
    use rust_decimal_macros::dec;
    use spendbook_core::errors::{DatabaseError, Error};
    use tempfile::tempdir;

    fn setup() -> (ExpenseRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("test.db").to_string_lossy().into_owned());
        init(&config).unwrap();
        let pool = create_pool(&config).unwrap();
        run_migrations(&pool, false).unwrap();
        let writer = spawn_writer(&pool).unwrap();
        (ExpenseRepository::new(pool, writer), dir)
    }

    fn at(new_expense: NewExpense, millis: i64) -> NewExpense {
        new_expense.with_created_at(millis)
    }

    #[tokio::test]
    async fn test_insert_assigns_ascending_ids() {
        let (repo, _dir) = setup();
        let first = repo.insert(NewExpense::new("Coffee", dec!(3.50))).await.unwrap();
        let second = repo.insert(NewExpense::new("Tea", dec!(2.00))).await.unwrap();
        assert!(second.id > first.id);
        assert_eq!(first.amount, dec!(3.50));
        assert!(first.created_at > 0);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (repo, _dir) = setup();
        repo.insert(at(NewExpense::new("Old", dec!(1)), 1_000)).await.unwrap();
        repo.insert(at(NewExpense::new("New", dec!(2)), 3_000)).await.unwrap();
        repo.insert(at(NewExpense::new("Mid", dec!(3)), 2_000)).await.unwrap();

        let names: Vec<String> = repo
            .list()
            .unwrap()
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(names, vec!["New", "Mid", "Old"]);
    }

    #[tokio::test]
    async fn test_range_queries_are_inclusive() {
        let (repo, _dir) = setup();
        for (millis, value) in [(999, dec!(1)), (1_000, dec!(2)), (2_000, dec!(4)), (2_001, dec!(8))] {
            repo.insert(at(NewExpense::new("x", value), millis)).await.unwrap();
        }
        let range = DateRange::new(1_000, 2_000);
        assert_eq!(repo.list_in_range(range).unwrap().len(), 2);
        assert_eq!(repo.total_amount_in_range(range).unwrap(), dec!(6));
        assert_eq!(repo.list_since(2_000).unwrap().len(), 2);
        assert_eq!(repo.total_amount().unwrap(), dec!(15));
    }

    #[tokio::test]
    async fn test_empty_table_totals_are_zero() {
        let (repo, _dir) = setup();
        assert_eq!(repo.total_amount().unwrap(), Decimal::ZERO);
        assert_eq!(repo.count().unwrap(), 0);
        assert!(repo.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let (repo, _dir) = setup();
        let original = repo
            .insert(at(NewExpense::new("Taxi", dec!(20)), 5_000))
            .await
            .unwrap();

        let updated = repo
            .update(Expense {
                description: "Taxi home".to_string(),
                amount: dec!(22.75),
                created_at: 9_999,
                ..original.clone()
            })
            .await
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, 5_000);
        let stored = repo.get_by_id(original.id).unwrap();
        assert_eq!(stored.description, "Taxi home");
        assert_eq!(stored.amount, dec!(22.75));
        assert_eq!(stored.created_at, 5_000);
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let (repo, _dir) = setup();
        let result = repo
            .update(Expense {
                id: 404,
                description: "Ghost".to_string(),
                amount: dec!(1),
                created_at: 0,
            })
            .await;
        assert!(matches!(
            result,
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_insert_with_explicit_id_replaces() {
        let (repo, _dir) = setup();
        let original = repo.insert(NewExpense::new("Lunch", dec!(10))).await.unwrap();
        let replacement = NewExpense {
            id: Some(original.id),
            ..NewExpense::new("Dinner", dec!(30)).with_created_at(7_000)
        };
        let replaced = repo.insert(replacement).await.unwrap();

        assert_eq!(replaced.id, original.id);
        assert_eq!(repo.count().unwrap(), 1);
        let stored = repo.get_by_id(original.id).unwrap();
        assert_eq!(stored.description, "Dinner");
        assert_eq!(stored.created_at, 7_000);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let (repo, _dir) = setup();
        let keep = repo.insert(NewExpense::new("Keep", dec!(5))).await.unwrap();
        let gone = repo.insert(NewExpense::new("Gone", dec!(7))).await.unwrap();

        assert_eq!(repo.delete(gone.id).await.unwrap(), 1);
        assert_eq!(repo.delete(gone.id).await.unwrap(), 0);
        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(repo.total_amount().unwrap(), dec!(5));
        assert_eq!(repo.list().unwrap(), vec![keep]);
        assert!(matches!(
            repo.get_by_id(gone.id),
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_all() {
        let (repo, _dir) = setup();
        repo.insert(NewExpense::new("A", dec!(1))).await.unwrap();
        repo.insert(NewExpense::new("B", dec!(2))).await.unwrap();
        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_total_overflow_is_an_error() {
        let (repo, _dir) = setup();
        repo.insert(NewExpense::new("Huge", Decimal::MAX)).await.unwrap();
        repo.insert(NewExpense::new("Huge", Decimal::MAX)).await.unwrap();

        assert!(matches!(
            repo.total_amount(),
            Err(Error::AmountOverflow(_))
        ));
        assert!(matches!(
            repo.total_amount_in_range(DateRange::new(0, i64::MAX)),
            Err(Error::AmountOverflow(_))
        ));
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_repository_stores_values_validation_would_reject() {
        let (repo, _dir) = setup();
        let stored = repo.insert(NewExpense::new("", dec!(-2))).await.unwrap();
        assert_eq!(stored.amount, dec!(-2));
        assert_eq!(stored.description, "");
    }
}
