use log::debug;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tokio::runtime::RuntimeFlavor;

use crate::core::item::{ItemWriter, ItemWriterResult};
use crate::error::{BatchError, StorageError};
use crate::item::rdbc::DatabaseItemBinder;

// Default SQLITE_MAX_VARIABLE_NUMBER since SQLite 3.32
const BIND_LIMIT: usize = 32766;

/// A writer inserting items into a SQLite table, one transaction per chunk.
///
/// # Design
///
/// - Every `write` call opens a transaction, inserts the whole slice with as
///   few multi-row `INSERT` statements as the bind-parameter limit allows,
///   then commits
/// - If any statement fails the transaction is rolled back, so either every
///   item of the chunk is stored or none is
/// - Columns not listed (typically an `INTEGER PRIMARY KEY` identity) are
///   filled by the database
///
/// SQLx is asynchronous while `ItemWriter` is not: `write` blocks the current
/// thread with `block_in_place`, so it must run on a multi-threaded tokio
/// runtime or on a `spawn_blocking` thread.
pub struct SqliteItemWriter<'a, O> {
    pool: &'a Pool<Sqlite>,
    table: &'a str,
    columns: Vec<&'a str>,
    item_binder: &'a dyn DatabaseItemBinder<O, Sqlite>,
    rows_per_statement: usize,
}

impl<O> SqliteItemWriter<'_, O> {
    async fn insert_in_transaction(&self, items: &[O]) -> Result<(), sqlx::Error> {
        let mut transaction = self.pool.begin().await?;

        for rows in items.chunks(self.rows_per_statement) {
            let mut query_builder = QueryBuilder::<Sqlite>::new("INSERT INTO ");
            query_builder.push(self.table);
            query_builder.push(" (");
            query_builder.push(self.columns.join(","));
            query_builder.push(") ");

            query_builder.push_values(rows, |b, item| {
                self.item_binder.bind(item, b);
            });

            query_builder.build().execute(&mut *transaction).await?;
        }

        // Dropping an uncommitted transaction rolls it back
        transaction.commit().await
    }
}

impl<O> ItemWriter<O> for SqliteItemWriter<'_, O> {
    /// Writes all items in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` naming the table and the size of the chunk
    /// when the transaction cannot be committed: connection issues, constraint
    /// violations, missing table or column, or when not called from a
    /// multi-threaded tokio runtime.
    fn write(&self, items: &[O]) -> ItemWriterResult {
        if items.is_empty() {
            return Ok(());
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| StorageError::new(self.table, items.len(), e))?;

        // block_in_place panics on a current-thread runtime
        if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
            return Err(StorageError::new(
                self.table,
                items.len(),
                "SQLite writes require a multi-threaded tokio runtime",
            ));
        }

        let result = tokio::task::block_in_place(|| {
            handle.block_on(self.insert_in_transaction(items))
        });

        match result {
            Ok(()) => {
                debug!(
                    "Successfully wrote {} items to SQLite table {}",
                    items.len(),
                    self.table
                );
                Ok(())
            }
            Err(e) => Err(StorageError::new(self.table, items.len(), e)),
        }
    }
}

/// Builder for a `SqliteItemWriter`.
///
/// # Examples
///
/// ```no_run
/// use person_batch::item::rdbc::{DatabaseItemBinder, SqliteItemWriterBuilder};
/// use sqlx::{query_builder::Separated, Sqlite, SqlitePool};
///
/// struct Product {
///     name: String,
///     price: f64,
/// }
///
/// struct ProductBinder;
/// impl DatabaseItemBinder<Product, Sqlite> for ProductBinder {
///     fn bind(&self, item: &Product, mut query_builder: Separated<Sqlite, &str>) {
///         query_builder.push_bind(item.name.clone());
///         query_builder.push_bind(item.price);
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite::memory:").await?;
/// let binder = ProductBinder;
///
/// let writer = SqliteItemWriterBuilder::<Product>::new()
///     .pool(&pool)
///     .table("products")
///     .add_column("name")
///     .add_column("price")
///     .item_binder(&binder)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteItemWriterBuilder<'a, O> {
    pool: Option<&'a Pool<Sqlite>>,
    table: Option<&'a str>,
    columns: Vec<&'a str>,
    item_binder: Option<&'a dyn DatabaseItemBinder<O, Sqlite>>,
    rows_per_statement: Option<usize>,
}

impl<O> Default for SqliteItemWriterBuilder<'_, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, O> SqliteItemWriterBuilder<'a, O> {
    pub fn new() -> Self {
        Self {
            pool: None,
            table: None,
            columns: Vec::new(),
            item_binder: None,
            rows_per_statement: None,
        }
    }

    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn table(mut self, table: &'a str) -> Self {
        self.table = Some(table);
        self
    }

    /// Adds a column; binders push values in the order columns are added.
    pub fn add_column(mut self, column: &'a str) -> Self {
        self.columns.push(column);
        self
    }

    pub fn item_binder(mut self, item_binder: &'a dyn DatabaseItemBinder<O, Sqlite>) -> Self {
        self.item_binder = Some(item_binder);
        self
    }

    /// Caps the rows of a single `INSERT` statement.
    ///
    /// Defaults to the largest count fitting SQLite's bind-parameter limit.
    /// Every statement of a chunk still shares the chunk's transaction.
    pub fn rows_per_statement(mut self, rows: usize) -> Self {
        self.rows_per_statement = Some(rows);
        self
    }

    pub fn build(self) -> Result<SqliteItemWriter<'a, O>, BatchError> {
        let missing = |what: &str| BatchError::Configuration(format!("{what} is mandatory"));

        let pool = self.pool.ok_or_else(|| missing("Pool"))?;
        let table = self.table.ok_or_else(|| missing("Table name"))?;
        let item_binder = self.item_binder.ok_or_else(|| missing("Item binder"))?;

        if self.columns.is_empty() {
            return Err(BatchError::Configuration(
                "One or more columns are required".to_owned(),
            ));
        }

        let bind_limited = BIND_LIMIT / self.columns.len();
        let rows_per_statement = self
            .rows_per_statement
            .unwrap_or(bind_limited)
            .clamp(1, bind_limited.max(1));

        Ok(SqliteItemWriter {
            pool,
            table,
            columns: self.columns,
            item_binder,
            rows_per_statement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::ItemWriter;
    use sqlx::{Sqlite, SqlitePool, query_builder::Separated, sqlite::SqlitePoolOptions};

    #[derive(Clone, Debug, PartialEq)]
    struct TestUser {
        name: String,
        email: String,
    }

    fn user(name: &str, email: &str) -> TestUser {
        TestUser {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    struct TestUserBinder;
    impl DatabaseItemBinder<TestUser, Sqlite> for TestUserBinder {
        fn bind(&self, item: &TestUser, mut query_builder: Separated<Sqlite, &str>) {
            query_builder.push_bind(item.name.clone());
            query_builder.push_bind(item.email.clone());
        }
    }

    async fn setup_test_db() -> Result<SqlitePool, sqlx::Error> {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(pool)
    }

    async fn count_users(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_requires_mandatory_settings() {
        let pool = setup_test_db().await.unwrap();
        let binder = TestUserBinder;

        let without_table = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .add_column("name")
            .item_binder(&binder)
            .build();
        assert!(matches!(without_table, Err(BatchError::Configuration(_))));

        let without_columns = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .table("users")
            .item_binder(&binder)
            .build();
        assert!(matches!(without_columns, Err(BatchError::Configuration(_))));

        let without_binder = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .table("users")
            .add_column("name")
            .build();
        assert!(matches!(without_binder, Err(BatchError::Configuration(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_write_empty_items() {
        let pool = setup_test_db().await.unwrap();
        let binder = TestUserBinder;

        let writer = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .table("users")
            .add_column("name")
            .add_column("email")
            .item_binder(&binder)
            .build()
            .unwrap();

        assert!(writer.write(&[]).is_ok());
        assert_eq!(count_users(&pool).await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_write_generates_identities() {
        let pool = setup_test_db().await.unwrap();
        let binder = TestUserBinder;

        let writer = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .table("users")
            .add_column("name")
            .add_column("email")
            .item_binder(&binder)
            .build()
            .unwrap();

        let users = vec![
            user("John Doe", "john@example.com"),
            user("Jane Smith", "jane@example.com"),
            user("Bob Johnson", "bob@example.com"),
        ];

        writer.write(&users).unwrap();

        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM users ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                (1, "John Doe".to_string()),
                (2, "Jane Smith".to_string()),
                (3, "Bob Johnson".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_chunk_is_rolled_back() {
        let pool = setup_test_db().await.unwrap();
        let binder = TestUserBinder;

        // Two rows per statement: the duplicate sits in the third statement
        let writer = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .table("users")
            .add_column("name")
            .add_column("email")
            .item_binder(&binder)
            .rows_per_statement(2)
            .build()
            .unwrap();

        writer
            .write(&[user("John Doe", "john@example.com")])
            .unwrap();

        let chunk = vec![
            user("A", "a@example.com"),
            user("B", "b@example.com"),
            user("C", "c@example.com"),
            user("D", "d@example.com"),
            user("Duplicate", "john@example.com"),
        ];

        let result = writer.write(&chunk);

        match result {
            Err(error) => {
                assert_eq!(error.target, "users");
                assert_eq!(error.rows, 5);
            }
            Ok(()) => panic!("Expected a storage error"),
        }
        assert_eq!(count_users(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_write_on_current_thread_runtime_is_an_error() {
        let pool = setup_test_db().await.unwrap();
        let binder = TestUserBinder;

        let writer = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .table("users")
            .add_column("name")
            .add_column("email")
            .item_binder(&binder)
            .build()
            .unwrap();

        let error = writer
            .write(&[user("John Doe", "john@example.com")])
            .unwrap_err();

        assert_eq!(error.target, "users");
        assert_eq!(error.rows, 1);
        assert!(error.to_string().contains("multi-threaded"));
        assert_eq!(count_users(&pool).await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_large_batch_insert() {
        let pool = setup_test_db().await.unwrap();
        let binder = TestUserBinder;

        let writer = SqliteItemWriterBuilder::<TestUser>::new()
            .pool(&pool)
            .table("users")
            .add_column("name")
            .add_column("email")
            .item_binder(&binder)
            .rows_per_statement(30)
            .build()
            .unwrap();

        let users: Vec<TestUser> = (1..=100)
            .map(|i| user(&format!("User {}", i), &format!("user{}@example.com", i)))
            .collect();

        writer.write(&users).unwrap();

        assert_eq!(count_users(&pool).await, 100);
    }
}
