//! SQLite trade store.
//!
//! One writer connection serializes bulk inserts from all persistence
//! workers; a separate reader pool serves metric queries concurrently under
//! WAL. Prices are stored as decimal text and parsed back exactly.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::application::ports::{RepositoryError, TradeRepositoryPort};
use crate::domain::shared::Ticker;
use crate::domain::trade::{Trade, TradeInfo};

/// Rows per insert statement. Five binds per row keeps each statement well
/// under SQLite's bind parameter limit.
const INSERT_CHUNK_ROWS: usize = 1_000;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a persistence worker waits for the writer connection. Large
/// batches from other workers queue behind each other here.
const WRITER_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(600);

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Connection(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
                Self::CorruptRow(err.to_string())
            }
            _ => Self::Query(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for RepositoryError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Connection(format!("migration failed: {err}"))
    }
}

/// SQLite implementation of `TradeRepositoryPort`.
#[derive(Debug, Clone)]
pub struct SqliteTradeRepository {
    reader: SqlitePool,
    writer: SqlitePool,
}

impl SqliteTradeRepository {
    /// Open (creating if missing) the database at `dsn` and apply pending
    /// migrations.
    ///
    /// `dsn` is a file path or a `sqlite:` URL. `max_readers` bounds the
    /// reader pool.
    pub async fn open(dsn: &str, max_readers: u32) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(dsn)?
            .busy_timeout(BUSY_TIMEOUT)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("temp_store", "memory")
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(WRITER_ACQUIRE_TIMEOUT)
            .connect_with(options.clone())
            .await?;

        sqlx::migrate!("./migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(max_readers.max(1))
            .connect_with(options)
            .await?;

        tracing::info!(dsn, "Trade store opened");
        Ok(Self { reader, writer })
    }

    /// Close both pools, waiting for in-flight statements.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }

    fn row_to_trade_info(row: &SqliteRow) -> Result<TradeInfo, RepositoryError> {
        let ticker: String = row.try_get("ticker")?;
        let price: String = row.try_get("price")?;
        let date: NaiveDate = row.try_get("trade_date")?;
        let quantity: i64 = row.try_get("quantity")?;

        Ok(TradeInfo {
            ticker: Ticker::parse(ticker)
                .map_err(|e| RepositoryError::CorruptRow(e.to_string()))?,
            price: Decimal::from_str(&price)
                .map_err(|e| RepositoryError::CorruptRow(format!("price {price:?}: {e}")))?,
            date,
            quantity,
        })
    }
}

#[async_trait]
impl TradeRepositoryPort for SqliteTradeRepository {
    async fn bulk_insert(&self, trades: &[Trade]) -> Result<u64, RepositoryError> {
        if trades.is_empty() {
            return Ok(0);
        }

        let mut tx = self.writer.begin().await?;
        let mut rows = 0;

        for chunk in trades.chunks(INSERT_CHUNK_ROWS) {
            let mut query_builder: QueryBuilder<'_, Sqlite> =
                QueryBuilder::new("insert into trades (ticker, hour, trade_date, price, quantity) ");
            query_builder.push_values(chunk, |mut b, trade| {
                b.push_bind(trade.ticker.as_str())
                    .push_bind(trade.hour.as_str())
                    .push_bind(trade.date)
                    .push_bind(trade.price.to_string())
                    .push_bind(trade.quantity);
            });

            rows += query_builder
                .build()
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(rows)
    }

    async fn list_trade_info(
        &self,
        ticker: &Ticker,
        date: Option<NaiveDate>,
    ) -> Result<Vec<TradeInfo>, RepositoryError> {
        let rows = sqlx::query(
            r"
            select
                ticker, price, trade_date, quantity
            from
                trades
            where
                ticker = ?1
            and
                (?2 is null or trade_date = ?2)
            ",
        )
        .bind(ticker.as_str())
        .bind(date)
        .fetch_all(&self.reader)
        .await?;

        rows.iter().map(Self::row_to_trade_info).collect()
    }
}
