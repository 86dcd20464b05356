//! Per-test databases on a shared PostgreSQL container.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::{OnceCell, mpsc};

const USER: &str = "bazaar_test";
const PASSWORD: &str = "bazaar_test_password";

/// Started on first use and shared by every test in the binary.
static CONTAINER: Lazy<OnceCell<ContainerAsync<PostgresImage>>> = Lazy::new(OnceCell::new);

/// Databases waiting to be dropped.
static DROPS: Lazy<OnceCell<mpsc::UnboundedSender<String>>> = Lazy::new(OnceCell::new);

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

async fn start_container() -> ContainerAsync<PostgresImage> {
    PostgresImage::default()
        .with_user(USER)
        .with_password(PASSWORD)
        .with_db_name(USER)
        .with_env_var("POSTGRES_INITDB_ARGS", "--auth-host=trust")
        .start()
        .await
        .expect("Failed to start PostgreSQL container")
}

async fn start_dropper() -> mpsc::UnboundedSender<String> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(name) = receiver.recv().await {
            if let Err(error) = drop_database(&name).await {
                eprintln!("Failed to drop test database {name}: {error}");
            }
        }
    });

    sender
}

async fn server_url(database: &str) -> String {
    let container = CONTAINER.get_or_init(start_container).await;

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get container port");

    let host =
        std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string());

    format!("postgresql://{USER}:{PASSWORD}@{host}:{port}/{database}")
}

async fn drop_database(name: &str) -> Result<(), sqlx::Error> {
    let mut conn = PgConnection::connect(&server_url("postgres").await).await?;

    sqlx::query(&format!("DROP DATABASE IF EXISTS \"{name}\" WITH (FORCE)"))
        .execute(&mut conn)
        .await?;

    conn.close().await
}

/// Only generated names reach `CREATE DATABASE`, but check anyway since they
/// are interpolated.
fn is_safe_name(name: &str) -> bool {
    (1..=63).contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// A freshly migrated database, dropped in the background when this value is.
///
/// Services commit their own transactions, so isolation comes from every test
/// having its own database rather than from rolling back.
#[derive(Debug)]
pub(crate) struct TestDb {
    pub(crate) pool: PgPool,
    name: String,
}

impl TestDb {
    pub(crate) async fn new() -> Self {
        DROPS.get_or_init(start_dropper).await;

        let name = format!(
            "bazaar_test_{}_{}",
            std::process::id(),
            SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );

        assert!(is_safe_name(&name), "unsafe database name {name}");

        let mut conn = PgConnection::connect(&server_url("postgres").await)
            .await
            .expect("Failed to connect to postgres database");

        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut conn)
            .await
            .expect("Failed to create test database");

        conn.close()
            .await
            .expect("Failed to close admin connection");

        let pool = PgPool::connect(&server_url(&name).await)
            .await
            .expect("Failed to connect to test database");

        crate::database::migrate(&pool)
            .await
            .expect("Failed to run migrations");

        Self { pool, name }
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Some(sender) = DROPS.get() {
            let _ = sender.send(self.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_safe() {
        assert!(is_safe_name("bazaar_test_41_7"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name("7bazaar"));
        assert!(!is_safe_name("bazaar\"; drop"));
        assert!(!is_safe_name(&"a".repeat(64)));
    }

    #[tokio::test]
    async fn migrations_create_the_marketplace_tables() {
        let test_db = TestDb::new().await;

        for table in [
            "sellers",
            "products",
            "coupons",
            "coupon_usages",
            "carts",
            "cart_items",
            "orders",
            "sub_orders",
            "return_requests",
            "disputes",
            "wallets",
            "wallet_transactions",
            "payments",
        ] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&test_db.pool)
                .await
                .unwrap_or_else(|error| panic!("table {table} missing: {error}"));

            assert_eq!(count, 0, "{table} should start empty");
        }
    }
}
