//! Database Test Utilities
//!
//! Starts a disposable PostgreSQL container for the store adapter suites.
//! One container is shared per test binary; each test builds its own pool on
//! its own runtime, since sqlx pools do not outlive the runtime they were
//! created on.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "postgres";
const POSTGRES_PASSWORD: &str = "postgres";
const POSTGRES_DB: &str = "postgres";

pub type TestDatabaseError = Box<dyn std::error::Error + Send + Sync>;

/// Connection settings for a test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A running PostgreSQL container
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
}

impl TestDatabase {
    /// Starts a new container and waits until it accepts connections
    pub async fn start() -> Result<Self, TestDatabaseError> {
        let container = Postgres::default().with_tag(POSTGRES_TAG).start().await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        Ok(Self {
            _container: container,
            config,
        })
    }

    pub fn connection_url(&self) -> String {
        self.config.connection_url()
    }

    /// Plain pool without migrations, for ad-hoc queries
    pub async fn pool(&self, max_connections: u32) -> Result<PgPool, TestDatabaseError> {
        Ok(PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.connection_url())
            .await?)
    }
}

static SHARED_TEST_DB: OnceCell<TestDatabase> = OnceCell::const_new();

/// Container shared by every test in the binary
///
/// # Panics
///
/// Panics if the container cannot be started, e.g. when Docker is not running.
pub async fn shared_test_database() -> &'static TestDatabase {
    SHARED_TEST_DB
        .get_or_init(|| async {
            TestDatabase::start()
                .await
                .expect("Failed to start PostgreSQL test container")
        })
        .await
}
