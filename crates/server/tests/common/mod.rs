//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use guardianship_server::AppResources;
use guardianship_server::config::{AppConfig, DispatchConfig, HttpConfig, SmtpConfig};
use guardianship_server::entity::user::{self, UserStatus};
use guardianship_server::error::SendError;
use guardianship_server::notify::{MailTransport, RenderedMessage};
use guardianship_server::store::DbStore;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    Statement,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};

pub const ADMIN: &str = "admin@guardianship.example";
pub const SECOND_ADMIN: &str = "ops@guardianship.example";

const USERS_TABLE: &str = r#"CREATE TABLE users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    name TEXT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);"#;

const ALERTS_LOG_TABLE: &str = r#"CREATE TABLE alerts_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NULL,
    phone TEXT NULL,
    latitude REAL NULL,
    longitude REAL NULL,
    location TEXT NULL,
    photo TEXT NULL,
    time TEXT NOT NULL,
    raw TEXT NOT NULL,
    recipients INTEGER NOT NULL,
    emailed INTEGER NOT NULL,
    created_at TEXT NOT NULL
);"#;

const BROADCAST_MESSAGES_TABLE: &str = r#"CREATE TABLE broadcast_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    admin_email TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    sent_to_count INTEGER NOT NULL,
    sent_count INTEGER NOT NULL,
    failed_count INTEGER NOT NULL,
    sent_at TEXT NOT NULL
);"#;

/// Which tables the in-memory database starts with. Leaving one out makes
/// every query against it fail, which is how the tests simulate an
/// unreachable data source.
#[derive(Clone, Copy)]
pub struct Schema {
    pub users: bool,
    pub audit: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            users: true,
            audit: true,
        }
    }
}

pub async fn create_test_db(schema: Schema) -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    let mut tables = Vec::new();
    if schema.users {
        tables.push(USERS_TABLE);
    }
    if schema.audit {
        tables.push(ALERTS_LOG_TABLE);
        tables.push(BROADCAST_MESSAGES_TABLE);
    }
    for sql in tables {
        db.execute(Statement::from_string(DbBackend::Sqlite, sql))
            .await
            .expect("create table");
    }
    db
}

/// Inserts a user created `age_minutes` ago, so tests control ordering.
pub async fn insert_user(
    db: &DatabaseConnection,
    id: &str,
    email: &str,
    status: UserStatus,
    age_minutes: i64,
) -> user::Model {
    user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(email.to_string()),
        name: Set(Some(format!("User {id}"))),
        status: Set(status),
        created_at: Set(OffsetDateTime::now_utc() - Duration::minutes(age_minutes)),
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .expect("count query")
        .expect("count row");
    row.try_get::<i64>("", "n").expect("count value")
}

pub fn create_test_config(admins: &[&str]) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        smtp: SmtpConfig {
            server: "localhost".into(),
            port: 25,
            username: "test".into(),
            password: "test".into(),
            from: "noreply@guardianship.example".into(),
            from_name: "GuardianshipApp".into(),
            starttls: false,
        },
        admin_emails: admins.iter().map(|a| a.to_string()).collect(),
        // No pacing, tests would otherwise sleep between sends.
        dispatch: DispatchConfig {
            messages_per_second: 0.0,
        },
        http: HttpConfig::default(),
    }
}

/// Mail transport double recording every attempt, optionally failing some.
#[derive(Default)]
pub struct RecordingTransport {
    fail_all: bool,
    fail_for: HashSet<String>,
    attempts: Mutex<Vec<(String, RenderedMessage)>>,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Default::default()
        }
    }

    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> Vec<(String, RenderedMessage)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.attempts().into_iter().map(|(to, _)| to).collect()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, to: &str, message: &RenderedMessage) -> Result<(), SendError> {
        self.attempts
            .lock()
            .unwrap()
            .push((to.to_string(), message.clone()));
        if self.fail_all || self.fail_for.contains(to) {
            return Err(SendError::InvalidAddress {
                address: to.to_string(),
                reason: "mailbox unavailable".into(),
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub transport: Arc<RecordingTransport>,
    pub server: TestServer,
}

pub async fn create_test_app(
    admins: &[&str],
    schema: Schema,
    transport: RecordingTransport,
) -> TestApp {
    create_test_app_with_config(create_test_config(admins), schema, transport).await
}

pub async fn create_test_app_with_config(
    config: AppConfig,
    schema: Schema,
    transport: RecordingTransport,
) -> TestApp {
    let db = Arc::new(create_test_db(schema).await);
    let store = Arc::new(DbStore::new(db.clone()));
    let transport = Arc::new(transport);
    let resources = AppResources::new(
        Arc::new(config),
        store.clone(),
        store,
        transport.clone(),
    );
    let server = TestServer::new(guardianship_server::api::router(resources)).unwrap();
    TestApp {
        db,
        transport,
        server,
    }
}

pub async fn default_app() -> TestApp {
    create_test_app(
        &[ADMIN, SECOND_ADMIN],
        Schema::default(),
        RecordingTransport::default(),
    )
    .await
}
