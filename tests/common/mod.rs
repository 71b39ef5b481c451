//! Common test utilities

#![allow(dead_code)]

use simple_bank::db;
use simple_bank::models::{Account, CreateAccountParams, CreateUserParams, User};
use simple_bank::random::RandomGenerator;
use simple_bank::store::{PgStore, Queries, Store};

/// Connect to the test database and apply migrations.
///
/// Returns `None` when `DATABASE_URL` is not set so the suite can run without
/// PostgreSQL. Tests never truncate: every fixture uses fresh random names.
pub async fn setup_test_store() -> Option<PgStore> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping postgres test");
        return None;
    };

    let pool = db::create_pool(&database_url, 20)
        .await
        .expect("Failed to connect to DB");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(PgStore::new(pool))
}

pub async fn create_random_user(store: &PgStore, rng: &RandomGenerator) -> User {
    let mut conn = store.conn().await.unwrap();
    conn.create_user(CreateUserParams {
        username: rng.string(12),
        hashed_password: rng.string(16),
        full_name: rng.owner(),
        email: format!("{}@email.com", rng.string(16)),
    })
    .await
    .unwrap()
}

pub async fn create_random_account(
    store: &PgStore,
    rng: &RandomGenerator,
    balance: i64,
) -> Account {
    let user = create_random_user(store, rng).await;
    let mut conn = store.conn().await.unwrap();
    conn.create_account(CreateAccountParams {
        owner: user.username,
        balance,
        currency: "USD".to_string(),
    })
    .await
    .unwrap()
}
