use sqlx::{FromRow, PgPool};

use crate::auth::password::{hash_password, verify_password};

/// One credential row. The `password` column holds the salted argon2 hash;
/// plaintext is never stored.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
}

/// True iff `username` exists and `password` matches its stored hash.
/// Unknown user and wrong password are deliberately indistinguishable.
pub async fn authenticate(db: &PgPool, username: &str, password: &str) -> anyhow::Result<bool> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await?;
    match user {
        Some(user) => verify_password(password, &user.password),
        None => Ok(false),
    }
}

/// Hash with a fresh salt and insert. A duplicate username surfaces as the
/// schema-level uniqueness violation.
pub async fn store(db: &PgPool, username: &str, password: &str) -> anyhow::Result<User> {
    let hash = hash_password(password)?;
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password)
        VALUES ($1, $2)
        RETURNING id, username, password
        "#,
    )
    .bind(username)
    .bind(&hash)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Re-hash and overwrite. Returns rows affected; 0 when the user is absent.
pub async fn update_password(db: &PgPool, username: &str, password: &str) -> anyhow::Result<u64> {
    let hash = hash_password(password)?;
    let done = sqlx::query(
        r#"
        UPDATE users SET password = $1
        WHERE username = $2
        "#,
    )
    .bind(&hash)
    .bind(username)
    .execute(db)
    .await?;
    Ok(done.rows_affected())
}

/// Remove the row. Returns rows affected; 0 when the user is absent.
pub async fn delete(db: &PgPool, username: &str) -> anyhow::Result<u64> {
    let done = sqlx::query(
        r#"
        DELETE FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .execute(db)
    .await?;
    Ok(done.rows_affected())
}

/// Numeric identifier for a username, `None` when no such user exists.
pub async fn find_user_id(db: &PgPool, username: &str) -> anyhow::Result<Option<i32>> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT id
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await?;
    Ok(id)
}
