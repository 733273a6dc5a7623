use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

use crate::db::models::User;

const DEMO_USERS: [(i64, &str); 3] = [(1, "admin"), (2, "alice"), (3, "bob")];

pub async fn connect(options: &SqliteConnectOptions) -> Result<SqliteConnection, sqlx::Error> {
    options.connect().await
}

pub async fn create_user_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO users (id, username) VALUES (?, ?)")
        .bind(user.id)
        .bind(&user.username)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Builds the lookup by pasting `raw_id` straight into the SQL text.
///
/// Nothing is escaped or bound, so the caller controls the whole `WHERE`
/// clause. Returns the first row the resulting query yields.
pub async fn find_user_unescaped(
    conn: &mut SqliteConnection,
    raw_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    let query = lookup_query(raw_id);
    tracing::debug!(%query, "running user lookup");

    sqlx::query_as::<_, User>(&query)
        .fetch_optional(&mut *conn)
        .await
}

fn lookup_query(raw_id: &str) -> String {
    format!("SELECT id, username FROM users WHERE id = '{raw_id}'")
}

/// Opens the database (creating the file if needed), ensures the `users`
/// table exists and fills it with the demo accounts when it is empty.
pub async fn init_database(options: &SqliteConnectOptions) -> Result<(), sqlx::Error> {
    let mut conn = connect(&options.clone().create_if_missing(true)).await?;
    create_user_table(&mut conn).await?;

    let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut conn)
        .await?;

    if count == 0 {
        for (id, username) in DEMO_USERS {
            let user = User {
                id,
                username: username.to_string(),
            };
            insert_user(&mut conn, &user).await?;
        }
        tracing::info!(users = DEMO_USERS.len(), "seeded demo users");
    }

    conn.close().await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_options(dir: &tempfile::TempDir) -> SqliteConnectOptions {
        let options = SqliteConnectOptions::new().filename(dir.path().join("users.db"));
        init_database(&options).await.unwrap();
        options
    }

    #[test]
    fn test_lookup_query_interpolates_verbatim() {
        assert_eq!(
            lookup_query("' OR '1'='1"),
            "SELECT id, username FROM users WHERE id = '' OR '1'='1'"
        );
    }

    #[tokio::test]
    async fn test_find_existing_user() {
        let dir = tempfile::tempdir().unwrap();
        let options = seeded_options(&dir).await;
        let mut conn = connect(&options).await.unwrap();

        let user = find_user_unescaped(&mut conn, "2").await.unwrap();
        assert_eq!(
            user,
            Some(User {
                id: 2,
                username: "alice".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_find_missing_user() {
        let dir = tempfile::tempdir().unwrap();
        let options = seeded_options(&dir).await;
        let mut conn = connect(&options).await.unwrap();

        assert_eq!(find_user_unescaped(&mut conn, "42").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_injected_predicate_matches_rows() {
        let dir = tempfile::tempdir().unwrap();
        let options = seeded_options(&dir).await;
        let mut conn = connect(&options).await.unwrap();

        let user = find_user_unescaped(&mut conn, "' OR '1'='1").await.unwrap();
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn test_unbalanced_quote_is_a_database_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = seeded_options(&dir).await;
        let mut conn = connect(&options).await.unwrap();

        assert!(find_user_unescaped(&mut conn, "'").await.is_err());
    }

    #[tokio::test]
    async fn test_init_database_seeds_once() {
        let dir = tempfile::tempdir().unwrap();
        let options = seeded_options(&dir).await;
        init_database(&options).await.unwrap();

        let mut conn = connect(&options).await.unwrap();
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(count, DEMO_USERS.len() as i64);
    }

    #[tokio::test]
    async fn test_connect_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = SqliteConnectOptions::new().filename(dir.path().join("absent.db"));

        assert!(connect(&options).await.is_err());
    }
}
