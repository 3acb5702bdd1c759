// src/db.rs - Database migrations and setup

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::SUGGESTED_GUIDE_CATEGORIES;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys and WAL mode
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE CHECK(length(username) >= 3 AND length(username) <= 50),
            email TEXT NOT NULL UNIQUE CHECK(length(email) >= 5 AND length(email) <= 255),
            password_hash TEXT NOT NULL,
            full_name TEXT CHECK(full_name IS NULL OR length(full_name) <= 255),
            country TEXT CHECK(country IS NULL OR length(country) <= 100),
            field_of_study TEXT CHECK(field_of_study IS NULL OR length(field_of_study) <= 255),
            role TEXT NOT NULL DEFAULT 'student' CHECK(role IN ('admin', 'student')),
            is_active INTEGER NOT NULL DEFAULT 1 CHECK(is_active IN (0, 1)),
            last_login DATETIME,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            failed_login_attempts INTEGER NOT NULL DEFAULT 0,
            locked_until DATETIME
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            expires_at DATETIME NOT NULL,
            revoked_at DATETIME NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Array columns hold JSON text; readers coerce anything else to []
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scholarships (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL CHECK(length(title) > 0 AND length(title) <= 255),
            institution TEXT NOT NULL CHECK(length(institution) <= 255),
            country TEXT NOT NULL CHECK(length(country) <= 100),
            level TEXT NOT NULL CHECK(
                level IN ('Undergraduate', 'Masters', 'PhD', 'Research', 'Training')
            ),
            deadline DATE NOT NULL,
            fields TEXT,
            description TEXT,
            benefits TEXT,
            requirements TEXT,
            application_url TEXT NOT NULL,
            source_url TEXT,
            featured INTEGER NOT NULL DEFAULT 0 CHECK(featured IN (0, 1)),
            created_by TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (created_by) REFERENCES users (id) ON DELETE SET NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS guide_categories (
            name TEXT PRIMARY KEY,
            position INTEGER NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS guides (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL CHECK(length(title) > 0 AND length(title) <= 255),
            description TEXT,
            category TEXT NOT NULL CHECK(length(category) <= 100),
            country TEXT NOT NULL CHECK(length(country) <= 100),
            image_url TEXT,
            steps TEXT,
            created_by TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (created_by) REFERENCES users (id) ON DELETE SET NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS saved_scholarships (
            user_id TEXT NOT NULL,
            scholarship_id TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            PRIMARY KEY (user_id, scholarship_id),
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
            FOREIGN KEY (scholarship_id) REFERENCES scholarships (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL CHECK(length(title) > 0 AND length(title) <= 200),
            content TEXT NOT NULL CHECK(length(content) <= 10000),
            likes_count INTEGER NOT NULL DEFAULT 0 CHECK(likes_count >= 0),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post_likes (
            post_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            PRIMARY KEY (post_id, user_id),
            FOREIGN KEY (post_id) REFERENCES posts (id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            content TEXT NOT NULL CHECK(length(content) > 0 AND length(content) <= 2000),
            likes_count INTEGER NOT NULL DEFAULT 0 CHECK(likes_count >= 0),
            created_at DATETIME NOT NULL,
            FOREIGN KEY (post_id) REFERENCES posts (id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comment_likes (
            comment_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            PRIMARY KEY (comment_id, user_id),
            FOREIGN KEY (comment_id) REFERENCES comments (id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL CHECK(length(title) > 0 AND length(title) <= 200),
            content TEXT NOT NULL DEFAULT '',
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS translations (
            key TEXT NOT NULL,
            locale TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at DATETIME NOT NULL,
            PRIMARY KEY (key, locale)
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            scholarship_id TEXT,
            role TEXT NOT NULL CHECK(role IN ('user', 'assistant')),
            content TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
            FOREIGN KEY (scholarship_id) REFERENCES scholarships (id) ON DELETE SET NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    // ==================== CREATE INDEXES ====================

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_scholarships_country ON scholarships(country)",
        "CREATE INDEX IF NOT EXISTS idx_scholarships_level ON scholarships(level)",
        "CREATE INDEX IF NOT EXISTS idx_scholarships_deadline ON scholarships(deadline)",
        "CREATE INDEX IF NOT EXISTS idx_guides_category ON guides(category)",
        "CREATE INDEX IF NOT EXISTS idx_saved_user ON saved_scholarships(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id)",
        "CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_translations_locale ON translations(locale)",
        "CREATE INDEX IF NOT EXISTS idx_chat_user ON chat_messages(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_revoked_expires ON revoked_tokens(expires_at)",
    ];
    for query in indexes.iter() {
        let _ = sqlx::query(query).execute(pool).await;
    }

    seed_guide_categories(pool).await?;

    log::info!("✅ Database migrations completed");
    Ok(())
}

pub async fn seed_guide_categories(pool: &SqlitePool) -> Result<()> {
    for (position, name) in SUGGESTED_GUIDE_CATEGORIES.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO guide_categories (name, position) VALUES (?, ?)")
            .bind(name)
            .bind(position as i64)
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn guide_categories(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM guide_categories ORDER BY position, name")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

// ==================== TEST SUPPORT ====================

/// Fresh in-memory database with all migrations applied. A single connection
/// keeps every query on the same in-memory instance.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool).await.unwrap();

        let categories = guide_categories(&pool).await.unwrap();
        assert_eq!(categories.len(), SUGGESTED_GUIDE_CATEGORIES.len());
        assert_eq!(categories[0], SUGGESTED_GUIDE_CATEGORIES[0]);
    }

    #[actix_rt::test]
    async fn test_level_check_constraint() {
        let pool = test_pool().await;
        let result = sqlx::query(
            "INSERT INTO scholarships (id, title, institution, country, level, deadline, application_url, created_at, updated_at)
             VALUES ('x', 'T', 'I', 'Japan', 'Diploma', '2026-01-01', 'https://example.org', datetime('now'), datetime('now'))",
        )
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }
}
