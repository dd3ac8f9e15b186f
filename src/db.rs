use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};

use crate::error::{Error, Result};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub last_fetched_at: Option<String>,
}

/// A feed joined with its creator's display name, for listings.
#[derive(Debug, Clone, FromRow)]
pub struct FeedWithOwner {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub owner_name: String,
    pub last_fetched_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost<'a> {
    pub feed_id: i64,
    pub url: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A follow row joined with the display names of both sides.
#[derive(Debug, Clone, FromRow)]
pub struct Follow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub user_name: String,
    pub feed_name: String,
}

/// Storage surface for users, feeds, posts and follows.
///
/// Uniqueness constraints (feed URL, post URL, (user, feed) pair) are the
/// concurrency-control mechanism: conflicting writes from the scheduler and
/// concurrently running commands serialize on them and surface as
/// [`Error::Conflict`].
#[allow(async_fn_in_trait)]
pub trait FeedStore {
    async fn create_user(&self, name: &str) -> Result<User>;
    async fn get_user_by_name(&self, name: &str) -> Result<User>;
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Bulk reset. Deletes every user; feeds, posts and follows go with
    /// them via foreign-key cascade.
    async fn delete_all_users(&self) -> Result<()>;

    async fn create_feed(&self, name: &str, url: &str, owner_id: i64) -> Result<Feed>;
    async fn get_feed_by_url(&self, url: &str) -> Result<Feed>;
    async fn list_feeds(&self) -> Result<Vec<FeedWithOwner>>;
    /// The feed whose watermark is oldest, never-fetched feeds first.
    async fn next_feed_to_fetch(&self) -> Result<Feed>;
    async fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Inserting a post whose URL is already stored (for any feed) fails
    /// with [`Error::Conflict`]; callers on the ingest path treat that as
    /// "already known", not as a failure.
    async fn create_post(&self, post: NewPost<'_>) -> Result<()>;

    async fn create_follow(&self, user_id: i64, feed_id: i64) -> Result<Follow>;
    /// The follow is addressed by user and feed URL, not by follow id.
    async fn delete_follow(&self, user_id: i64, feed_url: &str) -> Result<()>;
    async fn follows_for_user(&self, user_id: i64) -> Result<Vec<String>>;
    /// Posts from feeds the user follows, most recent first.
    async fn posts_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Post>>;
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options: SqliteConnectOptions = database_url
            .parse::<SqliteConnectOptions>()
            .map_err(Error::Storage)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(Error::Storage)?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Storage)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                last_fetched_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Storage)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT,
                published_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Storage)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_follows (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                UNIQUE(user_id, feed_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Storage)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_published
            ON posts(published_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Storage)?;

        Ok(())
    }
}

impl FeedStore for SqliteStore {
    async fn create_user(&self, name: &str) -> Result<User> {
        let result = sqlx::query("INSERT INTO users (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("user", e))?;

        Ok(User {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_user_by_name(&self, name: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("user", e))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("user", e))
    }

    async fn delete_all_users(&self) -> Result<()> {
        sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("user", e))?;
        Ok(())
    }

    async fn create_feed(&self, name: &str, url: &str, owner_id: i64) -> Result<Feed> {
        let result = sqlx::query("INSERT INTO feeds (name, url, user_id) VALUES (?, ?, ?)")
            .bind(name)
            .bind(url)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("feed", e))?;

        Ok(Feed {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            url: url.to_string(),
            user_id: owner_id,
            last_fetched_at: None,
        })
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("feed", e))
    }

    async fn list_feeds(&self) -> Result<Vec<FeedWithOwner>> {
        sqlx::query_as::<_, FeedWithOwner>(
            r#"
            SELECT feeds.id, feeds.name, feeds.url,
                   users.name AS owner_name, feeds.last_fetched_at
            FROM feeds
            INNER JOIN users ON users.id = feeds.user_id
            ORDER BY feeds.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::from_sqlx("feed", e))
    }

    async fn next_feed_to_fetch(&self) -> Result<Feed> {
        sqlx::query_as::<_, Feed>(
            r#"
            SELECT * FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST
            LIMIT 1
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::from_sqlx("feed", e))
    }

    async fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE feeds SET last_fetched_at = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(feed_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("feed", e))?;
        Ok(())
    }

    async fn create_post(&self, post: NewPost<'_>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (feed_id, url, title, description, published_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.feed_id)
        .bind(post.url)
        .bind(post.title)
        .bind(post.description)
        .bind(post.published_at.map(|p| p.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::from_sqlx("post", e))?;
        Ok(())
    }

    async fn create_follow(&self, user_id: i64, feed_id: i64) -> Result<Follow> {
        let result = sqlx::query("INSERT INTO feed_follows (user_id, feed_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::from_sqlx("follow", e))?;

        sqlx::query_as::<_, Follow>(
            r#"
            SELECT feed_follows.id, feed_follows.user_id, feed_follows.feed_id,
                   users.name AS user_name, feeds.name AS feed_name
            FROM feed_follows
            INNER JOIN users ON users.id = feed_follows.user_id
            INNER JOIN feeds ON feeds.id = feed_follows.feed_id
            WHERE feed_follows.id = ?
            "#,
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::from_sqlx("follow", e))
    }

    async fn delete_follow(&self, user_id: i64, feed_url: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows
            WHERE user_id = ?
              AND feed_id IN (SELECT id FROM feeds WHERE url = ?)
            "#,
        )
        .bind(user_id)
        .bind(feed_url)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::from_sqlx("follow", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("follow"));
        }
        Ok(())
    }

    async fn follows_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT feeds.name
            FROM feed_follows
            INNER JOIN feeds ON feeds.id = feed_follows.feed_id
            WHERE feed_follows.user_id = ?
            ORDER BY feed_follows.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::from_sqlx("follow", e))
    }

    async fn posts_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Post>> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT posts.*
            FROM posts
            INNER JOIN feed_follows ON feed_follows.feed_id = posts.feed_id
            WHERE feed_follows.user_id = ?
            ORDER BY posts.published_at DESC NULLS LAST, posts.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::from_sqlx("post", e))
    }
}
