//! Feed, follow and post repositories for Gator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::fetcher::validate_url;
use super::store::{FeedStore, PostStore};
use super::types::{Feed, FeedFollow, InsertOutcome, NewFeed, NewPost, Post};
use crate::datetime::{format_timestamp, parse_timestamp};
use crate::db::{parse_uuid, DbPool};
use crate::{GatorError, Result};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

const POST_COLUMNS: &str =
    "posts.id, posts.feed_id, posts.title, posts.url, posts.description, posts.published_at, posts.created_at, posts.updated_at";

/// Row type for feeds.
#[derive(Debug, sqlx::FromRow)]
struct FeedRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
}

impl TryFrom<FeedRow> for Feed {
    type Error = GatorError;

    fn try_from(row: FeedRow) -> Result<Self> {
        Ok(Feed {
            id: parse_uuid(&row.id)?,
            name: row.name,
            url: row.url,
            user_id: parse_uuid(&row.user_id)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            last_fetched_at: row
                .last_fetched_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FeedFollowRow {
    id: String,
    user_id: String,
    feed_id: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FeedFollowRow> for FeedFollow {
    type Error = GatorError;

    fn try_from(row: FeedFollowRow) -> Result<Self> {
        Ok(FeedFollow {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            feed_id: parse_uuid(&row.feed_id)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: String,
    feed_id: String,
    title: String,
    url: String,
    description: Option<String>,
    published_at: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PostRow> for Post {
    type Error = GatorError;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: parse_uuid(&row.id)?,
            feed_id: parse_uuid(&row.feed_id)?,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: parse_timestamp(&row.published_at)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Repository for feed operations.
#[derive(Debug, Clone)]
pub struct FeedRepository {
    pool: DbPool,
}

impl FeedRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Create a new feed.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let name = feed.name.trim();
        if name.is_empty() {
            return Err(GatorError::Validation("feed name must not be empty".into()));
        }
        validate_url(&feed.url).map_err(|e| GatorError::Validation(e.to_string()))?;

        let id = Uuid::new_v4();
        let now = format_timestamp(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at, last_fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&feed.url)
        .bind(feed.user_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".into()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// List all feeds in registration order.
    pub async fn list_all(&self) -> Result<Vec<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Feed::try_from).collect()
    }

    /// List feeds owned by a user in registration order.
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Feed>> {
        let query = format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, FeedRow>(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Feed::try_from).collect()
    }

    /// The feed fetched least recently, never-fetched feeds first.
    pub async fn next_to_fetch(&self) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// Set `last_fetched_at` and `updated_at` to `at`.
    pub async fn mark_fetched(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let at = format_timestamp(&at);
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = $1, updated_at = $2 WHERE id = $3")
                .bind(&at)
                .bind(&at)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(GatorError::NotFound("feed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedStore for FeedRepository {
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        self.next_to_fetch().await
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::mark_fetched(self, feed_id, at).await
    }
}

/// Repository for feed follows.
#[derive(Debug, Clone)]
pub struct FeedFollowRepository {
    pool: DbPool,
}

impl FeedFollowRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Make `user_id` follow `feed_id`.
    pub async fn create(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        let id = Uuid::new_v4();
        let now = format_timestamp(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(feed_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, FeedFollowRow>(
            "SELECT id, user_id, feed_id, created_at, updated_at FROM feed_follows WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| GatorError::NotFound("feed follow".into()))?;

        FeedFollow::try_from(row)
    }

    /// List the follows of a user, oldest first.
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>> {
        let rows = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT id, user_id, feed_id, created_at, updated_at
            FROM feed_follows
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FeedFollow::try_from).collect()
    }

    /// Remove a follow. Returns whether one existed.
    pub async fn delete(&self, user_id: Uuid, feed_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id.to_string())
            .bind(feed_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for posts.
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Insert a post, ignoring it if the feed already has one with the same URL.
    pub async fn create_or_ignore(&self, post: &NewPost) -> Result<InsertOutcome> {
        let created_at = format_timestamp(&post.created_at);

        let result = sqlx::query(
            r#"
            INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (feed_id, url) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(post.feed_id.to_string())
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(format_timestamp(&post.published_at))
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::Duplicate)
        }
    }

    /// List posts of a feed, newest first.
    pub async fn list_by_feed(&self, feed_id: Uuid) -> Result<Vec<Post>> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE posts.feed_id = $1
            ORDER BY posts.published_at DESC, posts.id ASC
            "#
        );
        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(feed_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    /// List posts from the feeds a user follows, newest first.
    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Post>> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            JOIN feed_follows ON posts.feed_id = feed_follows.feed_id
            WHERE feed_follows.user_id = $1
            ORDER BY posts.published_at DESC, posts.id ASC
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(user_id.to_string())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    /// Count the posts of a feed.
    pub async fn count_by_feed(&self, feed_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl PostStore for PostRepository {
    async fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome> {
        self.create_or_ignore(post).await
    }
}
