//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `StorageService` port against a relational schema.
//! It handles all interactions with SQLite using `sqlx`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use skilltrack_core::domain::{
    Achievement, Difficulty, ForumPost, ForumReply, LearningPath, LearningPathUpdate, Module,
    NewAchievement, NewForumPost, NewForumReply, NewLearningPath, NewOpportunity, NewResource,
    NewUser, NewUserProgress, Opportunity, OpportunityType, ProgressStatus, ProgressUpdate,
    Resource, ResourceType, Role, User, UserProgress, UserStats, UserUpdate,
};
use skilltrack_core::ports::{PortError, PortResult, StorageService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Wraps an existing connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for the given connection string, creating the database
    /// file when it does not exist yet.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Runs database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Mapping Helpers
//=========================================================================================

fn unexpected(err: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(err.to_string())
}

fn parse_id(raw: &str) -> PortResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| unexpected(format!("malformed id in database: {raw}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> PortResult<String> {
    serde_json::to_string(value).map_err(unexpected)
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> PortResult<T> {
    serde_json::from_str(raw).map_err(unexpected)
}

fn parse_enum<T>(raw: &str, parse: impl Fn(&str) -> Option<T>, what: &str) -> PortResult<T> {
    parse(raw).ok_or_else(|| unexpected(format!("unknown {what} in database: {raw}")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: String,
    username: String,
    email: String,
    password: String,
    full_name: String,
    role: String,
    profile_image: Option<String>,
    bio: Option<String>,
    skills: String,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            username: self.username,
            email: self.email,
            password: self.password,
            full_name: self.full_name,
            role: parse_enum(&self.role, Role::parse, "role")?,
            profile_image: self.profile_image,
            bio: self.bio,
            skills: from_json(&self.skills)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct LearningPathRecord {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    modules: String,
    difficulty: String,
    estimated_hours: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl LearningPathRecord {
    fn to_domain(self) -> PortResult<LearningPath> {
        Ok(LearningPath {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            title: self.title,
            description: self.description,
            modules: from_json::<Vec<Module>>(&self.modules)?,
            difficulty: parse_enum(&self.difficulty, Difficulty::parse, "difficulty")?,
            estimated_hours: self.estimated_hours,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserProgressRecord {
    id: String,
    user_id: String,
    learning_path_id: String,
    module_id: String,
    status: String,
    progress_percentage: i64,
    hours_spent: i64,
    last_accessed: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserProgressRecord {
    fn to_domain(self) -> PortResult<UserProgress> {
        Ok(UserProgress {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            learning_path_id: parse_id(&self.learning_path_id)?,
            module_id: self.module_id,
            status: parse_enum(&self.status, ProgressStatus::parse, "status")?,
            progress_percentage: self.progress_percentage,
            hours_spent: self.hours_spent,
            last_accessed: self.last_accessed,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AchievementRecord {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    badge_icon: String,
    points: i64,
    unlocked_at: DateTime<Utc>,
}

impl AchievementRecord {
    fn to_domain(self) -> PortResult<Achievement> {
        Ok(Achievement {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            title: self.title,
            description: self.description,
            badge_icon: self.badge_icon,
            points: self.points,
            unlocked_at: self.unlocked_at,
        })
    }
}

#[derive(FromRow)]
struct ForumPostRecord {
    id: String,
    user_id: String,
    title: String,
    content: String,
    category: String,
    tags: String,
    likes: i64,
    replies: i64,
    is_resolved: bool,
    created_at: DateTime<Utc>,
}

impl ForumPostRecord {
    fn to_domain(self) -> PortResult<ForumPost> {
        Ok(ForumPost {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            title: self.title,
            content: self.content,
            category: self.category,
            tags: from_json(&self.tags)?,
            likes: self.likes,
            replies: self.replies,
            is_resolved: self.is_resolved,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ForumReplyRecord {
    id: String,
    user_id: String,
    post_id: String,
    content: String,
    likes: i64,
    is_accepted: bool,
    created_at: DateTime<Utc>,
}

impl ForumReplyRecord {
    fn to_domain(self) -> PortResult<ForumReply> {
        Ok(ForumReply {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            post_id: parse_id(&self.post_id)?,
            content: self.content,
            likes: self.likes,
            is_accepted: self.is_accepted,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct OpportunityRecord {
    id: String,
    title: String,
    description: String,
    #[sqlx(rename = "type")]
    kind: String,
    company: Option<String>,
    location: Option<String>,
    is_remote: bool,
    requirements: String,
    application_url: Option<String>,
    deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl OpportunityRecord {
    fn to_domain(self) -> PortResult<Opportunity> {
        Ok(Opportunity {
            id: parse_id(&self.id)?,
            title: self.title,
            description: self.description,
            kind: parse_enum(&self.kind, OpportunityType::parse, "opportunity type")?,
            company: self.company,
            location: self.location,
            is_remote: self.is_remote,
            requirements: from_json(&self.requirements)?,
            application_url: self.application_url,
            deadline: self.deadline,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ResourceRecord {
    id: String,
    title: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    kind: String,
    platform: String,
    url: String,
    thumbnail: Option<String>,
    duration: Option<String>,
    rating: i64,
    difficulty: String,
    tags: String,
    is_free: bool,
    price: Option<String>,
    created_at: DateTime<Utc>,
}

impl ResourceRecord {
    fn to_domain(self) -> PortResult<Resource> {
        Ok(Resource {
            id: parse_id(&self.id)?,
            title: self.title,
            description: self.description,
            kind: parse_enum(&self.kind, ResourceType::parse, "resource type")?,
            platform: self.platform,
            url: self.url,
            thumbnail: self.thumbnail,
            duration: self.duration,
            rating: self.rating,
            difficulty: parse_enum(&self.difficulty, Difficulty::parse, "difficulty")?,
            tags: from_json(&self.tags)?,
            is_free: self.is_free,
            price: self.price,
            created_at: self.created_at,
        })
    }
}

fn collect_domain<R, T>(records: Vec<R>, to_domain: impl Fn(R) -> PortResult<T>) -> PortResult<Vec<T>> {
    records.into_iter().map(to_domain).collect()
}

//=========================================================================================
// `StorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StorageService for SqliteStorage {
    // --- Users ---

    async fn get_user(&self, id: Uuid) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        record.map(UserRecord::to_domain).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        record.map(UserRecord::to_domain).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        record.map(UserRecord::to_domain).transpose()
    }

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            full_name: new_user.full_name,
            role: new_user.role,
            profile_image: new_user.profile_image,
            bio: new_user.bio,
            skills: new_user.skills,
            created_at: Utc::now(),
        };
        // The UNIQUE columns do the duplicate detection, so a racing
        // registration cannot slip past; the driver error is translated into
        // a typed conflict.
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password, full_name, role, profile_image, bio, skills, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.profile_image)
        .bind(&user.bio)
        .bind(to_json(&user.skills)?)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(PortError::Conflict(
                "username or email already taken".to_string(),
            )),
            Err(e) => Err(unexpected(e)),
        }
    }

    async fn update_user(&self, id: Uuid, updates: UserUpdate) -> PortResult<Option<User>> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };
        updates.apply(&mut user);
        sqlx::query(
            "UPDATE users SET full_name = ?, role = ?, profile_image = ?, bio = ?, skills = ? WHERE id = ?",
        )
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.profile_image)
        .bind(&user.bio)
        .bind(to_json(&user.skills)?)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(Some(user))
    }

    // --- Learning paths ---

    async fn get_learning_path(&self, id: Uuid) -> PortResult<Option<LearningPath>> {
        let record =
            sqlx::query_as::<_, LearningPathRecord>("SELECT * FROM learning_paths WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        record.map(LearningPathRecord::to_domain).transpose()
    }

    async fn get_learning_paths_by_user(&self, user_id: Uuid) -> PortResult<Vec<LearningPath>> {
        let records = sqlx::query_as::<_, LearningPathRecord>(
            "SELECT * FROM learning_paths WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect_domain(records, LearningPathRecord::to_domain)
    }

    async fn create_learning_path(&self, new_path: NewLearningPath) -> PortResult<LearningPath> {
        let path = LearningPath {
            id: Uuid::new_v4(),
            user_id: new_path.user_id,
            title: new_path.title,
            description: new_path.description,
            modules: new_path.modules,
            difficulty: new_path.difficulty,
            estimated_hours: new_path.estimated_hours,
            is_active: new_path.is_active,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO learning_paths (id, user_id, title, description, modules, difficulty, estimated_hours, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(path.id.to_string())
        .bind(path.user_id.to_string())
        .bind(&path.title)
        .bind(&path.description)
        .bind(to_json(&path.modules)?)
        .bind(path.difficulty.as_str())
        .bind(path.estimated_hours)
        .bind(path.is_active)
        .bind(path.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(path)
    }

    async fn update_learning_path(
        &self,
        id: Uuid,
        updates: LearningPathUpdate,
    ) -> PortResult<Option<LearningPath>> {
        let Some(mut path) = self.get_learning_path(id).await? else {
            return Ok(None);
        };
        updates.apply(&mut path);
        sqlx::query(
            "UPDATE learning_paths SET title = ?, description = ?, modules = ?, difficulty = ?, estimated_hours = ?, is_active = ? \
             WHERE id = ?",
        )
        .bind(&path.title)
        .bind(&path.description)
        .bind(to_json(&path.modules)?)
        .bind(path.difficulty.as_str())
        .bind(path.estimated_hours)
        .bind(path.is_active)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(Some(path))
    }

    async fn delete_learning_path(&self, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM learning_paths WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    // --- Progress ---

    async fn get_user_progress(
        &self,
        user_id: Uuid,
        learning_path_id: Option<Uuid>,
    ) -> PortResult<Vec<UserProgress>> {
        let records = match learning_path_id {
            Some(path_id) => {
                sqlx::query_as::<_, UserProgressRecord>(
                    "SELECT * FROM user_progress WHERE user_id = ? AND learning_path_id = ?",
                )
                .bind(user_id.to_string())
                .bind(path_id.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, UserProgressRecord>(
                    "SELECT * FROM user_progress WHERE user_id = ?",
                )
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(unexpected)?;
        collect_domain(records, UserProgressRecord::to_domain)
    }

    async fn create_progress(&self, new_progress: NewUserProgress) -> PortResult<UserProgress> {
        let now = Utc::now();
        let progress = UserProgress {
            id: Uuid::new_v4(),
            user_id: new_progress.user_id,
            learning_path_id: new_progress.learning_path_id,
            module_id: new_progress.module_id,
            status: new_progress.status,
            progress_percentage: new_progress.progress_percentage,
            hours_spent: new_progress.hours_spent,
            last_accessed: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO user_progress (id, user_id, learning_path_id, module_id, status, progress_percentage, hours_spent, last_accessed, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(progress.id.to_string())
        .bind(progress.user_id.to_string())
        .bind(progress.learning_path_id.to_string())
        .bind(&progress.module_id)
        .bind(progress.status.as_str())
        .bind(progress.progress_percentage)
        .bind(progress.hours_spent)
        .bind(progress.last_accessed)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(progress)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        updates: ProgressUpdate,
    ) -> PortResult<Option<UserProgress>> {
        let record =
            sqlx::query_as::<_, UserProgressRecord>("SELECT * FROM user_progress WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        let Some(mut progress) = record.map(UserProgressRecord::to_domain).transpose()? else {
            return Ok(None);
        };
        updates.apply(&mut progress);
        // Refreshed unconditionally; the caller has no say.
        progress.updated_at = Utc::now();
        sqlx::query(
            "UPDATE user_progress SET status = ?, progress_percentage = ?, hours_spent = ?, last_accessed = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(progress.status.as_str())
        .bind(progress.progress_percentage)
        .bind(progress.hours_spent)
        .bind(progress.last_accessed)
        .bind(progress.updated_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(Some(progress))
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        // The hour total is summed by the database engine rather than in
        // application code.
        let learning_hours: Option<i64> =
            sqlx::query_scalar("SELECT SUM(hours_spent) FROM user_progress WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;

        let skills_mastered: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_progress WHERE user_id = ? AND status = 'completed'",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let average_progress: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(progress_percentage) FROM user_progress WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let points: Option<i64> =
            sqlx::query_scalar("SELECT SUM(points) FROM achievements WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;

        Ok(UserStats {
            learning_hours: learning_hours.unwrap_or(0),
            skills_mastered,
            course_progress: average_progress.map(|avg| avg.round() as i64).unwrap_or(0),
            points: points.unwrap_or(0),
        })
    }

    // --- Achievements ---

    async fn get_user_achievements(&self, user_id: Uuid) -> PortResult<Vec<Achievement>> {
        let records = sqlx::query_as::<_, AchievementRecord>(
            "SELECT * FROM achievements WHERE user_id = ? ORDER BY unlocked_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect_domain(records, AchievementRecord::to_domain)
    }

    async fn create_achievement(&self, new_achievement: NewAchievement) -> PortResult<Achievement> {
        let achievement = Achievement {
            id: Uuid::new_v4(),
            user_id: new_achievement.user_id,
            title: new_achievement.title,
            description: new_achievement.description,
            badge_icon: new_achievement.badge_icon,
            points: new_achievement.points,
            unlocked_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO achievements (id, user_id, title, description, badge_icon, points, unlocked_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(achievement.id.to_string())
        .bind(achievement.user_id.to_string())
        .bind(&achievement.title)
        .bind(&achievement.description)
        .bind(&achievement.badge_icon)
        .bind(achievement.points)
        .bind(achievement.unlocked_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(achievement)
    }

    // --- Forum ---

    async fn get_forum_posts(
        &self,
        limit: i64,
        category: Option<&str>,
    ) -> PortResult<Vec<ForumPost>> {
        // A negative bound would read as LIMIT -1, which SQLite treats as
        // unlimited.
        let limit = limit.max(0);
        let records = match category {
            Some(category) => {
                sqlx::query_as::<_, ForumPostRecord>(
                    "SELECT * FROM forum_posts WHERE category = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(category)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ForumPostRecord>(
                    "SELECT * FROM forum_posts ORDER BY created_at DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(unexpected)?;
        collect_domain(records, ForumPostRecord::to_domain)
    }

    async fn get_forum_post(&self, id: Uuid) -> PortResult<Option<ForumPost>> {
        let record = sqlx::query_as::<_, ForumPostRecord>("SELECT * FROM forum_posts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        record.map(ForumPostRecord::to_domain).transpose()
    }

    async fn create_forum_post(&self, new_post: NewForumPost) -> PortResult<ForumPost> {
        let post = ForumPost {
            id: Uuid::new_v4(),
            user_id: new_post.user_id,
            title: new_post.title,
            content: new_post.content,
            category: new_post.category,
            tags: new_post.tags,
            likes: 0,
            replies: 0,
            is_resolved: false,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO forum_posts (id, user_id, title, content, category, tags, likes, replies, is_resolved, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, ?)",
        )
        .bind(post.id.to_string())
        .bind(post.user_id.to_string())
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.category)
        .bind(to_json(&post.tags)?)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(post)
    }

    async fn get_forum_replies(&self, post_id: Uuid) -> PortResult<Vec<ForumReply>> {
        let records = sqlx::query_as::<_, ForumReplyRecord>(
            "SELECT * FROM forum_replies WHERE post_id = ? ORDER BY created_at ASC",
        )
        .bind(post_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect_domain(records, ForumReplyRecord::to_domain)
    }

    async fn create_forum_reply(&self, new_reply: NewForumReply) -> PortResult<ForumReply> {
        let reply = ForumReply {
            id: Uuid::new_v4(),
            user_id: new_reply.user_id,
            post_id: new_reply.post_id,
            content: new_reply.content,
            likes: 0,
            is_accepted: false,
            created_at: Utc::now(),
        };

        // One transaction covers the insert and the counter bump. The bump
        // itself is a single atomic update expression, never a
        // read-modify-write round trip.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        sqlx::query(
            "INSERT INTO forum_replies (id, user_id, post_id, content, likes, is_accepted, created_at) \
             VALUES (?, ?, ?, ?, 0, 0, ?)",
        )
        .bind(reply.id.to_string())
        .bind(reply.user_id.to_string())
        .bind(reply.post_id.to_string())
        .bind(&reply.content)
        .bind(reply.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query("UPDATE forum_posts SET replies = replies + 1 WHERE id = ?")
            .bind(reply.post_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;

        Ok(reply)
    }

    // --- Opportunities ---

    async fn get_opportunities(
        &self,
        limit: i64,
        kind: Option<OpportunityType>,
    ) -> PortResult<Vec<Opportunity>> {
        let limit = limit.max(0);
        let records = match kind {
            Some(kind) => {
                sqlx::query_as::<_, OpportunityRecord>(
                    "SELECT * FROM opportunities WHERE type = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(kind.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, OpportunityRecord>(
                    "SELECT * FROM opportunities ORDER BY created_at DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(unexpected)?;
        collect_domain(records, OpportunityRecord::to_domain)
    }

    async fn get_opportunity(&self, id: Uuid) -> PortResult<Option<Opportunity>> {
        let record =
            sqlx::query_as::<_, OpportunityRecord>("SELECT * FROM opportunities WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        record.map(OpportunityRecord::to_domain).transpose()
    }

    async fn create_opportunity(&self, new_opportunity: NewOpportunity) -> PortResult<Opportunity> {
        let opportunity = Opportunity {
            id: Uuid::new_v4(),
            title: new_opportunity.title,
            description: new_opportunity.description,
            kind: new_opportunity.kind,
            company: new_opportunity.company,
            location: new_opportunity.location,
            is_remote: new_opportunity.is_remote,
            requirements: new_opportunity.requirements,
            application_url: new_opportunity.application_url,
            deadline: new_opportunity.deadline,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO opportunities (id, title, description, type, company, location, is_remote, requirements, application_url, deadline, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(opportunity.id.to_string())
        .bind(&opportunity.title)
        .bind(&opportunity.description)
        .bind(opportunity.kind.as_str())
        .bind(&opportunity.company)
        .bind(&opportunity.location)
        .bind(opportunity.is_remote)
        .bind(to_json(&opportunity.requirements)?)
        .bind(&opportunity.application_url)
        .bind(opportunity.deadline)
        .bind(opportunity.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(opportunity)
    }

    // --- Resources ---

    async fn get_resources(
        &self,
        limit: i64,
        category: Option<ResourceType>,
    ) -> PortResult<Vec<Resource>> {
        let limit = limit.max(0);
        let records = match category {
            Some(category) => {
                sqlx::query_as::<_, ResourceRecord>(
                    "SELECT * FROM resources WHERE type = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(category.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ResourceRecord>(
                    "SELECT * FROM resources ORDER BY created_at DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(unexpected)?;
        collect_domain(records, ResourceRecord::to_domain)
    }

    async fn get_recommended_resources(&self, user_id: Uuid) -> PortResult<Vec<Resource>> {
        let skills: Vec<String> = match self.get_user(user_id).await? {
            Some(user) => user.skills.iter().map(|s| s.to_lowercase()).collect(),
            None => Vec::new(),
        };
        if skills.is_empty() {
            return self.get_resources(4, Some(ResourceType::Video)).await;
        }

        // Tag matching happens on the JSON payload, so filter in application
        // code rather than in SQL.
        let records = sqlx::query_as::<_, ResourceRecord>("SELECT * FROM resources")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        let mut matches = Vec::new();
        for record in records {
            let resource = record.to_domain()?;
            if resource
                .tags
                .iter()
                .any(|tag| skills.contains(&tag.to_lowercase()))
            {
                matches.push(resource);
                if matches.len() == 4 {
                    break;
                }
            }
        }
        Ok(matches)
    }

    async fn create_resource(&self, new_resource: NewResource) -> PortResult<Resource> {
        let resource = Resource {
            id: Uuid::new_v4(),
            title: new_resource.title,
            description: new_resource.description,
            kind: new_resource.kind,
            platform: new_resource.platform,
            url: new_resource.url,
            thumbnail: new_resource.thumbnail,
            duration: new_resource.duration,
            rating: new_resource.rating,
            difficulty: new_resource.difficulty,
            tags: new_resource.tags,
            is_free: new_resource.is_free,
            price: new_resource.price,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO resources (id, title, description, type, platform, url, thumbnail, duration, rating, difficulty, tags, is_free, price, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(resource.id.to_string())
        .bind(&resource.title)
        .bind(&resource.description)
        .bind(resource.kind.as_str())
        .bind(&resource.platform)
        .bind(&resource.url)
        .bind(&resource.thumbnail)
        .bind(&resource.duration)
        .bind(resource.rating)
        .bind(resource.difficulty.as_str())
        .bind(to_json(&resource.tags)?)
        .bind(resource.is_free)
        .bind(&resource.price)
        .bind(resource.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(resource)
    }

    // --- Auth sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(user_id.to_string())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Option<Uuid>> {
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT user_id, expires_at FROM auth_sessions WHERE id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        match row {
            Some((user_id, expires_at)) if expires_at > Utc::now() => {
                Ok(Some(parse_id(&user_id)?))
            }
            Some(_) => {
                self.delete_auth_session(session_id).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_storage() -> SqliteStorage {
        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let storage = SqliteStorage::new(pool);
        storage.run_migrations().await.expect("migrations");
        storage
    }

    async fn seeded_user(storage: &SqliteStorage, username: &str, skills: Vec<String>) -> User {
        storage
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "hashed".to_string(),
                full_name: "Test User".to_string(),
                role: Default::default(),
                profile_image: None,
                bio: None,
                skills,
            })
            .await
            .expect("create user")
    }

    #[tokio::test]
    async fn user_round_trips_through_relational_schema() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "rowan", vec!["Rust".to_string()]).await;

        let by_id = storage.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "rowan");
        assert_eq!(by_id.skills, vec!["Rust".to_string()]);

        let by_name = storage.get_user_by_username("rowan").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(storage.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_columns_surface_as_conflicts() {
        let storage = test_storage().await;
        seeded_user(&storage, "taken", vec![]).await;

        // Duplicate username. This exercises the constraint path itself, so
        // a duplicate arriving mid-flight gets the same typed error.
        let err = storage
            .create_user(NewUser {
                username: "taken".to_string(),
                email: "fresh@example.com".to_string(),
                password: "hashed".to_string(),
                full_name: "Other".to_string(),
                role: Default::default(),
                profile_image: None,
                bio: None,
                skills: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));

        // Duplicate email, fresh username.
        let err = storage
            .create_user(NewUser {
                username: "someone_else".to_string(),
                email: "taken@example.com".to_string(),
                password: "hashed".to_string(),
                full_name: "Other".to_string(),
                role: Default::default(),
                profile_image: None,
                bio: None,
                skills: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn learning_path_update_merges_and_persists() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "paths", vec![]).await;
        let path = storage
            .create_learning_path(NewLearningPath {
                user_id: user.id,
                title: "Databases".to_string(),
                description: Some("From B-trees up".to_string()),
                modules: vec![Module {
                    id: "module1".to_string(),
                    title: "Storage engines".to_string(),
                    description: String::new(),
                    estimated_hours: 4.0,
                    status: Default::default(),
                }],
                difficulty: Difficulty::Intermediate,
                estimated_hours: 12,
                is_active: true,
            })
            .await
            .unwrap();

        let updated = storage
            .update_learning_path(
                path.id,
                LearningPathUpdate {
                    title: Some("X".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "X");

        let fetched = storage.get_learning_path(path.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "X");
        assert_eq!(fetched.description.as_deref(), Some("From B-trees up"));
        assert_eq!(fetched.modules.len(), 1);
        assert_eq!(fetched.difficulty, Difficulty::Intermediate);

        assert!(storage
            .update_learning_path(Uuid::new_v4(), LearningPathUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn paths_list_newest_first_per_owner() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "order", vec![]).await;
        let other = seeded_user(&storage, "other", vec![]).await;

        let make = |uid: Uuid, title: &str| NewLearningPath {
            user_id: uid,
            title: title.to_string(),
            description: None,
            modules: vec![],
            difficulty: Default::default(),
            estimated_hours: 0,
            is_active: true,
        };
        let older = storage.create_learning_path(make(user.id, "Older")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = storage.create_learning_path(make(user.id, "Newer")).await.unwrap();
        storage.create_learning_path(make(other.id, "Foreign")).await.unwrap();

        let paths = storage.get_learning_paths_by_user(user.id).await.unwrap();
        assert_eq!(
            paths.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
    }

    #[tokio::test]
    async fn stats_use_sql_aggregates() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "stats", vec![]).await;
        let path = storage
            .create_learning_path(NewLearningPath {
                user_id: user.id,
                title: "Stats".to_string(),
                description: None,
                modules: vec![],
                difficulty: Default::default(),
                estimated_hours: 0,
                is_active: true,
            })
            .await
            .unwrap();

        assert_eq!(
            storage.get_user_stats(user.id).await.unwrap(),
            UserStats { learning_hours: 0, skills_mastered: 0, course_progress: 0, points: 0 }
        );

        for (status, pct, hours) in [
            (ProgressStatus::Completed, 100, 2),
            (ProgressStatus::InProgress, 50, 3),
        ] {
            storage
                .create_progress(NewUserProgress {
                    user_id: user.id,
                    learning_path_id: path.id,
                    module_id: "module1".to_string(),
                    status,
                    progress_percentage: pct,
                    hours_spent: hours,
                })
                .await
                .unwrap();
        }
        storage
            .create_achievement(NewAchievement {
                user_id: user.id,
                title: "Thirty".to_string(),
                description: None,
                badge_icon: "medal".to_string(),
                points: 30,
            })
            .await
            .unwrap();

        assert_eq!(
            storage.get_user_stats(user.id).await.unwrap(),
            UserStats { learning_hours: 5, skills_mastered: 1, course_progress: 75, points: 30 }
        );
    }

    #[tokio::test]
    async fn reply_counter_increments_inside_the_transaction() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "replies", vec![]).await;
        let post = storage
            .create_forum_post(NewForumPost {
                user_id: user.id,
                title: "Sqlite locking".to_string(),
                content: "Who owns the write lock?".to_string(),
                category: "databases".to_string(),
                tags: vec!["sqlite".to_string()],
            })
            .await
            .unwrap();

        storage
            .create_forum_reply(NewForumReply {
                user_id: user.id,
                post_id: post.id,
                content: "The single writer does.".to_string(),
            })
            .await
            .unwrap();

        let fetched = storage.get_forum_post(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.replies, 1);

        let replies = storage.get_forum_replies(post.id).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "The single writer does.");
    }

    #[tokio::test]
    async fn negative_limits_return_nothing_instead_of_everything() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "lister", vec![]).await;
        storage
            .create_forum_post(NewForumPost {
                user_id: user.id,
                title: "Limits".to_string(),
                content: "How low can they go?".to_string(),
                category: "meta".to_string(),
                tags: vec![],
            })
            .await
            .unwrap();

        assert!(storage.get_forum_posts(-1, None).await.unwrap().is_empty());
        assert!(storage.get_opportunities(-1, None).await.unwrap().is_empty());
        assert!(storage.get_resources(-1, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recommendations_fall_back_without_skills() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "unskilled", vec![]).await;

        storage
            .create_resource(NewResource {
                title: "Ownership in Rust".to_string(),
                description: None,
                kind: ResourceType::Video,
                platform: "youtube".to_string(),
                url: "https://example.com/ownership".to_string(),
                thumbnail: None,
                duration: None,
                rating: 5,
                difficulty: Default::default(),
                tags: vec!["Rust".to_string()],
                is_free: true,
                price: None,
            })
            .await
            .unwrap();

        let fallback = storage.get_recommended_resources(user.id).await.unwrap();
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].kind, ResourceType::Video);

        let skilled = seeded_user(&storage, "rustacean", vec!["rust".to_string()]).await;
        let matched = storage.get_recommended_resources(skilled.id).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title, "Ownership in Rust");
    }

    #[tokio::test]
    async fn auth_sessions_expire_in_the_sessions_table() {
        let storage = test_storage().await;
        let user = seeded_user(&storage, "cookie", vec![]).await;

        storage
            .create_auth_session("fresh", user.id, Utc::now() + Duration::days(30))
            .await
            .unwrap();
        storage
            .create_auth_session("stale", user.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(
            storage.validate_auth_session("fresh").await.unwrap(),
            Some(user.id)
        );
        assert_eq!(storage.validate_auth_session("stale").await.unwrap(), None);

        storage.delete_auth_session("fresh").await.unwrap();
        assert_eq!(storage.validate_auth_session("fresh").await.unwrap(), None);
    }
}
