//! crates/skilltrack_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! web layer to be independent of the concrete storage backend and of the
//! AI collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Achievement, ChatbotReply, ForumPost, ForumReply, GeneratedPath, LearningPath,
    LearningPathUpdate, NewAchievement, NewForumPost, NewForumReply, NewLearningPath,
    NewOpportunity, NewResource, NewUser, NewUserProgress, Opportunity, OpportunityType,
    ProgressUpdate, Resource, ResourceType, SkillAnalysis, User, UserProgress, UserStats,
    UserUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// Ordinary absence is never an error: lookup operations return `Ok(None)`
/// and deletions return `Ok(false)` when the record does not exist.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A uniqueness invariant was violated (e.g. username or email taken).
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

/// Data-access contract shared by the persistent and in-memory backends.
///
/// List operations apply filter, then sort, then `limit`, in that order.
/// Every create strips nothing from its input because identifiers and
/// timestamps are simply not representable in the `New*` types; they are
/// assigned by the backend.
#[async_trait]
pub trait StorageService: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> PortResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>>;
    /// Fails with [`PortError::Conflict`] when the username or email is
    /// already taken. Both backends enforce this.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;
    async fn update_user(&self, id: Uuid, updates: UserUpdate) -> PortResult<Option<User>>;

    // --- Learning paths ---
    async fn get_learning_path(&self, id: Uuid) -> PortResult<Option<LearningPath>>;
    /// Paths owned by the user, newest-created first.
    async fn get_learning_paths_by_user(&self, user_id: Uuid) -> PortResult<Vec<LearningPath>>;
    async fn create_learning_path(&self, new_path: NewLearningPath) -> PortResult<LearningPath>;
    async fn update_learning_path(
        &self,
        id: Uuid,
        updates: LearningPathUpdate,
    ) -> PortResult<Option<LearningPath>>;
    async fn delete_learning_path(&self, id: Uuid) -> PortResult<bool>;

    // --- Progress ---
    /// Progress records for the user, optionally narrowed to one path.
    async fn get_user_progress(
        &self,
        user_id: Uuid,
        learning_path_id: Option<Uuid>,
    ) -> PortResult<Vec<UserProgress>>;
    async fn create_progress(&self, new_progress: NewUserProgress) -> PortResult<UserProgress>;
    /// `updated_at` is refreshed to the current time regardless of the
    /// caller-supplied fields.
    async fn update_progress(
        &self,
        id: Uuid,
        updates: ProgressUpdate,
    ) -> PortResult<Option<UserProgress>>;
    /// Aggregate dashboard stats; zeros when the user has no records.
    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats>;

    // --- Achievements ---
    /// Achievements for the user, most recently unlocked first.
    async fn get_user_achievements(&self, user_id: Uuid) -> PortResult<Vec<Achievement>>;
    async fn create_achievement(&self, new_achievement: NewAchievement) -> PortResult<Achievement>;

    // --- Forum ---
    /// Posts newest first, optionally filtered by category.
    async fn get_forum_posts(
        &self,
        limit: i64,
        category: Option<&str>,
    ) -> PortResult<Vec<ForumPost>>;
    async fn get_forum_post(&self, id: Uuid) -> PortResult<Option<ForumPost>>;
    async fn create_forum_post(&self, new_post: NewForumPost) -> PortResult<ForumPost>;
    /// Replies to a post, oldest first.
    async fn get_forum_replies(&self, post_id: Uuid) -> PortResult<Vec<ForumReply>>;
    /// As a side effect, atomically increments the parent post's reply
    /// counter.
    async fn create_forum_reply(&self, new_reply: NewForumReply) -> PortResult<ForumReply>;

    // --- Opportunities ---
    async fn get_opportunities(
        &self,
        limit: i64,
        kind: Option<OpportunityType>,
    ) -> PortResult<Vec<Opportunity>>;
    async fn get_opportunity(&self, id: Uuid) -> PortResult<Option<Opportunity>>;
    async fn create_opportunity(&self, new_opportunity: NewOpportunity) -> PortResult<Opportunity>;

    // --- Resources ---
    async fn get_resources(
        &self,
        limit: i64,
        category: Option<ResourceType>,
    ) -> PortResult<Vec<Resource>>;
    /// Up to four resources whose tags intersect the user's skills
    /// (case-insensitive). A user with no skills gets the first four video
    /// resources instead.
    async fn get_recommended_resources(&self, user_id: Uuid) -> PortResult<Vec<Resource>>;
    async fn create_resource(&self, new_resource: NewResource) -> PortResult<Resource>;

    // --- Auth sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;
    /// Resolves a session id to its user. Expired or unknown sessions
    /// resolve to `None`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Option<Uuid>>;
    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

//=========================================================================================
// AI Collaborator Port
//=========================================================================================

/// Contract for the recommendation/AI collaborator. The route layer consumes
/// this contract but treats the implementation as an external system.
#[async_trait]
pub trait AiService: Send + Sync {
    /// Synthesizes a learning-path proposal from the user's stated skills,
    /// goals and weekly time commitment.
    async fn generate_learning_path(
        &self,
        skills: &[String],
        goals: &str,
        time_commitment: f64,
    ) -> PortResult<GeneratedPath>;

    /// Produces a gap analysis between the user's current skills and an
    /// employable profile.
    async fn analyze_skills(
        &self,
        resume: Option<&str>,
        current_skills: &[String],
    ) -> PortResult<SkillAnalysis>;

    /// Answers a free-form study question.
    async fn chatbot_reply(&self, message: &str, context: Option<&str>)
        -> PortResult<ChatbotReply>;
}
