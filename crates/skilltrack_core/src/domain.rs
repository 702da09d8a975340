//! crates/skilltrack_core/src/domain.rs
//!
//! Defines the core data structures for the platform: the persisted entities,
//! the validated insert ("new") types, and the partial-update types. These are
//! independent of any storage backend; the wire format is camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Validation
//=========================================================================================

/// Raised when an insert or update payload fails a schema rule.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

fn require_non_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

//=========================================================================================
// Enumerations
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Beginner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl Default for ProgressStatus {
    fn default() -> Self {
        ProgressStatus::NotStarted
    }
}

/// Status of a module embedded in a learning path. Unlike [`ProgressStatus`]
/// a module can also be `locked` (not yet reachable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    NotStarted,
    InProgress,
    Completed,
    Locked,
}

impl Default for ModuleStatus {
    fn default() -> Self {
        ModuleStatus::NotStarted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    Internship,
    Hackathon,
    Workshop,
    Job,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Video,
    Article,
    Course,
    Tutorial,
}

macro_rules! enum_text {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// The storage representation of the variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }

            /// Parses the storage representation back into the variant.
            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $($text => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

enum_text!(Role { Student => "student", Instructor => "instructor" });
enum_text!(Difficulty { Beginner => "beginner", Intermediate => "intermediate", Advanced => "advanced" });
enum_text!(ProgressStatus { NotStarted => "not_started", InProgress => "in_progress", Completed => "completed" });
enum_text!(OpportunityType { Internship => "internship", Hackathon => "hackathon", Workshop => "workshop", Job => "job" });
enum_text!(ResourceType { Video => "video", Article => "article", Course => "course", Tutorial => "tutorial" });

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 hash of the user's password. Never serialized to clients.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Already hashed by the caller; storage never sees cleartext.
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.username, "username")?;
        require_non_empty(&self.email, "email")?;
        require_non_empty(&self.password, "password")?;
        require_non_empty(&self.full_name, "fullName")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
}

impl UserUpdate {
    /// Merges the supplied fields into an existing record.
    pub fn apply(self, user: &mut User) {
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(profile_image) = self.profile_image {
            user.profile_image = Some(profile_image);
        }
        if let Some(bio) = self.bio {
            user.bio = Some(bio);
        }
        if let Some(skills) = self.skills {
            user.skills = skills;
        }
    }
}

//=========================================================================================
// Learning paths
//=========================================================================================

/// A unit of a learning path. Modules are embedded as structured data inside
/// the path record rather than persisted as their own entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub status: ModuleStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub modules: Vec<Module>,
    pub difficulty: Difficulty,
    pub estimated_hours: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLearningPath {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_hours: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl NewLearningPath {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "title")?;
        if self.estimated_hours < 0 {
            return Err(ValidationError::OutOfRange("estimatedHours"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub modules: Option<Vec<Module>>,
    pub difficulty: Option<Difficulty>,
    pub estimated_hours: Option<i64>,
    pub is_active: Option<bool>,
}

impl LearningPathUpdate {
    /// Merges the supplied fields into an existing record.
    pub fn apply(self, path: &mut LearningPath) {
        if let Some(title) = self.title {
            path.title = title;
        }
        if let Some(description) = self.description {
            path.description = Some(description);
        }
        if let Some(modules) = self.modules {
            path.modules = modules;
        }
        if let Some(difficulty) = self.difficulty {
            path.difficulty = difficulty;
        }
        if let Some(estimated_hours) = self.estimated_hours {
            path.estimated_hours = estimated_hours;
        }
        if let Some(is_active) = self.is_active {
            path.is_active = is_active;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_non_empty(title, "title")?;
        }
        if matches!(self.estimated_hours, Some(hours) if hours < 0) {
            return Err(ValidationError::OutOfRange("estimatedHours"));
        }
        Ok(())
    }
}

//=========================================================================================
// Progress
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub learning_path_id: Uuid,
    pub module_id: String,
    pub status: ProgressStatus,
    pub progress_percentage: i64,
    pub hours_spent: i64,
    pub last_accessed: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserProgress {
    pub user_id: Uuid,
    pub learning_path_id: Uuid,
    pub module_id: String,
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub progress_percentage: i64,
    #[serde(default)]
    pub hours_spent: i64,
}

impl NewUserProgress {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.module_id, "moduleId")?;
        if !(0..=100).contains(&self.progress_percentage) {
            return Err(ValidationError::OutOfRange("progressPercentage"));
        }
        if self.hours_spent < 0 {
            return Err(ValidationError::OutOfRange("hoursSpent"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub status: Option<ProgressStatus>,
    pub progress_percentage: Option<i64>,
    pub hours_spent: Option<i64>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl ProgressUpdate {
    /// Merges the supplied fields into an existing record. The caller is
    /// responsible for refreshing `updated_at`.
    pub fn apply(self, progress: &mut UserProgress) {
        if let Some(status) = self.status {
            progress.status = status;
        }
        if let Some(percentage) = self.progress_percentage {
            progress.progress_percentage = percentage;
        }
        if let Some(hours) = self.hours_spent {
            progress.hours_spent = hours;
        }
        if let Some(last_accessed) = self.last_accessed {
            progress.last_accessed = last_accessed;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.progress_percentage, Some(pct) if !(0..=100).contains(&pct)) {
            return Err(ValidationError::OutOfRange("progressPercentage"));
        }
        if matches!(self.hours_spent, Some(hours) if hours < 0) {
            return Err(ValidationError::OutOfRange("hoursSpent"));
        }
        Ok(())
    }
}

/// Aggregate dashboard figures for one user. All zeros when the user has no
/// progress or achievement records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub learning_hours: i64,
    pub skills_mastered: i64,
    pub course_progress: i64,
    pub points: i64,
}

//=========================================================================================
// Achievements
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub badge_icon: String,
    pub points: i64,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAchievement {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub badge_icon: String,
    #[serde(default)]
    pub points: i64,
}

impl NewAchievement {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "title")?;
        require_non_empty(&self.badge_icon, "badgeIcon")?;
        if self.points < 0 {
            return Err(ValidationError::OutOfRange("points"));
        }
        Ok(())
    }
}

//=========================================================================================
// Forum
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub likes: i64,
    /// Denormalized reply counter, incremented atomically by the storage
    /// layer whenever a reply is created.
    pub replies: i64,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewForumPost {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewForumPost {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "title")?;
        require_non_empty(&self.content, "content")?;
        require_non_empty(&self.category, "category")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumReply {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub content: String,
    pub likes: i64,
    pub is_accepted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewForumReply {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub content: String,
}

impl NewForumReply {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.content, "content")
    }
}

//=========================================================================================
// Opportunities
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    pub company: Option<String>,
    pub location: Option<String>,
    pub is_remote: bool,
    pub requirements: Vec<String>,
    pub application_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOpportunity {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub application_url: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl NewOpportunity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "title")?;
        require_non_empty(&self.description, "description")?;
        Ok(())
    }
}

//=========================================================================================
// Resources
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub platform: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub rating: i64,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub is_free: bool,
    pub price: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_free: bool,
    #[serde(default)]
    pub price: Option<String>,
}

impl NewResource {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "title")?;
        require_non_empty(&self.platform, "platform")?;
        require_non_empty(&self.url, "url")?;
        if !(0..=5).contains(&self.rating) {
            return Err(ValidationError::OutOfRange("rating"));
        }
        Ok(())
    }
}

//=========================================================================================
// Auth sessions
//=========================================================================================

/// A browser login session (auth cookie), persisted decoupled from the
/// business entities.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// AI collaborator payloads
//=========================================================================================

/// A synthesized learning path proposal returned by the AI collaborator.
/// This is not a persisted entity; the client may turn it into one via the
/// regular learning-path create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPath {
    pub title: String,
    pub description: String,
    pub modules: Vec<Module>,
    pub difficulty: Difficulty,
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecommendation {
    pub skill: String,
    pub priority: String,
    pub reason: String,
    pub estimated_learning_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAnalysis {
    pub current_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<SkillRecommendation>,
    pub overall_readiness: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotReply {
    pub message: String,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_progress() -> NewUserProgress {
        NewUserProgress {
            user_id: Uuid::new_v4(),
            learning_path_id: Uuid::new_v4(),
            module_id: "module1".to_string(),
            status: ProgressStatus::InProgress,
            progress_percentage: 50,
            hours_spent: 2,
        }
    }

    #[test]
    fn new_learning_path_rejects_empty_title() {
        let path = NewLearningPath {
            user_id: Uuid::new_v4(),
            title: "   ".to_string(),
            description: None,
            modules: vec![],
            difficulty: Difficulty::Beginner,
            estimated_hours: 0,
            is_active: true,
        };
        assert_eq!(path.validate(), Err(ValidationError::Empty("title")));
    }

    #[test]
    fn progress_percentage_must_stay_within_bounds() {
        let mut progress = sample_progress();
        assert!(progress.validate().is_ok());

        progress.progress_percentage = 101;
        assert_eq!(
            progress.validate(),
            Err(ValidationError::OutOfRange("progressPercentage"))
        );
    }

    #[test]
    fn resource_rating_must_stay_within_bounds() {
        let resource = NewResource {
            title: "Intro".to_string(),
            description: None,
            kind: ResourceType::Video,
            platform: "youtube".to_string(),
            url: "https://example.com".to_string(),
            thumbnail: None,
            duration: None,
            rating: 6,
            difficulty: Difficulty::Beginner,
            tags: vec![],
            is_free: true,
            price: None,
        };
        assert_eq!(resource.validate(), Err(ValidationError::OutOfRange("rating")));
    }

    #[test]
    fn enums_round_trip_through_storage_text() {
        assert_eq!(Difficulty::parse(Difficulty::Advanced.as_str()), Some(Difficulty::Advanced));
        assert_eq!(
            ProgressStatus::parse(ProgressStatus::NotStarted.as_str()),
            Some(ProgressStatus::NotStarted)
        );
        assert_eq!(OpportunityType::parse("job"), Some(OpportunityType::Job));
        assert_eq!(ResourceType::parse("unknown"), None);
    }

    #[test]
    fn partial_update_types_default_to_no_changes() {
        let update = LearningPathUpdate::default();
        assert!(update.validate().is_ok());
        assert!(update.title.is_none() && update.is_active.is_none());
    }

    #[test]
    fn wire_format_is_camel_case_with_type_field() {
        let opportunity = NewOpportunity {
            title: "Frontend Developer Intern".to_string(),
            description: "Work on real projects".to_string(),
            kind: OpportunityType::Internship,
            company: Some("TechCorp".to_string()),
            location: None,
            is_remote: true,
            requirements: vec!["React".to_string()],
            application_url: None,
            deadline: None,
        };
        let json = serde_json::to_value(&opportunity).unwrap();
        assert_eq!(json["type"], "internship");
        assert_eq!(json["isRemote"], true);
        assert_eq!(json["applicationUrl"], serde_json::Value::Null);
    }
}
