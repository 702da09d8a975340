//! services/api/src/adapters/memory.rs
//!
//! In-memory implementation of the `StorageService` port. State lives in
//! process-local keyed collections behind a single lock and is lost on
//! restart. The store is seeded with sample opportunities and resources at
//! construction so the system is usable without any write operations.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use skilltrack_core::domain::{
    Achievement, AuthSession, Difficulty, ForumPost, ForumReply, LearningPath, LearningPathUpdate,
    NewAchievement, NewForumPost, NewForumReply, NewLearningPath, NewOpportunity, NewResource,
    NewUser, NewUserProgress, Opportunity, OpportunityType, ProgressStatus, ProgressUpdate,
    Resource, ResourceType, User, UserProgress, UserStats, UserUpdate,
};
use skilltrack_core::ports::{PortError, PortResult, StorageService};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    learning_paths: HashMap<Uuid, LearningPath>,
    user_progress: HashMap<Uuid, UserProgress>,
    achievements: HashMap<Uuid, Achievement>,
    forum_posts: HashMap<Uuid, ForumPost>,
    forum_replies: HashMap<Uuid, ForumReply>,
    opportunities: HashMap<Uuid, Opportunity>,
    resources: HashMap<Uuid, Resource>,
    auth_sessions: HashMap<String, AuthSession>,
}

/// A storage backend that keeps everything in process memory.
///
/// The single lock also serializes the forum reply-counter increment, so the
/// counter can never under-count from interleaved replies.
pub struct MemStorage {
    inner: RwLock<Inner>,
}

impl MemStorage {
    pub fn new() -> Self {
        let storage = Self {
            inner: RwLock::new(Inner::default()),
        };
        storage.seed_data();
        storage
    }

    fn read(&self) -> PortResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| PortError::Unexpected("storage lock poisoned".to_string()))
    }

    fn write(&self) -> PortResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| PortError::Unexpected("storage lock poisoned".to_string()))
    }

    /// Seeds sample opportunities and resources so dashboards have content
    /// before any user writes anything.
    fn seed_data(&self) {
        let now = Utc::now();
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            // A freshly constructed lock cannot be poisoned.
            Err(poisoned) => poisoned.into_inner(),
        };

        let sample_opportunities = [
            Opportunity {
                id: Uuid::new_v4(),
                title: "Frontend Developer Intern".to_string(),
                description: "Join our team as a frontend developer intern. Work on real projects using React, TypeScript, and modern web technologies.".to_string(),
                kind: OpportunityType::Internship,
                company: Some("TechCorp".to_string()),
                location: Some("Remote".to_string()),
                is_remote: true,
                requirements: vec!["React".to_string(), "JavaScript".to_string(), "CSS".to_string()],
                application_url: Some("https://techcorp.com/careers/frontend-intern".to_string()),
                deadline: Some(now + Duration::days(30)),
                created_at: now,
            },
            Opportunity {
                id: Uuid::new_v4(),
                title: "Code for Good 2024".to_string(),
                description: "48-hour hackathon focused on creating technology solutions for social good. $10k in prizes!".to_string(),
                kind: OpportunityType::Hackathon,
                company: Some("Tech Academy".to_string()),
                location: Some("San Francisco".to_string()),
                is_remote: false,
                requirements: vec!["Full Stack".to_string(), "Social Impact".to_string()],
                application_url: Some("https://codeforgood2024.com/register".to_string()),
                deadline: Some(now + Duration::days(15)),
                created_at: now,
            },
            Opportunity {
                id: Uuid::new_v4(),
                title: "Advanced React Patterns Workshop".to_string(),
                description: "Deep dive into advanced React patterns including Context API, custom hooks, and performance optimization.".to_string(),
                kind: OpportunityType::Workshop,
                company: Some("Tech Academy".to_string()),
                location: Some("Online".to_string()),
                is_remote: true,
                requirements: vec!["React".to_string(), "Advanced".to_string()],
                application_url: Some("https://techacademy.com/workshops/react-advanced".to_string()),
                deadline: Some(now + Duration::days(7)),
                created_at: now,
            },
        ];
        for opportunity in sample_opportunities {
            inner.opportunities.insert(opportunity.id, opportunity);
        }

        let sample_resources = [
            Resource {
                id: Uuid::new_v4(),
                title: "JavaScript Async/Await Complete Guide".to_string(),
                description: Some("Comprehensive tutorial covering promises, async/await, and error handling in JavaScript.".to_string()),
                kind: ResourceType::Video,
                platform: "youtube".to_string(),
                url: "https://www.youtube.com/watch?v=vn3tm0quoqE".to_string(),
                thumbnail: Some("https://images.unsplash.com/photo-1593720213428-28a5b9e94613?ixlib=rb-4.0.3&auto=format&fit=crop&w=200&h=120".to_string()),
                duration: Some("45 min".to_string()),
                rating: 5,
                difficulty: Difficulty::Intermediate,
                tags: vec!["JavaScript".to_string(), "Async".to_string(), "Promises".to_string()],
                is_free: true,
                price: None,
                created_at: now,
            },
            Resource {
                id: Uuid::new_v4(),
                title: "JavaScript Promises Explained".to_string(),
                description: Some("Interactive tutorial covering JavaScript promises with practical examples and exercises.".to_string()),
                kind: ResourceType::Tutorial,
                platform: "geeksforgeeks".to_string(),
                url: "https://www.geeksforgeeks.org/javascript-promises/".to_string(),
                thumbnail: Some("https://images.unsplash.com/photo-1516321318423-f06f85e504b3?ixlib=rb-4.0.3&auto=format&fit=crop&w=200&h=120".to_string()),
                duration: Some("30 min read".to_string()),
                rating: 4,
                difficulty: Difficulty::Beginner,
                tags: vec!["JavaScript".to_string(), "Promises".to_string()],
                is_free: true,
                price: None,
                created_at: now,
            },
            Resource {
                id: Uuid::new_v4(),
                title: "Programming Foundations with JavaScript".to_string(),
                description: Some("Comprehensive course covering JavaScript fundamentals from Duke University.".to_string()),
                kind: ResourceType::Course,
                platform: "coursera".to_string(),
                url: "https://www.coursera.org/learn/programming-foundations-with-javascript".to_string(),
                thumbnail: Some("https://images.unsplash.com/photo-1516321497487-e288fb19713f?ixlib=rb-4.0.3&auto=format&fit=crop&w=200&h=120".to_string()),
                duration: Some("4 weeks".to_string()),
                rating: 4,
                difficulty: Difficulty::Beginner,
                tags: vec!["JavaScript".to_string(), "Programming".to_string(), "Certificate".to_string()],
                is_free: false,
                price: Some("$49/month".to_string()),
                created_at: now,
            },
            Resource {
                id: Uuid::new_v4(),
                title: "The Complete JavaScript Course 2024".to_string(),
                description: Some("Master JavaScript with the most complete course! Projects, challenges, final exam, ES2023+".to_string()),
                kind: ResourceType::Course,
                platform: "udemy".to_string(),
                url: "https://www.udemy.com/course/the-complete-javascript-course/".to_string(),
                thumbnail: Some("https://images.unsplash.com/photo-1611224923853-80b023f02d71?ixlib=rb-4.0.3&auto=format&fit=crop&w=200&h=120".to_string()),
                duration: Some("69 hours".to_string()),
                rating: 5,
                difficulty: Difficulty::Beginner,
                tags: vec!["JavaScript".to_string(), "Complete Course".to_string()],
                is_free: false,
                price: Some("$89.99".to_string()),
                created_at: now,
            },
        ];
        for resource in sample_resources {
            inner.resources.insert(resource.id, resource);
        }
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorts newest-created first and truncates to `limit`.
fn newest_first<T>(mut items: Vec<T>, limit: usize, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items.truncate(limit);
    items
}

#[async_trait]
impl StorageService for MemStorage {
    // --- Users ---

    async fn get_user(&self, id: Uuid) -> PortResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut inner = self.write()?;
        let taken = inner
            .users
            .values()
            .any(|user| user.username == new_user.username || user.email == new_user.email);
        if taken {
            return Err(PortError::Conflict(
                "username or email already taken".to_string(),
            ));
        }

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
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, updates: UserUpdate) -> PortResult<Option<User>> {
        let mut inner = self.write()?;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        updates.apply(user);
        Ok(Some(user.clone()))
    }

    // --- Learning paths ---

    async fn get_learning_path(&self, id: Uuid) -> PortResult<Option<LearningPath>> {
        Ok(self.read()?.learning_paths.get(&id).cloned())
    }

    async fn get_learning_paths_by_user(&self, user_id: Uuid) -> PortResult<Vec<LearningPath>> {
        let paths: Vec<LearningPath> = self
            .read()?
            .learning_paths
            .values()
            .filter(|path| path.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(paths, usize::MAX, |path| path.created_at))
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
        self.write()?.learning_paths.insert(path.id, path.clone());
        Ok(path)
    }

    async fn update_learning_path(
        &self,
        id: Uuid,
        updates: LearningPathUpdate,
    ) -> PortResult<Option<LearningPath>> {
        let mut inner = self.write()?;
        let Some(path) = inner.learning_paths.get_mut(&id) else {
            return Ok(None);
        };
        updates.apply(path);
        Ok(Some(path.clone()))
    }

    async fn delete_learning_path(&self, id: Uuid) -> PortResult<bool> {
        Ok(self.write()?.learning_paths.remove(&id).is_some())
    }

    // --- Progress ---

    async fn get_user_progress(
        &self,
        user_id: Uuid,
        learning_path_id: Option<Uuid>,
    ) -> PortResult<Vec<UserProgress>> {
        Ok(self
            .read()?
            .user_progress
            .values()
            .filter(|progress| {
                progress.user_id == user_id
                    && learning_path_id
                        .map(|path_id| progress.learning_path_id == path_id)
                        .unwrap_or(true)
            })
            .cloned()
            .collect())
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
        self.write()?.user_progress.insert(progress.id, progress.clone());
        Ok(progress)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        updates: ProgressUpdate,
    ) -> PortResult<Option<UserProgress>> {
        let mut inner = self.write()?;
        let Some(progress) = inner.user_progress.get_mut(&id) else {
            return Ok(None);
        };
        updates.apply(progress);
        // Refreshed unconditionally; the caller has no say.
        progress.updated_at = Utc::now();
        Ok(Some(progress.clone()))
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let inner = self.read()?;
        let progresses: Vec<&UserProgress> = inner
            .user_progress
            .values()
            .filter(|progress| progress.user_id == user_id)
            .collect();

        let learning_hours: i64 = progresses.iter().map(|p| p.hours_spent).sum();
        let skills_mastered = progresses
            .iter()
            .filter(|p| p.status == ProgressStatus::Completed)
            .count() as i64;
        let course_progress = if progresses.is_empty() {
            0
        } else {
            let total: i64 = progresses.iter().map(|p| p.progress_percentage).sum();
            (total as f64 / progresses.len() as f64).round() as i64
        };
        let points: i64 = inner
            .achievements
            .values()
            .filter(|achievement| achievement.user_id == user_id)
            .map(|achievement| achievement.points)
            .sum();

        Ok(UserStats {
            learning_hours,
            skills_mastered,
            course_progress,
            points,
        })
    }

    // --- Achievements ---

    async fn get_user_achievements(&self, user_id: Uuid) -> PortResult<Vec<Achievement>> {
        let achievements: Vec<Achievement> = self
            .read()?
            .achievements
            .values()
            .filter(|achievement| achievement.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(achievements, usize::MAX, |a| a.unlocked_at))
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
        self.write()?
            .achievements
            .insert(achievement.id, achievement.clone());
        Ok(achievement)
    }

    // --- Forum ---

    async fn get_forum_posts(
        &self,
        limit: i64,
        category: Option<&str>,
    ) -> PortResult<Vec<ForumPost>> {
        let posts: Vec<ForumPost> = self
            .read()?
            .forum_posts
            .values()
            .filter(|post| category.map(|c| post.category == c).unwrap_or(true))
            .cloned()
            .collect();
        Ok(newest_first(posts, limit.max(0) as usize, |post| post.created_at))
    }

    async fn get_forum_post(&self, id: Uuid) -> PortResult<Option<ForumPost>> {
        Ok(self.read()?.forum_posts.get(&id).cloned())
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
        self.write()?.forum_posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_forum_replies(&self, post_id: Uuid) -> PortResult<Vec<ForumReply>> {
        let mut replies: Vec<ForumReply> = self
            .read()?
            .forum_replies
            .values()
            .filter(|reply| reply.post_id == post_id)
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(replies)
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

        // One critical section covers both the insert and the counter bump,
        // so concurrent replies cannot lose an increment.
        let mut inner = self.write()?;
        inner.forum_replies.insert(reply.id, reply.clone());
        if let Some(post) = inner.forum_posts.get_mut(&reply.post_id) {
            post.replies += 1;
        }
        Ok(reply)
    }

    // --- Opportunities ---

    async fn get_opportunities(
        &self,
        limit: i64,
        kind: Option<OpportunityType>,
    ) -> PortResult<Vec<Opportunity>> {
        let opportunities: Vec<Opportunity> = self
            .read()?
            .opportunities
            .values()
            .filter(|opportunity| kind.map(|k| opportunity.kind == k).unwrap_or(true))
            .cloned()
            .collect();
        Ok(newest_first(opportunities, limit.max(0) as usize, |o| o.created_at))
    }

    async fn get_opportunity(&self, id: Uuid) -> PortResult<Option<Opportunity>> {
        Ok(self.read()?.opportunities.get(&id).cloned())
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
        self.write()?
            .opportunities
            .insert(opportunity.id, opportunity.clone());
        Ok(opportunity)
    }

    // --- Resources ---

    async fn get_resources(
        &self,
        limit: i64,
        category: Option<ResourceType>,
    ) -> PortResult<Vec<Resource>> {
        let resources: Vec<Resource> = self
            .read()?
            .resources
            .values()
            .filter(|resource| category.map(|c| resource.kind == c).unwrap_or(true))
            .cloned()
            .collect();
        Ok(newest_first(resources, limit.max(0) as usize, |r| r.created_at))
    }

    async fn get_recommended_resources(&self, user_id: Uuid) -> PortResult<Vec<Resource>> {
        let skills: Vec<String> = match self.read()?.users.get(&user_id) {
            Some(user) => user.skills.iter().map(|s| s.to_lowercase()).collect(),
            None => Vec::new(),
        };
        if skills.is_empty() {
            return self.get_resources(4, Some(ResourceType::Video)).await;
        }

        let mut matches: Vec<Resource> = self
            .read()?
            .resources
            .values()
            .filter(|resource| {
                resource
                    .tags
                    .iter()
                    .any(|tag| skills.contains(&tag.to_lowercase()))
            })
            .cloned()
            .collect();
        matches.truncate(4);
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
        self.write()?.resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    // --- Auth sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.write()?.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Option<Uuid>> {
        let mut inner = self.write()?;
        match inner.auth_sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(Some(session.user_id)),
            Some(_) => {
                inner.auth_sessions.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.write()?.auth_sessions.remove(session_id);
        Ok(())
    }
}
