pub mod domain;
pub mod ports;

pub use domain::{
    Achievement, AuthSession, ChatbotReply, Difficulty, ForumPost, ForumReply, GeneratedPath,
    LearningPath, LearningPathUpdate, Module, ModuleStatus, NewAchievement, NewForumPost,
    NewForumReply, NewLearningPath, NewOpportunity, NewResource, NewUser, NewUserProgress,
    Opportunity, OpportunityType, ProgressStatus, ProgressUpdate, Resource, ResourceType, Role,
    SkillAnalysis, SkillRecommendation, User, UserProgress, UserStats, UserUpdate,
    ValidationError,
};
pub use ports::{AiService, PortError, PortResult, StorageService};
