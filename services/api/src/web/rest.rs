//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use skilltrack_core::domain::{
    NewAchievement, NewForumPost, NewForumReply, NewLearningPath, NewOpportunity, NewResource,
    NewUserProgress, OpportunityType, ProgressUpdate, ResourceType,
};
use skilltrack_core::ports::PortError;

use crate::web::state::AppState;

/// Default `limit` for the list endpoints that accept one.
const DEFAULT_LIST_LIMIT: i64 = 10;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::current_user_handler,
        user_stats_handler,
        list_learning_paths_handler,
        create_learning_path_handler,
        get_learning_path_handler,
        update_learning_path_handler,
        delete_learning_path_handler,
        list_progress_handler,
        create_progress_handler,
        update_progress_handler,
        list_achievements_handler,
        create_achievement_handler,
        list_forum_posts_handler,
        create_forum_post_handler,
        get_forum_post_handler,
        list_forum_replies_handler,
        create_forum_reply_handler,
        list_opportunities_handler,
        get_opportunity_handler,
        create_opportunity_handler,
        list_resources_handler,
        recommended_resources_handler,
        create_resource_handler,
        generate_path_handler,
        analyze_skills_handler,
        chatbot_handler,
    ),
    components(schemas(
        crate::web::auth::RegisterRequest,
        crate::web::auth::LoginRequest,
        GeneratePathRequest,
        AnalyzeSkillsRequest,
        ChatbotRequest,
    )),
    tags(
        (name = "SkillTrack API", description = "API endpoints for the student learning dashboard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Query and Payload Structs
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub learning_path_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ForumQuery {
    pub limit: Option<i64>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct OpportunityQuery {
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
pub struct ResourceQuery {
    pub limit: Option<i64>,
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePathRequest {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub goals: String,
    #[serde(default)]
    pub time_commitment: f64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSkillsRequest {
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(default)]
    pub current_skills: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatbotRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<String>,
}

//=========================================================================================
// Error Mapping Helpers
//=========================================================================================

fn storage_failure(message: &'static str) -> impl FnOnce(PortError) -> (StatusCode, String) {
    move |e| {
        error!("{}: {:?}", message, e);
        (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }
}

fn bad_request(message: &'static str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.to_string())
}

fn not_found(message: &'static str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, message.to_string())
}

/// Stamps the authenticated user into a client-supplied JSON body before it
/// is decoded into an insert type. Clients never choose the owner of a
/// record.
fn stamp_user(mut body: Value, user_id: Uuid) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert("userId".to_string(), Value::String(user_id.to_string()));
    }
    body
}

//=========================================================================================
// Dashboard Stats
//=========================================================================================

/// Aggregate dashboard figures for the logged-in user.
#[utoipa::path(
    get,
    path = "/api/user/stats",
    responses(
        (status = 200, description = "Aggregate stats"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn user_stats_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stats = state
        .storage
        .get_user_stats(user_id)
        .await
        .map_err(storage_failure("Failed to fetch user stats"))?;
    Ok(Json(stats))
}

//=========================================================================================
// Learning Paths
//=========================================================================================

/// Learning paths owned by the logged-in user, newest first.
#[utoipa::path(
    get,
    path = "/api/learning-paths",
    responses((status = 200, description = "The user's learning paths"))
)]
pub async fn list_learning_paths_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let paths = state
        .storage
        .get_learning_paths_by_user(user_id)
        .await
        .map_err(storage_failure("Failed to fetch learning paths"))?;
    Ok(Json(paths))
}

/// Create a learning path owned by the logged-in user.
#[utoipa::path(
    post,
    path = "/api/learning-paths",
    responses(
        (status = 201, description = "Learning path created"),
        (status = 400, description = "Invalid learning path data")
    )
)]
pub async fn create_learning_path_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new_path: NewLearningPath = serde_json::from_value(stamp_user(body, user_id))
        .map_err(|_| bad_request("Invalid learning path data"))?;
    new_path
        .validate()
        .map_err(|_| bad_request("Invalid learning path data"))?;
    let path = state
        .storage
        .create_learning_path(new_path)
        .await
        .map_err(storage_failure("Failed to create learning path"))?;
    Ok((StatusCode::CREATED, Json(path)))
}

/// Fetch one learning path by id.
#[utoipa::path(
    get,
    path = "/api/learning-paths/{id}",
    responses(
        (status = 200, description = "The learning path"),
        (status = 404, description = "Learning path not found")
    )
)]
pub async fn get_learning_path_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = state
        .storage
        .get_learning_path(id)
        .await
        .map_err(storage_failure("Failed to fetch learning path"))?
        .ok_or(not_found("Learning path not found"))?;
    Ok(Json(path))
}

/// Partially update a learning path. Absent fields are left untouched.
#[utoipa::path(
    put,
    path = "/api/learning-paths/{id}",
    responses(
        (status = 200, description = "The updated learning path"),
        (status = 400, description = "Failed to update learning path"),
        (status = 404, description = "Learning path not found")
    )
)]
pub async fn update_learning_path_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let updates: skilltrack_core::domain::LearningPathUpdate = serde_json::from_value(body)
        .map_err(|_| bad_request("Failed to update learning path"))?;
    updates
        .validate()
        .map_err(|_| bad_request("Failed to update learning path"))?;
    let path = state
        .storage
        .update_learning_path(id, updates)
        .await
        .map_err(storage_failure("Failed to update learning path"))?
        .ok_or(not_found("Learning path not found"))?;
    Ok(Json(path))
}

/// Delete a learning path.
#[utoipa::path(
    delete,
    path = "/api/learning-paths/{id}",
    responses(
        (status = 204, description = "Learning path deleted"),
        (status = 404, description = "Learning path not found")
    )
)]
pub async fn delete_learning_path_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deleted = state
        .storage
        .delete_learning_path(id)
        .await
        .map_err(storage_failure("Failed to delete learning path"))?;
    if !deleted {
        return Err(not_found("Learning path not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Progress
//=========================================================================================

/// Progress records for the logged-in user, optionally narrowed to one path.
#[utoipa::path(
    get,
    path = "/api/progress",
    responses((status = 200, description = "The user's progress records"))
)]
pub async fn list_progress_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
    Query(query): Query<ProgressQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let progress = state
        .storage
        .get_user_progress(user_id, query.learning_path_id)
        .await
        .map_err(storage_failure("Failed to fetch progress"))?;
    Ok(Json(progress))
}

/// Record progress on a module for the logged-in user.
#[utoipa::path(
    post,
    path = "/api/progress",
    responses(
        (status = 201, description = "Progress recorded"),
        (status = 400, description = "Invalid progress data")
    )
)]
pub async fn create_progress_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new_progress: NewUserProgress = serde_json::from_value(stamp_user(body, user_id))
        .map_err(|_| bad_request("Invalid progress data"))?;
    new_progress
        .validate()
        .map_err(|_| bad_request("Invalid progress data"))?;
    let progress = state
        .storage
        .create_progress(new_progress)
        .await
        .map_err(storage_failure("Failed to create progress"))?;
    Ok((StatusCode::CREATED, Json(progress)))
}

/// Partially update a progress record. `updatedAt` is always refreshed.
#[utoipa::path(
    put,
    path = "/api/progress/{id}",
    responses(
        (status = 200, description = "The updated progress record"),
        (status = 400, description = "Failed to update progress"),
        (status = 404, description = "Progress record not found")
    )
)]
pub async fn update_progress_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let updates: ProgressUpdate =
        serde_json::from_value(body).map_err(|_| bad_request("Failed to update progress"))?;
    updates
        .validate()
        .map_err(|_| bad_request("Failed to update progress"))?;
    let progress = state
        .storage
        .update_progress(id, updates)
        .await
        .map_err(storage_failure("Failed to update progress"))?
        .ok_or(not_found("Progress record not found"))?;
    Ok(Json(progress))
}

//=========================================================================================
// Achievements
//=========================================================================================

/// Achievements for the logged-in user, most recently unlocked first.
#[utoipa::path(
    get,
    path = "/api/achievements",
    responses((status = 200, description = "The user's achievements"))
)]
pub async fn list_achievements_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let achievements = state
        .storage
        .get_user_achievements(user_id)
        .await
        .map_err(storage_failure("Failed to fetch achievements"))?;
    Ok(Json(achievements))
}

/// Unlock an achievement for the logged-in user.
#[utoipa::path(
    post,
    path = "/api/achievements",
    responses(
        (status = 201, description = "Achievement unlocked"),
        (status = 400, description = "Invalid achievement data")
    )
)]
pub async fn create_achievement_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new_achievement: NewAchievement = serde_json::from_value(stamp_user(body, user_id))
        .map_err(|_| bad_request("Invalid achievement data"))?;
    new_achievement
        .validate()
        .map_err(|_| bad_request("Invalid achievement data"))?;
    let achievement = state
        .storage
        .create_achievement(new_achievement)
        .await
        .map_err(storage_failure("Failed to create achievement"))?;
    Ok((StatusCode::CREATED, Json(achievement)))
}

//=========================================================================================
// Forum
//=========================================================================================

/// Forum posts, newest first, optionally filtered by category.
#[utoipa::path(
    get,
    path = "/api/forum/posts",
    responses((status = 200, description = "Forum posts"))
)]
pub async fn list_forum_posts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForumQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let posts = state
        .storage
        .get_forum_posts(
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            query.category.as_deref(),
        )
        .await
        .map_err(storage_failure("Failed to fetch forum posts"))?;
    Ok(Json(posts))
}

/// Publish a forum post as the logged-in user.
#[utoipa::path(
    post,
    path = "/api/forum/posts",
    responses(
        (status = 201, description = "Post created"),
        (status = 400, description = "Invalid forum post data")
    )
)]
pub async fn create_forum_post_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new_post: NewForumPost = serde_json::from_value(stamp_user(body, user_id))
        .map_err(|_| bad_request("Invalid forum post data"))?;
    new_post
        .validate()
        .map_err(|_| bad_request("Invalid forum post data"))?;
    let post = state
        .storage
        .create_forum_post(new_post)
        .await
        .map_err(storage_failure("Failed to create forum post"))?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Fetch one forum post by id.
#[utoipa::path(
    get,
    path = "/api/forum/posts/{id}",
    responses(
        (status = 200, description = "The post"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_forum_post_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let post = state
        .storage
        .get_forum_post(id)
        .await
        .map_err(storage_failure("Failed to fetch forum post"))?
        .ok_or(not_found("Post not found"))?;
    Ok(Json(post))
}

/// Replies to a post, oldest first.
#[utoipa::path(
    get,
    path = "/api/forum/posts/{id}/replies",
    responses((status = 200, description = "Replies to the post"))
)]
pub async fn list_forum_replies_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let replies = state
        .storage
        .get_forum_replies(id)
        .await
        .map_err(storage_failure("Failed to fetch replies"))?;
    Ok(Json(replies))
}

/// Reply to a post as the logged-in user. Bumps the post's reply counter.
#[utoipa::path(
    post,
    path = "/api/forum/posts/{id}/replies",
    responses(
        (status = 201, description = "Reply created"),
        (status = 400, description = "Invalid reply data"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_forum_reply_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .storage
        .get_forum_post(id)
        .await
        .map_err(storage_failure("Failed to fetch forum post"))?
        .ok_or(not_found("Post not found"))?;

    let mut body = stamp_user(body, user_id);
    if let Value::Object(map) = &mut body {
        map.insert("postId".to_string(), Value::String(id.to_string()));
    }
    let new_reply: NewForumReply =
        serde_json::from_value(body).map_err(|_| bad_request("Invalid reply data"))?;
    new_reply
        .validate()
        .map_err(|_| bad_request("Invalid reply data"))?;
    let reply = state
        .storage
        .create_forum_reply(new_reply)
        .await
        .map_err(storage_failure("Failed to create reply"))?;
    Ok((StatusCode::CREATED, Json(reply)))
}

//=========================================================================================
// Opportunities
//=========================================================================================

/// Opportunities, newest first, optionally filtered by type.
#[utoipa::path(
    get,
    path = "/api/opportunities",
    responses(
        (status = 200, description = "Opportunities"),
        (status = 400, description = "Invalid opportunity type")
    )
)]
pub async fn list_opportunities_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OpportunityQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let kind = match query.kind.as_deref() {
        Some(raw) => Some(
            OpportunityType::parse(raw).ok_or(bad_request("Invalid opportunity type"))?,
        ),
        None => None,
    };
    let opportunities = state
        .storage
        .get_opportunities(query.limit.unwrap_or(DEFAULT_LIST_LIMIT), kind)
        .await
        .map_err(storage_failure("Failed to fetch opportunities"))?;
    Ok(Json(opportunities))
}

/// Fetch one opportunity by id.
#[utoipa::path(
    get,
    path = "/api/opportunities/{id}",
    responses(
        (status = 200, description = "The opportunity"),
        (status = 404, description = "Opportunity not found")
    )
)]
pub async fn get_opportunity_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let opportunity = state
        .storage
        .get_opportunity(id)
        .await
        .map_err(storage_failure("Failed to fetch opportunity"))?
        .ok_or(not_found("Opportunity not found"))?;
    Ok(Json(opportunity))
}

/// Publish an opportunity.
#[utoipa::path(
    post,
    path = "/api/opportunities",
    responses(
        (status = 201, description = "Opportunity created"),
        (status = 400, description = "Invalid opportunity data")
    )
)]
pub async fn create_opportunity_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new_opportunity: NewOpportunity =
        serde_json::from_value(body).map_err(|_| bad_request("Invalid opportunity data"))?;
    new_opportunity
        .validate()
        .map_err(|_| bad_request("Invalid opportunity data"))?;
    let opportunity = state
        .storage
        .create_opportunity(new_opportunity)
        .await
        .map_err(storage_failure("Failed to create opportunity"))?;
    Ok((StatusCode::CREATED, Json(opportunity)))
}

//=========================================================================================
// Resources
//=========================================================================================

/// Resources, newest first, optionally filtered by type.
#[utoipa::path(
    get,
    path = "/api/resources",
    responses(
        (status = 200, description = "Resources"),
        (status = 400, description = "Invalid resource type")
    )
)]
pub async fn list_resources_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResourceQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let category = match query.category.as_deref() {
        Some(raw) => {
            Some(ResourceType::parse(raw).ok_or(bad_request("Invalid resource type"))?)
        }
        None => None,
    };
    let resources = state
        .storage
        .get_resources(query.limit.unwrap_or(DEFAULT_LIST_LIMIT), category)
        .await
        .map_err(storage_failure("Failed to fetch resources"))?;
    Ok(Json(resources))
}

/// Up to four resources matched to the logged-in user's skills.
#[utoipa::path(
    get,
    path = "/api/resources/recommended",
    responses((status = 200, description = "Recommended resources"))
)]
pub async fn recommended_resources_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user_id): axum::Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let resources = state
        .storage
        .get_recommended_resources(user_id)
        .await
        .map_err(storage_failure("Failed to fetch recommended resources"))?;
    Ok(Json(resources))
}

/// Publish a resource.
#[utoipa::path(
    post,
    path = "/api/resources",
    responses(
        (status = 201, description = "Resource created"),
        (status = 400, description = "Invalid resource data")
    )
)]
pub async fn create_resource_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new_resource: NewResource =
        serde_json::from_value(body).map_err(|_| bad_request("Invalid resource data"))?;
    new_resource
        .validate()
        .map_err(|_| bad_request("Invalid resource data"))?;
    let resource = state
        .storage
        .create_resource(new_resource)
        .await
        .map_err(storage_failure("Failed to create resource"))?;
    Ok((StatusCode::CREATED, Json(resource)))
}

//=========================================================================================
// AI Collaborator
//=========================================================================================

/// Synthesize a learning-path proposal from skills, goals and available time.
#[utoipa::path(
    post,
    path = "/api/ai/generate-path",
    request_body = GeneratePathRequest,
    responses(
        (status = 200, description = "A generated learning-path proposal"),
        (status = 500, description = "AI service temporarily unavailable")
    )
)]
pub async fn generate_path_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GeneratePathRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = state
        .ai
        .generate_learning_path(&req.skills, &req.goals, req.time_commitment)
        .await
        .map_err(|e| {
            error!("Path generation failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI service temporarily unavailable".to_string(),
            )
        })?;
    Ok(Json(path))
}

/// Gap analysis between the user's skills and an employable profile.
#[utoipa::path(
    post,
    path = "/api/ai/analyze-skills",
    request_body = AnalyzeSkillsRequest,
    responses(
        (status = 200, description = "A skill gap analysis"),
        (status = 500, description = "AI analysis service temporarily unavailable")
    )
)]
pub async fn analyze_skills_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeSkillsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let analysis = state
        .ai
        .analyze_skills(req.resume.as_deref(), &req.current_skills)
        .await
        .map_err(|e| {
            error!("Skill analysis failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI analysis service temporarily unavailable".to_string(),
            )
        })?;
    Ok(Json(analysis))
}

/// Answer a free-form study question.
#[utoipa::path(
    post,
    path = "/api/ai/chatbot",
    request_body = ChatbotRequest,
    responses(
        (status = 200, description = "A chatbot reply"),
        (status = 500, description = "Chatbot service temporarily unavailable")
    )
)]
pub async fn chatbot_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatbotRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let reply = state
        .ai
        .chatbot_reply(&req.message, req.context.as_deref())
        .await
        .map_err(|e| {
            error!("Chatbot reply failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Chatbot service temporarily unavailable".to_string(),
            )
        })?;
    Ok(Json(reply))
}
