//! services/api/src/web/mod.rs
//!
//! The HTTP surface: route table, handlers, auth middleware and shared state.

pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};

pub use middleware::require_auth;
pub use rest::ApiDoc;
use state::AppState;

/// Builds the API route table. Everything except registration, login and
/// logout sits behind the session-cookie middleware.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/register", post(auth::register_handler))
        .route("/api/login", post(auth::login_handler))
        .route("/api/logout", post(auth::logout_handler));

    let protected_routes = Router::new()
        .route("/api/user", get(auth::current_user_handler))
        .route("/api/user/stats", get(rest::user_stats_handler))
        .route(
            "/api/learning-paths",
            get(rest::list_learning_paths_handler).post(rest::create_learning_path_handler),
        )
        .route(
            "/api/learning-paths/{id}",
            get(rest::get_learning_path_handler)
                .put(rest::update_learning_path_handler)
                .delete(rest::delete_learning_path_handler),
        )
        .route(
            "/api/progress",
            get(rest::list_progress_handler).post(rest::create_progress_handler),
        )
        .route("/api/progress/{id}", put(rest::update_progress_handler))
        .route(
            "/api/achievements",
            get(rest::list_achievements_handler).post(rest::create_achievement_handler),
        )
        .route(
            "/api/forum/posts",
            get(rest::list_forum_posts_handler).post(rest::create_forum_post_handler),
        )
        .route("/api/forum/posts/{id}", get(rest::get_forum_post_handler))
        .route(
            "/api/forum/posts/{id}/replies",
            get(rest::list_forum_replies_handler).post(rest::create_forum_reply_handler),
        )
        .route(
            "/api/opportunities",
            get(rest::list_opportunities_handler).post(rest::create_opportunity_handler),
        )
        .route("/api/opportunities/{id}", get(rest::get_opportunity_handler))
        .route(
            "/api/resources",
            get(rest::list_resources_handler).post(rest::create_resource_handler),
        )
        .route(
            "/api/resources/recommended",
            get(rest::recommended_resources_handler),
        )
        .route("/api/ai/generate-path", post(rest::generate_path_handler))
        .route("/api/ai/analyze-skills", post(rest::analyze_skills_handler))
        .route("/api/ai/chatbot", post(rest::chatbot_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemStorage, MockAiAdapter};
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let app_state = Arc::new(AppState {
            storage: Arc::new(MemStorage::new()),
            ai: Arc::new(MockAiAdapter::new()),
            config: Arc::new(Config::for_tests()),
        });
        api_router(app_state)
    }

    fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        builder.body(body).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // Error responses carry a plain-text body; surface it as a string.
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    /// Registers an account and returns its session cookie plus the user id.
    async fn register(app: &Router, username: &str, skills: Value) -> (String, Value) {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "hunter22",
                    "fullName": "Test User",
                    "skills": skills,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("register sets a cookie")
            .to_string();
        let cookie = set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .to_string();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let user: Value = serde_json::from_slice(&bytes).unwrap();
        (cookie, user)
    }

    #[tokio::test]
    async fn protected_routes_require_a_session_cookie() {
        let app = test_app();
        for uri in [
            "/api/user",
            "/api/learning-paths",
            "/api/forum/posts",
            "/api/resources/recommended",
        ] {
            let (status, _) = send(&app, request("GET", uri, None, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }
        let (status, _) = send(
            &app,
            request("GET", "/api/user", Some("session=bogus"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_login_and_fetch_current_user() {
        let app = test_app();
        let (cookie, user) = register(&app, "amelia", json!([])).await;
        assert_eq!(user["username"], "amelia");
        // The hash never leaves the server.
        assert!(user.get("password").is_none());

        let (status, me) = send(&app, request("GET", "/api/user", Some(&cookie), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], user["id"]);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/login",
                None,
                Some(json!({"username": "amelia", "password": "hunter22"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/login",
                None,
                Some(json!({"username": "amelia", "password": "wrong"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let app = test_app();
        register(&app, "taken", json!([])).await;
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/register",
                None,
                Some(json!({
                    "username": "taken",
                    "email": "second@example.com",
                    "password": "hunter22",
                    "fullName": "Someone Else",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!("Username or email already exists"));
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let app = test_app();
        let (cookie, _) = register(&app, "leaver", json!([])).await;

        let (status, _) = send(&app, request("POST", "/api/logout", Some(&cookie), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, request("GET", "/api/user", Some(&cookie), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn learning_path_crud_is_scoped_to_the_owner() {
        let app = test_app();
        let (cookie, user) = register(&app, "pather", json!([])).await;

        let (status, created) = send(
            &app,
            request(
                "POST",
                "/api/learning-paths",
                Some(&cookie),
                Some(json!({
                    "title": "Rust from zero",
                    "difficulty": "intermediate",
                    "estimatedHours": 40,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        // Ownership comes from the session, not the payload.
        assert_eq!(created["userId"], user["id"]);

        let (status, listed) = send(
            &app,
            request("GET", "/api/learning-paths", Some(&cookie), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let uri = format!("/api/learning-paths/{}", created["id"].as_str().unwrap());
        let (status, updated) = send(
            &app,
            request("PUT", &uri, Some(&cookie), Some(json!({"isActive": false}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["isActive"], json!(false));
        assert_eq!(updated["title"], json!("Rust from zero"));

        let (status, _) = send(&app, request("DELETE", &uri, Some(&cookie), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request("GET", &uri, Some(&cookie), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_learning_path_payload_is_a_bad_request() {
        let app = test_app();
        let (cookie, _) = register(&app, "strict", json!([])).await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/learning-paths",
                Some(&cookie),
                Some(json!({"title": "   "})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!("Invalid learning path data"));
    }

    #[tokio::test]
    async fn progress_updates_reject_out_of_range_percentages() {
        let app = test_app();
        let (cookie, _) = register(&app, "learner", json!([])).await;

        let (_, path) = send(
            &app,
            request(
                "POST",
                "/api/learning-paths",
                Some(&cookie),
                Some(json!({"title": "Databases"})),
            ),
        )
        .await;
        let (status, progress) = send(
            &app,
            request(
                "POST",
                "/api/progress",
                Some(&cookie),
                Some(json!({
                    "learningPathId": path["id"],
                    "moduleId": "module1",
                    "status": "in_progress",
                    "progressPercentage": 40,
                    "hoursSpent": 3,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/progress/{}", progress["id"].as_str().unwrap());
        let (status, _) = send(
            &app,
            request("PUT", &uri, Some(&cookie), Some(json!({"progressPercentage": 140}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = send(
            &app,
            request("PUT", &uri, Some(&cookie), Some(json!({"progressPercentage": 80}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["progressPercentage"], json!(80));
    }

    #[tokio::test]
    async fn replying_through_the_api_bumps_the_post_counter() {
        let app = test_app();
        let (cookie, _) = register(&app, "poster", json!([])).await;

        let (_, post) = send(
            &app,
            request(
                "POST",
                "/api/forum/posts",
                Some(&cookie),
                Some(json!({
                    "title": "Borrow checker woes",
                    "content": "Why does this not compile?",
                    "category": "rust",
                })),
            ),
        )
        .await;

        let replies_uri = format!("/api/forum/posts/{}/replies", post["id"].as_str().unwrap());
        let (status, _) = send(
            &app,
            request(
                "POST",
                &replies_uri,
                Some(&cookie),
                Some(json!({"content": "You need a lifetime annotation."})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let post_uri = format!("/api/forum/posts/{}", post["id"].as_str().unwrap());
        let (_, fetched) = send(&app, request("GET", &post_uri, Some(&cookie), None)).await;
        assert_eq!(fetched["replies"], json!(1));

        let missing = format!("/api/forum/posts/{}/replies", uuid::Uuid::new_v4());
        let (status, _) = send(
            &app,
            request("POST", &missing, Some(&cookie), Some(json!({"content": "hello"}))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn forum_listing_defaults_to_ten_posts() {
        let app = test_app();
        let (cookie, _) = register(&app, "prolific", json!([])).await;

        for n in 0..12 {
            let (status, _) = send(
                &app,
                request(
                    "POST",
                    "/api/forum/posts",
                    Some(&cookie),
                    Some(json!({
                        "title": format!("Thread {n}"),
                        "content": "body",
                        "category": "general",
                    })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, listed) = send(
            &app,
            request("GET", "/api/forum/posts", Some(&cookie), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(10));

        let (status, listed) = send(
            &app,
            request("GET", "/api/forum/posts?limit=12", Some(&cookie), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(12));
    }

    #[tokio::test]
    async fn seeded_opportunities_filter_by_type() {
        let app = test_app();
        let (cookie, _) = register(&app, "browser", json!([])).await;

        let (status, all) = send(
            &app,
            request("GET", "/api/opportunities", Some(&cookie), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().map(Vec::len), Some(3));

        let (status, hackathons) = send(
            &app,
            request("GET", "/api/opportunities?type=hackathon", Some(&cookie), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hackathons.as_array().map(Vec::len), Some(1));

        let (status, _) = send(
            &app,
            request("GET", "/api/opportunities?type=parade", Some(&cookie), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommendations_follow_the_profile_skills() {
        let app = test_app();
        let (cookie, _) = register(&app, "jsdev", json!(["javascript"])).await;

        let (status, recommended) = send(
            &app,
            request("GET", "/api/resources/recommended", Some(&cookie), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let recommended = recommended.as_array().unwrap().clone();
        assert!(!recommended.is_empty() && recommended.len() <= 4);
        for resource in &recommended {
            let tags: Vec<String> = resource["tags"]
                .as_array()
                .unwrap()
                .iter()
                .map(|t| t.as_str().unwrap().to_lowercase())
                .collect();
            assert!(tags.contains(&"javascript".to_string()));
        }
    }

    #[tokio::test]
    async fn ai_endpoints_return_canned_payloads() {
        let app = test_app();
        let (cookie, _) = register(&app, "curious", json!([])).await;

        let (status, path) = send(
            &app,
            request(
                "POST",
                "/api/ai/generate-path",
                Some(&cookie),
                Some(json!({"skills": ["Rust"], "goals": "systems", "timeCommitment": 10})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(path["title"], json!("Personalized Rust Learning Path"));
        assert_eq!(path["modules"].as_array().map(Vec::len), Some(3));

        let (status, analysis) = send(
            &app,
            request("POST", "/api/ai/analyze-skills", Some(&cookie), Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analysis["overallReadiness"], json!(65));

        let (status, reply) = send(
            &app,
            request(
                "POST",
                "/api/ai/chatbot",
                Some(&cookie),
                Some(json!({"message": "help me study"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["suggestions"].as_array().map(Vec::len), Some(3));
    }
}
