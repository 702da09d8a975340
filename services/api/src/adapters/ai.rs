//! services/api/src/adapters/ai.rs
//!
//! Canned implementation of the `AiService` port. It synthesizes plausible
//! payloads locally so the rest of the application can be developed and
//! tested without a model provider in the loop.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use skilltrack_core::domain::{
    ChatbotReply, Difficulty, GeneratedPath, Module, ModuleStatus, SkillAnalysis,
    SkillRecommendation,
};
use skilltrack_core::ports::{AiService, PortResult};

/// Chat replies are drawn at random from this pool.
const CHAT_REPLIES: [&str; 4] = [
    "That's a great question! Based on your current learning path, I'd recommend focusing on practical projects to reinforce your understanding.",
    "I can help you with that! Let me suggest some resources that match your learning style and current progress.",
    "Excellent progress! You're on track to complete this module. Have you considered applying these concepts in a personal project?",
    "I see you're working on JavaScript. Would you like me to recommend some coding challenges to practice these concepts?",
];

/// An `AiService` that fabricates its answers in-process.
#[derive(Debug, Default, Clone)]
pub struct MockAiAdapter;

impl MockAiAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AiService for MockAiAdapter {
    async fn generate_learning_path(
        &self,
        skills: &[String],
        _goals: &str,
        time_commitment: f64,
    ) -> PortResult<GeneratedPath> {
        // The proposal front-loads 30% of the committed hours, spends 40% in
        // the middle and keeps later modules locked until reached.
        Ok(GeneratedPath {
            title: format!("Personalized {} Learning Path", skills.join(" & ")),
            description: format!(
                "A customized learning path to help you master {} based on your goals.",
                skills.join(" and ")
            ),
            modules: vec![
                Module {
                    id: "module1".to_string(),
                    title: "Fundamentals".to_string(),
                    description: "Master the basics".to_string(),
                    estimated_hours: time_commitment * 0.3,
                    status: ModuleStatus::NotStarted,
                },
                Module {
                    id: "module2".to_string(),
                    title: "Intermediate Concepts".to_string(),
                    description: "Build on your foundation".to_string(),
                    estimated_hours: time_commitment * 0.4,
                    status: ModuleStatus::Locked,
                },
                Module {
                    id: "module3".to_string(),
                    title: "Advanced Topics".to_string(),
                    description: "Become proficient".to_string(),
                    estimated_hours: time_commitment * 0.3,
                    status: ModuleStatus::Locked,
                },
            ],
            difficulty: Difficulty::Beginner,
            estimated_hours: time_commitment,
        })
    }

    async fn analyze_skills(
        &self,
        _resume: Option<&str>,
        current_skills: &[String],
    ) -> PortResult<SkillAnalysis> {
        let current_skills = if current_skills.is_empty() {
            ["HTML", "CSS", "Basic JavaScript"]
                .map(String::from)
                .to_vec()
        } else {
            current_skills.to_vec()
        };
        Ok(SkillAnalysis {
            current_skills,
            missing_skills: ["React", "Node.js", "Database Management", "API Development"]
                .map(String::from)
                .to_vec(),
            recommendations: vec![
                SkillRecommendation {
                    skill: "React".to_string(),
                    priority: "High".to_string(),
                    reason: "Essential for modern frontend development".to_string(),
                    estimated_learning_time: "4-6 weeks".to_string(),
                },
                SkillRecommendation {
                    skill: "Node.js".to_string(),
                    priority: "Medium".to_string(),
                    reason: "Important for full-stack development".to_string(),
                    estimated_learning_time: "3-4 weeks".to_string(),
                },
            ],
            overall_readiness: 65,
        })
    }

    async fn chatbot_reply(
        &self,
        _message: &str,
        _context: Option<&str>,
    ) -> PortResult<ChatbotReply> {
        let pick = rand::thread_rng().gen_range(0..CHAT_REPLIES.len());
        Ok(ChatbotReply {
            message: CHAT_REPLIES[pick].to_string(),
            suggestions: [
                "View recommended resources",
                "Take a practice quiz",
                "Join study group discussion",
            ]
            .map(String::from)
            .to_vec(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_path_splits_the_time_commitment() {
        let ai = MockAiAdapter::new();
        let path = ai
            .generate_learning_path(
                &["Rust".to_string(), "SQL".to_string()],
                "become a backend engineer",
                10.0,
            )
            .await
            .unwrap();

        assert_eq!(path.title, "Personalized Rust & SQL Learning Path");
        assert_eq!(path.modules.len(), 3);
        let total: f64 = path.modules.iter().map(|m| m.estimated_hours).sum();
        assert!((total - 10.0).abs() < 1e-9);
        assert_eq!(path.modules[0].status, ModuleStatus::NotStarted);
        assert!(path.modules[1..]
            .iter()
            .all(|m| m.status == ModuleStatus::Locked));
    }

    #[tokio::test]
    async fn analysis_defaults_current_skills_when_none_given() {
        let ai = MockAiAdapter::new();
        let analysis = ai.analyze_skills(None, &[]).await.unwrap();
        assert_eq!(analysis.current_skills, vec!["HTML", "CSS", "Basic JavaScript"]);
        assert_eq!(analysis.overall_readiness, 65);

        let kept = ai
            .analyze_skills(None, &["Go".to_string()])
            .await
            .unwrap();
        assert_eq!(kept.current_skills, vec!["Go"]);
    }

    #[tokio::test]
    async fn chat_replies_come_from_the_canned_pool() {
        let ai = MockAiAdapter::new();
        for _ in 0..8 {
            let reply = ai.chatbot_reply("how do I learn async?", None).await.unwrap();
            assert!(CHAT_REPLIES.contains(&reply.message.as_str()));
            assert_eq!(reply.suggestions.len(), 3);
        }
    }
}
