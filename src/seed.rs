use chrono::{Duration, Utc};

use crate::chat::MessageLog;
use crate::error::Result;
use crate::feedback::{FeedbackBoard, FeedbackSubmission};
use crate::registry::{Participant, ParticipantRole, SessionDraft, SessionRegistry, SessionStatus};

/// Populate the stores with the demo content the product ships with: one
/// upcoming, one active, and one completed session, a transcript for the
/// active one and evaluations for the completed one. Schedules are relative
/// to now so the demo stays plausible whenever the server starts.
pub async fn seed_demo_data(
    registry: &SessionRegistry,
    messages: &MessageLog,
    feedback: &FeedbackBoard,
) -> Result<()> {
    registry
        .create(SessionDraft {
            title: "Impact of Artificial Intelligence on Job Market".to_string(),
            description: "A discussion about how AI is changing employment opportunities and challenges across various industries.".to_string(),
            status: SessionStatus::Upcoming,
            scheduled_at: Utc::now() + Duration::days(3),
            duration_minutes: 45,
            participants: vec![
                Participant::new("user-1", "Alex Johnson", "alex@example.com", ParticipantRole::Moderator),
                Participant::new("user-2", "Jamie Smith", "jamie@example.com", ParticipantRole::Participant),
                Participant::new("user-3", "Taylor Brown", "taylor@example.com", ParticipantRole::Participant),
                Participant::new("user-4", "Morgan Lee", "morgan@example.com", ParticipantRole::Participant),
                Participant::new("user-5", "Casey Wilson", "casey@example.com", ParticipantRole::Evaluator),
            ],
            moderator_id: "user-1".to_string(),
            evaluator_ids: vec!["user-5".to_string()],
        })
        .await;

    let active = registry
        .create(SessionDraft {
            title: "Sustainable Business Practices".to_string(),
            description: "Exploring how companies can implement eco-friendly strategies while maintaining profitability.".to_string(),
            status: SessionStatus::Active,
            scheduled_at: Utc::now() - Duration::minutes(30),
            duration_minutes: 60,
            participants: vec![
                Participant::new("user-6", "Jordan Parker", "jordan@example.com", ParticipantRole::Moderator),
                Participant::new("user-7", "Riley Cooper", "riley@example.com", ParticipantRole::Participant),
                Participant::new("user-8", "Quinn Evans", "quinn@example.com", ParticipantRole::Participant),
                Participant::new("user-9", "Avery Martinez", "avery@example.com", ParticipantRole::Evaluator),
            ],
            moderator_id: "user-6".to_string(),
            evaluator_ids: vec!["user-9".to_string()],
        })
        .await;

    let completed = registry
        .create(SessionDraft {
            title: "Future of Remote Work".to_string(),
            description: "Discussing the long-term impacts of remote work on company culture and productivity.".to_string(),
            status: SessionStatus::Completed,
            scheduled_at: Utc::now() - Duration::days(7),
            duration_minutes: 50,
            participants: vec![
                Participant::new("user-10", "Sam Rivera", "sam@example.com", ParticipantRole::Moderator),
                Participant::new("user-11", "Drew Morgan", "drew@example.com", ParticipantRole::Participant),
                Participant::new("user-12", "Jordan Casey", "jordanc@example.com", ParticipantRole::Participant),
                Participant::new("user-13", "Taylor Reed", "taylorreed@example.com", ParticipantRole::Participant),
                Participant::new("user-14", "Alex Kim", "alexkim@example.com", ParticipantRole::Evaluator),
            ],
            moderator_id: "user-10".to_string(),
            evaluator_ids: vec!["user-14".to_string()],
        })
        .await;

    messages
        .append(
            &active.id,
            "user-6",
            "Jordan Parker",
            "Welcome everyone to our discussion on Sustainable Business Practices. Let's start by defining what sustainability means in a business context.",
        )
        .await?;
    messages
        .append(
            &active.id,
            "user-7",
            "Riley Cooper",
            "I think sustainability in business refers to operating in a way that meets our present needs without compromising future generations - both environmentally and economically.",
        )
        .await?;
    messages
        .append(
            &active.id,
            "user-8",
            "Quinn Evans",
            "Agreed, and I would add that it also includes social sustainability - ensuring fair labor practices and giving back to communities.",
        )
        .await?;

    feedback
        .submit(
            &completed.id,
            FeedbackSubmission {
                participant_id: "user-11".to_string(),
                evaluator_id: "user-14".to_string(),
                clarity: 4,
                content: 5,
                delivery: 3,
                engagement: 4,
                comments: "Drew made excellent points about remote work productivity tools. Could improve on delivery by modulating tone more.".to_string(),
            },
        )
        .await?;
    feedback
        .submit(
            &completed.id,
            FeedbackSubmission {
                participant_id: "user-12".to_string(),
                evaluator_id: "user-14".to_string(),
                clarity: 5,
                content: 4,
                delivery: 5,
                engagement: 4,
                comments: "Jordan presented very clear arguments with excellent delivery. Could incorporate more specific examples.".to_string(),
            },
        )
        .await?;
    feedback
        .submit(
            &completed.id,
            FeedbackSubmission {
                participant_id: "user-13".to_string(),
                evaluator_id: "user-14".to_string(),
                clarity: 3,
                content: 5,
                delivery: 4,
                engagement: 3,
                comments: "Taylor had deep knowledge but points were sometimes too complex for quick understanding. Great engagement with others' points.".to_string(),
            },
        )
        .await?;

    tracing::info!(sessions = 3, "Seeded demo data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_populates_all_stores() {
        let registry = SessionRegistry::new();
        let messages = MessageLog::new();
        let feedback = FeedbackBoard::new();

        seed_demo_data(&registry, &messages, &feedback)
            .await
            .unwrap();

        let sessions = registry.snapshot().await;
        assert_eq!(sessions.len(), 3);

        let statuses: Vec<SessionStatus> = sessions.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                SessionStatus::Upcoming,
                SessionStatus::Active,
                SessionStatus::Completed
            ]
        );

        let active = &sessions[1];
        assert_eq!(messages.history(&active.id).await.len(), 3);

        let completed = &sessions[2];
        let received = feedback.for_session(&completed.id).await;
        assert_eq!(received.len(), 3);
        assert_eq!(received[1].overall, 4.5);
        assert_eq!(received[2].overall, 3.75);

        let summary = feedback.summarize(&completed.id).await;
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].participant_id, "user-11");
        assert_eq!(summary[0].highest_rated, "content");
    }
}
