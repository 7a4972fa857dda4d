use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{MockMateError, Result};

/// The four criteria every evaluation rates, in display order.
const CRITERIA: [&str; 4] = ["clarity", "content", "delivery", "engagement"];

/// One evaluator's feedback for one participant in one session.
///
/// `overall` is the arithmetic mean of the four criteria and is always
/// computed by the board, never taken from the submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub session_id: String,
    pub participant_id: String,
    pub evaluator_id: String,
    pub clarity: u8,
    pub content: u8,
    pub delivery: u8,
    pub engagement: u8,
    pub overall: f32,
    pub comments: String,
    pub timestamp: DateTime<Utc>,
}

/// What an evaluator submits. Ratings are 1-5; comments are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub participant_id: String,
    pub evaluator_id: String,
    pub clarity: u8,
    pub content: u8,
    pub delivery: u8,
    pub engagement: u8,
    pub comments: String,
}

/// Averaged scores for one participant across all their evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantScores {
    pub participant_id: String,
    pub feedback_count: usize,
    pub clarity: f32,
    pub content: f32,
    pub delivery: f32,
    pub engagement: f32,
    pub overall: f32,
    pub highest_rated: String,
}

/// In-memory store of submitted feedback.
pub struct FeedbackBoard {
    state: Arc<RwLock<BoardState>>,
}

struct BoardState {
    entries: Vec<Feedback>,
    next_serial: u64,
}

impl FeedbackBoard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(RwLock::new(BoardState {
                entries: Vec::new(),
                next_serial: 1,
            })),
        })
    }

    /// Validate and record a submission, computing its overall score.
    pub async fn submit(
        &self,
        session_id: &str,
        submission: FeedbackSubmission,
    ) -> Result<Feedback> {
        let ratings = [
            submission.clarity,
            submission.content,
            submission.delivery,
            submission.engagement,
        ];
        for (criterion, value) in CRITERIA.into_iter().zip(ratings) {
            if !(1..=5).contains(&value) {
                return Err(MockMateError::RatingOutOfRange { criterion, value });
            }
        }
        if submission.comments.trim().is_empty() {
            return Err(MockMateError::EmptyComments);
        }

        let overall = ratings.iter().map(|&r| r as f32).sum::<f32>() / ratings.len() as f32;

        let mut state = self.state.write().await;
        let feedback = Feedback {
            id: format!("feedback-{}", state.next_serial),
            session_id: session_id.to_string(),
            participant_id: submission.participant_id,
            evaluator_id: submission.evaluator_id,
            clarity: submission.clarity,
            content: submission.content,
            delivery: submission.delivery,
            engagement: submission.engagement,
            overall,
            comments: submission.comments,
            timestamp: Utc::now(),
        };
        state.next_serial += 1;
        state.entries.push(feedback.clone());

        tracing::info!(
            session_id = %session_id,
            feedback_id = %feedback.id,
            participant_id = %feedback.participant_id,
            overall = feedback.overall,
            "Feedback submitted"
        );
        Ok(feedback)
    }

    /// All feedback for a session, oldest first.
    pub async fn for_session(&self, session_id: &str) -> Vec<Feedback> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|f| f.session_id == session_id)
            .cloned()
            .collect()
    }

    /// All feedback one participant received in a session.
    pub async fn for_participant(&self, session_id: &str, participant_id: &str) -> Vec<Feedback> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|f| f.session_id == session_id && f.participant_id == participant_id)
            .cloned()
            .collect()
    }

    /// Per-participant criterion averages for a session, participants in
    /// first-feedback order.
    pub async fn summarize(&self, session_id: &str) -> Vec<ParticipantScores> {
        let entries = self.for_session(session_id).await;

        let mut participant_order: Vec<String> = Vec::new();
        for entry in &entries {
            if !participant_order.contains(&entry.participant_id) {
                participant_order.push(entry.participant_id.clone());
            }
        }

        participant_order
            .into_iter()
            .map(|participant_id| {
                let received: Vec<&Feedback> = entries
                    .iter()
                    .filter(|f| f.participant_id == participant_id)
                    .collect();
                let count = received.len();
                let avg = |pick: fn(&Feedback) -> u8| -> f32 {
                    received.iter().map(|f| pick(f) as f32).sum::<f32>() / count as f32
                };

                let clarity = avg(|f| f.clarity);
                let content = avg(|f| f.content);
                let delivery = avg(|f| f.delivery);
                let engagement = avg(|f| f.engagement);
                let overall =
                    received.iter().map(|f| f.overall).sum::<f32>() / count as f32;

                ParticipantScores {
                    participant_id,
                    feedback_count: count,
                    clarity,
                    content,
                    delivery,
                    engagement,
                    overall,
                    highest_rated: highest_rated(clarity, content, delivery, engagement),
                }
            })
            .collect()
    }
}

/// Name of the best-scoring criterion; earlier criteria win ties.
fn highest_rated(clarity: f32, content: f32, delivery: f32, engagement: f32) -> String {
    let scores = [clarity, content, delivery, engagement];
    let mut best = 0;
    for (index, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = index;
        }
    }
    CRITERIA[best].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(participant: &str, ratings: [u8; 4]) -> FeedbackSubmission {
        FeedbackSubmission {
            participant_id: participant.to_string(),
            evaluator_id: "user-14".to_string(),
            clarity: ratings[0],
            content: ratings[1],
            delivery: ratings[2],
            engagement: ratings[3],
            comments: "Clear points, good engagement with the group.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_overall_is_mean_of_criteria() {
        let board = FeedbackBoard::new();

        let high = board
            .submit("session-000003", submission("user-12", [5, 4, 5, 4]))
            .await
            .unwrap();
        assert_eq!(high.overall, 4.5);

        let mixed = board
            .submit("session-000003", submission("user-13", [3, 5, 4, 3]))
            .await
            .unwrap();
        assert_eq!(mixed.overall, 3.75);
    }

    #[tokio::test]
    async fn test_rating_out_of_range_rejected() {
        let board = FeedbackBoard::new();

        let low = board
            .submit("session-000003", submission("user-12", [0, 4, 4, 4]))
            .await;
        assert!(matches!(
            low,
            Err(MockMateError::RatingOutOfRange {
                criterion: "clarity",
                value: 0
            })
        ));

        let high = board
            .submit("session-000003", submission("user-12", [4, 4, 4, 6]))
            .await;
        assert!(matches!(
            high,
            Err(MockMateError::RatingOutOfRange {
                criterion: "engagement",
                value: 6
            })
        ));

        assert!(board.for_session("session-000003").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_comments_rejected() {
        let board = FeedbackBoard::new();
        let mut sub = submission("user-12", [4, 4, 4, 4]);
        sub.comments = "  ".to_string();

        let result = board.submit("session-000003", sub).await;
        assert!(matches!(result, Err(MockMateError::EmptyComments)));
    }

    #[tokio::test]
    async fn test_filtering_by_session_and_participant() {
        let board = FeedbackBoard::new();
        board
            .submit("session-000003", submission("user-11", [4, 5, 3, 4]))
            .await
            .unwrap();
        board
            .submit("session-000003", submission("user-12", [5, 4, 5, 4]))
            .await
            .unwrap();
        board
            .submit("session-000007", submission("user-11", [3, 3, 3, 3]))
            .await
            .unwrap();

        assert_eq!(board.for_session("session-000003").await.len(), 2);
        assert_eq!(
            board.for_participant("session-000003", "user-11").await.len(),
            1
        );
        assert_eq!(
            board.for_participant("session-000007", "user-11").await.len(),
            1
        );
        assert!(board
            .for_participant("session-000003", "user-99")
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_summary_averages_across_evaluators() {
        let board = FeedbackBoard::new();
        let mut first = submission("user-11", [4, 5, 3, 4]);
        first.evaluator_id = "user-14".to_string();
        let mut second = submission("user-11", [5, 5, 4, 4]);
        second.evaluator_id = "user-15".to_string();

        board.submit("session-000003", first).await.unwrap();
        board.submit("session-000003", second).await.unwrap();

        let summary = board.summarize("session-000003").await;
        assert_eq!(summary.len(), 1);

        let scores = &summary[0];
        assert_eq!(scores.participant_id, "user-11");
        assert_eq!(scores.feedback_count, 2);
        assert_eq!(scores.clarity, 4.5);
        assert_eq!(scores.content, 5.0);
        assert_eq!(scores.delivery, 3.5);
        assert_eq!(scores.engagement, 4.0);
        assert_eq!(scores.highest_rated, "content");
    }

    #[test]
    fn test_highest_rated_tie_prefers_earlier_criterion() {
        assert_eq!(highest_rated(4.0, 4.0, 4.0, 4.0), "clarity");
        assert_eq!(highest_rated(3.0, 4.0, 4.0, 2.0), "content");
        assert_eq!(highest_rated(3.0, 3.0, 4.5, 4.5), "delivery");
    }

    #[tokio::test]
    async fn test_summary_keeps_first_feedback_order() {
        let board = FeedbackBoard::new();
        board
            .submit("session-000003", submission("user-12", [5, 4, 5, 4]))
            .await
            .unwrap();
        board
            .submit("session-000003", submission("user-11", [4, 5, 3, 4]))
            .await
            .unwrap();

        let summary = board.summarize("session-000003").await;
        assert_eq!(summary[0].participant_id, "user-12");
        assert_eq!(summary[1].participant_id, "user-11");
    }
}
