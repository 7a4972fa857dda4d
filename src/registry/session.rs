use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a discussion session. Transitions are explicit:
/// the registry never advances a session on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Upcoming,
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Upcoming => "upcoming",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<SessionStatus> {
        match s {
            "upcoming" => Some(SessionStatus::Upcoming),
            "active" => Some(SessionStatus::Active),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Moderator,
    Participant,
    Evaluator,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Moderator => "moderator",
            ParticipantRole::Participant => "participant",
            ParticipantRole::Evaluator => "evaluator",
        }
    }

    pub fn parse(s: &str) -> Option<ParticipantRole> {
        match s {
            "moderator" => Some(ParticipantRole::Moderator),
            "participant" => Some(ParticipantRole::Participant),
            "evaluator" => Some(ParticipantRole::Evaluator),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person on a session roster. The presence flags are only meaningful
/// while a session is active and are omitted from JSON when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: ParticipantRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_speaking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_camera: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_mic: Option<bool>,
}

impl Participant {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: ParticipantRole,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            avatar: "/placeholder.svg".to_string(),
            role,
            is_active: None,
            is_speaking: None,
            has_camera: None,
            has_mic: None,
        }
    }
}

/// A scheduled, running, or finished discussion session.
///
/// `moderator_id` and `evaluator_ids` reference entries in `participants`
/// but the registry does not enforce that; keeping them consistent is the
/// caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: SessionStatus,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub participants: Vec<Participant>,
    pub moderator_id: String,
    pub evaluator_ids: Vec<String>,
}

/// Everything a session record carries except its id. The registry assigns
/// the id on creation; callers never pick one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub title: String,
    pub description: String,
    pub status: SessionStatus,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub participants: Vec<Participant>,
    pub moderator_id: String,
    pub evaluator_ids: Vec<String>,
}

impl SessionDraft {
    pub fn into_record(self, id: String) -> SessionRecord {
        SessionRecord {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            participants: self.participants,
            moderator_id: self.moderator_id,
            evaluator_ids: self.evaluator_ids,
        }
    }
}
