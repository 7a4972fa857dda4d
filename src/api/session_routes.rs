use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::Filter;

use super::feed_websocket;
use crate::chat::MessageLog;
use crate::error::{MockMateError, Result};
use crate::feedback::{FeedbackBoard, FeedbackSubmission};
use crate::registry::{
    Participant, ParticipantRole, SessionDraft, SessionRecord, SessionRegistry, SessionStatus,
};

/// Body of POST /api/sessions. Participants may arrive without ids or
/// names; the server fills those in, mirrors of what the creation form
/// derives client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub participants: Vec<ParticipantInvite>,
    #[serde(default)]
    pub moderator_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInvite {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub status: Option<String>,
    pub participant: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    pub participant: Option<String>,
}

pub fn health_check() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "health")
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "MockMate Server",
                "version": env!("CARGO_PKG_VERSION")
            }))
        })
}

pub fn config_endpoint() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone
{
    warp::path!("api" / "config")
        .and(warp::get())
        .map(|| {
            use std::env;

            let config = serde_json::json!({
                "SERVER_HOST": env::var("SERVER_HOST").ok(),
                "SERVER_PORT": env::var("SERVER_PORT").ok(),
                "SEED_DEMO_DATA": env::var("SEED_DEMO_DATA").ok()
            });

            warp::reply::json(&config)
        })
}

/// Live session feed: clients subscribe over WebSocket and receive the
/// full list after every mutation.
pub fn feed_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "feed")
        .and(warp::ws())
        .and(with_registry(registry))
        .map(|ws: warp::ws::Ws, registry: Arc<SessionRegistry>| {
            ws.on_upgrade(move |websocket| {
                feed_websocket::handle_feed_websocket(websocket, registry)
            })
        })
}

/// CRUD for sessions under /api/sessions.
pub fn session_routes(
    registry: Arc<SessionRegistry>,
    messages: Arc<MessageLog>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let list = warp::path!("api" / "sessions")
        .and(warp::get())
        .and(warp::query::<SessionQuery>())
        .and(with_registry(registry.clone()))
        .and_then(list_sessions);

    let create = warp::path!("api" / "sessions")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_registry(registry.clone()))
        .and_then(create_session);

    let get = warp::path!("api" / "sessions" / String)
        .and(warp::get())
        .and(with_registry(registry.clone()))
        .and_then(get_session);

    let update = warp::path!("api" / "sessions" / String)
        .and(warp::put())
        .and(warp::body::json())
        .and(with_registry(registry.clone()))
        .and_then(update_session);

    let delete = warp::path!("api" / "sessions" / String)
        .and(warp::delete())
        .and(with_registry(registry))
        .and(with_messages(messages))
        .and_then(delete_session);

    list.or(create).or(get).or(update).or(delete)
}

/// Transcript endpoints under /api/sessions/:id/messages.
pub fn message_routes(
    registry: Arc<SessionRegistry>,
    messages: Arc<MessageLog>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let history = warp::path!("api" / "sessions" / String / "messages")
        .and(warp::get())
        .and(with_registry(registry.clone()))
        .and(with_messages(messages.clone()))
        .and_then(get_messages);

    let post = warp::path!("api" / "sessions" / String / "messages")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_registry(registry))
        .and(with_messages(messages))
        .and_then(post_message);

    history.or(post)
}

/// Evaluation endpoints under /api/sessions/:id/feedback.
///
/// Submitting requires a live session, but the read endpoints go straight
/// to the board: feedback outlives its session and stays readable after a
/// delete.
pub fn feedback_routes(
    registry: Arc<SessionRegistry>,
    board: Arc<FeedbackBoard>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let list = warp::path!("api" / "sessions" / String / "feedback")
        .and(warp::get())
        .and(warp::query::<FeedbackQuery>())
        .and(with_board(board.clone()))
        .and_then(get_feedback);

    let post = warp::path!("api" / "sessions" / String / "feedback")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_registry(registry))
        .and(with_board(board.clone()))
        .and_then(post_feedback);

    let summary = warp::path!("api" / "sessions" / String / "feedback" / "summary")
        .and(warp::get())
        .and(with_board(board))
        .and_then(feedback_summary);

    summary.or(list).or(post)
}

pub fn stats_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "stats")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(get_stats)
}

async fn list_sessions(
    query: SessionQuery,
    registry: Arc<SessionRegistry>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    let mut sessions = registry.snapshot().await;

    if let Some(raw) = query.status.as_deref() {
        match SessionStatus::parse(raw) {
            Some(status) => sessions.retain(|s| s.status == status),
            None => {
                return Ok(warp::reply::with_status(
                    warp::reply::json(&error_body(format!("Unknown status: {}", raw))),
                    StatusCode::BAD_REQUEST,
                ))
            }
        }
    }
    if let Some(participant) = &query.participant {
        sessions.retain(|s| s.participants.iter().any(|p| &p.id == participant));
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&sessions),
        StatusCode::OK,
    ))
}

async fn create_session(
    request: CreateSessionRequest,
    registry: Arc<SessionRegistry>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    match resolve_draft(request) {
        Ok(draft) => {
            let record = registry.create(draft).await;
            Ok(warp::reply::with_status(
                warp::reply::json(&record),
                StatusCode::CREATED,
            ))
        }
        Err(e) => Ok(warp::reply::with_status(
            warp::reply::json(&error_body(e.to_string())),
            StatusCode::UNPROCESSABLE_ENTITY,
        )),
    }
}

async fn get_session(
    id: String,
    registry: Arc<SessionRegistry>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    match registry.get(&id).await {
        Some(record) => Ok(warp::reply::with_status(
            warp::reply::json(&record),
            StatusCode::OK,
        )),
        None => Ok(session_not_found(&id)),
    }
}

async fn update_session(
    id: String,
    record: SessionRecord,
    registry: Arc<SessionRegistry>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    if record.id != id {
        let err = MockMateError::SessionIdMismatch {
            path: id,
            body: record.id,
        };
        return Ok(warp::reply::with_status(
            warp::reply::json(&error_body(err.to_string())),
            StatusCode::BAD_REQUEST,
        ));
    }

    if registry.update(record.clone()).await {
        Ok(warp::reply::with_status(
            warp::reply::json(&record),
            StatusCode::OK,
        ))
    } else {
        Ok(session_not_found(&id))
    }
}

async fn delete_session(
    id: String,
    registry: Arc<SessionRegistry>,
    messages: Arc<MessageLog>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    if registry.remove(&id).await {
        // The transcript dies with the session; feedback is kept as a
        // historical record.
        messages.clear(&id).await;
        Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({"id": id, "deleted": true})),
            StatusCode::OK,
        ))
    } else {
        Ok(session_not_found(&id))
    }
}

async fn get_messages(
    id: String,
    registry: Arc<SessionRegistry>,
    messages: Arc<MessageLog>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    if !registry.exists(&id).await {
        return Ok(session_not_found(&id));
    }
    Ok(warp::reply::with_status(
        warp::reply::json(&messages.history(&id).await),
        StatusCode::OK,
    ))
}

async fn post_message(
    id: String,
    request: PostMessageRequest,
    registry: Arc<SessionRegistry>,
    messages: Arc<MessageLog>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    if !registry.exists(&id).await {
        return Ok(session_not_found(&id));
    }
    match messages
        .append(&id, request.sender_id, request.sender_name, request.content)
        .await
    {
        Ok(message) => {
            // A concurrent delete may have cleared the transcript after the
            // exists check; re-check and drop the orphaned append.
            if scrub_if_deleted(&registry, &messages, &id).await {
                return Ok(session_not_found(&id));
            }
            Ok(warp::reply::with_status(
                warp::reply::json(&message),
                StatusCode::CREATED,
            ))
        }
        Err(e) => Ok(warp::reply::with_status(
            warp::reply::json(&error_body(e.to_string())),
            StatusCode::UNPROCESSABLE_ENTITY,
        )),
    }
}

async fn get_feedback(
    id: String,
    query: FeedbackQuery,
    board: Arc<FeedbackBoard>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    let feedback = match &query.participant {
        Some(participant) => board.for_participant(&id, participant).await,
        None => board.for_session(&id).await,
    };
    Ok(warp::reply::json(&feedback))
}

async fn post_feedback(
    id: String,
    submission: FeedbackSubmission,
    registry: Arc<SessionRegistry>,
    board: Arc<FeedbackBoard>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    if !registry.exists(&id).await {
        return Ok(session_not_found(&id));
    }
    match board.submit(&id, submission).await {
        Ok(feedback) => Ok(warp::reply::with_status(
            warp::reply::json(&feedback),
            StatusCode::CREATED,
        )),
        Err(e) => Ok(warp::reply::with_status(
            warp::reply::json(&error_body(e.to_string())),
            StatusCode::UNPROCESSABLE_ENTITY,
        )),
    }
}

async fn feedback_summary(
    id: String,
    board: Arc<FeedbackBoard>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&board.summarize(&id).await))
}

async fn get_stats(
    registry: Arc<SessionRegistry>,
) -> std::result::Result<impl warp::Reply, Infallible> {
    let sessions = registry.snapshot().await;
    let count = |status: SessionStatus| sessions.iter().filter(|s| s.status == status).count();
    let participants: HashSet<&str> = sessions
        .iter()
        .flat_map(|s| s.participants.iter().map(|p| p.id.as_str()))
        .collect();

    Ok(warp::reply::json(&serde_json::json!({
        "total": sessions.len(),
        "upcoming": count(SessionStatus::Upcoming),
        "active": count(SessionStatus::Active),
        "completed": count(SessionStatus::Completed),
        "distinct_participants": participants.len()
    })))
}

fn with_registry(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = (Arc<SessionRegistry>,), Error = Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

fn with_messages(
    messages: Arc<MessageLog>,
) -> impl Filter<Extract = (Arc<MessageLog>,), Error = Infallible> + Clone {
    warp::any().map(move || messages.clone())
}

fn with_board(
    board: Arc<FeedbackBoard>,
) -> impl Filter<Extract = (Arc<FeedbackBoard>,), Error = Infallible> + Clone {
    warp::any().map(move || board.clone())
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

fn session_not_found(id: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    let err = MockMateError::SessionNotFound(id.to_string());
    warp::reply::with_status(
        warp::reply::json(&error_body(err.to_string())),
        StatusCode::NOT_FOUND,
    )
}

/// True when the session vanished under a concurrent delete, in which
/// case any transcript entries appended after the delete's clear are
/// dropped as well.
async fn scrub_if_deleted(registry: &SessionRegistry, messages: &MessageLog, id: &str) -> bool {
    if registry.exists(id).await {
        return false;
    }
    messages.clear(id).await;
    true
}

/// Turn a create request into a registry draft: validate the form rules,
/// then fill in participant ids, names, and the derived role fields.
fn resolve_draft(request: CreateSessionRequest) -> Result<SessionDraft> {
    validate_create(&request)?;

    let mut participants = Vec::with_capacity(request.participants.len());
    for invite in &request.participants {
        let role = ParticipantRole::parse(&invite.role)
            .ok_or_else(|| MockMateError::InvalidRole(invite.role.clone()))?;
        let id = invite.id.clone().unwrap_or_else(mint_participant_id);
        let name = invite
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| local_part(&invite.email));
        participants.push(Participant::new(id, name, invite.email.clone(), role));
    }

    let moderator_id = request
        .moderator_id
        .or_else(|| {
            participants
                .iter()
                .find(|p| p.role == ParticipantRole::Moderator)
                .map(|p| p.id.clone())
        })
        .or_else(|| participants.first().map(|p| p.id.clone()))
        .unwrap_or_default();

    let evaluator_ids = participants
        .iter()
        .filter(|p| p.role == ParticipantRole::Evaluator)
        .map(|p| p.id.clone())
        .collect();

    Ok(SessionDraft {
        title: request.title,
        description: request.description,
        status: request.status.unwrap_or(SessionStatus::Upcoming),
        scheduled_at: request.scheduled_at,
        duration_minutes: request.duration_minutes,
        participants,
        moderator_id,
        evaluator_ids,
    })
}

fn validate_create(request: &CreateSessionRequest) -> Result<()> {
    if request.title.trim().chars().count() < 5 {
        return Err(MockMateError::InvalidTitle(
            "must be at least 5 characters".to_string(),
        ));
    }
    if request.description.trim().chars().count() < 10 {
        return Err(MockMateError::InvalidDescription(
            "must be at least 10 characters".to_string(),
        ));
    }
    if request.duration_minutes == 0 {
        return Err(MockMateError::InvalidDuration(
            "must be a positive number".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for invite in &request.participants {
        if !is_valid_email(&invite.email) {
            return Err(MockMateError::InvalidEmail(invite.email.clone()));
        }
        if !seen.insert(invite.email.as_str()) {
            return Err(MockMateError::DuplicateEmail(invite.email.clone()));
        }
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn local_part(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

fn mint_participant_id() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let token: String = (0..7)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("user-{}", token)
}
