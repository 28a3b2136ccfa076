use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use cairn_db::models::{MessageRow, NewMessage};
use cairn_types::api::{Claims, CreateMessageRequest};
use cairn_types::models::{Message, Outcome};

use crate::auth::AppState;
use crate::error::ApiError;

/// Longest accepted message body, in characters.
pub const MAX_CONTENT_LEN: usize = 256;

pub async fn post_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = create_message(&state, &claims, req.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(list_messages(&state).await?))
}

/// Resolve any dice command in `content`, store the message, then announce
/// it on the bus. Nothing is published unless the row was written, and a
/// written row is always published even if the caller stops waiting.
pub async fn create_message(
    state: &AppState,
    author: &Claims,
    content: String,
) -> Result<Message, ApiError> {
    validate_content(&content)?;

    // Resolved before the first await; the thread-local rng stays on this thread.
    let outcome = cairn_dice::interpret(&content);

    let message = Message {
        id: Uuid::new_v4(),
        content,
        author_id: author.sub,
        author_name: author.username.clone(),
        outcome,
        // Stored at microsecond precision, so keep the returned copy identical.
        created_at: Utc::now().trunc_subsecs(6),
    };

    let outcome_json = message
        .outcome
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(anyhow::Error::from)?;

    // Insert and publish run together on the blocking pool. A dropped
    // request future cannot stop that task between the two steps.
    let state = state.clone();
    let message = tokio::task::spawn_blocking(move || -> anyhow::Result<Message> {
        state.db.insert_message(&NewMessage {
            id: &message.id.to_string(),
            content: &message.content,
            author_id: &message.author_id.to_string(),
            outcome: outcome_json.as_deref(),
            created_at: &message.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        })?;

        let delivered = state.bus.publish(message.clone());
        debug!(
            "{} posted {} ({} live subscribers)",
            message.author_name, message.id, delivered
        );
        Ok(message)
    })
    .await??;

    Ok(message)
}

/// Every stored message, oldest first.
pub async fn list_messages(state: &AppState) -> Result<Vec<Message>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_messages()).await??;

    Ok(rows.into_iter().filter_map(row_to_message).collect())
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(ApiError::BadRequest("message must be at most 256 characters"));
    }
    Ok(())
}

/// Rows that fail to decode are skipped rather than failing the whole list.
fn row_to_message(row: MessageRow) -> Option<Message> {
    let decoded = (|| -> anyhow::Result<Message> {
        let outcome = row
            .outcome
            .as_deref()
            .map(serde_json::from_str::<Outcome>)
            .transpose()?;

        Ok(Message {
            id: row.id.parse()?,
            content: row.content.clone(),
            author_id: row.author_id.parse()?,
            author_name: row.author_username.clone(),
            outcome,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)?.with_timezone(&Utc),
        })
    })();

    match decoded {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Skipping unreadable message row {}: {:#}", row.id, e);
            None
        }
    }
}
