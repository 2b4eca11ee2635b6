use crate::domain::model::{ChatMessage, ThreadMessage};
use crate::domain::ports::ChatPlatform;
use crate::utils::error::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

struct AppState {
    chat: Arc<dyn ChatPlatform>,
}

pub fn create_router(chat: Arc<dyn ChatPlatform>) -> Router {
    let state = Arc::new(AppState { chat });

    Router::new()
        .route("/healthz", get(healthz))
        .route("/read_messages/{thread_id}", get(read_messages))
        .with_state(state)
}

/// 綁定位址並持續服務，直到 listener 出錯
pub async fn serve(listen_addr: &str, chat: Arc<dyn ChatPlatform>) -> Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("🌐 HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(chat)).await?;
    Ok(())
}

async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn read_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<u64>,
) -> std::result::Result<Json<Value>, (StatusCode, Json<Value>)> {
    let upstream = |e: crate::utils::error::BotError| {
        tracing::error!("❌ Failed to read thread {}: {}", thread_id, e);
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": e.user_friendly_message()})),
        )
    };

    let Some(channel) = state.chat.channel(thread_id).await.map_err(upstream)? else {
        return Ok(Json(json!({"error": "Thread not found"})));
    };

    let history = state
        .chat
        .channel_messages(thread_id)
        .await
        .map_err(upstream)?;

    let mut nicknames: HashMap<u64, Option<String>> = HashMap::new();
    let mut messages = Vec::with_capacity(history.len());
    for message in history {
        let nickname = match channel.guild_id {
            Some(guild_id) => match nicknames.get(&message.author_id) {
                Some(cached) => cached.clone(),
                None => {
                    let nickname = state
                        .chat
                        .member_nickname(guild_id, message.author_id)
                        .await
                        .map_err(upstream)?;
                    nicknames.insert(message.author_id, nickname.clone());
                    nickname
                }
            },
            None => None,
        };
        messages.push(to_thread_message(message, nickname));
    }

    tracing::debug!("Read {} messages from thread {}", messages.len(), thread_id);
    Ok(Json(json!({ "messages": messages })))
}

fn to_thread_message(message: ChatMessage, nickname: Option<String>) -> ThreadMessage {
    ThreadMessage {
        username: message.author_name,
        nickname,
        content: Some(message.content).filter(|content| !content.is_empty()),
        image_urls: message.attachment_urls,
        timestamp: message.timestamp.to_rfc3339(),
    }
}
