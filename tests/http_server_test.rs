use httpmock::prelude::*;
use regear_bot::app::server::create_router;
use regear_bot::domain::ports::ChatPlatform;
use regear_bot::DiscordClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// 在隨機埠啟動 HTTP 服務，回傳基底網址
async fn spawn_server(discord: &MockServer) -> String {
    let chat: Arc<dyn ChatPlatform> = Arc::new(
        DiscordClient::new(discord.base_url(), "secret", Duration::from_secs(5)).unwrap(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(chat)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn get_json(url: &str) -> (u16, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_healthz() {
    let discord = MockServer::start();
    let base = spawn_server(&discord).await;

    let (status, body) = get_json(&format!("{}/healthz", base)).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_read_messages_returns_thread_history() {
    let discord = MockServer::start();
    discord.mock(|when, then| {
        when.method(GET)
            .path("/channels/300")
            .header("Authorization", "Bot secret");
        then.status(200).json_body(json!({
            "id": "300", "type": 11, "guild_id": "7", "parent_id": "55", "name": "ZvZ"
        }));
    });
    discord.mock(|when, then| {
        when.method(GET).path("/channels/300/messages");
        then.status(200).json_body(json!([
            {
                "id": "502",
                "author": {"id": "42", "username": "alice"},
                "content": "",
                "attachments": [{"url": "https://cdn.example.com/loss.png"}],
                "timestamp": "2024-01-01T02:05:00+00:00"
            },
            {
                "id": "501",
                "author": {"id": "42", "username": "alice"},
                "content": "lost my sword",
                "attachments": [],
                "timestamp": "2024-01-01T02:00:00+00:00"
            },
            {
                "id": "500",
                "author": {"id": "43", "username": "bob"},
                "content": "same",
                "attachments": [],
                "timestamp": "2024-01-01T01:55:00+00:00"
            }
        ]));
    });
    let alice = discord.mock(|when, then| {
        when.method(GET).path("/guilds/7/members/42");
        then.status(200).json_body(json!({"nick": "Tanky"}));
    });
    discord.mock(|when, then| {
        when.method(GET).path("/guilds/7/members/43");
        then.status(404);
    });

    let base = spawn_server(&discord).await;
    let (status, body) = get_json(&format!("{}/read_messages/300", base)).await;

    assert_eq!(status, 200);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[0],
        json!({
            "username": "alice",
            "nickname": "Tanky",
            "content": null,
            "image_urls": ["https://cdn.example.com/loss.png"],
            "timestamp": "2024-01-01T02:05:00+00:00"
        })
    );
    assert_eq!(messages[1]["content"], "lost my sword");
    assert_eq!(messages[2]["username"], "bob");
    assert_eq!(messages[2]["nickname"], Value::Null);
    // 同一位作者只查一次暱稱
    assert_eq!(alice.hits(), 1);
}

#[tokio::test]
async fn test_read_messages_unknown_thread() {
    let discord = MockServer::start();
    discord.mock(|when, then| {
        when.method(GET).path("/channels/404");
        then.status(404).json_body(json!({"message": "Unknown Channel"}));
    });

    let base = spawn_server(&discord).await;
    let (status, body) = get_json(&format!("{}/read_messages/404", base)).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"error": "Thread not found"}));
}

#[tokio::test]
async fn test_read_messages_upstream_failure() {
    let discord = MockServer::start();
    discord.mock(|when, then| {
        when.method(GET).path("/channels/300");
        then.status(500);
    });

    let base = spawn_server(&discord).await;
    let (status, body) = get_json(&format!("{}/read_messages/300", base)).await;

    assert_eq!(status, 502);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_read_messages_rejects_non_numeric_id() {
    let discord = MockServer::start();
    let base = spawn_server(&discord).await;

    let response = reqwest::get(format!("{}/read_messages/general", base))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}
