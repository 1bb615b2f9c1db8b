use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::error;

use crate::config::TelegramConfig;
use crate::notification::{Event, EventType, NotificationError, Notifier, format_event};

const TELEGRAM_API_URL: &str = "https://api.telegram.org/bot";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_MESSAGE_LENGTH: usize = 4096;
const ASYNC_QUEUE_SIZE: usize = 100;

/// Telegram notifier using the Bot API
pub struct TelegramNotifier {
    chat_id: String,
    http_client: reqwest::Client,
    api_url: String,
    sender: mpsc::Sender<Event>,
    worker_done: Arc<AtomicBool>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotificationError> {
        if config.bot_token.is_empty() {
            return Err(NotificationError::new("bot_token is required"));
        }
        if config.chat_id.is_empty() {
            return Err(NotificationError::new("chat_id is required"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::new(format!("Failed to create HTTP client: {}", e)))?;

        let api_url = format!("{}{}", TELEGRAM_API_URL, config.bot_token);

        let (sender, receiver) = mpsc::channel(ASYNC_QUEUE_SIZE);
        let worker_done = Arc::new(AtomicBool::new(false));

        Self::spawn_worker(
            receiver,
            config.chat_id.clone(),
            http_client.clone(),
            api_url.clone(),
            worker_done.clone(),
        );

        Ok(Self {
            chat_id: config.chat_id.clone(),
            http_client,
            api_url,
            sender,
            worker_done,
        })
    }

    fn spawn_worker(
        mut receiver: mpsc::Receiver<Event>,
        chat_id: String,
        http_client: reqwest::Client,
        api_url: String,
        worker_done: Arc<AtomicBool>,
    ) {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let text = format_event(&event);
                if let Err(e) = send_message(&http_client, &api_url, &chat_id, &text).await {
                    error!(error = %e, "Failed to send Telegram message");
                }
            }
            worker_done.store(true, Ordering::SeqCst);
        });
    }
}

/// Cuts text to the Telegram limit on a char boundary.
pub(crate) fn truncate_message(text: &str) -> &str {
    if text.len() <= MAX_MESSAGE_LENGTH {
        return text;
    }
    let mut end = MAX_MESSAGE_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn send_message(
    http_client: &reqwest::Client,
    api_url: &str,
    chat_id: &str,
    text: &str,
) -> Result<(), NotificationError> {
    let url = format!("{}/sendMessage", api_url);

    let payload = serde_json::json!({
        "chat_id": chat_id,
        "text": truncate_message(text),
        "parse_mode": "Markdown"
    });

    let response = http_client
        .post(&url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| NotificationError::new(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(NotificationError::new(format!(
            "Telegram API error: {} - {}",
            status, body
        )));
    }

    Ok(())
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        if !self.is_enabled(event.event_type) {
            return Ok(());
        }
        let text = format_event(event);
        send_message(&self.http_client, &self.api_url, &self.chat_id, &text).await
    }

    fn send_async(&self, event: Event) {
        if !self.is_enabled(event.event_type) {
            return;
        }

        if let Err(e) = self.sender.try_send(event) {
            error!(error = %e, "Failed to queue Telegram message");
        }
    }

    fn is_enabled(&self, event_type: EventType) -> bool {
        // Connection flaps are too noisy for a chat.
        event_type != EventType::Connection
    }

    async fn close(&self) -> Result<(), NotificationError> {
        if !self.worker_done.load(Ordering::SeqCst) {
            // Give the worker a moment to flush queued messages.
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }
}
