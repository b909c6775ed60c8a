use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    AnswerCallbackQueryRequest, ApiResponse, BotCommand, GetUpdatesRequest, InlineKeyboardMarkup,
    Message, SendMessageRequest, SetMyCommandsRequest, Update,
};
use crate::error::{Error, Result};
use crate::exchange::req::HttpClient;

const API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http_client: HttpClient,
}

impl TelegramClient {
    pub fn new(client: Option<Client>, token: &str) -> Self {
        Self::with_api_url(client, API_URL, token)
    }

    pub fn with_api_url(client: Option<Client>, api_url: &str, token: &str) -> Self {
        TelegramClient {
            http_client: HttpClient {
                client: client.unwrap_or_default(),
                base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            },
        }
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &'static str,
        payload: &P,
    ) -> Result<T> {
        let data = serde_json::to_string(payload).map_err(|e| Error::JsonParse(e.to_string()))?;
        let body = match self.http_client.post(method, data).await {
            Ok(body) => body,
            // the Bot API explains failures in the envelope, surface that text
            Err(Error::Api { body, .. }) => body,
            Err(e) => return Err(e),
        };
        parse_response(method, &body)
    }

    /// Long-polls for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message", "callback_query"],
        };
        self.call("/getUpdates", &request).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        debug!("Sending {} chars to chat {}", text.len(), chat_id);
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            reply_markup: keyboard,
        };
        self.call("/sendMessage", &request).await
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<bool> {
        self.call(
            "/answerCallbackQuery",
            &AnswerCallbackQueryRequest { callback_query_id },
        )
        .await
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<bool> {
        self.call("/setMyCommands", &SetMyCommandsRequest { commands })
            .await
    }
}

fn parse_response<T: DeserializeOwned>(method: &str, body: &str) -> Result<T> {
    let response: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| Error::JsonParse(e.to_string()))?;
    match (response.ok, response.result) {
        (true, Some(result)) => Ok(result),
        (_, _) => Err(Error::Telegram(format!(
            "{} failed: {}",
            method.trim_start_matches('/'),
            response.description.unwrap_or_else(|| "no description".to_string())
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_embeds_token() {
        let client = TelegramClient::with_api_url(None, "http://localhost:8081/", "123:abc");
        assert_eq!(client.http_client.base_url, "http://localhost:8081/bot123:abc");
    }

    #[test]
    fn test_parse_ok_response() {
        let sent: bool = parse_response("/setMyCommands", r#"{"ok":true,"result":true}"#).unwrap();
        assert!(sent);
    }

    #[test]
    fn test_parse_failed_response() {
        let err = parse_response::<Message>(
            "/sendMessage",
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Telegram(msg) if msg == "sendMessage failed: Bad Request: chat not found"));
    }
}
