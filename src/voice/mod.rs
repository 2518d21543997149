//! Voice pathway - speech transcription and command interpretation
//!
//! Talks to any OpenAI-compatible endpoint. Configuration:
//! - `OPENAI_API_KEY`: API key (required)
//! - `OPENAI_BASE_URL`: Base URL (default: <https://api.openai.com/v1>)
//! - `OPENAI_CHAT_MODEL`: Chat model (default: `gpt-4o-mini`)
//! - `OPENAI_TRANSCRIBE_MODEL`: Speech model (default: `whisper-1`)

pub mod interpret;

use std::env;
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::exercise::ValidationError;
use crate::intent::Intent;

pub use interpret::Reply;

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const CHAT_MODEL_ENV: &str = "OPENAI_CHAT_MODEL";
const TRANSCRIBE_MODEL_ENV: &str = "OPENAI_TRANSCRIBE_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TRANSCRIBE_MODEL: &str = "whisper-1";

/// Speech is always Russian
const LANGUAGE: &str = "ru";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Переменная окружения OPENAI_API_KEY не задана")]
    MissingApiKey,
    #[error("Ошибка запроса: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API вернул {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Пустой ответ от LLM")]
    EmptyReply,
    #[error("Не удалось распознать: {content}")]
    MalformedReply {
        content: String,
        #[source]
        source: serde_json::Error,
    },
    /// The model asked the user for more details
    #[error("{0}")]
    Clarify(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub transcribe_model: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self, VoiceError> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(VoiceError::MissingApiKey)?;
        Ok(Self {
            base_url: env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
            api_key,
            chat_model: env::var(CHAT_MODEL_ENV).unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_owned()),
            transcribe_model: env::var(TRANSCRIBE_MODEL_ENV)
                .unwrap_or_else(|_| DEFAULT_TRANSCRIBE_MODEL.to_owned()),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for transcription and chat completion
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, VoiceError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        info!(
            "Voice client ready: base_url={}, chat={}, speech={}",
            config.base_url, config.chat_model, config.transcribe_model
        );
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, VoiceError> {
        Self::new(OpenAiConfig::from_env()?)
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, VoiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("API error {}: {}", status, body);
        Err(VoiceError::Api { status, body })
    }

    /// Speech to text. `audio` is the raw file, e.g. a Telegram `.ogg` voice note.
    pub async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, VoiceError> {
        debug!(bytes = audio.len(), "transcribing voice");
        let form = Form::new()
            .text("model", self.config.transcribe_model.clone())
            .text("language", LANGUAGE)
            .text("response_format", "json")
            .part("file", Part::bytes(audio).file_name(file_name.to_owned()));

        let response = self
            .http
            .post(self.api_url("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;
        let body: TranscriptionResponse = Self::check(response).await?.json().await?;
        Ok(body.text.trim().to_string())
    }

    /// Ask the chat model what the user wants
    pub async fn interpret(&self, text: &str) -> Result<Reply, VoiceError> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: interpret::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.1,
            max_tokens: 200,
        };

        let response = self
            .http
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let body: ChatResponse = Self::check(response).await?.json().await?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(VoiceError::EmptyReply)?;
        debug!("LLM reply: {}", content);
        Reply::decode(&content)
    }

    /// Transcript to intent
    pub async fn intent_from_text(&self, text: &str) -> Result<Intent, VoiceError> {
        self.interpret(text).await?.into_intent()
    }
}
