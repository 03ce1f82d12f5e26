use serde::{Deserialize, Serialize};
use std::fmt;

// Types shared across multiple modules

// Binary judgement returned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Focused,
    Distracted,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Focused => write!(f, "FOCUSED"),
            Verdict::Distracted => write!(f, "DISTRACTED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

// A user-facing message; the shell decides how to present it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub message: String,
    pub level: Level,
}

impl Notification {
    pub fn new(level: Level, subtitle: &str, message: impl Into<String>) -> Self {
        Self {
            title: crate::constants::APP_NAME.to_string(),
            subtitle: subtitle.to_string(),
            message: message.into(),
            level,
        }
    }
}

// API request structure
#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

// Message struct for API calls
#[derive(Serialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
pub struct ImageUrl {
    pub url: String,
}

// API response structure
#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}
