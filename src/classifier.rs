use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::sync::Arc;

use crate::constants::{
    subtitle, API_TIMEOUT, CLASSIFY_PROMPT, DISTRACTED_TOKEN, MAX_VERDICT_TOKENS,
};
use crate::notify::Notifier;
use crate::types::{ChatRequest, ChatResponse, ContentPart, ImageUrl, Message, Verdict};

// Decides whether a screenshot shows a focused or a distracted user.
//
// Implementations never fail: anything that goes wrong degrades to
// `Verdict::Focused`. Calls may be slow and must stay off the command path.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &Path) -> Verdict;
}

// Remote vision model behind an OpenAI-compatible chat completions endpoint
pub struct VisionClassifier {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    notifier: Arc<dyn Notifier>,
}

impl VisionClassifier {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: String,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model,
            notifier,
        })
    }

    async fn request_verdict(&self, api_key: &str, data_url: String) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: CLASSIFY_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: MAX_VERDICT_TOKENS,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to classification service")?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            bail!("Classification service returned {}: {}", status, body.trim());
        }

        let response_data: ChatResponse = response
            .json()
            .await
            .context("Failed to parse classification response")?;

        Ok(response_data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Classifier for VisionClassifier {
    async fn classify(&self, image: &Path) -> Verdict {
        let Some(api_key) = self.api_key.as_deref() else {
            self.notifier.error(
                subtitle::CONFIG_ERROR,
                "No API key configured (set OPENAI_API_KEY); distraction checks are disabled",
            );
            return Verdict::Focused;
        };

        let data_url = match encode_image(image).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not encode {}: {:#}", image.display(), e);
                return Verdict::Focused;
            }
        };

        match self.request_verdict(api_key, data_url).await {
            Ok(text) => {
                let verdict = parse_verdict(&text);
                debug!("Classifier said {:?} -> {}", text.trim(), verdict);
                verdict
            }
            Err(e) => {
                warn!("Classification failed, assuming focused: {:#}", e);
                Verdict::Focused
            }
        }
    }
}

async fn encode_image(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(bytes)))
}

// DISTRACTED iff the token appears anywhere in the reply, in any case.
pub fn parse_verdict(text: &str) -> Verdict {
    if text.to_ascii_uppercase().contains(DISTRACTED_TOKEN) {
        Verdict::Distracted
    } else {
        Verdict::Focused
    }
}
