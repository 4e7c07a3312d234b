//! `VisionModel` backed by an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::Settings;
use crate::error::Error;
use crate::naming::{NameRequest, VisionModel};

/// Chat completions response, reduced to the parts we read.
#[derive(Deserialize)]
struct ChatResponse {
    /// Completions; only the first is used.
    #[serde(default)]
    choices: Vec<Choice>,
}

/// One completion.
#[derive(Deserialize)]
struct Choice {
    /// The assistant message.
    message: Message,
}

/// Assistant message body.
#[derive(Deserialize)]
struct Message {
    /// Text content; absent for refusals and tool calls.
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for `{base_url}/chat/completions`.
pub struct OpenAiVision {
    /// Bearer token.
    api_key: String,
    /// Full endpoint URL.
    endpoint: String,
    /// Shared HTTP client.
    http: HttpClient,
    /// Model name sent with every request.
    model: String,
}

impl OpenAiVision {
    /// Client for the endpoint and model in `settings`. Requests have no
    /// timeout: a rename waits until the service answers or fails.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built.
    pub fn new(settings: &Settings, api_key: String) -> Result<Self, Error> {
        let http = HttpClient::builder().timeout(None::<Duration>).build()?;
        let base = settings.base_url.trim_end_matches('/');
        return Ok(Self {
            api_key,
            endpoint: format!("{base}/chat/completions"),
            http,
            model: settings.model.clone(),
        });
    }
}

impl VisionModel for OpenAiVision {
    fn complete(&self, request: &NameRequest<'_>) -> Result<Option<String>, Error> {
        let payload = request_body(&self.model, request);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(Error::Inference {
                reason: format!("{status}: {}", truncate(&body, 256)),
            });
        }
        return first_message(&body);
    }
}

/// Text of the first choice, if it has any.
///
/// # Errors
///
/// Returns `Error::Json` if the body is not a chat completions response.
fn first_message(body: &str) -> Result<Option<String>, Error> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    return Ok(parsed.choices.into_iter().next().and_then(|c| return c.message.content));
}

/// JSON body: the instruction as the system message, then the note title
/// and the image as one user message.
fn request_body(model: &str, request: &NameRequest<'_>) -> Value {
    return json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": request.instruction,
            },
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": format!("Note title: {}", request.note_title),
                    },
                    {
                        "type": "image_url",
                        "image_url": { "url": request.image_data_url },
                    },
                ],
            },
        ],
    });
}

/// At most `max` characters of `text`, for error messages.
fn truncate(text: &str, max: usize) -> String {
    return text.chars().take(max).collect();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn body_carries_instruction_title_and_image() {
        let request = NameRequest {
            image_data_url: "data:image/png;base64,AAAA".to_string(),
            instruction: "name it",
            note_title: "Trip",
        };
        let body = request_body("gpt-4o", &request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["content"], "name it");
        assert_eq!(body["messages"][1]["content"][0]["text"], "Note title: Trip");
        assert_eq!(body["messages"][1]["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"cat.png"}},{"message":{"content":"dog.png"}}]}"#;
        assert_eq!(first_message(body).unwrap().as_deref(), Some("cat.png"));
    }

    #[test]
    fn empty_or_contentless_answers_are_none() {
        assert_eq!(first_message(r#"{"choices":[]}"#).unwrap(), None);
        assert_eq!(first_message(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap(), None);
        assert_eq!(first_message("{}").unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(first_message("<html>"), Err(Error::Json(_))));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let settings = Settings {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Settings::default()
        };
        let client = OpenAiVision::new(&settings, "k".to_string()).unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/v1/chat/completions");
    }
}
