//! Uniform request/response contract over the three hosted generation
//! services. Each profile owns its endpoint, envelope, auth header shape,
//! and image encoding; `invoke` normalizes them behind one signature and
//! pulls the single textual reply out of each differently-shaped response.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{DeckError, Result};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const DEEPSEEK_URL: &str = "https://api.deepseek.com/chat/completions";

const OPENAI_MODEL: &str = "gpt-4o";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEEPSEEK_MODEL: &str = "deepseek-chat";

/// DeepSeek rejects requests above this budget, so it is clamped silently.
const DEEPSEEK_MAX_TOKENS: u32 = 8192;

const TEMPERATURE: f64 = 0.7;

/// The three interchangeable backend profiles, selected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Gpt4o,
    Claude,
    DeepSeek,
}

impl Backend {
    pub fn id(&self) -> &'static str {
        match self {
            Backend::Gpt4o => "gpt-4o",
            Backend::Claude => "claude",
            Backend::DeepSeek => "deepseek",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "gpt-4o" => Some(Backend::Gpt4o),
            "claude" => Some(Backend::Claude),
            "deepseek" => Some(Backend::DeepSeek),
            _ => None,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Seam between the pipeline and the hosted services; tests drive the
/// pipeline through a scripted implementation of this trait.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Send one prompt and return the raw textual reply. Never returns an
    /// empty string: absence of extractable content is a failure.
    async fn invoke(
        &self,
        backend: Backend,
        system: &str,
        user: &str,
        max_tokens: u32,
        json_mode: bool,
        image: Option<&str>,
    ) -> Result<String>;
}

pub struct HttpBackend {
    http: reqwest::Client,
    config: Config,
}

impl HttpBackend {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn api_key(&self, backend: Backend) -> Result<&str> {
        let (key, var) = match backend {
            Backend::Gpt4o => (&self.config.openai_api_key, "OPENAI_API_KEY"),
            Backend::Claude => (&self.config.anthropic_api_key, "ANTHROPIC_API_KEY"),
            Backend::DeepSeek => (&self.config.deepseek_api_key, "DEEPSEEK_API_KEY"),
        };
        key.as_deref()
            .ok_or_else(|| DeckError::Config(format!("{var} is not configured")))
    }
}

#[async_trait]
impl GenerativeBackend for HttpBackend {
    async fn invoke(
        &self,
        backend: Backend,
        system: &str,
        user: &str,
        max_tokens: u32,
        json_mode: bool,
        image: Option<&str>,
    ) -> Result<String> {
        let api_key = self.api_key(backend)?;

        let (url, body) = match backend {
            Backend::Gpt4o => (
                OPENAI_URL,
                openai_request_body(system, user, max_tokens, json_mode, image),
            ),
            Backend::Claude => (
                ANTHROPIC_URL,
                claude_request_body(system, user, max_tokens, json_mode, image),
            ),
            Backend::DeepSeek => (
                DEEPSEEK_URL,
                deepseek_request_body(system, user, max_tokens, json_mode),
            ),
        };

        tracing::debug!(backend = backend.id(), max_tokens, json_mode, "backend request");

        let mut req = self.http.post(url).json(&body);
        req = match backend {
            Backend::Gpt4o | Backend::DeepSeek => req.bearer_auth(api_key),
            Backend::Claude => req
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01"),
        };

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport_error(backend, status.as_u16(), body));
        }

        let reply: Value = response.json().await?;
        match backend {
            Backend::Gpt4o | Backend::DeepSeek => extract_chat_content(&reply, backend),
            Backend::Claude => extract_claude_content(&reply),
        }
    }
}

/// Surface a non-success reply. The error shown to users carries only the
/// status; the provider's diagnostic body goes to the log.
fn transport_error(backend: Backend, status: u16, body: String) -> DeckError {
    tracing::warn!(
        backend = backend.id(),
        status,
        body = %body,
        "backend rejected request"
    );
    DeckError::Transport {
        backend: backend.id(),
        status,
        body,
    }
}

fn user_message_text(user: &str) -> Value {
    json!({ "role": "user", "content": user })
}

/// OpenAI-style multimodal content: text part plus an `image_url` part when
/// a reference image data-URL is attached.
fn openai_request_body(
    system: &str,
    user: &str,
    max_tokens: u32,
    json_mode: bool,
    image: Option<&str>,
) -> Value {
    let user_message = match image {
        Some(data_url) => json!({
            "role": "user",
            "content": [
                { "type": "text", "text": user },
                { "type": "image_url", "image_url": { "url": data_url } },
            ],
        }),
        None => user_message_text(user),
    };

    let mut body = json!({
        "model": OPENAI_MODEL,
        "messages": [
            { "role": "system", "content": system },
            user_message,
        ],
        "temperature": TEMPERATURE,
        "max_tokens": max_tokens,
    });
    if json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

/// Anthropic takes the system prompt out-of-band and images as separate
/// base64 source blocks split out of the data-URL. There is no JSON
/// response mode, so json_mode becomes a system-prompt suffix.
fn claude_request_body(
    system: &str,
    user: &str,
    max_tokens: u32,
    json_mode: bool,
    image: Option<&str>,
) -> Value {
    let system = if json_mode {
        format!("{system}\n\nIMPORTANT: Respond with valid JSON only, no markdown formatting.")
    } else {
        system.to_string()
    };

    let user_message = match image.and_then(split_data_url) {
        Some((media_type, data)) => json!({
            "role": "user",
            "content": [
                {
                    "type": "image",
                    "source": { "type": "base64", "media_type": media_type, "data": data },
                },
                { "type": "text", "text": user },
            ],
        }),
        None => user_message_text(user),
    };

    json!({
        "model": ANTHROPIC_MODEL,
        "max_tokens": max_tokens,
        "system": system,
        "messages": [user_message],
    })
}

/// DeepSeek speaks the OpenAI envelope but has no image support and a hard
/// response-budget ceiling.
fn deepseek_request_body(system: &str, user: &str, max_tokens: u32, json_mode: bool) -> Value {
    let mut body = json!({
        "model": DEEPSEEK_MODEL,
        "messages": [
            { "role": "system", "content": system },
            user_message_text(user),
        ],
        "temperature": TEMPERATURE,
        "max_tokens": max_tokens.min(DEEPSEEK_MAX_TOKENS),
    });
    if json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

/// Split `data:image/png;base64,...` into media type and payload. Returns
/// None for anything that is not a base64 image data-URL.
fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (media_type, data) = rest.split_once(";base64,")?;
    if !media_type.starts_with("image/") || data.is_empty() {
        return None;
    }
    Some((media_type, data))
}

fn extract_chat_content(reply: &Value, backend: Backend) -> Result<String> {
    let choice = &reply["choices"][0];
    if choice["finish_reason"].as_str() == Some("length") {
        tracing::warn!(
            backend = backend.id(),
            usage = %reply["usage"],
            "reply truncated at the response budget"
        );
    }
    let content = choice["message"]["content"].as_str().unwrap_or_default();
    if content.is_empty() {
        return Err(DeckError::Decode(format!(
            "no content in {} reply",
            backend.id()
        )));
    }
    Ok(content.to_string())
}

fn extract_claude_content(reply: &Value) -> Result<String> {
    let content = reply["content"][0]["text"].as_str().unwrap_or_default();
    if content.is_empty() {
        return Err(DeckError::Decode("no content in claude reply".to_string()));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_URL: &str = "data:image/png;base64,aGVsbG8=";

    #[test]
    fn backend_ids_round_trip() {
        for backend in [Backend::Gpt4o, Backend::Claude, Backend::DeepSeek] {
            assert_eq!(Backend::parse(backend.id()), Some(backend));
        }
        assert_eq!(Backend::parse("gpt-5"), None);
    }

    #[test]
    fn openai_body_carries_json_mode_and_image_parts() {
        let body = openai_request_body("sys", "draw free fall", 4096, true, Some(PNG_URL));
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        let parts = body["messages"][1]["content"].as_array().expect("parts");
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["image_url"]["url"], PNG_URL);

        let plain = openai_request_body("sys", "draw free fall", 4096, false, None);
        assert!(plain.get("response_format").is_none());
        assert_eq!(plain["messages"][1]["content"], "draw free fall");
    }

    #[test]
    fn claude_body_splits_data_url_and_appends_json_instruction() {
        let body = claude_request_body("sys", "draw", 16384, true, Some(PNG_URL));
        let system = body["system"].as_str().expect("system");
        assert!(system.starts_with("sys"));
        assert!(system.contains("valid JSON only"));

        let blocks = body["messages"][0]["content"].as_array().expect("blocks");
        assert_eq!(blocks[0]["source"]["media_type"], "image/png");
        assert_eq!(blocks[0]["source"]["data"], "aGVsbG8=");
        assert_eq!(blocks[1]["text"], "draw");
    }

    #[test]
    fn claude_malformed_data_url_falls_back_to_text() {
        let body = claude_request_body("sys", "draw", 1024, false, Some("nonsense"));
        assert_eq!(body["messages"][0]["content"], "draw");
        assert_eq!(body["system"], "sys");
    }

    #[test]
    fn deepseek_clamps_response_budget() {
        let body = deepseek_request_body("sys", "draw", 16384, true);
        assert_eq!(body["max_tokens"], 8192);

        let small = deepseek_request_body("sys", "draw", 4096, true);
        assert_eq!(small["max_tokens"], 4096);
    }

    #[test]
    fn chat_extraction_rejects_empty_content() {
        let reply = serde_json::json!({
            "choices": [{ "finish_reason": "stop", "message": { "content": "" } }]
        });
        assert!(extract_chat_content(&reply, Backend::Gpt4o).is_err());

        let ok = serde_json::json!({
            "choices": [{ "finish_reason": "stop", "message": { "content": "{\"plan\":\"x\"}" } }]
        });
        assert_eq!(
            extract_chat_content(&ok, Backend::Gpt4o).expect("content"),
            "{\"plan\":\"x\"}"
        );
    }

    #[test]
    fn claude_extraction_reads_first_text_block() {
        let reply = serde_json::json!({ "content": [{ "type": "text", "text": "hi" }] });
        assert_eq!(extract_claude_content(&reply).expect("content"), "hi");
        assert!(extract_claude_content(&serde_json::json!({ "content": [] })).is_err());
    }

    #[test]
    fn rejected_request_logs_the_diagnostic_body() {
        use std::sync::{Arc, Mutex, PoisonError};

        #[derive(Clone)]
        struct Capture(Arc<Mutex<Vec<u8>>>);
        impl std::io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let sink = Capture(Arc::new(Mutex::new(Vec::new())));
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let sink = sink.clone();
                move || sink.clone()
            })
            .finish();

        let err = tracing::subscriber::with_default(subscriber, || {
            transport_error(Backend::Gpt4o, 429, "rate limited, retry later".to_string())
        });
        assert_eq!(err.to_string(), "gpt-4o API error: 429");

        let logged = String::from_utf8(
            sink.0.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        )
        .expect("utf8");
        assert!(logged.contains("rate limited, retry later"));
    }

    #[test]
    fn missing_credential_is_a_config_error_before_any_call() {
        let backend = HttpBackend::new(Config::default());
        let err = backend.api_key(Backend::Claude).expect_err("no key");
        assert!(matches!(err, DeckError::Config(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }
}
