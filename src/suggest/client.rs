use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use anyhow::Context as _;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::model::RenderConfig;
use crate::foundation::error::{LoopError, LoopResult};

/// Returned in place of real suggestions whenever a request fails.
pub const FALLBACK_PHRASES: [&str; 3] = ["Error generating text", "Try again later", "Check API Key"];

pub const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Tone requested for suggested phrases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mood {
    #[default]
    Cyberpunk,
    Retro,
    Minimalist,
    Aggressive,
    Calm,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Cyberpunk,
        Mood::Retro,
        Mood::Minimalist,
        Mood::Aggressive,
        Mood::Calm,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Mood::Cyberpunk => "Cyberpunk",
            Mood::Retro => "Retro",
            Mood::Minimalist => "Minimalist",
            Mood::Aggressive => "Aggressive",
            Mood::Calm => "Calm",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mood {
    type Err = LoopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Mood::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                LoopError::validation(format!(
                    "unknown mood '{s}' (expected one of: cyberpunk, retro, minimalist, aggressive, calm)"
                ))
            })
    }
}

/// A topic plus mood. The topic is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionRequest {
    topic: String,
    mood: Mood,
}

impl SuggestionRequest {
    pub fn new(topic: impl Into<String>, mood: Mood) -> LoopResult<Self> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(LoopError::validation("suggestion topic must not be empty"));
        }
        Ok(Self { topic, mood })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn prompt(&self) -> String {
        format!(
            "Generate 5 short, punchy, and catchy phrases (max 5 words each) suitable for an \
             infinite scrolling text loop about the topic: \"{}\". The mood should be: \"{}\". \
             Return ONLY a JSON array of strings.",
            self.topic, self.mood
        )
    }
}

/// Anything that can turn a request into candidate phrases.
pub trait PhraseSuggester {
    fn suggest(&self, request: &SuggestionRequest) -> LoopResult<Vec<String>>;
}

impl<S: PhraseSuggester + ?Sized> PhraseSuggester for Arc<S> {
    fn suggest(&self, request: &SuggestionRequest) -> LoopResult<Vec<String>> {
        (**self).suggest(request)
    }
}

/// Gemini `generateContent` client constrained to a JSON array of strings.
#[derive(Clone)]
pub struct GeminiSuggester {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for GeminiSuggester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSuggester")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiSuggester {
    pub fn new(api_key: impl Into<String>) -> LoopResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LoopError::suggestion(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_owned(),
            model: GEMINI_MODEL.to_owned(),
        })
    }

    /// Key from `GEMINI_API_KEY`, then `API_KEY`.
    pub fn from_env() -> LoopResult<Self> {
        let key = ["GEMINI_API_KEY", "API_KEY"]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                LoopError::suggestion("no API key: set GEMINI_API_KEY or API_KEY")
            })?;
        Self::new(key)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl PhraseSuggester for GeminiSuggester {
    #[tracing::instrument(skip(self, request), fields(mood = %request.mood()))]
    fn suggest(&self, request: &SuggestionRequest) -> LoopResult<Vec<String>> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .map_err(|e| LoopError::suggestion(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| LoopError::suggestion(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(LoopError::suggestion(format!(
                "service returned {status}: {}",
                text.trim()
            )));
        }

        let body: Value = serde_json::from_str(&text)?;
        let phrases = parse_response(&body)?;
        debug!(count = phrases.len(), "phrases received");
        Ok(phrases)
    }
}

fn request_body(request: &SuggestionRequest) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": request.prompt() }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        }
    })
}

/// Extract the phrase list from a `generateContent` response.
///
/// A response without any text yields an empty list.
fn parse_response(body: &Value) -> LoopResult<Vec<String>> {
    let Some(text) = body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
    else {
        return Ok(Vec::new());
    };
    let phrases: Vec<String> = serde_json::from_str(text)?;
    Ok(phrases)
}

fn fallback() -> Vec<String> {
    FALLBACK_PHRASES.iter().map(|s| (*s).to_owned()).collect()
}

/// Ask `suggester`, replacing any failure with [`FALLBACK_PHRASES`].
pub fn suggest_or_fallback<S: PhraseSuggester + ?Sized>(
    suggester: &S,
    request: &SuggestionRequest,
) -> Vec<String> {
    match suggester.suggest(request) {
        Ok(phrases) => phrases,
        Err(err) => {
            warn!(error = %err, topic = request.topic(), "phrase suggestion failed, using fallback");
            fallback()
        }
    }
}

/// Result of [`request_in_background`], ready to be polled from a frame loop.
#[derive(Debug)]
pub struct PendingSuggestion {
    rx: Receiver<Vec<String>>,
}

impl PendingSuggestion {
    /// Non-blocking check. `None` while the request is still in flight.
    pub fn try_take(&self) -> Option<Vec<String>> {
        match self.rx.try_recv() {
            Ok(phrases) => Some(phrases),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(fallback()),
        }
    }

    /// Block until the phrases are available.
    pub fn wait(self) -> Vec<String> {
        self.rx.recv().unwrap_or_else(|_| fallback())
    }
}

/// Run the request on a worker thread so the caller never blocks on the network.
pub fn request_in_background<S>(
    suggester: S,
    request: SuggestionRequest,
) -> LoopResult<PendingSuggestion>
where
    S: PhraseSuggester + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    std::thread::Builder::new()
        .name("loopline-suggest".to_owned())
        .spawn(move || {
            let phrases = suggest_or_fallback(&suggester, &request);
            // The receiver may already be gone; nothing left to do then.
            let _ = tx.send(phrases);
        })
        .context("failed to spawn suggestion thread")?;
    Ok(PendingSuggestion { rx })
}

/// Replace the loop text with the first phrase. `None` when there are no phrases.
pub fn apply_first_phrase(config: &RenderConfig, phrases: &[String]) -> Option<RenderConfig> {
    phrases.first().map(|p| config.with_text(p.as_str()))
}
