//! Generated party texts (roasts, manager replies, dares).
//!
//! Generation is best-effort: callers go through [`generate_or_fallback`],
//! which swaps any failure for a canned line matching the prompt's purpose.

mod gemini;

pub use gemini::GeminiGenerator;

use std::fmt;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Why a generation attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    NotConfigured,
    QuotaExceeded,
    Unauthorized,
    ModelUnavailable,
    Network,
    EmptyResponse,
    Other,
}

impl GenerationErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotConfigured => "not configured",
            Self::QuotaExceeded => "quota exceeded",
            Self::Unauthorized => "unauthorized",
            Self::ModelUnavailable => "model unavailable",
            Self::Network => "network",
            Self::EmptyResponse => "empty response",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("Text generation failed ({kind}): {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::new(
            GenerationErrorKind::NotConfigured,
            "no text generation provider configured",
        )
    }
}

/// What a prompt is for; selects the canned fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPurpose {
    /// Short roast of someone who just joined
    Roast,
    /// Dismissive cabin-manager answer to a complaint
    ManagerReply,
    /// A dare for the wheel
    Dare,
}

const ROAST_FALLBACKS: [&str; 4] = [
    "N-am buget de roast, dar arăți de parcă ai picat Bac-ul la desen. 🎨",
    "Skibidi toilet ar fi mândru de tine. 🚽",
    "6 7 vine garda să te ia pentru vibe-ul ăsta. 🚓",
    "Tralalelo tralala, dar tu ești tralala fail. 🎵",
];

const MANAGER_REPLY_FALLBACKS: [&str; 4] = [
    "Am notat pe o foaie invizibilă. Arunc-o la gunoi singur. 🚮",
    "Skibidi! Am notat, dar 6 7 vine garda să verifice. 🚽🚓",
    "Tralalelo tralala, am notat tichetul tău. 🎵",
    "Sigma rizz response: am notat, low key. 💀",
];

const DARE_FALLBACKS: [&str; 10] = [
    "Dansează Macarena pe silențios până observă cineva. 💃",
    "Fă skibidi dance până observă cineva. 🚽",
    "Strigă '6 7 VINE GARDA' cât mai tare. 🚓",
    "Cântă 'tralalelo tralala' în fața tuturor. 🎵",
    "Baga un shot. Fără discuții. 🥃",
    "Dansează pe manele 1 minut. 💃",
    "Fă 10 flotări, coachul meu. 💪",
    "Povestește cel mai cringe moment al tău. 💀",
    "Arată ultima poză din galerie. Fără trișat. 📸",
    "Spune 'sigma rizz' la fiecare răspuns 5 minute. 💀",
];

impl PromptPurpose {
    pub const fn fallbacks(self) -> &'static [&'static str] {
        match self {
            Self::Roast => &ROAST_FALLBACKS,
            Self::ManagerReply => &MANAGER_REPLY_FALLBACKS,
            Self::Dare => &DARE_FALLBACKS,
        }
    }

    /// A canned line picked uniformly at random.
    pub fn fallback(self) -> &'static str {
        let options = self.fallbacks();
        options
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(options[0])
    }
}

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 250;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub purpose: PromptPurpose,
    pub text: String,
    pub max_output_tokens: u32,
}

impl Prompt {
    fn new(purpose: PromptPurpose, text: String) -> Self {
        Self {
            purpose,
            text,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn roast_participant(name: &str) -> Self {
        Self::new(
            PromptPurpose::Roast,
            format!(
                "Ești \"Ceață\", un Gen Z arogant cu TikTok brainrot care judecă oamenii după nume. \
                 Tocmai a intrat cineva pe nume \"{name}\". Dă-i un roast scurt în rom-gleză, \
                 cu referințe la skibidi, \"6 7 vine garda\" sau tralalelo tralala. \
                 Amuzant, nu doar răutăcios. Maxim 80 de caractere. \
                 Răspunde doar cu textul roast-ului, fără ghilimele."
            ),
        )
    }

    pub fn manager_reply(complaint: &str) -> Self {
        Self::new(
            PromptPurpose::ManagerReply,
            format!(
                "Ești Managerul Cabanei, un corporatist bombardier care știe toate meme-urile TikTok. \
                 Clientul se plânge: \"{complaint}\". Spune-i că ai notat, în limbaj de lemn \
                 amestecat cu nepăsare totală (\"tichet\", \"escaladăm\", \"nu e în buget\", \
                 \"skill issue\", \"low key\"). O singură propoziție, maxim 120 de caractere. \
                 Răspunde doar cu textul răspunsului, fără ghilimele."
            ),
        )
    }

    pub fn dare() -> Self {
        Self::new(
            PromptPurpose::Dare,
            "Ești maestrul de ceremonii la o petrecere haotică de tineri, cu TikTok brainrot complet. \
             Generează o PROVOCARE clară, o frază completă, pentru cineva de la masă: dans penibil, \
             telefon, imitații, recunoașteri sau meme-uri (skibidi, \"6 7 vine garda\", sigma, rizz). \
             Maxim 150 de caractere. Răspunde doar cu provocarea, fără ghilimele."
                .to_string(),
        )
    }
}

/// Opaque `prompt -> text` capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn generate_text(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}

/// Generate text, or return a canned line when generation fails.
pub async fn generate_or_fallback(generator: &dyn TextGenerator, prompt: &Prompt) -> String {
    match generator.generate_text(prompt).await {
        Ok(text) => text,
        Err(error) => {
            if error.kind == GenerationErrorKind::NotConfigured {
                tracing::debug!("{error}; using canned text");
            } else {
                tracing::warn!("{error}; using canned text");
            }
            prompt.purpose.fallback().to_string()
        }
    }
}

/// Generator used when no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn provider(&self) -> &'static str {
        "none"
    }

    async fn generate_text(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
        Err(GenerationError::not_configured())
    }
}
