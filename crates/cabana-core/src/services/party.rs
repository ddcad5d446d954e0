//! Party game operations on top of the sync coordinator.

use std::path::Path;
use std::sync::Arc;

use crate::ai::{
    generate_or_fallback, DisabledGenerator, GeminiGenerator, Prompt, TextGenerator,
};
use crate::config::AppConfig;
use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::leaderboard::{tally, Standing};
use crate::models::{Category, Complaint, Participant, Quote, Vote};
use crate::remote::RemoteContext;
use crate::sync::SyncCoordinator;

/// Everything a client needs: synced collections plus text generation.
///
/// Writes wait for their remote mirror before returning so short-lived
/// clients do not exit with an upsert still in flight.
#[derive(Clone)]
pub struct PartyService {
    sync: SyncCoordinator,
    generator: Arc<dyn TextGenerator>,
}

impl PartyService {
    pub fn new(sync: SyncCoordinator, generator: Arc<dyn TextGenerator>) -> Self {
        Self { sync, generator }
    }

    /// Open the local store at `db_path`, bootstrap the remote store once,
    /// and pick a text generator from `config`.
    pub async fn open(config: &AppConfig, db_path: &Path) -> Result<Self> {
        let local = LocalStore::open_or_memory(db_path);
        let remote = RemoteContext::bootstrap(config.remote_credentials().as_ref()).await;
        let sync = SyncCoordinator::new(local, remote)?;
        Ok(Self::new(sync, generator_from_config(config)))
    }

    pub const fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    pub fn generator_provider(&self) -> &'static str {
        self.generator.provider()
    }

    pub fn active_user(&self) -> Option<String> {
        self.sync.active_user()
    }

    fn require_active_user(&self) -> Result<String> {
        self.active_user().ok_or(Error::NoActiveUser)
    }

    /// Become `name` on this device. Joining with a known name keeps the
    /// original join time.
    pub async fn join(&self, name: &str) -> Result<Participant> {
        let name = required(name, "Name")?;
        self.sync.set_active_user(&name);
        self.sync.write(Participant::new(name.clone())).await;

        let participant = self
            .sync
            .snapshot::<Participant>()
            .into_iter()
            .find(|participant| participant.name == name)
            .unwrap_or_else(|| Participant::new(name));
        tracing::info!("Joined as {}", participant.name);
        Ok(participant)
    }

    /// Forget who is using this device. Returns the previous name.
    pub fn logout(&self) -> Option<String> {
        let previous = self.active_user();
        self.sync.clear_active_user();
        previous
    }

    pub async fn cast_vote(&self, category: Category, candidate: &str) -> Result<Vote> {
        let voter = self.require_active_user()?;
        let candidate = required(candidate, "Candidate")?;

        let vote = Vote::new(voter, candidate, category);
        self.sync.write(vote.clone()).await;
        Ok(vote)
    }

    pub async fn retract_vote(&self, category: Category) -> Result<()> {
        let voter = self.require_active_user()?;
        self.sync.retract_vote(&voter, category).await;
        Ok(())
    }

    pub async fn post_quote(&self, text: &str, author: &str) -> Result<Quote> {
        let added_by = self.require_active_user()?;
        let text = required(text, "Quote text")?;
        let author = required(author, "Author")?;

        let quote = Quote::new(text, author, added_by);
        self.sync.write(quote.clone()).await;
        Ok(quote)
    }

    /// File an anonymous complaint with a generated manager reply.
    pub async fn file_complaint(&self, text: &str) -> Result<Complaint> {
        let text = required(text, "Complaint text")?;
        let prompt = Prompt::manager_reply(&text);
        let reply = generate_or_fallback(self.generator.as_ref(), &prompt).await;

        let complaint = Complaint::new(text, reply);
        self.sync.write(complaint.clone()).await;
        Ok(complaint)
    }

    pub async fn roast(&self, name: &str) -> String {
        let prompt = Prompt::roast_participant(name.trim());
        generate_or_fallback(self.generator.as_ref(), &prompt).await
    }

    pub async fn spin_dare(&self) -> String {
        generate_or_fallback(self.generator.as_ref(), &Prompt::dare()).await
    }

    pub async fn participants(&self) -> Vec<Participant> {
        self.sync.refresh().await
    }

    pub async fn votes(&self) -> Vec<Vote> {
        self.sync.refresh().await
    }

    pub async fn quotes(&self) -> Vec<Quote> {
        self.sync.refresh().await
    }

    pub async fn complaints(&self) -> Vec<Complaint> {
        self.sync.refresh().await
    }

    pub async fn leaderboard(&self, category: Category) -> Vec<Standing> {
        tally(&self.votes().await, category)
    }
}

impl std::fmt::Debug for PartyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartyService")
            .field("sync", &self.sync)
            .field("generator", &self.generator.provider())
            .finish()
    }
}

fn generator_from_config(config: &AppConfig) -> Arc<dyn TextGenerator> {
    let Some(gemini) = config.gemini() else {
        tracing::info!("Text generation not configured; using canned texts");
        return Arc::new(DisabledGenerator);
    };

    match GeminiGenerator::new(gemini) {
        Ok(generator) => Arc::new(generator),
        Err(error) => {
            tracing::warn!("{error}; using canned texts");
            Arc::new(DisabledGenerator)
        }
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::InvalidInput(format!("{field} must not be empty")))
    } else {
        Ok(value.to_string())
    }
}
