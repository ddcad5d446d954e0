//! Supabase (PostgREST) implementation of the Remote Store.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{Matcher, RealtimeConfig, RealtimeFeed, RemoteError, RemoteResult, RemoteStore};
use crate::models::{Collection, ConflictPolicy};
use crate::sync::{Listener, ListenerId};
use crate::util::body_excerpt;

/// PostgREST codes meaning "the table is not there yet".
const TABLE_MISSING_CODES: [&str; 3] = ["42P01", "PGRST205", "PGRST116"];

pub struct SupabaseRemote {
    rest_url: String,
    anon_key: String,
    client: Client,
    feed: RealtimeFeed,
}

impl SupabaseRemote {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> RemoteResult<Self> {
        let base_url = normalize_project_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url: format!("{base_url}/rest/v1"),
            feed: RealtimeFeed::new(RealtimeConfig::for_project(&base_url, &anon_key)),
            anon_key,
            client: Client::builder().build()?,
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.rest_url, collection.table())
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl RemoteStore for SupabaseRemote {
    fn backend_name(&self) -> &'static str {
        "supabase"
    }

    async fn probe(&self) -> RemoteResult<()> {
        let request = self.public_request(
            self.client
                .get(self.table_url(Collection::Participants))
                .query(&[("select", "count"), ("limit", "1")]),
        );
        check_response(request.send().await?).await?;
        Ok(())
    }

    async fn fetch_all(&self, collection: Collection) -> RemoteResult<Vec<Value>> {
        let request = self.public_request(
            self.client
                .get(self.table_url(collection))
                .query(&[("select", "*")]),
        );
        let response = check_response(request.send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn upsert(
        &self,
        collection: Collection,
        row: Value,
        conflict_columns: &'static [&'static str],
        policy: ConflictPolicy,
    ) -> RemoteResult<()> {
        let resolution = match policy {
            ConflictPolicy::Replace => "resolution=merge-duplicates",
            ConflictPolicy::KeepExisting => "resolution=ignore-duplicates",
        };
        let request = self.public_request(
            self.client
                .post(self.table_url(collection))
                .query(&[("on_conflict", conflict_columns.join(","))])
                .header("Prefer", format!("{resolution},return=minimal"))
                .json(&row),
        );
        check_response(request.send().await?).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, matcher: &Matcher) -> RemoteResult<()> {
        if matcher.filters().is_empty() {
            return Err(RemoteError::Api(format!(
                "refusing to delete every row of {}",
                collection.table()
            )));
        }

        let filters: Vec<(String, String)> = matcher
            .filters()
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{value}")))
            .collect();
        let request = self.public_request(
            self.client
                .delete(self.table_url(collection))
                .query(&filters),
        );
        check_response(request.send().await?).await?;
        Ok(())
    }

    fn subscribe_to_changes(&self, collection: Collection, listener: Listener) -> ListenerId {
        self.feed.listen(collection, listener)
    }

    fn unsubscribe_from_changes(&self, collection: Collection, id: ListenerId) {
        self.feed.forget(collection, id);
    }
}

/// Validate a Supabase project URL and strip trailing slashes.
pub fn normalize_project_url(url: &str) -> RemoteResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !["http://", "https://"]
        .iter()
        .any(|scheme| trimmed.starts_with(scheme))
    {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    Ok(trimmed.trim_end_matches("/rest/v1").to_string())
}

async fn check_response(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_api_error(status, &body))
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    error: Option<String>,
}

fn classify_api_error(status: StatusCode, body: &str) -> RemoteError {
    let payload = serde_json::from_str::<PostgrestErrorResponse>(body).ok();
    let message = parse_api_error(status, payload.as_ref(), body);

    let table_missing = payload
        .as_ref()
        .and_then(|payload| payload.code.as_deref())
        .is_some_and(|code| TABLE_MISSING_CODES.contains(&code));

    if table_missing {
        RemoteError::TableMissing(message)
    } else {
        RemoteError::Api(message)
    }
}

fn parse_api_error(
    status: StatusCode,
    payload: Option<&PostgrestErrorResponse>,
    body: &str,
) -> String {
    if let Some(payload) = payload {
        if let Some(message) = payload
            .message
            .as_deref()
            .or(payload.details.as_deref())
            .or(payload.hint.as_deref())
            .or(payload.error.as_deref())
        {
            return match payload.code.as_deref() {
                Some(code) => format!("{} [{code}] ({})", message.trim(), status.as_u16()),
                None => format!("{} ({})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed = body_excerpt(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}
