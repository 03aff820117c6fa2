//! REST backend for PostgREST-style document APIs.
//!
//! Every collection is reached at `{base_url}/rest/v1/{collection}`.
//! Filters travel as `field=eq.value`, ordering as `order=field.asc` and
//! limits as `limit=n`. Writes ask for the affected rows back with
//! `Prefer: return=representation`.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use quizforge_core::error::StoreError;
use quizforge_core::model::{Attempt, Group, Question, Test, UserAnswer};
use quizforge_core::traits::{Backend, Collection, Direction, ListQuery, Record, Repository};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct RestError {
    message: String,
}

/// Shared HTTP client and credentials.
struct RestClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl RestClient {
    fn collection_url(&self, collection: Collection) -> Result<Url, StoreError> {
        let raw = format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), collection);
        Url::parse(&raw).map_err(|e| StoreError::Network(format!("invalid backend URL {raw}: {e}")))
    }

    fn url_with(&self, collection: Collection, params: &[(String, String)]) -> Result<Url, StoreError> {
        let mut url = self.collection_url(collection)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .header("authorization", format!("Bearer {token}"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                StoreError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Unauthorized(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RestError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(StoreError::Http { status, message });
        }
        Ok(response)
    }

    async fn rows<T: Record>(&self, request: RequestBuilder) -> Result<Vec<T>, StoreError> {
        self.send(request)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Serialization(format!("failed to parse response: {e}")))
    }
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn query_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|f| (f.field.clone(), format!("eq.{}", filter_value(&f.value))))
        .collect();
    if let Some((field, direction)) = &query.order {
        let dir = match direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push(("order".into(), format!("{field}.{dir}")));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".into(), limit.to_string()));
    }
    params
}

fn id_param(id: &str) -> Vec<(String, String)> {
    vec![("id".into(), format!("eq.{id}"))]
}

fn not_found<T: Record>(id: &str) -> StoreError {
    StoreError::NotFound {
        collection: T::COLLECTION.to_string(),
        id: id.to_string(),
    }
}

/// One collection of a `RestBackend`.
pub struct RestCollection<T> {
    client: Arc<RestClient>,
    _record: PhantomData<fn() -> T>,
}

impl<T> RestCollection<T> {
    fn new(client: Arc<RestClient>) -> Self {
        Self {
            client,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Record> Repository<T> for RestCollection<T> {
    #[instrument(skip(self, query))]
    async fn list(&self, query: &ListQuery) -> anyhow::Result<Vec<T>> {
        let url = self.client.url_with(T::COLLECTION, &query_params(query))?;
        let rows = self.client.rows(self.client.client.get(url)).await?;
        tracing::debug!(collection = %T::COLLECTION, count = rows.len(), "listed");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> anyhow::Result<Option<T>> {
        let mut params = id_param(id);
        params.push(("limit".into(), "1".into()));
        let url = self.client.url_with(T::COLLECTION, &params)?;
        let rows: Vec<T> = self.client.rows(self.client.client.get(url)).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, record))]
    async fn create(&self, mut record: T) -> anyhow::Result<T> {
        if record.id().is_empty() {
            record.set_id(Uuid::new_v4().to_string());
        }
        let url = self.client.collection_url(T::COLLECTION)?;
        let request = self
            .client
            .client
            .post(url)
            .header("prefer", "return=representation")
            .json(&record);
        let rows: Vec<T> = self.client.rows(request).await?;
        let created = rows.into_iter().next().ok_or_else(|| {
            StoreError::Serialization(format!("{} insert returned no rows", T::COLLECTION))
        })?;
        tracing::info!(collection = %T::COLLECTION, id = created.id(), "created");
        Ok(created)
    }

    #[instrument(skip(self, record))]
    async fn update(&self, id: &str, mut record: T) -> anyhow::Result<T> {
        record.set_id(id.to_string());
        let url = self.client.url_with(T::COLLECTION, &id_param(id))?;
        let request = self
            .client
            .client
            .patch(url)
            .header("prefer", "return=representation")
            .json(&record);
        let rows: Vec<T> = self.client.rows(request).await?;
        Ok(rows.into_iter().next().ok_or_else(|| not_found::<T>(id))?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        let url = self.client.url_with(T::COLLECTION, &id_param(id))?;
        let request = self
            .client
            .client
            .delete(url)
            .header("prefer", "return=representation");
        let rows: Vec<Value> = self
            .client
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Serialization(format!("failed to parse response: {e}")))?;
        if rows.is_empty() {
            return Err(not_found::<T>(id).into());
        }
        Ok(())
    }
}

/// Backend reached over HTTP.
pub struct RestBackend {
    tests: RestCollection<Test>,
    questions: RestCollection<Question>,
    groups: RestCollection<Group>,
    attempts: RestCollection<Attempt>,
    answers: RestCollection<UserAnswer>,
}

impl RestBackend {
    /// Connect to `base_url`. Requests carry `api_key` as the `apikey`
    /// header and `access_token` (or the key itself) as the bearer token.
    pub fn new(
        base_url: &str,
        api_key: &str,
        access_token: Option<String>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;

        let client = Arc::new(RestClient {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            access_token,
            client,
        });
        Ok(Self {
            tests: RestCollection::new(Arc::clone(&client)),
            questions: RestCollection::new(Arc::clone(&client)),
            groups: RestCollection::new(Arc::clone(&client)),
            attempts: RestCollection::new(Arc::clone(&client)),
            answers: RestCollection::new(client),
        })
    }
}

impl Backend for RestBackend {
    fn name(&self) -> &str {
        "rest"
    }

    fn tests(&self) -> &dyn Repository<Test> {
        &self.tests
    }

    fn questions(&self) -> &dyn Repository<Question> {
        &self.questions
    }

    fn groups(&self) -> &dyn Repository<Group> {
        &self.groups
    }

    fn attempts(&self) -> &dyn Repository<Attempt> {
        &self.attempts
    }

    fn answers(&self) -> &dyn Repository<UserAnswer> {
        &self.answers
    }
}
