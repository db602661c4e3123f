//! CouchDB document store over the HTTP API
//!
//! All collections share one CouchDB database. A document's `_id` is
//! `<collection>:<key>`, so equal keys in two collections never collide, and
//! the collection name is also written into the body as `collection` so
//! `_find` can select on it.

use async_trait::async_trait;
use mms_common::config::CouchConfig;
use mms_common::docstore::{DocumentStore, Filter};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const COLLECTION_FIELD: &str = "collection";
const FIND_PAGE_SIZE: usize = 500;

#[derive(Debug, Error)]
pub enum CouchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid CouchDB URL {0:?}")]
    InvalidUrl(String),

    #[error("Document {0} already exists")]
    Conflict(String),

    #[error("CouchDB error {0}: {1}")]
    Api(u16, String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl From<CouchError> for mms_common::Error {
    fn from(e: CouchError) -> Self {
        mms_common::Error::DocumentStore(e.to_string())
    }
}

#[derive(Deserialize)]
struct FindResponse {
    docs: Vec<Value>,
    #[serde(default)]
    bookmark: Option<String>,
}

#[derive(Deserialize)]
struct RevOnly {
    #[serde(rename = "_rev")]
    rev: String,
}

/// CouchDB client implementing [`DocumentStore`]
#[derive(Clone)]
pub struct CouchStore {
    http: reqwest::Client,
    base: Url,
    database: String,
    user: String,
    password: String,
}

impl CouchStore {
    pub fn new(config: &CouchConfig) -> Result<Self, CouchError> {
        let base = Url::parse(&config.url).map_err(|_| CouchError::InvalidUrl(config.url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(CouchError::InvalidUrl(config.url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base,
            database: config.database.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CouchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CouchError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(&self.database)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        if self.user.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.user, Some(&self.password))
        }
    }

    /// Create the database; an existing database is not an error
    pub async fn ensure_database(&self) -> Result<(), CouchError> {
        let response = self.request(reqwest::Method::PUT, self.url(&[])?).send().await?;
        match response.status() {
            s if s.is_success() => {
                info!(database = %self.database, "Created CouchDB database");
                Ok(())
            }
            StatusCode::PRECONDITION_FAILED => Ok(()),
            s => Err(api_error(s, response).await),
        }
    }

    /// Raw document including `_id`, `_rev` and the collection field
    async fn get_raw(&self, collection: &str, key: &str) -> Result<Option<Value>, CouchError> {
        let id = doc_id(collection, key);
        let response = self.request(reqwest::Method::GET, self.url(&[id.as_str()])?).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json().await?)),
            s => Err(api_error(s, response).await),
        }
    }

    async fn put(&self, collection: &str, key: &str, doc: &Value, rev: Option<String>) -> Result<(), CouchError> {
        let mut body = match doc {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other.clone());
                map
            }
        };
        body.insert(COLLECTION_FIELD.into(), json!(collection));
        if let Some(rev) = rev {
            body.insert("_rev".into(), json!(rev));
        }

        let id = doc_id(collection, key);
        let response = self
            .request(reqwest::Method::PUT, self.url(&[id.as_str()])?)
            .json(&body)
            .send()
            .await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchError::Conflict(key.to_string())),
            s => Err(api_error(s, response).await),
        }
    }
}

fn doc_id(collection: &str, key: &str) -> String {
    format!("{}:{}", collection, key)
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> CouchError {
    let text = response.text().await.unwrap_or_default();
    CouchError::Api(status.as_u16(), text)
}

/// Drop CouchDB bookkeeping fields
fn strip_meta(mut doc: Value) -> Value {
    if let Value::Object(map) = &mut doc {
        map.remove("_id");
        map.remove("_rev");
        map.remove(COLLECTION_FIELD);
    }
    doc
}

/// Mango selector restricted to one collection
fn collection_selector(collection: &str, filter: &Filter) -> Value {
    let mut clauses = vec![json!({ COLLECTION_FIELD: collection })];
    if !filter.is_empty() {
        clauses.push(filter.to_selector());
    }
    json!({ "$and": clauses })
}

#[async_trait]
impl DocumentStore for CouchStore {
    async fn find(&self, collection: &str, filter: &Filter) -> mms_common::Result<Vec<Value>> {
        let selector = collection_selector(collection, filter);
        let url = self.url(&["_find"])?;
        let mut docs = Vec::new();
        let mut bookmark: Option<String> = None;

        loop {
            let page = match filter.max_results() {
                Some(max) => FIND_PAGE_SIZE.min(max - docs.len()),
                None => FIND_PAGE_SIZE,
            };
            let mut body = json!({ "selector": selector, "limit": page });
            if let Some(b) = &bookmark {
                body["bookmark"] = json!(b);
            }

            let response = self
                .request(reqwest::Method::POST, url.clone())
                .json(&body)
                .send()
                .await
                .map_err(CouchError::from)?;
            let status = response.status();
            if !status.is_success() {
                return Err(api_error(status, response).await.into());
            }
            let found: FindResponse = response
                .json()
                .await
                .map_err(|e| CouchError::Parse(e.to_string()))?;

            let fetched = found.docs.len();
            docs.extend(found.docs.into_iter().map(strip_meta).filter(|d| filter.matches(d)));

            let done = fetched < page || filter.max_results().is_some_and(|max| docs.len() >= max);
            if done || found.bookmark.is_none() {
                break;
            }
            bookmark = found.bookmark;
        }

        debug!(collection, matched = docs.len(), "CouchDB query");
        Ok(docs)
    }

    async fn get(&self, collection: &str, key: &str) -> mms_common::Result<Option<Value>> {
        let doc = self.get_raw(collection, key).await?;
        Ok(doc
            .filter(|d| d.get(COLLECTION_FIELD).and_then(Value::as_str) == Some(collection))
            .map(strip_meta))
    }

    async fn insert(&self, collection: &str, key: &str, doc: &Value) -> mms_common::Result<()> {
        self.put(collection, key, doc, None).await?;
        debug!(collection, key, "CouchDB document inserted");
        Ok(())
    }

    async fn upsert(&self, collection: &str, key: &str, doc: &Value) -> mms_common::Result<()> {
        let rev = match self.get_raw(collection, key).await? {
            Some(existing) => Some(
                serde_json::from_value::<RevOnly>(existing)
                    .map_err(|e| CouchError::Parse(e.to_string()))?
                    .rev,
            ),
            None => None,
        };
        self.put(collection, key, doc, rev).await?;
        debug!(collection, key, "CouchDB document upserted");
        Ok(())
    }

    async fn ping(&self) -> mms_common::Result<()> {
        let response = self
            .request(reqwest::Method::GET, self.url(&[])?)
            .send()
            .await
            .map_err(CouchError::from)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(status, response).await.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> CouchConfig {
        CouchConfig {
            url: url.into(),
            user: "admin".into(),
            password: "password".into(),
            database: "csanz".into(),
        }
    }

    #[test]
    fn test_document_url_keeps_key_intact() {
        let store = CouchStore::new(&config("http://localhost:5984/")).unwrap();
        let url = store.url(&[doc_id("members", "member::42").as_str()]).unwrap();
        assert_eq!(url.path(), "/csanz/members:member::42");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            CouchStore::new(&config("not a url")),
            Err(CouchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_selector_is_scoped_to_collection() {
        let selector = collection_selector("members", &Filter::new());
        assert_eq!(selector, json!({"$and": [{"collection": "members"}]}));

        let selector = collection_selector("members", &Filter::new().eq("id", 1));
        assert_eq!(selector["$and"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_strip_meta() {
        let doc = strip_meta(json!({"_id": "member::1", "_rev": "1-a", "collection": "members", "id": 1}));
        assert_eq!(doc, json!({"id": 1}));
    }
}
