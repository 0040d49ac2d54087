//! Minimal Qdrant REST client: collection setup, point writes and point lookups.

use crate::qdrant::types::{PointUpsert, QdrantError, RetrieveResponse};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::{Map, Value, json};

/// Payload fields indexed for filtering inside the search collection.
const PAYLOAD_INDEXES: [(&str, &str); 4] = [
    ("sourceVariant", "keyword"),
    ("originalDocId", "keyword"),
    ("categoryNames", "keyword"),
    ("tagNames", "keyword"),
];

/// Qdrant endpoint plus the HTTP client and credentials used to reach it.
pub struct QdrantService {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client for the Qdrant instance at `url`.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let http = Client::builder().user_agent("catalog-sync/0.1").build()?;

        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        let api_key = api_key.filter(|key| !key.is_empty());
        tracing::debug!(url = %base_url, has_api_key = api_key.is_some(), "Qdrant client ready");

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Create `collection_name` unless Qdrant already has it.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create a cosine-distance collection holding `vector_size`-dimensional vectors.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))?
            .json(&body)
            .send()
            .await?;

        expect_success(response).await?;
        tracing::debug!(collection = collection_name, "Collection created");
        Ok(())
    }

    /// Ensure keyword indexes exist for the payload fields used in filters.
    pub async fn ensure_payload_indexes(&self, collection_name: &str) -> Result<(), QdrantError> {
        for (field, schema) in PAYLOAD_INDEXES {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))?
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() || status == StatusCode::CONFLICT {
                tracing::debug!(collection = collection_name, field, %status, "Payload index present");
            } else {
                let error = unexpected_status(response).await;
                tracing::warn!(collection = collection_name, field, error = %error, "Payload index not created");
            }
        }

        Ok(())
    }

    /// Insert or overwrite points, waiting for the write to be applied.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        points: Vec<PointUpsert>,
    ) -> Result<(), QdrantError> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let body = points
            .into_iter()
            .map(|PointUpsert { id, vector, payload }| {
                json!({ "id": id, "vector": vector, "payload": payload })
            })
            .collect::<Vec<_>>();

        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": body }))
            .send()
            .await?;

        expect_success(response).await?;
        tracing::debug!(collection = collection_name, points = count, "Points upserted");
        Ok(())
    }

    /// Delete points by id. Unknown ids are ignored by Qdrant.
    pub async fn delete_points(
        &self,
        collection_name: &str,
        ids: &[String],
    ) -> Result<(), QdrantError> {
        if ids.is_empty() {
            return Ok(());
        }
        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/delete"),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": ids }))
            .send()
            .await?;

        expect_success(response).await?;
        tracing::debug!(collection = collection_name, points = ids.len(), "Points deleted");
        Ok(())
    }

    /// Fetch the payload of a single point, or `None` when it does not exist.
    pub async fn retrieve_payload(
        &self,
        collection_name: &str,
        id: &str,
    ) -> Result<Option<Map<String, Value>>, QdrantError> {
        let response = self
            .request(
                Method::GET,
                &format!("collections/{collection_name}/points/{id}"),
            )?
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let payload: RetrieveResponse = response.json().await?;
                Ok(payload.result.and_then(|point| point.payload))
            }
            _ => {
                let error = unexpected_status(response).await;
                tracing::error!(collection = collection_name, point = id, error = %error, "Point lookup failed");
                Err(error)
            }
        }
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => {
                let error = unexpected_status(response).await;
                tracing::error!(collection = collection_name, error = %error, "Collection lookup failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, QdrantError> {
        let builder = self.http.request(method, join_url(&self.base_url, path));
        Ok(match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        })
    }
}

async fn expect_success(response: Response) -> Result<(), QdrantError> {
    if response.status().is_success() {
        return Ok(());
    }
    let error = unexpected_status(response).await;
    tracing::error!(error = %error, "Qdrant request failed");
    Err(error)
}

async fn unexpected_status(response: Response) -> QdrantError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    QdrantError::UnexpectedStatus { status, body }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = Url::parse(url).map_err(|err| err.to_string())?;
    let trimmed = parsed.path().trim_end_matches('/').to_owned();
    parsed.set_path(&trimmed);
    Ok(parsed.into())
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
