//! Cloud REST adapter backend.
//!
//! Speaks the same capability set as the embedded backend against a hosted
//! HTTP API. Explicitly *not* Cypher-capable: the facade gates its internal
//! query-building paths on [`MemoryOperations::is_cypher_capable`], so this
//! adapter never pretends to be a graph engine.
//!
//! Must run on a thread where blocking is allowed (the MCP server executes
//! tool handlers on the blocking pool).

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::CloudConfig;
use crate::models::{
    Memory, MemoryId, Relationship, RelationshipId, RelationshipType, SearchQuery,
};
use crate::storage::traits::MemoryOperations;
use crate::{Error, Result};

/// REST-backed implementation of [`MemoryOperations`].
#[derive(Debug)]
pub struct CloudBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct RelatedPair {
    memory: Memory,
    relationship: Relationship,
}

impl CloudBackend {
    /// Builds the adapter from cloud configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no API URL is configured and
    /// [`Error::BackendUnavailable`] if the HTTP client cannot be built.
    pub fn from_config(config: &CloudConfig) -> Result<Self> {
        let base_url = config
            .api_url
            .as_ref()
            .ok_or_else(|| {
                Error::Validation("cloud backend selected but MEMORYGRAPH_API_URL is not set".to_string())
            })?
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::BackendUnavailable {
                operation: "build_cloud_client".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .map_err(|e| map_transport_error(operation, &e))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }
        Err(Error::BackendUnavailable {
            operation: operation.to_string(),
            cause: format!("cloud API returned {status}"),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<Option<T>> {
        let response = self.send(operation, self.client.get(self.url(path)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        response
            .json::<T>()
            .map(Some)
            .map_err(|e| Error::Internal(format!("malformed cloud response in {operation}: {e}")))
    }

    fn expect_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T> {
        self.get_json(operation, path)?
            .ok_or_else(|| Error::NotFound(format!("cloud resource {path}")))
    }

    fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        response
            .json::<T>()
            .map_err(|e| Error::Internal(format!("malformed cloud response in {operation}: {e}")))
    }
}

fn map_transport_error(operation: &str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::BackendTimeout {
            operation: operation.to_string(),
        }
    } else {
        Error::BackendUnavailable {
            operation: operation.to_string(),
            cause: err.to_string(),
        }
    }
}

fn query_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl MemoryOperations for CloudBackend {
    fn backend_name(&self) -> &'static str {
        "cloud"
    }

    fn store_memory(&self, memory: &Memory) -> Result<Memory> {
        let response = self.send(
            "store_memory",
            self.client.post(self.url("/api/v1/memories")).json(memory),
        )?;
        Self::decode("store_memory", response)
    }

    fn get_memory(&self, id: &MemoryId) -> Result<Option<Memory>> {
        self.get_json("get_memory", &format!("/api/v1/memories/{id}"))
    }

    fn update_memory(&self, memory: &Memory) -> Result<Memory> {
        let response = self.send(
            "update_memory",
            self.client
                .put(self.url(&format!("/api/v1/memories/{}", memory.id)))
                .json(memory),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("memory {}", memory.id)));
        }
        Self::decode("update_memory", response)
    }

    fn delete_memory(&self, id: &MemoryId) -> Result<bool> {
        let response = self.send(
            "delete_memory",
            self.client.delete(self.url(&format!("/api/v1/memories/{id}"))),
        )?;
        Ok(response.status() != StatusCode::NOT_FOUND)
    }

    fn search_memories(&self, query: &SearchQuery) -> Result<Vec<Memory>> {
        let response = self.send(
            "search_memories",
            self.client
                .post(self.url("/api/v1/memories/search"))
                .json(query),
        )?;
        Self::decode("search_memories", response)
    }

    fn count_memories(&self) -> Result<u64> {
        let counts: CountResponse = self.expect_json("count_memories", "/api/v1/memories/count")?;
        Ok(counts.count)
    }

    fn list_memories(&self) -> Result<Vec<Memory>> {
        self.expect_json("list_memories", "/api/v1/memories")
    }

    fn create_relationship(&self, relationship: &Relationship) -> Result<()> {
        self.send(
            "create_relationship",
            self.client
                .post(self.url("/api/v1/relationships"))
                .json(relationship),
        )?;
        Ok(())
    }

    fn get_relationship(&self, id: &RelationshipId) -> Result<Option<Relationship>> {
        self.get_json("get_relationship", &format!("/api/v1/relationships/{id}"))
    }

    fn update_relationship(&self, relationship: &Relationship) -> Result<()> {
        let response = self.send(
            "update_relationship",
            self.client
                .put(self.url(&format!("/api/v1/relationships/{}", relationship.id)))
                .json(relationship),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("relationship {}", relationship.id)));
        }
        Ok(())
    }

    fn relationships_from(
        &self,
        id: &MemoryId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<Relationship>> {
        let mut path = format!("/api/v1/memories/{id}/relationships?direction=from");
        if let Some(ts) = as_of {
            path.push_str(&format!("&as_of={}", query_timestamp(ts)));
        }
        self.expect_json("relationships_from", &path)
    }

    fn relationships_to(
        &self,
        id: &MemoryId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<Relationship>> {
        let mut path = format!("/api/v1/memories/{id}/relationships?direction=to");
        if let Some(ts) = as_of {
            path.push_str(&format!("&as_of={}", query_timestamp(ts)));
        }
        self.expect_json("relationships_to", &path)
    }

    fn relationships_touching(&self, id: &MemoryId) -> Result<Vec<Relationship>> {
        self.expect_json(
            "relationships_touching",
            &format!("/api/v1/memories/{id}/relationships?direction=any&history=true"),
        )
    }

    fn relationships_recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<Relationship>> {
        self.expect_json(
            "relationships_recorded_since",
            &format!(
                "/api/v1/relationships?recorded_since={}",
                query_timestamp(since)
            ),
        )
    }

    fn relationships_invalidated_since(&self, since: DateTime<Utc>) -> Result<Vec<Relationship>> {
        self.expect_json(
            "relationships_invalidated_since",
            &format!(
                "/api/v1/relationships?invalidated_since={}",
                query_timestamp(since)
            ),
        )
    }

    fn list_relationships(&self) -> Result<Vec<Relationship>> {
        self.expect_json("list_relationships", "/api/v1/relationships")
    }

    fn count_relationships(&self) -> Result<u64> {
        let counts: CountResponse =
            self.expect_json("count_relationships", "/api/v1/relationships/count")?;
        Ok(counts.count)
    }

    fn get_related_memories(
        &self,
        id: &MemoryId,
        types: Option<&[RelationshipType]>,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<(Memory, Relationship)>> {
        let mut query_parts: Vec<String> = Vec::new();
        if let Some(ts) = as_of {
            query_parts.push(format!("as_of={}", query_timestamp(ts)));
        }
        if let Some(types) = types
            && !types.is_empty()
        {
            let names: Vec<&str> = types.iter().map(RelationshipType::as_str).collect();
            query_parts.push(format!("types={}", names.join(",")));
        }
        let mut path = format!("/api/v1/memories/{id}/related");
        if !query_parts.is_empty() {
            path.push('?');
            path.push_str(&query_parts.join("&"));
        }
        let pairs: Vec<RelatedPair> = self.expect_json("get_related_memories", &path)?;
        Ok(pairs
            .into_iter()
            .map(|p| (p.memory, p.relationship))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_url() {
        let err = CloudBackend::from_config(&CloudConfig {
            api_url: None,
            api_key: None,
            timeout_secs: 5,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let backend = CloudBackend::from_config(&CloudConfig {
            api_url: Some("https://api.example.test/".to_string()),
            api_key: Some("k".to_string()),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            backend.url("/api/v1/memories"),
            "https://api.example.test/api/v1/memories"
        );
        assert!(!backend.is_cypher_capable());
    }
}
