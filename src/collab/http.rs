//! reqwest clients for the hit validator and the highscore service

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::CollabError;
use crate::game::GameVariant;
use crate::ws::protocol::{HitConfirmation, HitRequest};

use super::{GameRecord, HighscoreSink, HitValidator};

/// POST a JSON body and decode the JSON reply
async fn post_json<T: Serialize, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    body: &T,
) -> Result<R, CollabError> {
    let response = client
        .post(url)
        .header("Content-Type", "application/json;charset=UTF-8")
        .json(body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(CollabError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| CollabError::Decode(e.to_string()))
}

/// Hit-validation service reached over HTTP.
/// Each variant has its own endpoint under the base URL.
#[derive(Clone)]
pub struct HttpHitValidator {
    client: Client,
    base_url: String,
}

impl HttpHitValidator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, variant: GameVariant) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), variant.name())
    }
}

#[async_trait]
impl HitValidator for HttpHitValidator {
    async fn validate(
        &self,
        variant: GameVariant,
        request: &HitRequest,
    ) -> Result<HitConfirmation, CollabError> {
        post_json(&self.client, &self.endpoint(variant), request).await
    }
}

/// Highscore service reached over HTTP
#[derive(Clone)]
pub struct HttpHighscores {
    client: Client,
    url: String,
}

impl HttpHighscores {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl HighscoreSink for HttpHighscores {
    async fn submit(&self, record: &GameRecord) -> Result<(), CollabError> {
        let response = self.client.post(&self.url).json(record).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CollabError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
