//! HubSpot CRM REST client
//!
//! Only the three calls the sync layer needs: update a deal's stage, read a
//! deal's stage, and list deal pipelines. Every call is authenticated with
//! the per-user private app key passed in by the caller.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use utoipa::ToSchema;

use crate::domain::validation::is_valid_deal_id;

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("invalid HubSpot base url: {0}")]
    BadUrl(String),
    #[error("HubSpot rejected the API key")]
    Unauthorized,
    #[error("'{0}' is not a HubSpot deal id")]
    InvalidDealId(String),
    #[error("deal {0} not found in HubSpot")]
    DealNotFound(String),
    #[error("HubSpot returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("HubSpot request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for CrmError {
    fn from(e: reqwest::Error) -> Self {
        CrmError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealStage {
    pub deal_id: String,
    pub stage_id: String,
    pub pipeline_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PipelinesResponse {
    results: Vec<Pipeline>,
}

#[derive(Debug, Deserialize)]
struct DealResponse {
    id: String,
    properties: DealProperties,
}

#[derive(Debug, Deserialize)]
struct DealProperties {
    dealstage: Option<String>,
    pipeline: Option<String>,
}

/// The CRM operations the sync layer depends on.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn update_deal_stage(
        &self,
        api_key: &SecretString,
        deal_id: &str,
        stage_id: &str,
        pipeline_id: Option<&str>,
    ) -> Result<(), CrmError>;

    async fn get_deal_stage(&self, api_key: &SecretString, deal_id: &str)
    -> Result<DealStage, CrmError>;

    async fn list_pipelines(&self, api_key: &SecretString) -> Result<Vec<Pipeline>, CrmError>;
}

#[derive(Clone)]
pub struct HubSpotClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HubSpotClient {
    pub fn new(base_url: &str) -> Result<Self, CrmError> {
        let base_url = Url::parse(base_url).map_err(|e| CrmError::BadUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(CrmError::BadUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Append `segments` to the base URL, keeping any path prefix it has.
    /// Each segment is percent-encoded, so ids cannot escape their slot.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CrmError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CrmError::BadUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn deal_endpoint(&self, deal_id: &str) -> Result<Url, CrmError> {
        if !is_valid_deal_id(deal_id) {
            return Err(CrmError::InvalidDealId(deal_id.to_string()));
        }
        self.endpoint(&["crm", "v3", "objects", "deals", deal_id])
    }

    async fn check(
        resp: reqwest::Response,
        deal_id: Option<&str>,
    ) -> Result<reqwest::Response, CrmError> {
        match (resp.status(), deal_id) {
            (s, _) if s.is_success() => Ok(resp),
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Err(CrmError::Unauthorized),
            (StatusCode::NOT_FOUND, Some(id)) => Err(CrmError::DealNotFound(id.to_string())),
            (status, _) => {
                let body = resp.text().await.unwrap_or_default();
                Err(CrmError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl CrmClient for HubSpotClient {
    async fn update_deal_stage(
        &self,
        api_key: &SecretString,
        deal_id: &str,
        stage_id: &str,
        pipeline_id: Option<&str>,
    ) -> Result<(), CrmError> {
        let url = self.deal_endpoint(deal_id)?;

        let mut properties = json!({ "dealstage": stage_id });
        if let Some(pipeline) = pipeline_id {
            properties["pipeline"] = json!(pipeline);
        }

        tracing::debug!("PATCH {} dealstage={}", url, stage_id);
        let resp = self
            .http
            .patch(url)
            .bearer_auth(api_key.expose_secret())
            .json(&json!({ "properties": properties }))
            .send()
            .await?;

        Self::check(resp, Some(deal_id)).await?;
        Ok(())
    }

    async fn get_deal_stage(
        &self,
        api_key: &SecretString,
        deal_id: &str,
    ) -> Result<DealStage, CrmError> {
        let mut url = self.deal_endpoint(deal_id)?;
        url.query_pairs_mut()
            .append_pair("properties", "dealstage,pipeline");

        let resp = self
            .http
            .get(url)
            .bearer_auth(api_key.expose_secret())
            .send()
            .await?;
        let deal: DealResponse = Self::check(resp, Some(deal_id)).await?.json().await?;

        let stage_id = deal.properties.dealstage.ok_or_else(|| CrmError::Api {
            status: 200,
            body: format!("deal {} has no dealstage", deal.id),
        })?;

        Ok(DealStage {
            deal_id: deal.id,
            stage_id,
            pipeline_id: deal.properties.pipeline,
        })
    }

    async fn list_pipelines(&self, api_key: &SecretString) -> Result<Vec<Pipeline>, CrmError> {
        let url = self.endpoint(&["crm", "v3", "pipelines", "deals"])?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(api_key.expose_secret())
            .send()
            .await?;
        let parsed: PipelinesResponse = Self::check(resp, None).await?.json().await?;

        let mut pipelines = parsed.results;
        pipelines.sort_by_key(|p| p.display_order);
        for pipeline in &mut pipelines {
            pipeline.stages.sort_by_key(|s| s.display_order);
        }
        Ok(pipelines)
    }
}
