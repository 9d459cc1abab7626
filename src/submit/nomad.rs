use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use super::dispatch::{JobScheduler, JobSummary};
use crate::error::{Error, Result};

/// HTTP client for the Nomad jobs API.
#[derive(Clone)]
pub struct NomadClient {
    client: Client,
    address: String,
    region: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DispatchRequest<'a> {
    meta: &'a HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DispatchResponse {
    #[serde(rename = "DispatchedJobID")]
    dispatched_job_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobSummaryResponse {
    #[serde(default)]
    summary: JobSummary,
}

impl NomadClient {
    pub fn new(address: &str, region: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            address: address.trim_end_matches('/').to_string(),
            region: region.to_string(),
        })
    }

    fn job_url(&self, job_id: &str, action: &str) -> String {
        format!(
            "{}/v1/job/{}/{}",
            self.address,
            urlencoding::encode(job_id),
            action
        )
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

#[async_trait]
impl JobScheduler for NomadClient {
    async fn dispatch(&self, job_id: &str, meta: &HashMap<String, String>) -> Result<String> {
        let resp = self
            .client
            .post(self.job_url(job_id, "dispatch"))
            .query(&[("region", &self.region)])
            .json(&DispatchRequest { meta })
            .send()
            .await?;
        let body: DispatchResponse = Self::check(resp).await?.json().await?;
        Ok(body.dispatched_job_id)
    }

    async fn job_summary(&self, job_id: &str) -> Result<JobSummary> {
        let resp = self
            .client
            .get(self.job_url(job_id, "summary"))
            .query(&[("region", &self.region)])
            .send()
            .await?;
        let body: JobSummaryResponse = Self::check(resp).await?.json().await?;
        Ok(body.summary)
    }
}
