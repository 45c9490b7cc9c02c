// src/registry/client.rs
use crate::extractors::statement::parse_flexible_date;
use crate::registry::models::{
    CompanyProfile, CompanySnapshot, DocumentMetadata, FilingHistory,
};
use crate::utils::error::RegistryError;
use chrono::NaiveDate;
use reqwest::header;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Registry access configuration. The key and endpoints are injected here at
/// construction time; nothing network-facing is baked into the source.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub api_key: String,
    pub base_url: String,
    /// Cooperative pacing between API calls to respect the registry quota.
    pub pace: Duration,
    /// Per-request timeout; an unresponsive call becomes a recorded failure
    /// for that document, not a corpus-wide abort.
    pub timeout: Duration,
}

impl RegistryConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.company-information.service.gov.uk".to_string(),
            pace: Duration::from_millis(800),
            timeout: Duration::from_secs(10),
        }
    }
}

/// A filing document downloaded straight from the registry, with the metadata
/// needed to run it through the extraction pipeline.
#[derive(Debug)]
pub struct FetchedFiling {
    pub content: String,
    pub filing_date: Option<NaiveDate>,
}

pub struct RegistryClient {
    http: reqwest::Client,
    config: RegistryConfig,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Fetches the company profile and derives a snapshot for joining onto
    /// extracted statements.
    ///
    /// `Ok(None)` covers both an unknown company number and a company whose
    /// last accounts are not `full`/`group`; either way there is nothing to
    /// extract for this document.
    pub async fn company_snapshot(
        &self,
        company_number: &str,
    ) -> Result<Option<CompanySnapshot>, RegistryError> {
        let url = format!("{}/company/{}", self.config.base_url, company_number);
        let profile: CompanyProfile = match self.get_json(&url).await {
            Ok(profile) => profile,
            Err(RegistryError::NotFound(_)) => {
                tracing::warn!("Company {} not found in registry", company_number);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !profile.has_full_accounts() {
            tracing::debug!(
                "Skipping company {}: last accounts are not full/group",
                company_number
            );
            return Ok(None);
        }

        Ok(Some(CompanySnapshot::from_profile(company_number, profile)))
    }

    /// Fetches the company's most recent annual-accounts filing as XHTML.
    ///
    /// Walks filing history for the newest "AA" item, follows its document
    /// metadata link, and downloads the document content. `Ok(None)` means no
    /// machine-readable accounts exist (no AA filing, paper filed, or no
    /// XHTML rendition).
    pub async fn latest_full_accounts(
        &self,
        company_number: &str,
    ) -> Result<Option<FetchedFiling>, RegistryError> {
        let url = format!(
            "{}/company/{}/filing-history",
            self.config.base_url, company_number
        );
        let history: FilingHistory = self.get_json(&url).await?;

        let Some(item) = history.items.iter().find(|i| i.is_annual_accounts()) else {
            tracing::warn!("No annual accounts filing for company {}", company_number);
            return Ok(None);
        };
        if item.paper_filed {
            tracing::warn!(
                "Latest accounts for company {} were paper filed; nothing to parse",
                company_number
            );
            return Ok(None);
        }
        let Some(metadata_url) = item
            .links
            .as_ref()
            .and_then(|l| l.document_metadata.clone())
        else {
            return Err(RegistryError::DocumentUnavailable(format!(
                "filing history item for {} has no document metadata link",
                company_number
            )));
        };

        let metadata: DocumentMetadata = self.get_json(&metadata_url).await?;
        if !metadata.has_xhtml_rendition() {
            tracing::warn!(
                "No XHTML rendition of the accounts for company {}",
                company_number
            );
            return Ok(None);
        }
        let Some(document_url) = metadata.links.as_ref().and_then(|l| l.document.clone()) else {
            return Err(RegistryError::DocumentUnavailable(format!(
                "document metadata for {} has no content link",
                company_number
            )));
        };

        tracing::info!("Downloading accounts document from: {}", document_url);
        let response = self
            .paced_get(&document_url, "application/xhtml+xml")
            .await?;
        let content = response.text().await?;
        tracing::debug!("Downloaded {} bytes for company {}", content.len(), company_number);

        Ok(Some(FetchedFiling {
            content,
            filing_date: item.date.as_deref().and_then(parse_flexible_date),
        }))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RegistryError> {
        let response = self.paced_get(url, "application/json").await?;
        response.json::<T>().await.map_err(RegistryError::Network)
    }

    /// One paced, authenticated GET. The sleep before each request is the
    /// registry quota pacing; it applies to every call uniformly.
    async fn paced_get(
        &self,
        url: &str,
        accept: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        tokio::time::sleep(self.config.pace).await;

        let response = self
            .http
            .get(url)
            .basic_auth(&self.config.api_key, Some(""))
            .header(header::ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status == reqwest::StatusCode::FORBIDDEN
            {
                tracing::warn!("Registry refused the request - check API key and rate limits.");
                return Err(RegistryError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(RegistryError::NotFound(url.to_string()));
            }
            return Err(RegistryError::Http(status));
        }

        Ok(response)
    }
}
