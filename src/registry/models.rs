// src/registry/models.rs
#![allow(dead_code)]
use serde::Deserialize;
use std::collections::HashMap;

/// Structure representing a Companies House company profile
/// Example: https://api.company-information.service.gov.uk/company/02235387
#[derive(Debug, Deserialize)]
pub struct CompanyProfile {
    pub company_name: Option<String>,
    pub registered_office_address: Option<RegisteredOfficeAddress>,
    #[serde(default)]
    pub sic_codes: Vec<String>,
    pub accounts: Option<Accounts>,
}

#[derive(Debug, Deserialize)]
pub struct RegisteredOfficeAddress {
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Accounts {
    pub last_accounts: Option<LastAccounts>,
}

#[derive(Debug, Deserialize)]
pub struct LastAccounts {
    #[serde(rename = "type")]
    pub accounts_type: Option<String>,
}

impl CompanyProfile {
    /// Only `full` and `group` accounts carry the statement detail worth
    /// extracting; everything else (micro-entity, dormant, ...) is skipped.
    pub fn has_full_accounts(&self) -> bool {
        self.accounts
            .as_ref()
            .and_then(|a| a.last_accounts.as_ref())
            .and_then(|l| l.accounts_type.as_deref())
            .map(|t| matches!(t.to_lowercase().as_str(), "full" | "group"))
            .unwrap_or(false)
    }
}

/// Filing-history listing for a company.
#[derive(Debug, Deserialize)]
pub struct FilingHistory {
    #[serde(default)]
    pub items: Vec<FilingHistoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct FilingHistoryItem {
    #[serde(rename = "type")]
    pub filing_type: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub paper_filed: bool,
    pub links: Option<FilingHistoryLinks>,
}

#[derive(Debug, Deserialize)]
pub struct FilingHistoryLinks {
    pub document_metadata: Option<String>,
}

impl FilingHistoryItem {
    /// Annual accounts filings carry type code "AA".
    pub fn is_annual_accounts(&self) -> bool {
        self.filing_type.as_deref() == Some("AA")
    }
}

/// Document metadata from the document API; `resources` keys are MIME types.
#[derive(Debug, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub resources: HashMap<String, serde_json::Value>,
    pub links: Option<DocumentLinks>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentLinks {
    pub document: Option<String>,
}

impl DocumentMetadata {
    /// Whether a machine-readable XHTML rendition of the filing exists.
    pub fn has_xhtml_rendition(&self) -> bool {
        self.resources.contains_key("application/xhtml+xml")
    }
}

/// The company fields copied onto every persisted statement, captured at
/// extraction time. The extraction core reads this, never writes it back.
#[derive(Debug, Clone)]
pub struct CompanySnapshot {
    pub company_number: String,
    pub company_name: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub sic_codes: Vec<String>,
}

impl CompanySnapshot {
    pub fn from_profile(company_number: &str, profile: CompanyProfile) -> Self {
        let address = profile.registered_office_address;
        Self {
            company_number: company_number.to_string(),
            company_name: profile.company_name,
            address_line_1: address.as_ref().and_then(|a| a.address_line_1.clone()),
            address_line_2: address.as_ref().and_then(|a| a.address_line_2.clone()),
            locality: address.as_ref().and_then(|a| a.locality.clone()),
            postal_code: address.as_ref().and_then(|a| a.postal_code.clone()),
            country: address.as_ref().and_then(|a| a.country.clone()),
            sic_codes: profile.sic_codes,
        }
    }

    /// Classification code by position; filings record up to four.
    pub fn sic_code(&self, index: usize) -> Option<String> {
        self.sic_codes.get(index).cloned()
    }
}
