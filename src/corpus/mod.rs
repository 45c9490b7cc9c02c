// src/corpus/mod.rs
use crate::extractors::facts::FilingFormat;
use crate::extractors::statement::assemble;
use crate::registry::client::RegistryClient;
use crate::storage::StatementStore;
use crate::utils::error::{AppError, ExtractError};
use chrono::NaiveDate;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Outcome counters for one corpus run. Failures are logged with enough
/// context to re-process the affected documents; nothing aborts the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CorpusSummary {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// One filing ready for extraction: raw content plus the identity parsed from
/// its archive entry name or API metadata. Discarded after processing.
#[derive(Debug)]
pub struct FilingDocument {
    pub source: String,
    pub company_number: String,
    pub filing_date: NaiveDate,
    pub format: FilingFormat,
    pub content: String,
}

/// Company number from a bulk-archive entry name. The scheme is
/// `{processnum}_{...}_{company_number}_{yyyymmdd}.{ext}`, underscore
/// delimited, company number in the third field.
pub fn entry_company_number(entry_name: &str) -> Option<String> {
    let file_name = entry_name.rsplit('/').next()?;
    file_name
        .split('_')
        .nth(2)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
}

/// Filing date from a bulk-archive entry name: first eight digits of the
/// fourth underscore field, `yyyymmdd`.
pub fn entry_filing_date(entry_name: &str) -> Option<NaiveDate> {
    let file_name = entry_name.rsplit('/').next()?;
    let field = file_name.split('_').nth(3)?;
    let digits = field.split('.').next()?;
    if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Sequential orchestration loop around the extraction pipeline. Documents
/// are independent; the only shared state is the persistence sink and the
/// run counters.
pub struct CorpusDriver<'a> {
    registry: &'a RegistryClient,
    store: &'a StatementStore,
}

impl<'a> CorpusDriver<'a> {
    pub fn new(registry: &'a RegistryClient, store: &'a StatementStore) -> Self {
        Self { registry, store }
    }

    /// Processes every `*.zip` archive in a directory.
    pub async fn process_archive_dir(&self, dir: &Path) -> Result<CorpusSummary, AppError> {
        let mut archives: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("zip"))
                    .unwrap_or(false)
            })
            .collect();
        archives.sort();

        if archives.is_empty() {
            tracing::warn!("No ZIP archives found in {}", dir.display());
        }

        let mut summary = CorpusSummary::default();
        for archive_path in archives {
            tracing::info!("Processing archive: {}", archive_path.display());
            if let Err(e) = self.process_archive(&archive_path, &mut summary).await {
                tracing::error!(
                    "Unable to process archive {}: {}. Skipping.",
                    archive_path.display(),
                    e
                );
            }
        }
        Ok(summary)
    }

    async fn process_archive(
        &self,
        path: &Path,
        summary: &mut CorpusSummary,
    ) -> Result<(), AppError> {
        let file = std::fs::File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        for index in 0..archive.len() {
            // Read the entry fully before the async pipeline takes over
            let (name, content) = {
                let mut entry = archive.by_index(index)?;
                let name = entry.name().to_string();
                let mut raw = Vec::new();
                entry.read_to_end(&mut raw)?;
                (name, String::from_utf8_lossy(&raw).into_owned())
            };
            self.process_entry(&name, content, summary).await;
        }
        Ok(())
    }

    async fn process_entry(&self, name: &str, content: String, summary: &mut CorpusSummary) {
        let Some(format) = FilingFormat::from_entry_name(name) else {
            tracing::debug!("Skipping entry with ineligible extension: {}", name);
            summary.skipped += 1;
            return;
        };
        let (Some(company_number), Some(filing_date)) =
            (entry_company_number(name), entry_filing_date(name))
        else {
            tracing::warn!("Skipping entry with unparseable name: {}", name);
            summary.skipped += 1;
            return;
        };

        let document = FilingDocument {
            source: name.to_string(),
            company_number,
            filing_date,
            format,
            content,
        };
        self.process_document(&document, summary).await;
    }

    /// Runs one document through fetch → parse → assemble → persist, turning
    /// every failure into a counter and a log line.
    pub async fn process_document(&self, document: &FilingDocument, summary: &mut CorpusSummary) {
        match self.run_pipeline(document).await {
            Ok(created) => {
                summary.processed += 1;
                tracing::info!(
                    "{} statement for company {} ({})",
                    if created { "Created" } else { "Updated" },
                    document.company_number,
                    document.filing_date
                );
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!("Failed to process {}: {}", document.source, e);
            }
        }
    }

    async fn run_pipeline(&self, document: &FilingDocument) -> Result<bool, AppError> {
        let snapshot = self
            .registry
            .company_snapshot(&document.company_number)
            .await?
            .ok_or_else(|| ExtractError::CompanyNotFound(document.company_number.clone()))?;

        let statement = assemble(
            &document.content,
            document.format,
            &snapshot,
            document.filing_date,
        )?;

        Ok(self.store.upsert(&statement)?)
    }

    /// Fetches one company's latest machine-readable annual accounts from the
    /// registry and runs them through the same pipeline.
    pub async fn process_company(&self, company_number: &str) -> CorpusSummary {
        let mut summary = CorpusSummary::default();

        let fetched = match self.registry.latest_full_accounts(company_number).await {
            Ok(Some(fetched)) => fetched,
            Ok(None) => {
                summary.skipped += 1;
                return summary;
            }
            Err(e) => {
                tracing::error!(
                    "Failed to fetch accounts for company {}: {}",
                    company_number,
                    e
                );
                summary.failed += 1;
                return summary;
            }
        };

        let Some(filing_date) = fetched.filing_date else {
            tracing::warn!(
                "Filing history for company {} carries no usable date; skipping",
                company_number
            );
            summary.skipped += 1;
            return summary;
        };

        let document = FilingDocument {
            source: format!("registry:{}", company_number),
            company_number: company_number.to_string(),
            filing_date,
            format: FilingFormat::InlineXhtml,
            content: fetched.content,
        };
        self.process_document(&document, &mut summary).await;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_entry_names() {
        let name = "0001_ABC_02235387_20230331.xhtml";
        assert_eq!(entry_company_number(name).as_deref(), Some("02235387"));
        assert_eq!(
            entry_filing_date(name),
            Some(NaiveDate::from_ymd_opt(2023, 3, 31).unwrap())
        );
    }

    #[test]
    fn strips_directory_components_first() {
        let name = "statements/0001_ABC_02235387_20230331.xhtml";
        assert_eq!(entry_company_number(name).as_deref(), Some("02235387"));
        assert_eq!(
            entry_filing_date(name),
            Some(NaiveDate::from_ymd_opt(2023, 3, 31).unwrap())
        );
    }

    #[test]
    fn malformed_names_yield_nothing() {
        assert_eq!(entry_company_number("bad.xhtml"), None);
        assert_eq!(entry_filing_date("bad.xhtml"), None);

        // Date field present but not eight digits
        assert_eq!(entry_filing_date("0001_ABC_02235387_2023.xhtml"), None);
        assert_eq!(entry_filing_date("0001_ABC_02235387_2023033a.xhtml"), None);

        // Calendar-invalid date
        assert_eq!(entry_filing_date("0001_ABC_02235387_20231341.xhtml"), None);
    }
}
