// src/extractors/facts.rs

// --- Imports ---
use crate::extractors::numeric::normalize;
use crate::extractors::taxonomy::TaxonomyBinding;
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};

// --- Constants ---
/// Namespace of the inline-XBRL structural elements (`nonFraction`,
/// `nonNumeric`, `hidden`).
const INLINE_XBRL_NS: &str = "http://www.xbrl.org/2013/inlineXBRL";

// --- CSS Selectors (Lazy Static) ---
static TABLE_ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr").expect("Failed to compile TABLE_ROW_SELECTOR")
});

static TABLE_CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td, th").expect("Failed to compile TABLE_CELL_SELECTOR")
});

// --- Regex Patterns (Lazy Static) ---
// A fact-name attribute is "{prefix}:{LocalName}"; both halves matter.
static FACT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+):(\w+)$").expect("Failed to compile FACT_NAME_RE"));

/// Tag names the FRC renamed between taxonomy releases. The legacy name maps
/// to the canonical concept key used everywhere else (synonym table, store
/// columns). Must be extended together with the concept list.
const CONCEPT_ALIASES: &[(&str, &str)] = &[(
    "IncreaseDecreaseInCashCashEquivalentsBeforeForeignExchangeDifferencesChangesInConsolidation",
    "IncreaseDecreaseInCashCashEquivalents",
)];

fn canonical_concept(tag_name: &str) -> &str {
    CONCEPT_ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == tag_name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(tag_name)
}

/// Human-readable row labels that stand in for a concept when a filing is laid
/// out as a plain table instead of tagged facts. This is a second name-mapping
/// layer next to the tag names; keep the two in sync when adding concepts.
/// Matching is case-insensitive substring containment on the first cell.
pub(crate) fn label_synonyms(concept: &str) -> &'static [&'static str] {
    match concept {
        "TurnoverRevenue" => &["TURNOVER"],
        "CostSales" => &["COST OF SALES"],
        "GrossProfitLoss" | "GrossProfit" => &["GROSS PROFIT"],
        "AdministrativeExpenses" => &["ADMINISTRATIVE EXPENSES"],
        "OperatingProfitLoss" | "OperatingProfit" => &["OPERATING PROFIT"],
        "ProfitLossOnOrdinaryActivitiesBeforeTax" => &[
            "PROFIT BEFORE TAXATION",
            "PROFIT ON ORDINARY ACTIVITIES BEFORE TAXATION",
        ],
        "TaxTaxCreditOnProfitOrLossOnOrdinaryActivities" => &["TAX ON PROFIT"],
        "ProfitLoss" => &["PROFIT FOR THE FINANCIAL YEAR"],
        "FixedAssets" => &["FIXED ASSETS"],
        "IntangibleAssets" => &["INTANGIBLE ASSETS"],
        "TotalInventories" => &["STOCKS"],
        "Debtors" => &["DEBTORS"],
        "CashBankOnHand" => &["CASH AT BANK AND IN HAND"],
        "CurrentAssets" => &["CURRENT ASSETS"],
        "Creditors" => &["CREDITORS"],
        "TotalAssetsLessCurrentLiabilities" => &["TOTAL ASSETS LESS CURRENT LIABILITIES"],
        "NetCurrentAssetsLiabilities" => &["NET CURRENT ASSETS"],
        "NetAssetsLiabilities" => &["NET ASSETS"],
        "EndDateForPeriodCoveredByReport" => &["END OF PERIOD"],
        "AverageNumberEmployeesDuringPeriod" => &["AVERAGE NUMBER EMPLOYEES"],
        _ => &[],
    }
}

// --- Data Structures ---

/// Input format, decided by file extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingFormat {
    InlineXhtml,
    Html,
    Xbrl,
    Xml,
}

impl FilingFormat {
    /// Maps an archive entry or file name to a parseable format. `None` means
    /// the file is not eligible for extraction at all.
    pub fn from_entry_name(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "xhtml" => Some(Self::InlineXhtml),
            "html" => Some(Self::Html),
            "xbrl" => Some(Self::Xbrl),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Bare XBRL/XML documents have no table layout to fall back to, so a
    /// failed XML parse leaves nothing to extract from.
    fn requires_well_formed_xml(self) -> bool {
        matches!(self, Self::Xbrl | Self::Xml)
    }
}

/// One filing, parsed both ways: as XML for tag-based fact lookup, and as a
/// lenient HTML DOM for the table fallback.
///
/// The XML side is `None` for documents that are not well-formed XML; for
/// HTML-family formats that only disables tag lookup, the table fallback
/// still runs.
pub struct ParsedFiling<'a> {
    pub xml: Option<roxmltree::Document<'a>>,
    pub html: Html,
}

impl<'a> ParsedFiling<'a> {
    pub fn parse(content: &'a str, format: FilingFormat) -> Result<Self, ExtractError> {
        let xml = match roxmltree::Document::parse(content) {
            Ok(doc) => Some(doc),
            Err(e) if format.requires_well_formed_xml() => {
                return Err(ExtractError::ParseFailure(e.to_string()));
            }
            Err(e) => {
                tracing::warn!(
                    "Document is not well-formed XML ({}); tag-based extraction disabled",
                    e
                );
                None
            }
        };

        Ok(Self {
            xml,
            html: Html::parse_document(content),
        })
    }
}

// --- Extraction ---

/// Extracts a financial-role concept as an exact decimal.
///
/// Two stages, first success wins: tag-based inline-XBRL lookup (only when the
/// core role resolved to a prefix), then the row-label table fallback. Any
/// per-stage failure means "no value from this stage", never a document error.
pub fn extract_numeric(
    concept: &str,
    binding: &TaxonomyBinding,
    filing: &ParsedFiling<'_>,
) -> Option<Decimal> {
    if let Some(prefix) = binding.core_prefix() {
        if let Some(value) = tagged_numeric_fact(filing, prefix, concept) {
            return Some(value);
        }
    }

    let labels = label_synonyms(concept);
    if labels.is_empty() {
        return None;
    }
    let raw = scrape_table_value(&filing.html, labels)?;
    // No sign marker exists in a table layout; the text carries its own sign.
    normalize(&raw, None)
}

/// Extracts a business-role concept as raw text (e.g. a date string).
///
/// Business facts live as non-numeric entries in the document's hidden
/// region; the table fallback returns the matching row's value cell verbatim.
pub fn extract_text(
    concept: &str,
    binding: &TaxonomyBinding,
    filing: &ParsedFiling<'_>,
) -> Option<String> {
    if let Some(prefix) = binding.business_prefix() {
        if let Some(xml) = filing.xml.as_ref() {
            if let Some(node) = find_inline_fact(xml, "nonNumeric", prefix, concept, true) {
                let text = node_text(&node);
                let text = text.trim();
                if !text.is_empty() {
                    tracing::debug!("Extracted `{}` from hidden facts: {}", concept, text);
                    return Some(text.to_string());
                }
            }
        }
    }

    scrape_table_value(&filing.html, label_synonyms(concept))
}

/// Stage 1 for numeric concepts: first matching `ix:nonFraction` wins; its
/// text and sign-marker attribute go through the normalizer together.
fn tagged_numeric_fact(
    filing: &ParsedFiling<'_>,
    prefix: &str,
    concept: &str,
) -> Option<Decimal> {
    let xml = filing.xml.as_ref()?;
    let node = find_inline_fact(xml, "nonFraction", prefix, concept, false)?;
    let text = node_text(&node);
    let value = normalize(text.trim(), node.attribute("sign"));
    if value.is_some() {
        tracing::debug!("Extracted `{}` from tagged facts: {:?}", concept, value);
    }
    value
}

fn find_inline_fact<'a, 'input>(
    xml: &'a roxmltree::Document<'input>,
    element: &str,
    prefix: &str,
    concept: &str,
    hidden_only: bool,
) -> Option<roxmltree::Node<'a, 'input>> {
    xml.descendants().find(|node| {
        node.is_element()
            && node.tag_name().name() == element
            && node
                .tag_name()
                .namespace()
                .map_or(true, |ns| ns == INLINE_XBRL_NS)
            && fact_name_matches(node.attribute("name"), prefix, concept)
            && (!hidden_only || in_hidden_region(node))
    })
}

/// Checks a fact-name attribute against "{prefix}:{concept}", routing the
/// local part through the rename aliases first so legacy tag names still
/// resolve to the canonical concept.
fn fact_name_matches(name_attr: Option<&str>, prefix: &str, concept: &str) -> bool {
    let Some(name) = name_attr else {
        return false;
    };
    let Some(captures) = FACT_NAME_RE.captures(name) else {
        return false;
    };
    &captures[1] == prefix && canonical_concept(&captures[2]) == concept
}

fn in_hidden_region(node: &roxmltree::Node<'_, '_>) -> bool {
    node.ancestors()
        .any(|a| a.is_element() && a.tag_name().name() == "hidden")
}

fn node_text(node: &roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter_map(|d| if d.is_text() { d.text() } else { None })
        .collect()
}

/// Stage 2: scan table rows for a first-cell label containing one of the
/// concept's synonyms, and take the second cell's text as the value.
fn scrape_table_value(html: &Html, labels: &[&str]) -> Option<String> {
    if labels.is_empty() {
        return None;
    }

    for row in html.select(&TABLE_ROW_SELECTOR) {
        let cells: Vec<_> = row.select(&TABLE_CELL_SELECTOR).collect();
        if cells.len() < 2 {
            continue; // Not a label/value row
        }

        let label_text = cells[0].text().collect::<String>().trim().to_uppercase();
        if !labels.iter().any(|label| label_text.contains(label)) {
            continue;
        }

        let raw = cells[1].text().collect::<String>().trim().to_string();
        if raw.is_empty() {
            continue;
        }
        tracing::debug!("Extracted `{}` from table row: {}", labels[0], raw);
        return Some(raw);
    }

    None
}
