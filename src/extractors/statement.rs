// src/extractors/statement.rs

use crate::extractors::facts::{extract_numeric, extract_text, FilingFormat, ParsedFiling};
use crate::extractors::taxonomy::{namespace_table, TaxonomyBinding};
use crate::registry::models::CompanySnapshot;
use crate::utils::error::ExtractError;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Income-statement concepts, in persistence column order.
pub const INCOME_STATEMENT: &[&str] = &[
    "TurnoverRevenue",
    "CostSales",
    "GrossProfitLoss",
    "ProfitLoss",
    "AdministrativeExpenses",
    "OtherOperatingIncomeFormat1",
    "OperatingProfit",
    "OperatingProfitLoss",
    "OtherInterestRecievablesSimilarIncomeFinanceIncome",
    "ProfitLossOnOrdinaryActivitiesBeforeTax",
    "TaxTaxCreditOnProfitOrLossOnOrdinaryActivities",
    "NetIncome",
    "GrossProfit",
];

/// Balance-sheet concepts.
pub const BALANCE_SHEET: &[&str] = &[
    "IntangibleAssets",
    "PropertyPlantEquipment",
    "InvestmentsFixedAssets",
    "FixedAssets",
    "TotalInventories",
    "Debtors",
    "CashBankOnHand",
    "CurrentAssets",
    "TotalAssetsLessCurrentLiabilities",
    "Creditors",
    "TaxationIncludingDeferredTaxationBalanceSheetSubtotal",
    "NetCurrentAssetsLiabilities",
    "NetAssetsLiabilities",
];

/// Cash-flow-statement concepts.
pub const CASH_FLOW_STATEMENT: &[&str] = &[
    "NetCashFlowsFromUsedInOperatingActivities",
    "NetCashFlowsFromUsedInInvestingActivities",
    "CashCashEquivalents",
    "IncreaseDecreaseInCashCashEquivalents",
];

/// Business-role date concept marking the end of the reporting period.
pub const REPORT_END_DATE_CONCEPT: &str = "EndDateForPeriodCoveredByReport";

/// Core-role headcount concept, persisted as an integer.
pub const AVERAGE_EMPLOYEES_CONCEPT: &str = "AverageNumberEmployeesDuringPeriod";

/// All financial-role concepts queried for every document.
pub fn financial_concepts() -> impl Iterator<Item = &'static str> {
    INCOME_STATEMENT
        .iter()
        .chain(BALANCE_SHEET)
        .chain(CASH_FLOW_STATEMENT)
        .copied()
}

/// One extracted concept value. `None` means every extraction stage came up
/// empty for this document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialFact {
    pub concept: &'static str,
    pub value: Option<Decimal>,
}

/// The assembled, company-joined record for one filing period.
#[derive(Debug, Clone)]
pub struct FinancialStatement {
    pub company_number: String,
    pub filing_date: NaiveDate,
    pub company_name: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub sic_code_1: Option<String>,
    pub sic_code_2: Option<String>,
    pub sic_code_3: Option<String>,
    pub sic_code_4: Option<String>,
    pub report_end_date: Option<NaiveDate>,
    pub average_employees: Option<i64>,
    pub facts: Vec<FinancialFact>,
}

impl FinancialStatement {
    #[allow(dead_code)]
    pub fn fact(&self, concept: &str) -> Option<Decimal> {
        self.facts
            .iter()
            .find(|f| f.concept == concept)
            .and_then(|f| f.value)
    }
}

/// Drives the fact extractor over the full concept list and joins the results
/// with the caller-supplied company snapshot.
///
/// A document that yields no values still produces an (all-null) record; the
/// only aborts are a malformed document and a missing company snapshot, which
/// the corpus driver screens before calling in here.
pub fn assemble(
    content: &str,
    format: FilingFormat,
    company: &CompanySnapshot,
    filing_date: NaiveDate,
) -> Result<FinancialStatement, ExtractError> {
    let filing = ParsedFiling::parse(content, format)?;

    let binding = match filing.xml.as_ref() {
        Some(xml) => TaxonomyBinding::resolve(&namespace_table(xml)),
        None => TaxonomyBinding::Unbound,
    };
    if binding.is_unbound() {
        tracing::warn!(
            "No recognized taxonomy for company {}; falling back to table extraction",
            company.company_number
        );
    }

    let facts = financial_concepts()
        .map(|concept| FinancialFact {
            concept,
            value: extract_numeric(concept, &binding, &filing),
        })
        .collect();

    let report_end_date = extract_text(REPORT_END_DATE_CONCEPT, &binding, &filing)
        .and_then(|text| parse_flexible_date(text.trim()));

    let average_employees = extract_numeric(AVERAGE_EMPLOYEES_CONCEPT, &binding, &filing)
        .and_then(|d| d.to_i64());

    Ok(FinancialStatement {
        company_number: company.company_number.clone(),
        filing_date,
        company_name: company.company_name.clone(),
        address_line_1: company.address_line_1.clone(),
        address_line_2: company.address_line_2.clone(),
        locality: company.locality.clone(),
        postal_code: company.postal_code.clone(),
        country: company.country.clone(),
        sic_code_1: company.sic_code(0),
        sic_code_2: company.sic_code(1),
        sic_code_3: company.sic_code(2),
        sic_code_4: company.sic_code(3),
        report_end_date,
        average_employees,
        facts,
    })
}

/// Converts the date formats seen in filings into a `NaiveDate`.
pub fn parse_flexible_date(date_str: &str) -> Option<NaiveDate> {
    if date_str.is_empty() {
        return None;
    }

    const FORMATS: &[&str] = &["%d.%m.%y", "%d/%m/%y", "%d-%m-%y", "%Y-%m-%d"];
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, format) {
            return Some(date);
        }
    }

    tracing::error!("Date format unknown: {}", date_str);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn snapshot() -> CompanySnapshot {
        CompanySnapshot {
            company_number: "02235387".to_string(),
            company_name: Some("Test Trading Ltd".to_string()),
            address_line_1: Some("1 High Street".to_string()),
            address_line_2: None,
            locality: Some("Leeds".to_string()),
            postal_code: Some("LS1 1AA".to_string()),
            country: Some("England".to_string()),
            sic_codes: vec!["62020".to_string(), "62090".to_string()],
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn queries_every_concept_once() {
        assert_eq!(financial_concepts().count(), 30);
    }

    #[test]
    fn assembles_tagged_document() {
        let doc = r#"<html xmlns="http://www.w3.org/1999/xhtml"
                  xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"
                  xmlns:e="http://xbrl.frc.org.uk/fr/2022-01-01/core"
                  xmlns:b="http://xbrl.frc.org.uk/cd/2022-01-01/business">
            <body>
                <ix:hidden>
                    <ix:nonNumeric name="b:EndDateForPeriodCoveredByReport">2023-03-31</ix:nonNumeric>
                </ix:hidden>
                <ix:nonFraction name="e:TurnoverRevenue" contextRef="c1">1,000</ix:nonFraction>
                <ix:nonFraction name="e:NetAssetsLiabilities" contextRef="c1" sign="-">250</ix:nonFraction>
                <ix:nonFraction name="e:AverageNumberEmployeesDuringPeriod" contextRef="c1">12</ix:nonFraction>
            </body>
        </html>"#;

        let statement =
            assemble(doc, FilingFormat::InlineXhtml, &snapshot(), date("2023-06-01")).unwrap();

        assert_eq!(statement.company_number, "02235387");
        assert_eq!(statement.filing_date, date("2023-06-01"));
        assert_eq!(statement.company_name.as_deref(), Some("Test Trading Ltd"));
        assert_eq!(statement.sic_code_1.as_deref(), Some("62020"));
        assert_eq!(statement.sic_code_2.as_deref(), Some("62090"));
        assert_eq!(statement.sic_code_3, None);
        assert_eq!(statement.report_end_date, Some(date("2023-03-31")));
        assert_eq!(statement.average_employees, Some(12));
        assert_eq!(
            statement.fact("TurnoverRevenue"),
            Some(Decimal::from_str("1000").unwrap())
        );
        assert_eq!(
            statement.fact("NetAssetsLiabilities"),
            Some(Decimal::from_str("-250").unwrap())
        );
        assert_eq!(statement.fact("Debtors"), None);
    }

    #[test]
    fn empty_document_still_yields_a_record() {
        let statement = assemble(
            "<html><body><p>nothing here</p></body></html>",
            FilingFormat::Html,
            &snapshot(),
            date("2023-06-01"),
        )
        .unwrap();

        assert_eq!(statement.facts.len(), 30);
        assert!(statement.facts.iter().all(|f| f.value.is_none()));
        assert_eq!(statement.report_end_date, None);
        // Snapshot fields are still copied in
        assert_eq!(statement.company_name.as_deref(), Some("Test Trading Ltd"));
    }

    #[test]
    fn flexible_date_formats() {
        assert_eq!(parse_flexible_date("2023-03-31"), Some(date("2023-03-31")));
        assert_eq!(parse_flexible_date("31.03.23"), Some(date("2023-03-31")));
        assert_eq!(parse_flexible_date("31/03/23"), Some(date("2023-03-31")));
        assert_eq!(parse_flexible_date("31-03-23"), Some(date("2023-03-31")));
        assert_eq!(parse_flexible_date("March 2023"), None);
        assert_eq!(parse_flexible_date(""), None);
    }
}
