// src/storage/mod.rs
use crate::extractors::statement::{financial_concepts, FinancialStatement, AVERAGE_EMPLOYEES_CONCEPT};
use crate::utils::error::StorageError;
use once_cell::sync::Lazy;
use rusqlite::{params, params_from_iter, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// Company-snapshot and period columns preceding the concept columns.
const SNAPSHOT_COLUMNS: &[&str] = &[
    "company_name",
    "address_line_1",
    "address_line_2",
    "locality",
    "postal_code",
    "country",
    "sic_code_1",
    "sic_code_2",
    "sic_code_3",
    "sic_code_4",
    "report_end_date",
];

/// All non-key columns in insert order. Financial concept columns keep the
/// concept name verbatim (case-sensitive) so every column traces back to its
/// source tag name. Decimal values are stored as canonical text; SQLite REAL
/// is binary floating point and would not round-trip them exactly.
static DATA_COLUMNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    SNAPSHOT_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(AVERAGE_EMPLOYEES_CONCEPT))
        .chain(financial_concepts())
        .collect()
});

static CREATE_TABLE_SQL: Lazy<String> = Lazy::new(|| {
    let columns = DATA_COLUMNS
        .iter()
        .map(|c| format!("\"{}\" TEXT", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS financial_statements (
            company_number TEXT NOT NULL,
            filing_date TEXT NOT NULL,
            {},
            PRIMARY KEY (company_number, filing_date)
        )",
        columns
    )
});

static UPSERT_SQL: Lazy<String> = Lazy::new(|| {
    let columns = DATA_COLUMNS
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=DATA_COLUMNS.len() + 2)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = DATA_COLUMNS
        .iter()
        .map(|c| format!("\"{c}\" = excluded.\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO financial_statements (company_number, filing_date, {})
         VALUES ({})
         ON CONFLICT(company_number, filing_date) DO UPDATE SET {}",
        columns, placeholders, updates
    )
});

/// SQLite-backed store for assembled financial statements, keyed by
/// (company number, filing date).
pub struct StatementStore {
    conn: Mutex<Connection>,
}

impl StatementStore {
    /// Opens (creating if necessary) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory store, mainly for tests.
    #[allow(dead_code)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(&CREATE_TABLE_SQL, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts or fully replaces the statement row for its natural key.
    ///
    /// One key-scoped transaction against the primary key: the conflict
    /// target guarantees at most one row per key even under concurrent
    /// callers, and the update arm replaces every data column, so a concept
    /// that newly resolved to null overwrites an older non-null value.
    /// Returns whether the row was newly created.
    pub fn upsert(&self, statement: &FinancialStatement) -> Result<bool, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let tx = conn.unchecked_transaction()?;

        let filing_date = statement.filing_date.to_string();
        let existing: bool = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM financial_statements
                WHERE company_number = ?1 AND filing_date = ?2
            )",
            params![statement.company_number, filing_date],
            |row| row.get(0),
        )?;

        let mut values: Vec<Option<String>> = Vec::with_capacity(DATA_COLUMNS.len() + 2);
        values.push(Some(statement.company_number.clone()));
        values.push(Some(filing_date));
        values.push(statement.company_name.clone());
        values.push(statement.address_line_1.clone());
        values.push(statement.address_line_2.clone());
        values.push(statement.locality.clone());
        values.push(statement.postal_code.clone());
        values.push(statement.country.clone());
        values.push(statement.sic_code_1.clone());
        values.push(statement.sic_code_2.clone());
        values.push(statement.sic_code_3.clone());
        values.push(statement.sic_code_4.clone());
        values.push(statement.report_end_date.map(|d| d.to_string()));
        values.push(statement.average_employees.map(|n| n.to_string()));
        for fact in &statement.facts {
            values.push(fact.value.map(|d| d.to_string()));
        }

        tx.execute(&UPSERT_SQL, params_from_iter(values))?;
        tx.commit()?;

        Ok(!existing)
    }

    /// Number of persisted statement rows.
    pub fn row_count(&self) -> Result<i64, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(conn.query_row("SELECT COUNT(*) FROM financial_statements", [], |row| {
            row.get(0)
        })?)
    }

    /// Reads a single concept value back for one statement row.
    #[allow(dead_code)]
    pub fn fact_value(
        &self,
        company_number: &str,
        filing_date: &str,
        concept: &str,
    ) -> Result<Option<Decimal>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let raw: Option<String> = conn.query_row(
            &format!(
                "SELECT \"{}\" FROM financial_statements
                 WHERE company_number = ?1 AND filing_date = ?2",
                concept
            ),
            params![company_number, filing_date],
            |row| row.get(0),
        )?;
        Ok(raw.and_then(|s| Decimal::from_str(&s).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::facts::FilingFormat;
    use crate::extractors::statement::{assemble, FinancialFact};
    use crate::registry::models::CompanySnapshot;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn statement_with_turnover(value: Option<Decimal>) -> FinancialStatement {
        FinancialStatement {
            company_number: "02235387".to_string(),
            filing_date: date("2023-03-31"),
            company_name: Some("Test Trading Ltd".to_string()),
            address_line_1: Some("1 High Street".to_string()),
            address_line_2: None,
            locality: Some("Leeds".to_string()),
            postal_code: Some("LS1 1AA".to_string()),
            country: Some("England".to_string()),
            sic_code_1: Some("62020".to_string()),
            sic_code_2: None,
            sic_code_3: None,
            sic_code_4: None,
            report_end_date: Some(date("2023-03-31")),
            average_employees: Some(12),
            facts: financial_concepts()
                .map(|concept| FinancialFact {
                    concept,
                    value: if concept == "TurnoverRevenue" {
                        value
                    } else {
                        None
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let store = StatementStore::open_in_memory().unwrap();
        let statement = statement_with_turnover(Some(dec("1000")));

        assert!(store.upsert(&statement).unwrap());
        assert!(!store.upsert(&statement).unwrap());
        assert_eq!(store.row_count().unwrap(), 1);
    }

    #[test]
    fn second_document_for_same_key_fully_replaces_the_row() {
        let store = StatementStore::open_in_memory().unwrap();

        store
            .upsert(&statement_with_turnover(Some(dec("1000"))))
            .unwrap();
        // A concept that newly resolves to null must overwrite the old value
        store.upsert(&statement_with_turnover(None)).unwrap();

        assert_eq!(store.row_count().unwrap(), 1);
        assert_eq!(
            store
                .fact_value("02235387", "2023-03-31", "TurnoverRevenue")
                .unwrap(),
            None
        );

        store
            .upsert(&statement_with_turnover(Some(dec("2500"))))
            .unwrap();
        assert_eq!(
            store
                .fact_value("02235387", "2023-03-31", "TurnoverRevenue")
                .unwrap(),
            Some(dec("2500"))
        );
    }

    #[test]
    fn concurrent_upserts_never_duplicate_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StatementStore::open(dir.path().join("statements.db")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let statement = statement_with_turnover(Some(Decimal::from(i)));
                    store.upsert(&statement).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.row_count().unwrap(), 1);
    }

    fn snapshot() -> CompanySnapshot {
        CompanySnapshot {
            company_number: "02235387".to_string(),
            company_name: Some("Test Trading Ltd".to_string()),
            address_line_1: None,
            address_line_2: None,
            locality: None,
            postal_code: None,
            country: None,
            sic_codes: vec![],
        }
    }

    #[test]
    fn tagged_value_survives_to_the_store() {
        let doc = r#"<html xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"
                  xmlns:e="http://xbrl.frc.org.uk/fr/2021-01-01/core">
            <body>
              <ix:nonFraction name="e:TurnoverRevenue" contextRef="c1">1,234,567</ix:nonFraction>
              <ix:nonFraction name="e:ProfitLoss" contextRef="c1" sign="-">500</ix:nonFraction>
            </body>
        </html>"#;

        let statement =
            assemble(doc, FilingFormat::InlineXhtml, &snapshot(), date("2023-03-31")).unwrap();
        let store = StatementStore::open_in_memory().unwrap();
        assert!(store.upsert(&statement).unwrap());

        assert_eq!(
            store
                .fact_value("02235387", "2023-03-31", "TurnoverRevenue")
                .unwrap(),
            Some(dec("1234567.00"))
        );
        assert_eq!(
            store
                .fact_value("02235387", "2023-03-31", "ProfitLoss")
                .unwrap(),
            Some(dec("-500.00"))
        );
    }

    #[test]
    fn table_scraped_value_survives_to_the_store() {
        let doc = r#"<html><body><table>
            <tr><td>TURNOVER ................</td><td>42,000</td></tr>
        </table></body></html>"#;

        let statement = assemble(doc, FilingFormat::Html, &snapshot(), date("2023-03-31")).unwrap();
        let store = StatementStore::open_in_memory().unwrap();
        store.upsert(&statement).unwrap();

        assert_eq!(
            store
                .fact_value("02235387", "2023-03-31", "TurnoverRevenue")
                .unwrap(),
            Some(dec("42000"))
        );
    }

    #[test]
    fn placeholder_persists_as_null_not_zero() {
        let doc = r#"<html xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"
                  xmlns:e="http://xbrl.frc.org.uk/fr/2021-01-01/core">
            <body><ix:nonFraction name="e:TurnoverRevenue" contextRef="c1">N/A</ix:nonFraction></body>
        </html>"#;

        let statement =
            assemble(doc, FilingFormat::InlineXhtml, &snapshot(), date("2023-03-31")).unwrap();
        let store = StatementStore::open_in_memory().unwrap();
        store.upsert(&statement).unwrap();

        assert_eq!(
            store
                .fact_value("02235387", "2023-03-31", "TurnoverRevenue")
                .unwrap(),
            None
        );
    }
}
