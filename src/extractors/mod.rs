// src/extractors/mod.rs
pub mod facts;
pub mod numeric;
pub mod statement;
pub mod taxonomy;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use facts::{FilingFormat, ParsedFiling};
#[allow(unused_imports)]
pub use statement::{assemble, FinancialFact, FinancialStatement};
#[allow(unused_imports)]
pub use taxonomy::TaxonomyBinding;
