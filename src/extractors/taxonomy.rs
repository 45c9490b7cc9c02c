// src/extractors/taxonomy.rs
//
// UK statutory filings tag facts against an annually versioned FRC taxonomy.
// The document declares which release it uses through its XML namespace table;
// the prefix bound to a recognized URI is what the fact names are qualified
// with, so it has to be recovered per document before any tag lookup.

/// Namespace URIs of the FRC financial-reporting ("core") taxonomy releases we
/// can extract from.
const CORE_TAXONOMY_URIS: &[&str] = &[
    "http://xbrl.frc.org.uk/fr/2023-01-01/core",
    "http://xbrl.frc.org.uk/fr/2022-01-01/core",
    "http://xbrl.frc.org.uk/fr/2021-01-01/core",
];

/// Namespace URIs of the FRC descriptive ("business") taxonomy releases.
const BUSINESS_TAXONOMY_URIS: &[&str] = &[
    "http://xbrl.frc.org.uk/cd/2023-01-01/business",
    "http://xbrl.frc.org.uk/cd/2022-01-01/business",
    "http://xbrl.frc.org.uk/cd/2021-01-01/business",
];

/// Placeholder prefix for a default (unprefixed) namespace declaration.
///
/// A default namespace entry has no prefix of its own; it still has to take
/// part in URI matching, so it is materialized under this key instead of being
/// dropped from the table.
pub const SYNTHETIC_DEFAULT_PREFIX: &str = "default";

/// Builds the document's namespace table as (prefix, uri) pairs in declaration
/// order.
pub fn namespace_table(doc: &roxmltree::Document<'_>) -> Vec<(String, String)> {
    doc.root_element()
        .namespaces()
        .map(|ns| {
            let prefix = ns
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| SYNTHETIC_DEFAULT_PREFIX.to_string());
            (prefix, ns.uri().to_string())
        })
        .collect()
}

/// The taxonomy roles a document resolved to, with the prefix bound to each.
///
/// Resolved once per document and passed through the extraction call chain.
/// `Unbound` means no declared URI matched any known release; tag-based
/// extraction is skipped entirely and only the table fallback runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaxonomyBinding {
    #[default]
    Unbound,
    BoundCore {
        core: String,
    },
    BoundBusiness {
        business: String,
    },
    BoundBoth {
        core: String,
        business: String,
    },
}

impl TaxonomyBinding {
    /// Scans the namespace table for URIs belonging to a known taxonomy
    /// release. The first match in table order binds each role.
    pub fn resolve(namespaces: &[(String, String)]) -> Self {
        let core = bound_prefix(namespaces, CORE_TAXONOMY_URIS);
        let business = bound_prefix(namespaces, BUSINESS_TAXONOMY_URIS);

        match (core, business) {
            (Some(core), Some(business)) => Self::BoundBoth { core, business },
            (Some(core), None) => Self::BoundCore { core },
            (None, Some(business)) => Self::BoundBusiness { business },
            (None, None) => Self::Unbound,
        }
    }

    /// Prefix bound to the financial-reporting role, if any.
    pub fn core_prefix(&self) -> Option<&str> {
        match self {
            Self::BoundCore { core } | Self::BoundBoth { core, .. } => Some(core),
            _ => None,
        }
    }

    /// Prefix bound to the descriptive role, if any.
    pub fn business_prefix(&self) -> Option<&str> {
        match self {
            Self::BoundBusiness { business } | Self::BoundBoth { business, .. } => Some(business),
            _ => None,
        }
    }

    pub fn is_unbound(&self) -> bool {
        matches!(self, Self::Unbound)
    }
}

fn bound_prefix(namespaces: &[(String, String)], known: &[&str]) -> Option<String> {
    namespaces
        .iter()
        .find(|(_, uri)| known.contains(&uri.as_str()))
        .map(|(prefix, _)| prefix.clone())
}
