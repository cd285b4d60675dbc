//! Stock record representation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a stock record; doubles as the document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockId(String);

impl StockId {
    /// Wrap an existing identifier (e.g. one minted by the key generator)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of biological material a stock record describes.
///
/// The kind is fixed at creation time and recorded on the typed edge
/// linking the record to its properties document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockKind {
    Strain,
    Plasmid,
}

impl StockKind {
    /// Discriminator value stored on the stock→properties edge
    pub fn as_str(&self) -> &'static str {
        match self {
            StockKind::Strain => "strain",
            StockKind::Plasmid => "plasmid",
        }
    }

    /// Identifier prefix used by the key generator
    pub fn id_prefix(&self) -> &'static str {
        match self {
            StockKind::Strain => "DBS0",
            StockKind::Plasmid => "DBP0",
        }
    }
}

impl std::fmt::Display for StockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strain-specific attribute set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrainProperties {
    /// Systematic (genotype-derived) name
    pub systematic_name: String,
    /// Display label
    pub label: String,
    pub species: String,
    /// Back-reference to a plasmid name carried by the strain
    pub plasmid: Option<String>,
    /// Parent stock identifier, resolved from the lineage edge
    pub parent: Option<StockId>,
    /// Alternate names
    pub names: Vec<String>,
    /// Ontology-term annotation
    pub term: Option<String>,
}

/// Plasmid-specific attribute set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlasmidProperties {
    pub image_map: String,
    pub sequence: String,
    pub name: String,
}

/// Kind-specific properties document linked to a stock record.
///
/// A record carries exactly one variant; construction from a database row
/// consults the type discriminator on the stock→properties edge, so a
/// record can never hold both kinds or neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockProperties {
    Strain(StrainProperties),
    Plasmid(PlasmidProperties),
}

impl StockProperties {
    pub fn kind(&self) -> StockKind {
        match self {
            StockProperties::Strain(_) => StockKind::Strain,
            StockProperties::Plasmid(_) => StockKind::Plasmid,
        }
    }

    pub fn as_strain(&self) -> Option<&StrainProperties> {
        match self {
            StockProperties::Strain(p) => Some(p),
            StockProperties::Plasmid(_) => None,
        }
    }

    pub fn as_plasmid(&self) -> Option<&PlasmidProperties> {
        match self {
            StockProperties::Plasmid(p) => Some(p),
            StockProperties::Strain(_) => None,
        }
    }
}

/// Canonical entity returned by every repository operation.
///
/// Timestamps are persisted at millisecond resolution; `created_at` and
/// `created_by` never change after creation, `updated_at`/`updated_by`
/// change on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub stock_id: StockId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
    pub summary: String,
    pub editable_summary: String,
    pub depositor: String,
    /// Associated gene identifiers, in caller-supplied order
    pub genes: Vec<String>,
    /// External database cross-references
    pub dbxrefs: Vec<String>,
    /// Publication identifiers
    pub publications: Vec<String>,
    pub properties: StockProperties,
}

impl StockRecord {
    pub fn kind(&self) -> StockKind {
        self.properties.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_discriminator_and_prefix() {
        assert_eq!(StockKind::Strain.as_str(), "strain");
        assert_eq!(StockKind::Plasmid.as_str(), "plasmid");
        assert_eq!(StockKind::Strain.id_prefix(), "DBS0");
        assert_eq!(StockKind::Plasmid.id_prefix(), "DBP0");
    }

    #[test]
    fn properties_union_is_exclusive() {
        let props = StockProperties::Strain(StrainProperties {
            systematic_name: "AX4-1".into(),
            label: "AX4".into(),
            species: "Dictyostelium discoideum".into(),
            ..Default::default()
        });
        assert_eq!(props.kind(), StockKind::Strain);
        assert!(props.as_strain().is_some());
        assert!(props.as_plasmid().is_none());
    }
}
