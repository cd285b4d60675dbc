//! Caller-supplied attribute sets for insert and partial-update operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attributes for creating a strain record.
///
/// `created_at`/`updated_at` are honored only by the load path (migrating
/// pre-existing records); the regular add path stamps its own times.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStrain {
    pub created_by: String,
    pub updated_by: String,
    pub summary: String,
    pub editable_summary: String,
    pub depositor: String,
    pub genes: Vec<String>,
    pub dbxrefs: Vec<String>,
    pub publications: Vec<String>,
    pub systematic_name: String,
    pub label: String,
    pub species: String,
    pub plasmid: Option<String>,
    /// Parent stock identifier; triggers lineage-edge creation when set
    pub parent: Option<String>,
    pub names: Vec<String>,
    pub term: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Attributes for creating a plasmid record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPlasmid {
    pub created_by: String,
    pub updated_by: String,
    pub summary: String,
    pub editable_summary: String,
    pub depositor: String,
    pub genes: Vec<String>,
    pub dbxrefs: Vec<String>,
    pub publications: Vec<String>,
    pub image_map: String,
    pub sequence: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sparse update for a strain: `None` (or an empty string/list) means
/// "leave the field unchanged". Only `updated_by` is mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrainUpdate {
    pub updated_by: String,
    pub summary: Option<String>,
    pub editable_summary: Option<String>,
    pub depositor: Option<String>,
    pub genes: Option<Vec<String>>,
    pub dbxrefs: Option<Vec<String>>,
    pub publications: Option<Vec<String>>,
    pub systematic_name: Option<String>,
    pub label: Option<String>,
    pub species: Option<String>,
    pub plasmid: Option<String>,
    /// New parent stock identifier; drives the lineage state machine
    pub parent: Option<String>,
    pub names: Option<Vec<String>>,
    pub term: Option<String>,
}

impl StrainUpdate {
    pub fn new(updated_by: impl Into<String>) -> Self {
        Self {
            updated_by: updated_by.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_genes(mut self, genes: Vec<String>) -> Self {
        self.genes = Some(genes);
        self
    }
}

/// Sparse update for a plasmid; same absence semantics as [`StrainUpdate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlasmidUpdate {
    pub updated_by: String,
    pub summary: Option<String>,
    pub editable_summary: Option<String>,
    pub depositor: Option<String>,
    pub genes: Option<Vec<String>>,
    pub dbxrefs: Option<Vec<String>>,
    pub publications: Option<Vec<String>>,
    pub image_map: Option<String>,
    pub sequence: Option<String>,
    pub name: Option<String>,
}

impl PlasmidUpdate {
    pub fn new(updated_by: impl Into<String>) -> Self {
        Self {
            updated_by: updated_by.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
