//! Document bundle wire model and integrity helpers.
//!
//! Responsibilities:
//! - Define the `Bundle` container serialised as the interchange document
//! - Keep entries in append order (entries are never removed or reordered)
//! - Check that every intra-document reference resolves to an entry
//! - Render to JSON/YAML and parse JSON back with path-aware errors

use crate::datatypes::{Identifier, Meta};
use crate::reference::Reference;
use crate::resources::{Composition, Resource};
use crate::{FhirError, FhirResult};
use chrono::{DateTime, Utc};
use hip_uuid::ResourceId;
use serde::{Deserialize, Serialize};

/// Bundle kind. Only `document` bundles are produced or accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Document,
}

/// One slot of a bundle: exactly one resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    pub resource: Resource,
}

/// A self-contained, cross-referenced collection of resources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    resource_type: String,

    /// Logical id; absent when the business identifier is not a valid logical id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    pub identifier: Identifier,

    #[serde(rename = "type")]
    pub type_: BundleType,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    entry: Vec<BundleEntry>,
}

/// A reference that does not point at any entry of its bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Index of the entry holding the reference.
    pub entry_index: usize,
    pub reference: Reference,
}

impl Bundle {
    /// Creates an empty document bundle.
    ///
    /// `meta.lastUpdated` is set to `timestamp` so the bundle depends only on its inputs.
    pub fn document(id: Option<ResourceId>, identifier: Identifier, timestamp: DateTime<Utc>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id,
            meta: Some(Meta {
                version_id: Some("1".to_string()),
                last_updated: Some(timestamp),
            }),
            identifier,
            type_: BundleType::Document,
            timestamp,
            entry: Vec::new(),
        }
    }

    /// Appends a resource as a new entry and returns its index.
    ///
    /// With `with_full_url` the entry carries its relative `Type/id` URL; otherwise entries are
    /// addressed by resource id only.
    pub fn add_entry(&mut self, resource: impl Into<Resource>, with_full_url: bool) -> usize {
        let resource = resource.into();
        let full_url = with_full_url.then(|| resource.to_reference().reference);
        self.entry.push(BundleEntry { full_url, resource });
        self.entry.len() - 1
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entry
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().map(|e| &e.resource)
    }

    /// The composition, when it is the first entry as a document requires.
    pub fn composition(&self) -> Option<&Composition> {
        match self.entry.first().map(|e| &e.resource) {
            Some(Resource::Composition(c)) => Some(c),
            _ => None,
        }
    }

    /// Index of the entry a reference points at.
    pub fn position_of(&self, reference: &Reference) -> Option<usize> {
        let (resource_type, id) = reference.target().ok()?;
        self.entry.iter().position(|e| {
            e.resource.resource_type() == resource_type && e.resource.id() == &id
        })
    }

    /// Every reference in the bundle that does not resolve to one of its entries.
    pub fn unresolved_references(&self) -> Vec<UnresolvedReference> {
        self.entry
            .iter()
            .enumerate()
            .flat_map(|(entry_index, e)| {
                e.resource
                    .references()
                    .into_iter()
                    .filter(|r| self.position_of(r).is_none())
                    .map(move |r| UnresolvedReference {
                        entry_index,
                        reference: r.clone(),
                    })
            })
            .collect()
    }

    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if serialisation fails.
    pub fn to_json_pretty(&self) -> FhirResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }

    /// Render as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if serialisation fails.
    pub fn to_yaml(&self) -> FhirResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }

    /// Parse a bundle from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort path (e.g.
    /// `entry[2].resource.id`) to the failing field.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the JSON does not match the bundle wire schema,
    /// - unknown keys are present at bundle or entry level,
    /// - resourceType is not "Bundle".
    pub fn parse_json(json_text: &str) -> FhirResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let bundle = match serde_path_to_error::deserialize::<_, Bundle>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };

        if bundle.resource_type != "Bundle" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Bundle', got '{}'",
                bundle.resource_type
            )));
        }

        Ok(bundle)
    }
}
