//! # Schema Sources
//!
//! A [`SchemaSource`] turns a logical schema location into raw schema text.
//! The crate never fetches schemas over the network: bundled documents are
//! compiled into the binary and anything else comes from a caller-provided
//! source.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;

use crate::error::Error;

/// Logical locations of the bundled schema documents.
pub mod locations {
    /// Identification Report 2.0.
    pub const IDENTIFICATION_REPORT: &str = "identification-report.json";
    /// Natural person identified by an electronic identity.
    pub const NATURAL_PERSON: &str = "natural-person.json";
    /// Natural person authenticated with a German eID card.
    pub const EID_AUTHENTICATION: &str = "eid-authentication.json";
    /// Legal person.
    pub const LEGAL_PERSON: &str = "legal-person-authentication.json";
    /// Given and family name only.
    pub const NATURAL_PERSON_MINIMAL: &str = "natural-person-minimal.json";
    /// Natural person authenticated by a bank.
    pub const FINK_BANKING: &str = "fink-banking-authentication.json";
    /// Shared address definition referenced by the person schemas.
    pub const ADDRESS: &str = "address.json";
}

/// Schema identifiers (`$id`) declared by the bundled schema documents.
pub mod ids {
    /// Identification Report 2.0.
    pub const IDENTIFICATION_REPORT: &str =
        "https://raw.githubusercontent.com/Governikus/IdentificationReport/2.0.0/schema/identification-report.json";
    /// Natural person identified by an electronic identity.
    pub const NATURAL_PERSON: &str =
        "https://raw.githubusercontent.com/Governikus/IdentificationReport/2.0.0/schema/natural-person.json";
    /// Natural person authenticated with a German eID card.
    pub const EID_AUTHENTICATION: &str =
        "https://raw.githubusercontent.com/Governikus/IdentificationReport/2.0.0/schema/eid-authentication.json";
    /// Legal person.
    pub const LEGAL_PERSON: &str =
        "https://raw.githubusercontent.com/Governikus/IdentificationReport/2.0.0/schema/legal-person-authentication.json";
    /// Given and family name only.
    pub const NATURAL_PERSON_MINIMAL: &str =
        "https://raw.githubusercontent.com/Governikus/IdentificationReport/2.0.0/schema/natural-person-minimal.json";
    /// Natural person authenticated by a bank.
    pub const FINK_BANKING: &str =
        "https://raw.githubusercontent.com/Governikus/IdentificationReport/2.0.0/schema/fink-banking-authentication.json";
}

/// Resolves logical schema locations to schema text.
///
/// Implementations must be safe to share between threads: the schema store
/// and the subtype registry call into the same source concurrently.
pub trait SchemaSource: Send + Sync {
    /// Load the raw schema text stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is stored at the location or it cannot be
    /// read.
    fn load(&self, location: &str) -> Result<String>;

    /// Map a `$ref` URI encountered during compilation to a location this
    /// source understands. Defaults to the last path segment of the URI.
    fn locate(&self, uri: &str) -> String {
        let path = uri.split(['#', '?']).next().unwrap_or(uri);
        path.rsplit('/').next().unwrap_or(path).to_string()
    }
}

/// Schema documents shipped with the crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct BundledSchemas;

impl SchemaSource for BundledSchemas {
    fn load(&self, location: &str) -> Result<String> {
        let text = match location {
            locations::IDENTIFICATION_REPORT => {
                include_str!("../../schemas/identification-report.json")
            }
            locations::NATURAL_PERSON => include_str!("../../schemas/natural-person.json"),
            locations::EID_AUTHENTICATION => {
                include_str!("../../schemas/eid-authentication.json")
            }
            locations::LEGAL_PERSON => {
                include_str!("../../schemas/legal-person-authentication.json")
            }
            locations::NATURAL_PERSON_MINIMAL => {
                include_str!("../../schemas/natural-person-minimal.json")
            }
            locations::FINK_BANKING => {
                include_str!("../../schemas/fink-banking-authentication.json")
            }
            locations::ADDRESS => include_str!("../../schemas/address.json"),
            _ => bail!("no bundled schema named `{location}`"),
        };
        Ok(text.to_string())
    }
}

/// Schema documents read from a directory on disk. Locations are paths
/// relative to the directory and may not escape it.
#[derive(Clone, Debug)]
pub struct DirectorySchemas {
    root: PathBuf,
}

impl DirectorySchemas {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SchemaSource for DirectorySchemas {
    fn load(&self, location: &str) -> Result<String> {
        let relative = Path::new(location);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(anyhow!("location `{location}` is not a relative path"));
        }
        let path = self.root.join(relative);
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Load and parse the schema document at `location`.
pub(crate) fn load_document(source: &dyn SchemaSource, location: &str) -> crate::Result<Value> {
    let text = source.load(location).map_err(|e| Error::ResourceNotFound {
        location: location.to_string(),
        reason: format!("{e:#}"),
    })?;
    serde_json::from_str(&text).map_err(|e| Error::SchemaMalformed {
        location: location.to_string(),
        reason: e.to_string(),
    })
}
