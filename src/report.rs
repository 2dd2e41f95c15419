//! # Identification Report
//!
//! The report envelope: who produced it, when the identification happened,
//! at which level of assurance, and a reference to the identified subject.
//!
//! Fields not named by the report schema are kept in an extension bag and
//! written back at the top level of the document.

pub mod codec;
pub mod subject;

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub use self::codec::ReportCodec;
pub use self::subject::{
    Address, CustomAuthentication, EidAuthentication, FinkBankingAuthentication,
    LegalPersonAuthentication, NaturalPersonAuthentication, NaturalPersonMinimalAuthentication,
    SubjectRef,
};
use crate::error::{Error, Result};
use crate::schema::{SchemaValidator, ValidationResult, locations};

/// Level of assurance of the identification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LevelOfAssurance {
    /// eIDAS notified, high.
    EidasHigh,
    /// eIDAS notified, substantial.
    EidasSubstantial,
    /// eIDAS notified, low.
    EidasLow,
    /// eIDAS not notified, high.
    EidasNotNotifiedHigh,
    /// eIDAS not notified, substantial.
    EidasNotNotifiedSubstantial,
    /// eIDAS not notified, low.
    EidasNotNotifiedLow,
    /// BSI TR-03107, hoch.
    BsiHigh,
    /// BSI TR-03107, substantiell.
    BsiSubstantial,
    /// BSI TR-03107, normal.
    BsiNormal,
    /// Not known. Used when the level is absent.
    #[default]
    Unknown,
}

impl LevelOfAssurance {
    /// All levels, in wire order.
    pub const ALL: [Self; 10] = [
        Self::EidasHigh,
        Self::EidasSubstantial,
        Self::EidasLow,
        Self::EidasNotNotifiedHigh,
        Self::EidasNotNotifiedSubstantial,
        Self::EidasNotNotifiedLow,
        Self::BsiHigh,
        Self::BsiSubstantial,
        Self::BsiNormal,
        Self::Unknown,
    ];

    /// The wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EidasHigh => "http://eidas.europa.eu/LoA/high",
            Self::EidasSubstantial => "http://eidas.europa.eu/LoA/substantial",
            Self::EidasLow => "http://eidas.europa.eu/LoA/low",
            Self::EidasNotNotifiedHigh => "http://eidas.europa.eu/NotNotified/LoA/high",
            Self::EidasNotNotifiedSubstantial => {
                "http://eidas.europa.eu/NotNotified/LoA/substantial"
            }
            Self::EidasNotNotifiedLow => "http://eidas.europa.eu/NotNotified/LoA/low",
            Self::BsiHigh => "http://bsi.bund.de/eID/LoA/hoch",
            Self::BsiSubstantial => "http://bsi.bund.de/eID/LoA/substantiell",
            Self::BsiNormal => "http://bsi.bund.de/eID/LoA/normal",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for LevelOfAssurance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelOfAssurance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|loa| loa.as_str() == s)
            .ok_or_else(|| Error::LevelOfAssuranceUnrecognized(s.to_string()))
    }
}

impl Serialize for LevelOfAssurance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// `null` maps to `Unknown`.
impl<'de> Deserialize<'de> for LevelOfAssurance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map_or(Ok(Self::Unknown), |s| s.parse().map_err(serde::de::Error::custom))
    }
}

/// Evidence of an identification process.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationReport {
    /// Unique identifier of this report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,

    /// The service instance that produced the report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_identity: Option<String>,

    /// When the report was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_time: Option<DateTime<Utc>>,

    /// When the identification took place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification_time: Option<DateTime<Utc>>,

    /// How the subject was authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_method: Option<String>,

    /// Level of assurance. Never absent; defaults to
    /// [`LevelOfAssurance::Unknown`].
    #[serde(default)]
    pub level_of_assurance: LevelOfAssurance,

    /// Status of the identification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_status: Option<String>,

    /// Explanation of `id_status`, typically set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_statement: Option<String>,

    /// Schema identifier of `subject_ref`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_ref_type: Option<String>,

    /// The identified subject. Populated by [`ReportCodec`], which resolves
    /// its shape from `subject_ref_type`.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub subject_ref: Option<SubjectRef>,

    /// Transaction context linking the report to the requesting service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_information: Option<String>,

    /// Documents presented during the identification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_references: Option<Vec<Map<String, Value>>>,

    /// Fields not covered above.
    #[serde(flatten, deserialize_with = "extension_bag")]
    pub extra: Map<String, Value>,
}

// A subject can only be decoded once its kind is resolved, which is the
// job of `ReportCodec`; deserializing a report directly must not bury it in
// the bag.
fn extension_bag<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    let mut extra = Map::deserialize(deserializer)?;
    match extra.remove("subjectRef") {
        None | Some(Value::Null) => Ok(extra),
        Some(_) => Err(serde::de::Error::custom(
            "`subjectRef` must be decoded with `ReportCodec`",
        )),
    }
}

impl IdentificationReport {
    /// Validate the report against the Identification Report 2.0 schema and
    /// its subject, if any, against the subject's own schema. Subject errors
    /// are located under `/subjectRef`.
    ///
    /// # Errors
    ///
    /// Returns an error if a schema cannot be loaded or the report cannot be
    /// serialized.
    pub fn validation_result(&self, validator: &SchemaValidator) -> Result<ValidationResult> {
        let mut result = validator.validate(locations::IDENTIFICATION_REPORT, &self.to_json()?)?;
        if let Some(subject) = &self.subject_ref {
            result.extend_at("/subjectRef", subject.validate(validator)?);
        }
        Ok(result)
    }

    /// Whether the report and its subject are valid. Errors of an invalid
    /// report are logged.
    ///
    /// # Errors
    ///
    /// Returns an error if a schema cannot be loaded or the report cannot be
    /// serialized.
    pub fn validate(&self, validator: &SchemaValidator) -> Result<bool> {
        let result = self.validation_result(validator)?;
        if !result.valid {
            result.log_errors();
        }
        Ok(result.valid)
    }
}

/// A record with fixed fields plus an extension bag of arbitrary fields.
pub trait Extensible: Serialize + Clone {
    /// The extension bag.
    fn extra(&self) -> &Map<String, Value>;

    /// The extension bag, mutably.
    fn extra_mut(&mut self) -> &mut Map<String, Value>;

    /// The record as a JSON object with bag entries flattened alongside the
    /// fixed fields. A fixed field takes precedence over a bag entry of the
    /// same name.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be serialized.
    fn to_json(&self) -> Result<Value> {
        let mut fixed = self.clone();
        let extra = std::mem::take(fixed.extra_mut());

        let Value::Object(mut object) = serde_json::to_value(&fixed)? else {
            return Err(Error::Json(serde::ser::Error::custom("record is not a JSON object")));
        };
        for (key, value) in extra {
            object.entry(key).or_insert(value);
        }
        Ok(Value::Object(object))
    }
}

impl Extensible for IdentificationReport {
    fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn to_json(&self) -> Result<Value> {
        let mut fixed = self.clone();
        let extra = std::mem::take(&mut fixed.extra);
        let subject = fixed.subject_ref.take();

        let Value::Object(mut object) = serde_json::to_value(&fixed)? else {
            return Err(Error::Json(serde::ser::Error::custom("report is not a JSON object")));
        };
        if let Some(subject) = subject {
            object.insert("subjectRef".to_string(), subject.to_json()?);
        }
        for (key, value) in extra {
            object.entry(key).or_insert(value);
        }
        Ok(Value::Object(object))
    }
}
