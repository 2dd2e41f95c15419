//! # Report Codec
//!
//! Converts reports to and from JSON. The shape of `subjectRef` is resolved
//! through a [`SubtypeRegistry`] from the schema identifier in
//! `subjectRefType`, or supplied by the caller.

use std::sync::Arc;

use serde_json::Value;

use super::{Extensible, IdentificationReport, LevelOfAssurance};
use crate::error::{Error, Result};
use crate::jose::JwtHandler;
use crate::registry::{SubjectKind, SubtypeRegistry};

const SUBJECT_REF: &str = "subjectRef";
const SUBJECT_REF_TYPE: &str = "subjectRefType";
const LEVEL_OF_ASSURANCE: &str = "levelOfAssurance";

/// Encodes and decodes [`IdentificationReport`]s.
#[derive(Clone, Debug)]
pub struct ReportCodec {
    registry: Arc<SubtypeRegistry>,
}

impl ReportCodec {
    /// Create a codec resolving subject kinds through `registry`.
    #[must_use]
    pub const fn new(registry: Arc<SubtypeRegistry>) -> Self {
        Self { registry }
    }

    /// The registry used to resolve subject kinds.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SubtypeRegistry> {
        &self.registry
    }

    /// Decode a report, resolving the subject's kind from `subjectRefType`.
    ///
    /// Fields outside the report schema are kept in the extension bag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSubjectType`] if `subjectRef` is present but
    /// `subjectRefType` is missing or not registered,
    /// [`Error::LevelOfAssuranceUnrecognized`] for a level outside the closed
    /// set, and [`Error::Json`] if a field has the wrong shape.
    pub fn decode(&self, json: &Value) -> Result<IdentificationReport> {
        tracing::debug!("decode");
        self.decode_with(json, None)
    }

    /// Parse `json` as text and decode it as with [`Self::decode`].
    ///
    /// # Errors
    ///
    /// As [`Self::decode`], plus [`Error::Json`] if the text is not JSON.
    pub fn decode_str(&self, json: &str) -> Result<IdentificationReport> {
        self.decode(&serde_json::from_str(json)?)
    }

    /// Decode a report, decoding `subjectRef` as `kind` regardless of
    /// `subjectRefType`.
    ///
    /// # Errors
    ///
    /// As [`Self::decode`], except that [`Error::UnknownSubjectType`] is never
    /// returned.
    pub fn decode_as(&self, json: &Value, kind: &SubjectKind) -> Result<IdentificationReport> {
        tracing::debug!(%kind, "decode as");
        self.decode_with(json, Some(kind))
    }

    /// Encode a report as a JSON object. Extension bag entries are written at
    /// the top level; the subject is nested under `subjectRef`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be serialized.
    pub fn encode(&self, report: &IdentificationReport) -> Result<Value> {
        tracing::debug!("encode");
        report.to_json()
    }

    /// Encode a report as JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be serialized.
    pub fn encode_string(&self, report: &IdentificationReport) -> Result<String> {
        Ok(serde_json::to_string(&self.encode(report)?)?)
    }

    /// Encode a report and sign it as a compact JWS.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be encoded or signed.
    pub fn to_jws(&self, report: &IdentificationReport, handler: &JwtHandler) -> Result<String> {
        handler.create_signed(self.encode_string(report)?.as_bytes())
    }

    /// Encode a report and encrypt it as a compact JWE.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be encoded or encrypted.
    pub fn to_jwe(&self, report: &IdentificationReport, handler: &JwtHandler) -> Result<String> {
        handler.create_encrypted(self.encode_string(report)?.as_bytes())
    }

    /// Verify or decrypt a compact token and decode the report it carries.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be unwrapped or its payload is
    /// not a valid report.
    pub fn from_token(&self, token: &str, handler: &JwtHandler) -> Result<IdentificationReport> {
        let plain = handler.unwrap(token)?;
        self.decode(&plain.claims()?)
    }

    /// Verify or decrypt a compact token and decode the report it carries,
    /// decoding the subject as `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be unwrapped or its payload is
    /// not a valid report.
    pub fn from_token_as(
        &self, token: &str, handler: &JwtHandler, kind: &SubjectKind,
    ) -> Result<IdentificationReport> {
        let plain = handler.unwrap(token)?;
        self.decode_as(&plain.claims()?, kind)
    }

    fn decode_with(
        &self, json: &Value, kind: Option<&SubjectKind>,
    ) -> Result<IdentificationReport> {
        let Value::Object(fields) = json else {
            return Err(Error::Json(serde::de::Error::custom("report is not a JSON object")));
        };
        let mut fields = fields.clone();

        match fields.get(LEVEL_OF_ASSURANCE) {
            None | Some(Value::Null) => {}
            Some(Value::String(loa)) => {
                loa.parse::<LevelOfAssurance>()?;
            }
            Some(other) => return Err(Error::LevelOfAssuranceUnrecognized(other.to_string())),
        }

        // the subject is decoded separately so it never lands in the bag
        let subject = fields.remove(SUBJECT_REF).filter(|s| !s.is_null());
        let kind = match (subject.is_some(), kind) {
            (false, _) => None,
            (true, Some(kind)) => Some(kind.clone()),
            (true, None) => {
                let Some(hint) = fields.get(SUBJECT_REF_TYPE).and_then(Value::as_str) else {
                    return Err(Error::UnknownSubjectType(None));
                };
                let kind = self.registry.resolve(hint);
                Some(kind.ok_or_else(|| Error::UnknownSubjectType(Some(hint.to_string())))?)
            }
        };

        let mut report: IdentificationReport = serde_json::from_value(Value::Object(fields))?;
        if let (Some(subject), Some(kind)) = (subject, kind) {
            report.subject_ref = Some(kind.decode(subject)?);
        }
        Ok(report)
    }
}
