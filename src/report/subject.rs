//! # Subject References
//!
//! The authenticated party inside a report. Each variant is described by its
//! own schema document and carries an extension bag for fields its schema
//! does not name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::registry::{CustomKind, SubjectKind};
use crate::report::Extensible;
use crate::schema::{SchemaValidator, ValidationResult};

/// A place, given as a structured address, a statement that no place is
/// known, or free text. The schema forbids combining the three forms.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street and house number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,

    /// City.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// State.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Locality within the city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,

    /// Region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Postal code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,

    /// Statement that no place information is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_place_info: Option<String>,

    /// Unstructured place description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_place: Option<String>,
}

/// Natural person identified by an electronic identity.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NaturalPersonAuthentication {
    /// Service and card specific pseudonym.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_id: Option<String>,

    /// Given names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Date of birth as `dd-mm-yyyy`, `mm-yyyy`, or `yyyy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,

    /// Place of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,

    /// Birth name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_name: Option<String>,

    /// Place of residence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_residence: Option<Address>,

    /// Fields not covered above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Natural person authenticated with a German eID card.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EidAuthentication {
    /// Service and card specific pseudonym.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_id: Option<String>,

    /// Given names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Date of birth as `dd-mm-yyyy`, `mm-yyyy`, or `yyyy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,

    /// Place of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,

    /// Birth name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_name: Option<String>,

    /// Place of residence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_residence: Option<Address>,

    /// Fields not covered above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A legal person and the natural person acting for it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegalPersonAuthentication {
    /// Identifier of the organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Registered name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,

    /// Type of register, e.g. `HRB`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_type: Option<String>,

    /// Court or authority keeping the register.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_place: Option<String>,

    /// Register number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_number: Option<String>,

    /// Legal form as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_form: Option<String>,

    /// Legal form as a catalogue key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_form_key: Option<String>,

    /// Occupation as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,

    /// Occupation as a catalogue key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation_key: Option<String>,

    /// Identifier of the acting natural person.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,

    /// Registered address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    /// Fields not covered above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Given and family name only.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NaturalPersonMinimalAuthentication {
    /// Given names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Fields not covered above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Natural person authenticated by a bank.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinkBankingAuthentication {
    /// First name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Fields not covered above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Subject of a caller-registered kind. All fields live in the bag.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CustomAuthentication {
    /// The registered kind this subject was decoded as.
    #[serde(skip)]
    pub kind: CustomKind,

    /// The subject's fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

macro_rules! extensible {
    ($($ty:ty => $bag:ident),* $(,)?) => {
        $(
            impl Extensible for $ty {
                fn extra(&self) -> &Map<String, Value> {
                    &self.$bag
                }

                fn extra_mut(&mut self) -> &mut Map<String, Value> {
                    &mut self.$bag
                }
            }
        )*
    };
}

extensible! {
    NaturalPersonAuthentication => extra,
    EidAuthentication => extra,
    LegalPersonAuthentication => extra,
    NaturalPersonMinimalAuthentication => extra,
    FinkBankingAuthentication => extra,
    CustomAuthentication => fields,
}

/// A decoded subject reference.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubjectRef {
    /// See [`NaturalPersonAuthentication`].
    NaturalPerson(NaturalPersonAuthentication),

    /// See [`LegalPersonAuthentication`].
    LegalPerson(LegalPersonAuthentication),

    /// See [`NaturalPersonMinimalAuthentication`].
    NaturalPersonMinimal(NaturalPersonMinimalAuthentication),

    /// See [`EidAuthentication`].
    Eid(EidAuthentication),

    /// See [`FinkBankingAuthentication`].
    FinkBanking(FinkBankingAuthentication),

    /// See [`CustomAuthentication`].
    Custom(CustomAuthentication),
}

impl SubjectRef {
    /// The kind of this subject.
    #[must_use]
    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::NaturalPerson(_) => SubjectKind::NaturalPerson,
            Self::LegalPerson(_) => SubjectKind::LegalPerson,
            Self::NaturalPersonMinimal(_) => SubjectKind::NaturalPersonMinimal,
            Self::Eid(_) => SubjectKind::Eid,
            Self::FinkBanking(_) => SubjectKind::FinkBanking,
            Self::Custom(custom) => SubjectKind::Custom(custom.kind.clone()),
        }
    }

    /// The subject as a JSON object. Bag entries are flattened alongside the
    /// fixed fields; a fixed field takes precedence over a bag entry with the
    /// same name.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be serialized.
    pub fn to_json(&self) -> Result<Value> {
        match self {
            Self::NaturalPerson(s) => s.to_json(),
            Self::LegalPerson(s) => s.to_json(),
            Self::NaturalPersonMinimal(s) => s.to_json(),
            Self::Eid(s) => s.to_json(),
            Self::FinkBanking(s) => s.to_json(),
            Self::Custom(s) => s.to_json(),
        }
    }

    /// Validate the subject against its own schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be loaded.
    pub fn validate(&self, validator: &SchemaValidator) -> Result<ValidationResult> {
        let kind = self.kind();
        validator.validate(kind.schema_location(), &self.to_json()?)
    }
}

impl From<NaturalPersonAuthentication> for SubjectRef {
    fn from(subject: NaturalPersonAuthentication) -> Self {
        Self::NaturalPerson(subject)
    }
}

impl From<LegalPersonAuthentication> for SubjectRef {
    fn from(subject: LegalPersonAuthentication) -> Self {
        Self::LegalPerson(subject)
    }
}

impl From<NaturalPersonMinimalAuthentication> for SubjectRef {
    fn from(subject: NaturalPersonMinimalAuthentication) -> Self {
        Self::NaturalPersonMinimal(subject)
    }
}

impl From<EidAuthentication> for SubjectRef {
    fn from(subject: EidAuthentication) -> Self {
        Self::Eid(subject)
    }
}

impl From<FinkBankingAuthentication> for SubjectRef {
    fn from(subject: FinkBankingAuthentication) -> Self {
        Self::FinkBanking(subject)
    }
}

impl From<CustomAuthentication> for SubjectRef {
    fn from(subject: CustomAuthentication) -> Self {
        Self::Custom(subject)
    }
}
