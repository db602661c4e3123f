//! Closed association types for notes and issues
//!
//! On the wire an association is two flat fields, `association` (entity
//! name) and `associationId`. Both empty means "no association"; one without
//! the other, or an entity outside the allowed set, is rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssociationError;
use crate::{Error, Result};

/// Wire form of an association
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAssociation {
    pub association: String,
    pub association_id: i64,
}

impl RawAssociation {
    pub fn new(association: &str, association_id: i64) -> Self {
        Self {
            association: association.to_string(),
            association_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.association.trim().is_empty() && self.association_id == 0
    }

    /// Check both halves are present and the entity is one of `allowed`
    fn validate(&self, allowed: &[&'static str]) -> std::result::Result<Option<(&'static str, i64)>, AssociationError> {
        let entity = self.association.trim();
        if entity.is_empty() && self.association_id == 0 {
            return Ok(None);
        }
        if entity.is_empty() {
            return Err(AssociationError::NotSpecified);
        }
        if self.association_id <= 0 {
            return Err(AssociationError::IdNotSpecified);
        }
        allowed
            .iter()
            .find(|name| **name == entity)
            .map(|name| Some((*name, self.association_id)))
            .ok_or_else(|| AssociationError::Unknown(entity.to_string()))
    }
}

/// What an issue may be linked to besides a member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAssociation", into = "RawAssociation")]
pub enum IssueAssociation {
    #[default]
    None,
    Application(i64),
    Invoice(i64),
}

impl IssueAssociation {
    pub const ENTITIES: &'static [&'static str] = &["application", "invoice"];

    pub fn entity(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Application(_) => Some("application"),
            Self::Invoice(_) => Some("invoice"),
        }
    }

    pub fn entity_id(&self) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Application(id) | Self::Invoice(id) => Some(*id),
        }
    }
}

impl TryFrom<RawAssociation> for IssueAssociation {
    type Error = AssociationError;

    fn try_from(raw: RawAssociation) -> std::result::Result<Self, Self::Error> {
        Ok(match raw.validate(Self::ENTITIES)? {
            None => Self::None,
            Some(("application", id)) => Self::Application(id),
            Some((_, id)) => Self::Invoice(id),
        })
    }
}

impl From<IssueAssociation> for RawAssociation {
    fn from(a: IssueAssociation) -> Self {
        RawAssociation::new(a.entity().unwrap_or(""), a.entity_id().unwrap_or(0))
    }
}

/// What a note may be linked to besides its member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAssociation", into = "RawAssociation")]
pub enum NoteAssociation {
    #[default]
    None,
    Application(i64),
    Issue(i64),
}

impl NoteAssociation {
    pub const ENTITIES: &'static [&'static str] = &["application", "issue"];

    pub fn entity(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Application(_) => Some("application"),
            Self::Issue(_) => Some("issue"),
        }
    }

    pub fn entity_id(&self) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Application(id) | Self::Issue(id) => Some(*id),
        }
    }
}

impl TryFrom<RawAssociation> for NoteAssociation {
    type Error = AssociationError;

    fn try_from(raw: RawAssociation) -> std::result::Result<Self, Self::Error> {
        Ok(match raw.validate(Self::ENTITIES)? {
            None => Self::None,
            Some(("application", id)) => Self::Application(id),
            Some((_, id)) => Self::Issue(id),
        })
    }
}

impl From<NoteAssociation> for RawAssociation {
    fn from(a: NoteAssociation) -> Self {
        RawAssociation::new(a.entity().unwrap_or(""), a.entity_id().unwrap_or(0))
    }
}

/// Association stored in a `*_association` row, decoded for `A`
pub(crate) fn from_stored<A>(entity: Option<String>, entity_id: Option<i64>) -> Result<A>
where
    A: TryFrom<RawAssociation, Error = AssociationError>,
{
    let raw = RawAssociation::new(entity.as_deref().unwrap_or(""), entity_id.unwrap_or(0));
    Ok(A::try_from(raw)?)
}

/// Pull the wire association out of a JSON submission and validate it
///
/// Runs before the full decode so callers get a typed [`AssociationError`]
/// rather than a generic decode failure.
pub(crate) fn precheck<A>(value: &Value) -> Result<A>
where
    A: TryFrom<RawAssociation, Error = AssociationError>,
{
    let raw: RawAssociation = serde_json::from_value(value.clone())
        .map_err(|e| Error::InvalidInput(format!("Invalid association fields: {}", e)))?;
    Ok(A::try_from(raw)?)
}
