//! Member aggregate
//!
//! A [`Member`] is composed from the `member` row plus one query per junction
//! table (see [`reader`]). New members arrive as a [`row::MemberRow`]
//! submission and are written by [`row::insert_member_row`]. The document
//! mirror copy is maintained by [`mirror`].

pub mod mirror;
pub mod reader;
pub mod row;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use mirror::{save_member_doc, search_member_docs, sync_member_doc};
pub use reader::{member_by_id, member_ids, member_ids_updated_since};
pub use row::{insert_member_row, insert_row_from_json, MemberRow};

/// Fully composed member record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Member {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
    /// Name prefix (Dr, Prof, ...)
    pub title: String,
    pub first_name: String,
    pub middle_names: Vec<String>,
    pub last_name: String,
    pub post_nominal: String,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_entry: Option<NaiveDate>,
    pub country: String,
    pub journal_number: String,
    pub bpay_number: String,
    pub consent_directory: bool,
    pub consent_contact: bool,
    pub qualifications_info: String,
    pub contact: Contact,
    pub memberships: Vec<Membership>,
    pub qualifications: Vec<Qualification>,
    pub positions: Vec<Position>,
    pub specialities: Vec<Speciality>,
    pub accreditations: Vec<Accreditation>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub email_primary: String,
    pub email_secondary: String,
    pub mobile: String,
    pub locations: Vec<Location>,
}

/// Postal or directory contact location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    pub address: Vec<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phone: String,
    pub fax: String,
    pub email: String,
    pub web: String,
}

/// Membership title and status with their audit trails (most recent first)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Membership {
    pub title: String,
    pub status: String,
    pub title_history: Vec<TitleEntry>,
    pub status_history: Vec<StatusEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TitleEntry {
    pub date: Option<NaiveDate>,
    pub title: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusEntry {
    pub date: Option<NaiveDate>,
    pub status: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Qualification {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub organisation_id: Option<i64>,
    pub organisation_name: String,
    pub year: Option<i64>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    pub id: i64,
    pub name: String,
    pub organisation_id: Option<i64>,
    pub organisation_name: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Speciality {
    pub id: i64,
    pub name: String,
    pub preference: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Accreditation {
    pub id: i64,
    pub name: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Member {
    /// First name, middle names and last name joined by single spaces
    pub fn full_name(&self) -> String {
        std::iter::once(self.first_name.as_str())
            .chain(self.middle_names.iter().map(String::as_str))
            .chain(std::iter::once(self.last_name.as_str()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First contact location of the given type (case-insensitive)
    pub fn contact_location_by_type(&self, kind: &str) -> Option<&Location> {
        self.contact
            .locations
            .iter()
            .find(|l| l.kind.eq_ignore_ascii_case(kind))
    }

    /// First position with the given name (case-insensitive)
    pub fn position_by_name(&self, name: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Most preferred speciality
    pub fn primary_speciality(&self) -> Option<&Speciality> {
        self.specialities.first()
    }

    pub fn current_membership(&self) -> Option<&Membership> {
        self.memberships.first()
    }

    /// Current membership title, empty when there is no membership record
    pub fn current_title(&self) -> &str {
        self.current_membership().map(|m| m.title.as_str()).unwrap_or("")
    }

    /// Current membership status, empty when there is no membership record
    pub fn current_status(&self) -> &str {
        self.current_membership().map(|m| m.status.as_str()).unwrap_or("")
    }
}

/// Document store key for a member (`member::<id>`)
pub fn doc_key(id: i64) -> String {
    format!("member::{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Member {
        Member {
            id: 7,
            first_name: "Ada".into(),
            middle_names: vec!["Mary".into(), "Jane".into()],
            last_name: "Lovelace".into(),
            contact: Contact {
                locations: vec![
                    Location { kind: "Mail".into(), city: "Sydney".into(), ..Default::default() },
                    Location { kind: "directory".into(), city: "Perth".into(), ..Default::default() },
                ],
                ..Default::default()
            },
            positions: vec![Position { name: "First Council Affiliation".into(), ..Default::default() }],
            memberships: vec![Membership { title: "Fellow".into(), status: "Active".into(), ..Default::default() }],
            ..Default::default()
        }
    }

    #[test]
    fn test_full_name_skips_empty_parts() {
        let mut m = sample();
        assert_eq!(m.full_name(), "Ada Mary Jane Lovelace");
        m.middle_names.clear();
        assert_eq!(m.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_lookup_helpers() {
        let m = sample();
        assert_eq!(m.contact_location_by_type("mail").unwrap().city, "Sydney");
        assert_eq!(m.contact_location_by_type("DIRECTORY").unwrap().city, "Perth");
        assert!(m.contact_location_by_type("work").is_none());
        assert!(m.position_by_name("first council affiliation").is_some());
        assert_eq!(m.current_title(), "Fellow");
        assert_eq!(m.current_status(), "Active");
        assert!(m.primary_speciality().is_none());
    }

    #[test]
    fn test_member_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["contact"]["locations"][0]["type"], "Mail");
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_doc_key() {
        assert_eq!(doc_key(42), "member::42");
    }
}
