//! Member submission rows
//!
//! A [`MemberRow`] is the flat shape of a new-member submission: the member
//! columns plus one list per junction table. Junction rows hold foreign key
//! ids only; names are resolved on read.

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::db::seed::TAG_ADVANCED_TRAINEE;
use crate::db::{nullable_id, nullable_str};
use crate::{time, Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberRow {
    pub id: i64,
    pub role_id: i64,
    #[serde(rename = "titleId")]
    pub name_prefix_id: i64,
    pub country_id: i64,
    #[serde(alias = "consetDirectory")]
    pub consent_directory: bool,
    pub consent_contact: bool,
    pub updated_at: String,
    pub date_of_birth: String,
    pub date_of_entry: String,
    pub gender: String,
    pub first_name: String,
    pub middle_names: String,
    pub last_name: String,
    pub post_nominal: String,
    pub qualifications_info: String,
    pub mobile: String,
    pub primary_email: String,
    pub secondary_email: String,
    pub journal_number: String,
    pub bpay_number: String,
    /// Applying as an advanced trainee; adds the trainee tag on insert
    pub trainee: bool,

    pub qualifications: Vec<QualificationRow>,
    #[serde(rename = "interests", alias = "specialities")]
    pub specialities: Vec<SpecialityRow>,
    #[serde(rename = "positionRows")]
    pub positions: Vec<PositionRow>,
    #[serde(rename = "accreditationRows")]
    pub accreditations: Vec<AccreditationRow>,
    #[serde(rename = "tagRows")]
    pub tags: Vec<TagRow>,
    #[serde(rename = "contactRows")]
    pub contacts: Vec<ContactRow>,
    pub application: Option<ApplicationRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QualificationRow {
    pub id: i64,
    pub member_id: i64,
    pub qualification_id: i64,
    pub organisation_id: i64,
    #[serde(rename = "year")]
    pub year_obtained: i64,
    pub abbreviation: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionRow {
    pub id: i64,
    pub member_id: i64,
    pub position_id: i64,
    pub organisation_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecialityRow {
    pub id: i64,
    pub member_id: i64,
    pub speciality_id: i64,
    pub preference: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AccreditationRow {
    pub id: i64,
    #[serde(alias = "memberID")]
    pub member_id: i64,
    #[serde(alias = "accreditationID")]
    pub accreditation_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TagRow {
    pub id: i64,
    #[serde(alias = "memberID")]
    pub member_id: i64,
    #[serde(alias = "tagID")]
    pub tag_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactRow {
    pub id: i64,
    pub member_id: i64,
    pub contact_type_id: i64,
    pub country_id: i64,
    pub address1: String,
    pub address2: String,
    pub address3: String,
    pub locality: String,
    pub state: String,
    pub postcode: String,
    pub phone: String,
    pub fax: String,
    pub email: String,
    pub web: String,
}

/// Membership application lodged together with the new member
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationRow {
    pub id: i64,
    pub member_id: i64,
    pub nominator_id: i64,
    pub nominator_info: String,
    pub seconder_id: i64,
    #[serde(rename = "forTitleId")]
    pub membership_title_id: i64,
    pub applied_on: String,
    pub comment: String,
}

impl MemberRow {
    /// Decode a JSON submission
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("Invalid member submission: {}", e)))
    }

    /// Reject any row that already carries a store-assigned id
    fn check_ids_unset(&self) -> Result<()> {
        if self.id != 0 {
            return Err(Error::IdAlreadySet("member"));
        }
        let checks: [(&'static str, bool); 7] = [
            ("member_qualification", self.qualifications.iter().any(|r| r.id != 0)),
            ("member_position", self.positions.iter().any(|r| r.id != 0)),
            ("member_speciality", self.specialities.iter().any(|r| r.id != 0)),
            ("member_accreditation", self.accreditations.iter().any(|r| r.id != 0)),
            ("member_tag", self.tags.iter().any(|r| r.id != 0)),
            ("member_contact", self.contacts.iter().any(|r| r.id != 0)),
            ("application", self.application.as_ref().is_some_and(|a| a.id != 0)),
        ];
        match checks.iter().find(|(_, set)| *set) {
            Some((entity, _)) => Err(Error::IdAlreadySet(*entity)),
            None => Ok(()),
        }
    }

    /// Coerce free-form values to their stored form
    fn normalize(&mut self) -> Result<()> {
        self.gender = normalize_gender(&self.gender);
        self.date_of_birth = normalize_date(&self.date_of_birth)?;
        self.date_of_entry = normalize_date(&self.date_of_entry)?;
        if !self.updated_at.trim().is_empty() {
            self.updated_at = time::to_sql(&time::parse_timestamp(&self.updated_at)
                .map_err(|_| Error::InvalidInput(format!("Invalid updatedAt: {:?}", self.updated_at)))?);
        }
        for p in &mut self.positions {
            p.start_date = normalize_date(&p.start_date)?;
            p.end_date = normalize_date(&p.end_date)?;
        }
        for a in &mut self.accreditations {
            a.start_date = normalize_date(&a.start_date)?;
            a.end_date = normalize_date(&a.end_date)?;
        }
        if self.trainee && !self.tags.iter().any(|t| t.tag_id == TAG_ADVANCED_TRAINEE) {
            self.tags.push(TagRow {
                tag_id: TAG_ADVANCED_TRAINEE,
                ..Default::default()
            });
        }
        if let Some(app) = &mut self.application {
            app.applied_on = normalize_date(&app.applied_on)?;
            if app.applied_on.is_empty() {
                app.applied_on = time::date_to_sql(&time::now().date_naive());
            }
        }
        Ok(())
    }
}

/// Gender is stored as a single uppercase letter; empty stays empty
pub fn normalize_gender(gender: &str) -> String {
    gender
        .trim()
        .chars()
        .next()
        .and_then(|c| c.to_uppercase().next())
        .map(String::from)
        .unwrap_or_default()
}

fn normalize_date(value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Ok(String::new());
    }
    time::parse_date(value)
        .map(|d| time::date_to_sql(&d))
        .map_err(|_| Error::InvalidInput(format!("Invalid date: {:?}", value)))
}

/// Ids assigned while inserting, applied to the row only after commit
#[derive(Default)]
struct AssignedIds {
    member: i64,
    qualifications: Vec<i64>,
    positions: Vec<i64>,
    specialities: Vec<i64>,
    accreditations: Vec<i64>,
    tags: Vec<i64>,
    contacts: Vec<i64>,
    application: Option<i64>,
}

/// Decode a JSON submission and insert it
pub async fn insert_row_from_json(pool: &SqlitePool, json: &str) -> Result<MemberRow> {
    let mut row = MemberRow::from_json(json)?;
    insert_member_row(pool, &mut row).await?;
    Ok(row)
}

/// Insert a member row and every junction row in one transaction
///
/// On success the generated member id is written to `row.id` and to the
/// `member_id` of every child row, and each child row receives its own id.
/// Nothing is written to the row (or the store) on failure.
pub async fn insert_member_row(pool: &SqlitePool, row: &mut MemberRow) -> Result<()> {
    row.check_ids_unset()?;
    let mut prepared = row.clone();
    prepared.normalize()?;

    let mut tx = pool.begin().await?;
    let ids = insert_all(&mut tx, &prepared).await?;
    tx.commit().await?;

    *row = prepared;
    apply_ids(row, ids);

    info!(
        member_id = row.id,
        qualifications = row.qualifications.len(),
        positions = row.positions.len(),
        specialities = row.specialities.len(),
        accreditations = row.accreditations.len(),
        tags = row.tags.len(),
        contacts = row.contacts.len(),
        "Inserted member row"
    );
    Ok(())
}

async fn insert_all(tx: &mut Transaction<'_, Sqlite>, row: &MemberRow) -> Result<AssignedIds> {
    let mut ids = AssignedIds::default();

    ids.member = sqlx::query(
        r#"
        INSERT INTO member (
            role_id, name_prefix_id, country_id, consent_directory, consent_contact,
            date_of_birth, date_of_entry, gender, first_name, middle_names, last_name,
            suffix, qualifications_other, mobile_phone, primary_email, secondary_email,
            journal_number, bpay_number, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))
        "#,
    )
    .bind(if row.role_id > 0 { row.role_id } else { 1 })
    .bind(nullable_id(row.name_prefix_id))
    .bind(nullable_id(row.country_id))
    .bind(row.consent_directory)
    .bind(row.consent_contact)
    .bind(nullable_str(&row.date_of_birth))
    .bind(nullable_str(&row.date_of_entry))
    .bind(nullable_str(&row.gender))
    .bind(row.first_name.trim())
    .bind(row.middle_names.trim())
    .bind(row.last_name.trim())
    .bind(row.post_nominal.trim())
    .bind(&row.qualifications_info)
    .bind(&row.mobile)
    .bind(&row.primary_email)
    .bind(&row.secondary_email)
    .bind(&row.journal_number)
    .bind(&row.bpay_number)
    .bind(nullable_str(&row.updated_at))
    .execute(&mut **tx)
    .await?
    .last_insert_rowid();

    let member_id = ids.member;
    debug!(member_id, "Member row inserted, writing junction rows");

    for q in &row.qualifications {
        let id = sqlx::query(
            "INSERT INTO member_qualification (member_id, qualification_id, organisation_id, year, abbreviation, comment) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(q.qualification_id)
        .bind(nullable_id(q.organisation_id))
        .bind(nullable_id(q.year_obtained))
        .bind(&q.abbreviation)
        .bind(&q.comment)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
        ids.qualifications.push(id);
    }

    for p in &row.positions {
        let id = sqlx::query(
            "INSERT INTO member_position (member_id, position_id, organisation_id, start_on, end_on, comment) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(p.position_id)
        .bind(nullable_id(p.organisation_id))
        .bind(nullable_str(&p.start_date))
        .bind(nullable_str(&p.end_date))
        .bind(&p.comment)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
        ids.positions.push(id);
    }

    for s in &row.specialities {
        let id = sqlx::query(
            "INSERT INTO member_speciality (member_id, speciality_id, preference, comment) VALUES (?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(s.speciality_id)
        .bind(s.preference)
        .bind(&s.comment)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
        ids.specialities.push(id);
    }

    for a in &row.accreditations {
        let id = sqlx::query(
            "INSERT INTO member_accreditation (member_id, accreditation_id, start_on, end_on, comment) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(a.accreditation_id)
        .bind(nullable_str(&a.start_date))
        .bind(nullable_str(&a.end_date))
        .bind(&a.comment)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
        ids.accreditations.push(id);
    }

    for t in &row.tags {
        let id = sqlx::query("INSERT INTO member_tag (member_id, tag_id) VALUES (?, ?)")
            .bind(member_id)
            .bind(t.tag_id)
            .execute(&mut **tx)
            .await?
            .last_insert_rowid();
        ids.tags.push(id);
    }

    for c in &row.contacts {
        let id = sqlx::query(
            r#"
            INSERT INTO member_contact (
                member_id, contact_type_id, country_id, address1, address2, address3,
                locality, state, postcode, phone, fax, email, web
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(member_id)
        .bind(c.contact_type_id)
        .bind(nullable_id(c.country_id))
        .bind(&c.address1)
        .bind(&c.address2)
        .bind(&c.address3)
        .bind(&c.locality)
        .bind(&c.state)
        .bind(&c.postcode)
        .bind(&c.phone)
        .bind(&c.fax)
        .bind(&c.email)
        .bind(&c.web)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
        ids.contacts.push(id);
    }

    if let Some(app) = &row.application {
        let id = sqlx::query(
            r#"
            INSERT INTO application (
                member_id, nominator_id, nominator_info, seconder_id, membership_title_id,
                applied_on, comment
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(member_id)
        .bind(nullable_id(app.nominator_id))
        .bind(&app.nominator_info)
        .bind(nullable_id(app.seconder_id))
        .bind(nullable_id(app.membership_title_id))
        .bind(&app.applied_on)
        .bind(&app.comment)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
        ids.application = Some(id);
    }

    Ok(ids)
}

fn apply_ids(row: &mut MemberRow, ids: AssignedIds) {
    let member_id = ids.member;
    row.id = member_id;
    for (r, id) in row.qualifications.iter_mut().zip(ids.qualifications) {
        r.id = id;
        r.member_id = member_id;
    }
    for (r, id) in row.positions.iter_mut().zip(ids.positions) {
        r.id = id;
        r.member_id = member_id;
    }
    for (r, id) in row.specialities.iter_mut().zip(ids.specialities) {
        r.id = id;
        r.member_id = member_id;
    }
    for (r, id) in row.accreditations.iter_mut().zip(ids.accreditations) {
        r.id = id;
        r.member_id = member_id;
    }
    for (r, id) in row.tags.iter_mut().zip(ids.tags) {
        r.id = id;
        r.member_id = member_id;
    }
    for (r, id) in row.contacts.iter_mut().zip(ids.contacts) {
        r.id = id;
        r.member_id = member_id;
    }
    if let (Some(app), Some(id)) = (row.application.as_mut(), ids.application) {
        app.id = id;
        app.member_id = member_id;
    }
}
