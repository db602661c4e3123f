//! Member aggregate reader
//!
//! One query for the member row, then one query per child collection. The
//! first failing query aborts the read; no partial aggregate is returned.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{
    Accreditation, Contact, Location, Member, Membership, Position, Qualification, Speciality,
    StatusEntry, Tag, TitleEntry,
};
use crate::{time, Error, Result};

/// Load the full member aggregate
///
/// Returns [`Error::NotFound`] when no member row has this id.
pub async fn member_by_id(pool: &SqlitePool, id: i64) -> Result<Member> {
    let row = sqlx::query(
        r#"
        SELECT m.id, m.created_at, m.updated_at, m.active,
               m.consent_directory, m.consent_contact,
               m.date_of_birth, m.date_of_entry, m.gender,
               m.first_name, m.middle_names, m.last_name, m.suffix,
               m.qualifications_other, m.mobile_phone,
               m.primary_email, m.secondary_email,
               m.journal_number, m.bpay_number,
               COALESCE(np.name, '') AS title,
               COALESCE(c.name, '') AS country
        FROM member m
        LEFT JOIN name_prefix np ON np.id = m.name_prefix_id
        LEFT JOIN country c ON c.id = m.country_id
        WHERE m.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("member id {}", id)))?;

    let middle_names: String = row.get("middle_names");
    let mut member = Member {
        id: row.get("id"),
        created_at: time::parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: time::parse_timestamp(&row.get::<String, _>("updated_at"))?,
        active: row.get("active"),
        title: row.get("title"),
        first_name: row.get("first_name"),
        middle_names: middle_names.split_whitespace().map(String::from).collect(),
        last_name: row.get("last_name"),
        post_nominal: row.get("suffix"),
        gender: row.get::<Option<String>, _>("gender").unwrap_or_default(),
        date_of_birth: opt_date(row.get("date_of_birth"))?,
        date_of_entry: opt_date(row.get("date_of_entry"))?,
        country: row.get("country"),
        journal_number: row.get("journal_number"),
        bpay_number: row.get("bpay_number"),
        consent_directory: row.get("consent_directory"),
        consent_contact: row.get("consent_contact"),
        qualifications_info: row.get("qualifications_other"),
        contact: Contact {
            email_primary: row.get("primary_email"),
            email_secondary: row.get("secondary_email"),
            mobile: row.get("mobile_phone"),
            locations: Vec::new(),
        },
        ..Default::default()
    };

    member.contact.locations = contact_locations(pool, id).await?;
    member.memberships = memberships(pool, id).await?;
    member.qualifications = qualifications(pool, id).await?;
    member.positions = positions(pool, id).await?;
    member.specialities = specialities(pool, id).await?;
    member.accreditations = accreditations(pool, id).await?;
    member.tags = tags(pool, id).await?;

    debug!(member_id = id, "Loaded member aggregate");
    Ok(member)
}

/// All member ids in ascending order
pub async fn member_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT id FROM member ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Ids of members whose row was updated at or after `since`
pub async fn member_ids_updated_since(pool: &SqlitePool, since: DateTime<Utc>) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT id FROM member WHERE updated_at >= ? ORDER BY id")
        .bind(time::to_sql(&since))
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

pub(crate) fn opt_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    match value {
        Some(s) if !s.trim().is_empty() => time::parse_date(&s).map(Some),
        _ => Ok(None),
    }
}

async fn contact_locations(pool: &SqlitePool, member_id: i64) -> Result<Vec<Location>> {
    let rows = sqlx::query(
        r#"
        SELECT ct.name AS kind, mc.address1, mc.address2, mc.address3,
               mc.locality, mc.state, mc.postcode,
               COALESCE(c.name, '') AS country,
               mc.phone, mc.fax, mc.email, mc.web
        FROM member_contact mc
        JOIN contact_type ct ON ct.id = mc.contact_type_id
        LEFT JOIN country c ON c.id = mc.country_id
        WHERE mc.member_id = ?
        ORDER BY mc.id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Location {
            kind: r.get("kind"),
            address: ["address1", "address2", "address3"]
                .iter()
                .map(|col| r.get::<String, _>(*col))
                .filter(|line| !line.trim().is_empty())
                .collect(),
            city: r.get("locality"),
            state: r.get("state"),
            postcode: r.get("postcode"),
            country: r.get("country"),
            phone: r.get("phone"),
            fax: r.get("fax"),
            email: r.get("email"),
            web: r.get("web"),
        })
        .collect())
}

async fn memberships(pool: &SqlitePool, member_id: i64) -> Result<Vec<Membership>> {
    let title_rows = sqlx::query(
        r#"
        SELECT mt.granted_on, t.name, mt.comment
        FROM member_title mt
        JOIN membership_title t ON t.id = mt.membership_title_id
        WHERE mt.member_id = ?
        ORDER BY mt.id DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    let status_rows = sqlx::query(
        r#"
        SELECT ms.created_at, s.name, ms.comment
        FROM member_status ms
        JOIN membership_status s ON s.id = ms.membership_status_id
        WHERE ms.member_id = ?
        ORDER BY ms.id DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    if title_rows.is_empty() && status_rows.is_empty() {
        return Ok(Vec::new());
    }

    let title_history = title_rows
        .iter()
        .map(|r| {
            Ok(TitleEntry {
                date: opt_date(r.get("granted_on"))?,
                title: r.get("name"),
                comment: r.get("comment"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let status_history = status_rows
        .iter()
        .map(|r| {
            Ok(StatusEntry {
                date: opt_date(r.get("created_at"))?,
                status: r.get("name"),
                comment: r.get("comment"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(vec![Membership {
        title: title_history.first().map(|t| t.title.clone()).unwrap_or_default(),
        status: status_history.first().map(|s| s.status.clone()).unwrap_or_default(),
        title_history,
        status_history,
    }])
}

async fn qualifications(pool: &SqlitePool, member_id: i64) -> Result<Vec<Qualification>> {
    let rows = sqlx::query(
        r#"
        SELECT mq.qualification_id, q.name, mq.abbreviation, mq.organisation_id,
               COALESCE(o.name, '') AS organisation_name, mq.year, mq.comment
        FROM member_qualification mq
        JOIN qualification q ON q.id = mq.qualification_id
        LEFT JOIN organisation o ON o.id = mq.organisation_id
        WHERE mq.member_id = ?
        ORDER BY mq.id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Qualification {
            id: r.get("qualification_id"),
            name: r.get("name"),
            abbreviation: r.get("abbreviation"),
            organisation_id: r.get("organisation_id"),
            organisation_name: r.get("organisation_name"),
            year: r.get("year"),
            comment: r.get("comment"),
        })
        .collect())
}

async fn positions(pool: &SqlitePool, member_id: i64) -> Result<Vec<Position>> {
    let rows = sqlx::query(
        r#"
        SELECT mp.position_id, p.name, mp.organisation_id,
               COALESCE(o.name, '') AS organisation_name,
               mp.start_on, mp.end_on, mp.comment
        FROM member_position mp
        JOIN position p ON p.id = mp.position_id
        LEFT JOIN organisation o ON o.id = mp.organisation_id
        WHERE mp.member_id = ?
        ORDER BY mp.id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(position_from_row).collect()
}

fn position_from_row(r: &SqliteRow) -> Result<Position> {
    Ok(Position {
        id: r.get("position_id"),
        name: r.get("name"),
        organisation_id: r.get("organisation_id"),
        organisation_name: r.get("organisation_name"),
        start: opt_date(r.get("start_on"))?,
        end: opt_date(r.get("end_on"))?,
        comment: r.get("comment"),
    })
}

async fn specialities(pool: &SqlitePool, member_id: i64) -> Result<Vec<Speciality>> {
    let rows = sqlx::query(
        r#"
        SELECT ms.speciality_id, s.name, ms.preference, ms.comment
        FROM member_speciality ms
        JOIN speciality s ON s.id = ms.speciality_id
        WHERE ms.member_id = ?
        ORDER BY ms.preference ASC, ms.id ASC
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Speciality {
            id: r.get("speciality_id"),
            name: r.get("name"),
            preference: r.get("preference"),
            comment: r.get("comment"),
        })
        .collect())
}

async fn accreditations(pool: &SqlitePool, member_id: i64) -> Result<Vec<Accreditation>> {
    let rows = sqlx::query(
        r#"
        SELECT ma.accreditation_id, a.name, ma.start_on, ma.end_on, ma.comment
        FROM member_accreditation ma
        JOIN accreditation a ON a.id = ma.accreditation_id
        WHERE ma.member_id = ?
        ORDER BY ma.id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(Accreditation {
                id: r.get("accreditation_id"),
                name: r.get("name"),
                start: opt_date(r.get("start_on"))?,
                end: opt_date(r.get("end_on"))?,
                comment: r.get("comment"),
            })
        })
        .collect()
}

async fn tags(pool: &SqlitePool, member_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT mt.tag_id, t.name
        FROM member_tag mt
        JOIN tag t ON t.id = mt.tag_id
        WHERE mt.member_id = ?
        ORDER BY mt.id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Tag {
            id: r.get("tag_id"),
            name: r.get("name"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_missing_member_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = member_by_id(&pool, 404).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_member_without_children() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO member (first_name, last_name, middle_names) VALUES ('Jo', 'Bloggs', ' A  B ')")
            .execute(&pool)
            .await
            .unwrap();

        let m = member_by_id(&pool, 1).await.unwrap();
        assert_eq!(m.full_name(), "Jo A B Bloggs");
        assert!(m.memberships.is_empty());
        assert!(m.specialities.is_empty());
        assert_eq!(m.title, "");
        assert_eq!(member_ids(&pool).await.unwrap(), vec![1]);
    }

    #[test]
    fn test_opt_date() {
        assert_eq!(opt_date(None).unwrap(), None);
        assert_eq!(opt_date(Some(String::new())).unwrap(), None);
        assert!(opt_date(Some("2019-02-01".into())).unwrap().is_some());
    }
}
