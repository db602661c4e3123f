use sqlx::SqlitePool;
use tracing::warn;

use super::{Cell, Sheet};
use crate::application::Application;
use crate::member::{member_by_id, Member};

pub const APPLICATION_COLUMNS: [&str; 13] = [
    "Application ID",
    "Application date",
    "Member ID",
    "Member name",
    "Nominator ID",
    "Nominator name",
    "Seconder ID",
    "Seconder name",
    "Applied for",
    "Tags",
    "Region",
    "Result",
    "Comment",
];

/// One row per application, with tags and region taken from the applicant
pub async fn application_report(pool: &SqlitePool, applications: &[Application]) -> Sheet {
    let mut sheet = Sheet::new(&APPLICATION_COLUMNS);

    for a in applications {
        let (tags, region) = match member_by_id(pool, a.member_id).await {
            Ok(m) => (tag_names(&m), region(&m)),
            Err(e) => {
                warn!(application_id = a.id, member_id = a.member_id, error = %e, "Member lookup failed");
                sheet.add_error(a.id, format!("member lookup for id {} failed: {}", a.member_id, e));
                ("err".to_string(), "err".to_string())
            }
        };

        let row = vec![
            a.id.into(),
            a.date.into(),
            a.member_id.into(),
            a.member.as_str().into(),
            a.nominator_id.filter(|id| *id > 0).into(),
            a.nominator.as_str().into(),
            a.seconder_id.filter(|id| *id > 0).into(),
            a.seconder.as_str().into(),
            a.applied_for.as_str().into(),
            tags.into(),
            region.into(),
            a.status.as_str().into(),
            a.comment.as_str().into(),
        ];
        sheet.push_row(a.id, row);
    }
    sheet
}

fn tag_names(m: &Member) -> String {
    m.tags
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Country plus state and city of the first contact location
fn region(m: &Member) -> String {
    let mut parts = vec![m.country.as_str()];
    if let Some(loc) = m.contact.locations.first() {
        parts.push(loc.state.as_str());
        parts.push(loc.city.as_str());
    }
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationStatus;
    use crate::db::init_memory_database;
    use chrono::NaiveDate;

    fn application(id: i64, member_id: i64) -> Application {
        Application {
            id,
            member_id,
            member: "Applicant".into(),
            nominator_id: Some(3),
            nominator: "Nominator".into(),
            seconder_id: None,
            date: NaiveDate::from_ymd_opt(2019, 2, 1),
            applied_for: "Ordinary".into(),
            status: ApplicationStatus::Pending,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_member_writes_err_cells() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO member (id, first_name, last_name, country_id) VALUES (1, 'Ann', 'Applicant', 14)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO member_tag (member_id, tag_id) VALUES (1, 4)")
            .execute(&pool)
            .await
            .unwrap();

        let sheet = application_report(&pool, &[application(10, 1), application(11, 99)]).await;
        assert_eq!(sheet.row_count(), 2);

        let ok = &sheet.rows()[0];
        assert_eq!(ok[1].render(), "2019-02-01");
        assert_eq!(ok[4], Cell::Int(3));
        assert_eq!(ok[6], Cell::Empty);
        assert_eq!(ok[9].render(), "Advanced Trainee");
        assert_eq!(ok[10].render(), "Australia");
        assert_eq!(ok[11].render(), "pending");

        let missing = &sheet.rows()[1];
        assert_eq!(missing[9].render(), "err");
        assert_eq!(missing[10].render(), "err");
        assert_eq!(sheet.errors().len(), 1);
        assert_eq!(sheet.errors()[0].record_id, 11);
    }
}
