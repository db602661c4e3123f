use sqlx::SqlitePool;
use tracing::warn;

use super::{labelled, Cell, Sheet};
use crate::member::{member_by_id, Location};
use crate::position::MemberPosition;

pub const POSITION_COLUMNS: [&str; 16] = [
    "ID",
    "Member",
    "Email",
    "Position",
    "Organisation",
    "Start",
    "End",
    "Address 1",
    "Address 2",
    "Address 3",
    "Locality",
    "State",
    "Postcode",
    "Country",
    "Email",
    "Comment",
];

/// One row per position held, with the holder's mail address
pub async fn position_report(pool: &SqlitePool, positions: &[MemberPosition]) -> Sheet {
    let mut sheet = Sheet::new(&POSITION_COLUMNS);

    for p in positions {
        let (mail, contact_email) = match member_by_id(pool, p.member_id).await {
            Ok(m) => {
                let mail = m.contact_location_by_type("mail").cloned();
                if mail.is_none() {
                    sheet.add_error(p.member_id, "member has no mail address");
                }
                (mail.unwrap_or_default(), m.contact.email_primary)
            }
            Err(e) => {
                warn!(member_position_id = p.member_position_id, member_id = p.member_id, error = %e, "Member lookup failed");
                sheet.add_error(p.member_id, format!("error fetching member record: {}", e));
                (Location::default(), String::new())
            }
        };
        let line = |i: usize| -> Cell { mail.address.get(i).map(String::as_str).into() };

        let organisation = match p.organisation_id {
            Some(id) => labelled(&p.organisation_name, id),
            None => p.organisation_name.clone(),
        };

        let row = vec![
            p.member_position_id.into(),
            labelled(&p.member, p.member_id).into(),
            p.email.as_str().into(),
            labelled(&p.name, p.position_id).into(),
            organisation.into(),
            p.start.into(),
            p.end.into(),
            line(0),
            line(1),
            line(2),
            mail.city.as_str().into(),
            mail.state.as_str().into(),
            mail.postcode.as_str().into(),
            mail.country.as_str().into(),
            contact_email.into(),
            p.comment.as_str().into(),
        ];
        sheet.push_row(p.member_position_id, row);
    }
    sheet
}
