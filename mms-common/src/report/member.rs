use super::{Cell, Sheet};
use crate::db::seed::{POSITION_FIRST_COUNCIL, POSITION_SECOND_COUNCIL, POSITION_THIRD_COUNCIL};
use crate::member::{Location, Member};

pub const MEMBER_COLUMNS: [&str; 38] = [
    "Member ID",
    "Prefix",
    "First Name",
    "Middle Name(s)",
    "Last Name",
    "Suffix",
    "Gender",
    "Date of Birth",
    "Email (primary)",
    "Email (secondary)",
    "Mobile",
    "Date of Entry",
    "Membership Title",
    "Membership Status",
    "Membership Country",
    "Tags",
    "Journal No.",
    "BPAY No.",
    "Mail Address",
    "Mail Locality",
    "Mail State",
    "Mail Postcode",
    "Mail Country",
    "Directory Address",
    "Directory Locality",
    "Directory State",
    "Directory Postcode",
    "Directory Country",
    "Directory Phone",
    "Directory Fax",
    "Directory Email",
    "Directory Web",
    "First Council",
    "Second Council",
    "Third Council",
    "First Speciality",
    "Second Speciality",
    "Third Speciality",
];

pub const JOURNAL_COLUMNS: [&str; 14] = [
    "Member ID",
    "Journal No.",
    "Prefix",
    "First Name",
    "Last Name",
    "Suffix",
    "Mail Address 1",
    "Mail Address 2",
    "Mail Address 3",
    "Mail Locality",
    "Mail State",
    "Mail Postcode",
    "Mail Country",
    "Email (primary)",
];

const COUNCIL_POSITIONS: [(i64, &str); 3] = [
    (POSITION_FIRST_COUNCIL, "First Council Affiliation"),
    (POSITION_SECOND_COUNCIL, "Second Council Affiliation"),
    (POSITION_THIRD_COUNCIL, "Third Council Affiliation"),
];

/// One row per member with contact, membership, council and speciality detail
pub fn member_report(members: &[Member]) -> Sheet {
    let mut sheet = Sheet::new(&MEMBER_COLUMNS);
    let blank = Location::default();

    for m in members {
        let mail = m.contact_location_by_type("mail").unwrap_or(&blank);
        let dir = m.contact_location_by_type("directory").unwrap_or(&blank);

        let mut row: Vec<Cell> = vec![
            m.id.into(),
            m.title.as_str().into(),
            m.first_name.as_str().into(),
            m.middle_names.join(" ").into(),
            m.last_name.as_str().into(),
            m.post_nominal.as_str().into(),
            m.gender.as_str().into(),
            m.date_of_birth.into(),
            m.contact.email_primary.as_str().into(),
            m.contact.email_secondary.as_str().into(),
            m.contact.mobile.as_str().into(),
            m.date_of_entry.into(),
            m.current_title().into(),
            m.current_status().into(),
            m.country.as_str().into(),
            tag_names(m).into(),
            m.journal_number.as_str().into(),
            m.bpay_number.as_str().into(),
            mail.address.join(" ").into(),
            mail.city.as_str().into(),
            mail.state.as_str().into(),
            mail.postcode.as_str().into(),
            mail.country.as_str().into(),
            dir.address.join(" ").into(),
            dir.city.as_str().into(),
            dir.state.as_str().into(),
            dir.postcode.as_str().into(),
            dir.country.as_str().into(),
            dir.phone.as_str().into(),
            dir.fax.as_str().into(),
            dir.email.as_str().into(),
            dir.web.as_str().into(),
        ];

        for (position_id, name) in COUNCIL_POSITIONS {
            let org = m
                .positions
                .iter()
                .find(|p| p.id == position_id)
                .or_else(|| m.position_by_name(name))
                .map(|p| p.organisation_name.as_str());
            row.push(org.into());
        }

        // Up to three, in preference order
        for i in 0..3 {
            row.push(m.specialities.get(i).map(|s| s.name.as_str()).into());
        }

        sheet.push_row(m.id, row);
    }
    sheet
}

/// Mailing list for journal subscribers: members holding a journal number
pub fn journal_report(members: &[Member]) -> Sheet {
    let mut sheet = Sheet::new(&JOURNAL_COLUMNS);
    let blank = Location::default();

    for m in members.iter().filter(|m| !m.journal_number.trim().is_empty()) {
        let mail = m.contact_location_by_type("mail").unwrap_or(&blank);
        let line = |i: usize| -> Cell { mail.address.get(i).map(String::as_str).into() };

        let row = vec![
            m.id.into(),
            m.journal_number.as_str().into(),
            m.title.as_str().into(),
            m.first_name.as_str().into(),
            m.last_name.as_str().into(),
            m.post_nominal.as_str().into(),
            line(0),
            line(1),
            line(2),
            mail.city.as_str().into(),
            mail.state.as_str().into(),
            mail.postcode.as_str().into(),
            mail.country.as_str().into(),
            m.contact.email_primary.as_str().into(),
        ];
        sheet.push_row(m.id, row);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{Contact, Membership, Position, Speciality, Tag};

    fn member() -> Member {
        Member {
            id: 502,
            title: "Dr".into(),
            first_name: "Michael".into(),
            last_name: "Donnici".into(),
            journal_number: "J-1001".into(),
            tags: vec![
                Tag { id: 1, name: "Journal Subscriber".into() },
                Tag { id: 3, name: "Life Member".into() },
            ],
            contact: Contact {
                email_primary: "m@x.org".into(),
                locations: vec![Location {
                    kind: "Mail".into(),
                    address: vec!["PO Box 1".into(), "Level 2".into()],
                    city: "Sydney".into(),
                    state: "NSW".into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            memberships: vec![Membership { title: "Fellow".into(), status: "Active".into(), ..Default::default() }],
            positions: vec![Position {
                id: POSITION_SECOND_COUNCIL,
                name: "Second Council Affiliation".into(),
                organisation_name: "Heart Failure Council".into(),
                ..Default::default()
            }],
            specialities: vec![
                Speciality { id: 36, name: "Heart Failure".into(), preference: 1, ..Default::default() },
                Speciality { id: 2, name: "Imaging".into(), preference: 2, ..Default::default() },
            ],
            ..Default::default()
        }
    }

    fn col(name: &str) -> usize {
        MEMBER_COLUMNS.iter().position(|c| *c == name).unwrap()
    }

    #[test]
    fn test_member_report_row() {
        let sheet = member_report(&[member()]);
        assert_eq!(sheet.columns().len(), 38);
        assert!(sheet.errors().is_empty());

        let row = &sheet.rows()[0];
        assert_eq!(row.len(), 38);
        assert_eq!(row[col("Member ID")], Cell::Int(502));
        assert_eq!(row[col("Membership Title")].render(), "Fellow");
        assert_eq!(row[col("Tags")].render(), "Journal Subscriber, Life Member");
        assert_eq!(row[col("Mail Address")].render(), "PO Box 1 Level 2");
        assert_eq!(row[col("Directory Locality")], Cell::Text(String::new()));
        assert_eq!(row[col("First Council")], Cell::Empty);
        assert_eq!(row[col("Second Council")].render(), "Heart Failure Council");
        assert_eq!(row[col("First Speciality")].render(), "Heart Failure");
        assert_eq!(row[col("Third Speciality")], Cell::Empty);
    }

    #[test]
    fn test_journal_report_skips_non_subscribers() {
        let mut other = member();
        other.id = 7;
        other.journal_number.clear();

        let sheet = journal_report(&[member(), other]);
        assert_eq!(sheet.row_count(), 1);
        let row = &sheet.rows()[0];
        assert_eq!(row[6].render(), "PO Box 1");
        assert_eq!(row[8], Cell::Empty);
        assert_eq!(row[9].render(), "Sydney");
    }
}
