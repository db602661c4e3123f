//! Table definitions for the relational store
//!
//! Reference tables are keyed by explicit ids; entity and junction tables use
//! AUTOINCREMENT so identifiers are only ever assigned by the store.

use sqlx::SqlitePool;

use crate::Result;

/// Every table created by [`create_tables`], in creation order
pub const TABLE_NAMES: &[&str] = &[
    "country",
    "name_prefix",
    "organisation",
    "qualification",
    "position",
    "speciality",
    "accreditation",
    "tag",
    "contact_type",
    "membership_title",
    "membership_status",
    "member",
    "member_qualification",
    "member_position",
    "member_speciality",
    "member_accreditation",
    "member_tag",
    "member_contact",
    "member_title",
    "member_status",
    "application",
    "subscription",
    "invoice",
    "note_type",
    "note",
    "note_association",
    "note_attachment",
    "issue_category",
    "issue_type",
    "issue",
    "issue_association",
    "cpd_activity",
    "cpd_activity_type",
    "member_activity",
    "resource",
];

const REFERENCE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS country (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS name_prefix (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS organisation (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER REFERENCES organisation(id),
    type_id INTEGER,
    code TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    phone TEXT NOT NULL DEFAULT '',
    fax TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    web TEXT NOT NULL DEFAULT '',
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS qualification (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS position (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS speciality (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS accreditation (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS contact_type (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS membership_title (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS membership_status (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS subscription (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note_type (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issue_category (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS issue_type (
    id INTEGER PRIMARY KEY,
    issue_category_id INTEGER NOT NULL REFERENCES issue_category(id),
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS cpd_activity (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    unit_credit REAL NOT NULL DEFAULT 1.0,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS cpd_activity_type (
    id INTEGER PRIMARY KEY,
    cpd_activity_id INTEGER NOT NULL REFERENCES cpd_activity(id),
    name TEXT NOT NULL
);
"#;

const MEMBER_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS member (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    role_id INTEGER NOT NULL DEFAULT 1,
    name_prefix_id INTEGER REFERENCES name_prefix(id),
    country_id INTEGER REFERENCES country(id),
    active INTEGER NOT NULL DEFAULT 1,
    consent_directory INTEGER NOT NULL DEFAULT 0,
    consent_contact INTEGER NOT NULL DEFAULT 0,
    date_of_birth TEXT,
    date_of_entry TEXT,
    gender TEXT,
    first_name TEXT NOT NULL,
    middle_names TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL,
    suffix TEXT NOT NULL DEFAULT '',
    qualifications_other TEXT NOT NULL DEFAULT '',
    mobile_phone TEXT NOT NULL DEFAULT '',
    primary_email TEXT NOT NULL DEFAULT '',
    secondary_email TEXT NOT NULL DEFAULT '',
    journal_number TEXT NOT NULL DEFAULT '',
    bpay_number TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS member_qualification (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    qualification_id INTEGER NOT NULL REFERENCES qualification(id),
    organisation_id INTEGER REFERENCES organisation(id),
    year INTEGER,
    abbreviation TEXT NOT NULL DEFAULT '',
    comment TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS member_position (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    position_id INTEGER NOT NULL REFERENCES position(id),
    organisation_id INTEGER REFERENCES organisation(id),
    start_on TEXT,
    end_on TEXT,
    comment TEXT NOT NULL DEFAULT '',
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS member_speciality (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    speciality_id INTEGER NOT NULL REFERENCES speciality(id),
    preference INTEGER NOT NULL DEFAULT 0,
    comment TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS member_accreditation (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    accreditation_id INTEGER NOT NULL REFERENCES accreditation(id),
    start_on TEXT,
    end_on TEXT,
    comment TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS member_tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    tag_id INTEGER NOT NULL REFERENCES tag(id)
);

CREATE TABLE IF NOT EXISTS member_contact (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    contact_type_id INTEGER NOT NULL REFERENCES contact_type(id),
    country_id INTEGER REFERENCES country(id),
    address1 TEXT NOT NULL DEFAULT '',
    address2 TEXT NOT NULL DEFAULT '',
    address3 TEXT NOT NULL DEFAULT '',
    locality TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT '',
    postcode TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    fax TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    web TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS member_title (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    membership_title_id INTEGER NOT NULL REFERENCES membership_title(id),
    granted_on TEXT,
    comment TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS member_status (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    membership_status_id INTEGER NOT NULL REFERENCES membership_status(id),
    comment TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

const WORKFLOW_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS application (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    nominator_id INTEGER REFERENCES member(id),
    nominator_info TEXT NOT NULL DEFAULT '',
    seconder_id INTEGER REFERENCES member(id),
    membership_title_id INTEGER REFERENCES membership_title(id),
    applied_on TEXT NOT NULL,
    result INTEGER NOT NULL DEFAULT -1,
    comment TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS invoice (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    subscription_id INTEGER NOT NULL REFERENCES subscription(id),
    invoiced_on TEXT NOT NULL,
    last_sent_at TEXT,
    due_on TEXT NOT NULL,
    start_on TEXT NOT NULL,
    end_on TEXT NOT NULL,
    invoice_total REAL NOT NULL DEFAULT 0,
    paid INTEGER NOT NULL DEFAULT 0,
    comment TEXT NOT NULL DEFAULT '',
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS note (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_type_id INTEGER NOT NULL REFERENCES note_type(id),
    effective_on TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    note TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS note_association (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES note(id),
    member_id INTEGER NOT NULL REFERENCES member(id),
    association TEXT,
    association_entity_id INTEGER
);

CREATE TABLE IF NOT EXISTS note_attachment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES note(id),
    name TEXT NOT NULL,
    url TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_type_id INTEGER NOT NULL REFERENCES issue_type(id),
    resolved INTEGER NOT NULL DEFAULT 0,
    member_visible INTEGER NOT NULL DEFAULT 0,
    description TEXT NOT NULL,
    required_action TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS issue_association (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_id INTEGER NOT NULL REFERENCES issue(id),
    member_id INTEGER NOT NULL REFERENCES member(id),
    association TEXT,
    association_entity_id INTEGER
);

CREATE TABLE IF NOT EXISTS member_activity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES member(id),
    cpd_activity_id INTEGER NOT NULL REFERENCES cpd_activity(id),
    cpd_activity_type_id INTEGER REFERENCES cpd_activity_type(id),
    activity_on TEXT NOT NULL,
    quantity REAL NOT NULL DEFAULT 0,
    unit_credit REAL NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT '',
    evidence INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS resource (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_type TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    keywords TEXT NOT NULL DEFAULT '',
    resource_url TEXT NOT NULL DEFAULT '',
    published_on TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Create every table (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    for block in [REFERENCE_TABLES, MEMBER_TABLES, WORKFLOW_TABLES] {
        for statement in block.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(pool).await?;
        }
    }
    Ok(())
}
