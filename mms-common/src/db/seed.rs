//! Reference data seeded on every start (INSERT OR IGNORE)

use sqlx::SqlitePool;
use tracing::debug;

use crate::Result;

/// Position ids for council affiliations
pub const POSITION_FIRST_COUNCIL: i64 = 1;
pub const POSITION_SECOND_COUNCIL: i64 = 2;
pub const POSITION_THIRD_COUNCIL: i64 = 3;

/// Tag applied to advanced trainees on application
pub const TAG_ADVANCED_TRAINEE: i64 = 4;

const SEED: &[(&str, &[(i64, &str)])] = &[
    (
        "country",
        &[(14, "Australia"), (17, "New Zealand"), (30, "Singapore"), (44, "United Kingdom")],
    ),
    ("name_prefix", &[(1, "Mr"), (2, "Mrs"), (3, "Ms"), (4, "Dr"), (5, "Prof"), (6, "A/Prof")]),
    (
        "contact_type",
        &[(1, "mail"), (2, "directory"), (3, "work"), (4, "home")],
    ),
    (
        "membership_title",
        &[(1, "Associate"), (2, "Ordinary"), (3, "Fellow"), (4, "Honorary"), (5, "Affiliate")],
    ),
    (
        "membership_status",
        &[(1, "Applicant"), (2, "Active"), (3, "Inactive"), (4, "Resigned"), (5, "Deceased")],
    ),
    (
        "qualification",
        &[
            (1, "Bachelor of Medicine, Bachelor of Surgery"),
            (2, "Doctor of Philosophy"),
            (3, "Bachelor of Science"),
            (4, "Bachelor of Nursing"),
            (5, "Graduate Certificate"),
            (6, "Master of Public Health"),
        ],
    ),
    (
        "position",
        &[
            (1, "First Council Affiliation"),
            (2, "Second Council Affiliation"),
            (3, "Third Council Affiliation"),
            (4, "Board Member"),
            (5, "Committee Member"),
        ],
    ),
    (
        "speciality",
        &[
            (1, "Cardiac Care Nurse (Medical)"),
            (2, "Cardiac Cath Lab Nurse"),
            (3, "Cardiac Technologist"),
            (4, "Electrophysiology and Pacing"),
            (5, "General Cardiology"),
            (36, "Physiotherapist"),
            (39, "Rehab Nurse"),
            (41, "Statistician"),
        ],
    ),
    (
        "accreditation",
        &[(1, "Echocardiography"), (2, "Coronary Angiography"), (3, "Cardiac CT")],
    ),
    (
        "tag",
        &[(1, "Journal Subscriber"), (2, "Council Member"), (3, "Life Member"), (4, "Advanced Trainee")],
    ),
    (
        "subscription",
        &[(1, "Associate Membership"), (2, "Ordinary Membership"), (3, "Fellow Membership")],
    ),
    ("note_type", &[(1, "General"), (2, "System"), (3, "Application")]),
    ("issue_category", &[(1, "Membership"), (2, "Finance")]),
    ("cpd_activity", &[(1, "Conference attendance"), (2, "Journal reading"), (3, "Teaching")]),
];

/// Seed every reference table
pub async fn seed_reference_data(pool: &SqlitePool) -> Result<()> {
    for (table, rows) in SEED {
        for (id, name) in rows.iter() {
            sqlx::query(&format!("INSERT OR IGNORE INTO {} (id, name) VALUES (?, ?)", table))
                .bind(id)
                .bind(name)
                .execute(pool)
                .await?;
        }
    }

    for (id, category_id, name) in [
        (1, 1, "Application incomplete"),
        (2, 1, "Nominator not financial"),
        (3, 2, "Invoice overdue"),
        (4, 2, "Payment query"),
    ] {
        sqlx::query("INSERT OR IGNORE INTO issue_type (id, issue_category_id, name) VALUES (?, ?, ?)")
            .bind(id)
            .bind(category_id)
            .bind(name)
            .execute(pool)
            .await?;
    }

    for (id, activity_id, name) in [
        (1, 1, "Scientific meeting"),
        (2, 1, "Workshop"),
        (3, 2, "Peer-reviewed journal"),
        (4, 3, "Lecture"),
    ] {
        sqlx::query(
            "INSERT OR IGNORE INTO cpd_activity_type (id, cpd_activity_id, name) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(activity_id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    debug!("Reference data seeded");
    Ok(())
}
