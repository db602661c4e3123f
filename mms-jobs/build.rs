//! Stamps the mms-jobs binary with its build identity
//!
//! `main` logs these at startup so a batch run's log can be traced back to
//! the exact build that produced it.

use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    let stamps = [
        ("GIT_HASH", short_commit().unwrap_or_else(|| UNKNOWN.into())),
        (
            "BUILD_TIMESTAMP",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ),
        ("BUILD_PROFILE", std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.into())),
    ];

    for (name, value) in stamps {
        println!("cargo:rustc-env={}={}", name, value);
    }
}

/// Abbreviated HEAD commit, or `None` outside a git checkout
fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_owned()).filter(|h| !h.is_empty())
}
