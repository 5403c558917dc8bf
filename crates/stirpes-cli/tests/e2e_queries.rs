//! E2E CLI tests covering:
//! - `stirpes check` on the demo scenario and on a scenario that fails
//! - `stirpes ownership`, `timeline`, `explain`, and `ledger` queries
//! - Output mode resolution from flags and project config
//! - Project `[jurisdiction]` config feeding the rule set
//!
//! Each test runs the binary as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn demo() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/smith-family.toml")
}

/// Build a Command targeting the stirpes binary, rooted in `dir` with no
/// user config and no `FORMAT` override.
fn stirpes_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stirpes"));
    cmd.current_dir(dir);
    cmd.env("STIRPES_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("RUST_BACKTRACE");
    cmd.env_remove("RUST_LIB_BACKTRACE");
    cmd
}

/// The first JSON value on stderr. Anything the process writes after the
/// structured error (such as a backtrace) is ignored.
fn stderr_json(stderr: &[u8]) -> Value {
    let stderr = String::from_utf8_lossy(stderr);
    let start = stderr.find('{').expect("JSON error on stderr");
    serde_json::Deserializer::from_str(&stderr[start..])
        .into_iter::<Value>()
        .next()
        .expect("a JSON value on stderr")
        .expect("error JSON")
}

/// Run a query with `--json` and parse stdout.
fn json_of(dir: &Path, args: &[&str]) -> Value {
    let output = stirpes_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("command should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

fn demo_arg() -> String {
    demo().display().to_string()
}

/// Holdings of a rendered snapshot as `(person, fraction)` pairs.
fn holdings(snapshot: &Value) -> Vec<(String, String)> {
    snapshot["holdings"]
        .as_array()
        .expect("holdings array")
        .iter()
        .map(|h| {
            (
                h["person"].as_str().expect("person").to_string(),
                h["fraction"].as_str().expect("fraction").to_string(),
            )
        })
        .collect()
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(p, f)| ((*p).to_string(), (*f).to_string()))
        .collect()
}

const OVERDRAWN: &str = r#"
title = "Overdrawn"

[[people]]
id = "ann"
name = "Ann Lee"
birth = 1950

[[people]]
id = "ben"
name = "Ben Lee"
birth = 1975

[[people]]
id = "carl"
name = "Carl Lee"
birth = 1978

[initial_ownership]
ann = "1"

[[events]]
id = "deed_1"
type = "deed"
date = "2010-01-01"
source = "ann"
recipients = [{ person = "ben", fraction = "1/2" }]

[[events]]
id = "deed_2"
type = "deed"
date = "2011-01-01"
source = "ben"
recipients = [
    { person = "carl", fraction = "3/4" },
    { person = "ann", fraction = "1/2" },
]
"#;

fn write_scenario(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).expect("write scenario");
    path.display().to_string()
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_demo_succeeds_in_text_mode() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["check", &demo_arg(), "--format", "text"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ok\ttrue")
                .and(predicate::str::contains("applied\t4/4"))
                .and(predicate::str::contains("transfers\t3"))
                .and(predicate::str::contains("warnings\t3"))
                .and(predicate::str::contains("holding\tdavid\t1/16")),
        );
}

#[test]
fn check_demo_json_reports_warnings_for_frank() {
    let dir = TempDir::new().expect("tempdir");
    let report = json_of(dir.path(), &["check", &demo_arg()]);

    assert_eq!(report["ok"], true);
    assert_eq!(report["title"], "Smith family, 123 Oak Street");
    assert_eq!(report["people"], 9);
    assert_eq!(report["applied"], 4);

    let warnings = report["warnings"].as_array().expect("warnings");
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|w| w["event_id"] == "death_frank_2021"));
    let kinds: Vec<&str> = warnings.iter().filter_map(|w| w["type"].as_str()).collect();
    assert_eq!(kinds, ["UNKNOWN_CHILDREN", "UNKNOWN_SPOUSE", "UNKNOWN_PARENT"]);
}

#[test]
fn check_reports_the_failing_event_and_code() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_scenario(dir.path(), "overdrawn.toml", OVERDRAWN);

    stirpes_cmd(dir.path())
        .args(["check", &path, "--format", "text"])
        .assert()
        .failure()
        .stdout(
            predicate::str::contains("ok\tfalse")
                .and(predicate::str::contains("applied\t1/2"))
                .and(predicate::str::contains("holding\tben\t1/2")),
        )
        .stderr(
            predicate::str::contains("error[E3001]")
                .and(predicate::str::contains("deed_2"))
                .and(predicate::str::contains("at event #2")),
        );
}

#[test]
fn check_failure_json_error_is_structured() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_scenario(dir.path(), "overdrawn.toml", OVERDRAWN);

    let output = stirpes_cmd(dir.path())
        .args(["check", &path, "--json"])
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("partial report JSON");
    assert_eq!(report["ok"], false);
    assert_eq!(report["applied"], 1);

    let error = stderr_json(&output.stderr);
    assert_eq!(error["error"]["error_code"], "E3001");
    assert_eq!(error["error"]["event_id"], "deed_2");
    assert_eq!(error["error"]["event_index"], 1);
}

#[test]
fn missing_scenario_file_fails_with_scenario_code() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["check", "nope.toml", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E5001").and(predicate::str::contains("nope.toml")));
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[test]
fn ownership_defaults_to_after_the_last_event() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["ownership", &demo_arg(), "--format", "text"])
        .assert()
        .success()
        .stdout("alice\t3/8\ncharlie\t1/8\ndavid\t1/16\nemma\t1/16\nsusan\t3/8\n");
}

#[test]
fn ownership_at_a_date_includes_that_days_events() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = json_of(dir.path(), &["ownership", &demo_arg(), "--at", "2015-06-01"]);
    assert_eq!(snapshot["at"], "2015-06-01");
    assert_eq!(snapshot["after_event"], "deed_2015");
    assert_eq!(holdings(&snapshot), pairs(&[("alice", "1/4"), ("john", "3/4")]));

    let before = json_of(dir.path(), &["ownership", &demo_arg(), "--at", "2015-05-31"]);
    assert!(before.get("after_event").is_none());
    assert_eq!(holdings(&before), pairs(&[("john", "1")]));
}

#[test]
fn ownership_after_johns_death_splits_bobs_line_in_thirds() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = json_of(dir.path(), &["ownership", &demo_arg(), "--at", "2020-09-21"]);
    assert_eq!(
        holdings(&snapshot),
        pairs(&[
            ("alice", "3/8"),
            ("charlie", "1/8"),
            ("david", "1/24"),
            ("emma", "1/24"),
            ("frank", "1/24"),
            ("susan", "3/8"),
        ])
    );
}

#[test]
fn timeline_filters_by_kind_and_inclusive_range() {
    let dir = TempDir::new().expect("tempdir");
    let rows = json_of(
        dir.path(),
        &[
            "timeline",
            &demo_arg(),
            "--kind",
            "death",
            "--from",
            "2018-03-10",
            "--to",
            "2020-09-20",
        ],
    );
    let rows = rows.as_array().expect("array");
    let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, ["death_bob_2018", "death_john_2020"]);
    assert_eq!(rows[0]["transfer"], false);
    assert_eq!(rows[1]["transfer"], true);
    assert_eq!(rows[1]["type"], "death");
}

#[test]
fn timeline_text_lists_every_event() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["timeline", &demo_arg(), "--format", "text"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("DATE\tTYPE\tID\tSOURCE\tRECIPIENTS\tWARNINGS\n")
                .and(predicate::str::contains("2015-06-01\tdeed\tdeed_2015\tjohn\t1\t0"))
                .and(predicate::str::contains("2021-05-15\tdeath\tdeath_frank_2021\tfrank\t2\t3")),
        );
}

#[test]
fn timeline_rejects_an_inverted_range() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["timeline", &demo_arg(), "--from", "2021-01-01", "--to", "2020-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is after"));
}

#[test]
fn timeline_inverted_range_error_is_structured_json() {
    let dir = TempDir::new().expect("tempdir");
    let output = stirpes_cmd(dir.path())
        .args(["timeline", &demo_arg(), "--from", "2021-01-01", "--to", "2020-01-01", "--json"])
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let error = stderr_json(&output.stderr);
    assert_eq!(error["error"]["message"], "--from 2021-01-01 is after --to 2020-01-01");
    assert!(error["error"]["suggestion"].as_str().is_some());
}

#[test]
fn explain_shows_per_stirpes_passthrough() {
    let dir = TempDir::new().expect("tempdir");
    let trail = json_of(dir.path(), &["explain", &demo_arg(), "death_john_2020"]);

    assert_eq!(trail["rule"], "spouse_and_descendants");
    assert_eq!(trail["source_share_before"], "3/4");
    assert_eq!(trail["legal_basis"]["statute"], "N.C. Gen. Stat. § 29-15");

    let recipients = trail["recipients"].as_array().expect("recipients");
    let bob = recipients
        .iter()
        .find(|r| r["person"] == "bob")
        .expect("bob is listed");
    assert_eq!(bob["deceased"], true);
    assert_eq!(bob["fraction"], "1/8");
    let substitutes: Vec<(&str, &str)> = bob["passthrough"]
        .as_array()
        .expect("passthrough")
        .iter()
        .filter_map(|a| Some((a["person"].as_str()?, a["fraction"].as_str()?)))
        .collect();
    assert_eq!(
        substitutes,
        [("david", "1/24"), ("emma", "1/24"), ("frank", "1/24")]
    );
}

#[test]
fn explain_pretty_prints_the_deed_document() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["explain", &demo_arg(), "deed_2015", "--format", "pretty"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Warranty Deed")
                .and(predicate::str::contains("Love and affection"))
                .and(predicate::str::contains("Alice Smith (alice)")),
        );
}

#[test]
fn explain_unknown_event_fails() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["explain", &demo_arg(), "death_nobody", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E4003]").and(predicate::str::contains("death_nobody")));
}

#[test]
fn ledger_lists_initial_and_every_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let rows = json_of(dir.path(), &["ledger", &demo_arg()]);
    let rows = rows.as_array().expect("array");

    assert_eq!(rows.len(), 5);
    assert!(rows[0]["event_id"].is_null());
    assert_eq!(holdings(&rows[0]), pairs(&[("john", "1")]));
    // Bob's death moves nothing.
    assert_eq!(holdings(&rows[1]), holdings(&rows[2]));
    assert_eq!(rows[4]["event_id"], "death_frank_2021");
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn project_config_sets_output_mode() {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join(".stirpes")).expect("mkdir");
    fs::write(dir.path().join(".stirpes/config.toml"), "output = \"json\"\n").expect("write config");

    let output = stirpes_cmd(dir.path())
        .args(["ownership", &demo_arg()])
        .output()
        .expect("command should not crash");
    assert!(output.status.success());
    let snapshot: Value = serde_json::from_slice(&output.stdout).expect("config selects JSON");
    assert!(snapshot["holdings"].is_array());
}

#[test]
fn project_jurisdiction_changes_the_spouse_share() {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join(".stirpes")).expect("mkdir");
    fs::write(
        dir.path().join(".stirpes/config.toml"),
        "[jurisdiction]\nname = \"One third to the spouse\"\nspouse_share_with_descendants = \"1/3\"\n",
    )
    .expect("write config");

    // John's 3/4: Susan takes 1/4; each of the three children lines 1/6.
    let snapshot = json_of(dir.path(), &["ownership", &demo_arg(), "--at", "2020-09-21"]);
    assert_eq!(
        holdings(&snapshot),
        pairs(&[
            ("alice", "5/12"),
            ("charlie", "1/6"),
            ("david", "1/18"),
            ("emma", "1/18"),
            ("frank", "1/18"),
            ("susan", "1/4"),
        ])
    );

    let report = json_of(dir.path(), &["check", &demo_arg()]);
    assert_eq!(report["jurisdiction"], "One third to the spouse");
}

#[test]
fn help_lists_examples() {
    let dir = TempDir::new().expect("tempdir");
    stirpes_cmd(dir.path())
        .args(["explain", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXAMPLES:"));
}
