//! Integration tests for the quickdial command line

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Isolated config and contacts file. `echo` stands in for the link opener.
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
    store_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let store_path = temp_dir.path().join("data").join("contacts.json");

        let config = format!(
            "store_path = {:?}\n\n[commands]\nopen = [\"echo\"]\n",
            store_path.to_str().unwrap()
        );
        fs::write(&config_path, config).unwrap();

        Self {
            temp_dir,
            config_path,
            store_path,
        }
    }

    fn with_store(contents: &str) -> Self {
        let env = Self::new();
        fs::create_dir_all(env.store_path.parent().unwrap()).unwrap();
        fs::write(&env.store_path, contents).unwrap();
        env
    }

    fn cmd(&self) -> AssertCommand {
        let mut cmd = quickdial_cmd();
        cmd.arg("--config").arg(&self.config_path);
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Add a contact and return the id printed on stdout.
    fn add(&self, name: &str, phone: &str) -> String {
        let output = self
            .cmd()
            .args(["add", "--name", name, "--phone", phone])
            .output()
            .unwrap();
        assert!(output.status.success(), "add {} failed: {:?}", name, output);
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    fn list(&self, extra: &[&str]) -> String {
        let output = self.cmd().arg("list").args(extra).output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    }

    fn stored(&self) -> serde_json::Value {
        let raw = fs::read_to_string(&self.store_path).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

/// Get the quickdial binary command
fn quickdial_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("quickdial").unwrap()
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_add_favorite_delete_scenario() {
    let env = TestEnv::new();
    let ali = env.add("Ali", "01012345678");
    let sara = env.add("Sara", "01122223333");
    assert_ne!(ali, sara);

    env.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("total: 2"))
        .stdout(predicate::str::contains("favorites: 0"));

    env.cmd()
        .args(["favorite", &sara])
        .assert()
        .success()
        .stdout("favorite: on\n");

    let favorites = env.list(&["--favorites"]);
    assert!(favorites.contains("Sara"));
    assert!(!favorites.contains("Ali"));

    env.cmd()
        .args(["delete", &ali, "--yes"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Deleted! Ali has been deleted."));

    let remaining = env.list(&[]);
    assert_eq!(remaining.lines().count(), 1);
    assert!(remaining.starts_with(&format!("{}\tSara\t01122223333", sara)));

    env.cmd()
        .arg("stats")
        .assert()
        .stdout(predicate::str::contains("total: 1"))
        .stdout(predicate::str::contains("favorites: 1"));
}

#[test]
fn test_duplicate_phone_check() {
    let env = TestEnv::new();
    let ali = env.add("Ali", "01012345678");

    env.cmd()
        .args(["check-phone", "01012345678"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Phone number already exists"));

    env.cmd()
        .args(["check-phone", "01012345678", "--exclude", &ali])
        .assert()
        .success()
        .stdout("ok\n");

    env.cmd()
        .args(["check-phone", "01122223333"])
        .assert()
        .success();

    env.cmd()
        .args(["check-phone", "12345"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("valid Egyptian phone number"));
}

#[test]
fn test_add_without_name_is_rejected() {
    let env = TestEnv::new();
    env.cmd()
        .args(["add", "--name", "   ", "--phone", "01012345678"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Missing Name"));
    assert!(!env.store_path.exists());

    env.cmd()
        .args(["add", "--name", "Ali"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please enter a phone number!"));
}

#[test]
fn test_pattern_rules_only_warn() {
    let env = TestEnv::new();
    env.cmd()
        .args(["add", "--name", "R2D2", "--phone", "12345", "--email", "nope"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: Check input"))
        .stderr(predicate::str::contains("Added! R2D2 has been added successfully."));
}

#[test]
fn test_search_filters_by_name_phone_and_email() {
    let env = TestEnv::new();
    env.add("Ali", "01012345678");
    env.cmd()
        .args([
            "add",
            "--name",
            "Sara",
            "--phone",
            "01122223333",
            "--email",
            "sara@example.com",
        ])
        .assert()
        .success();

    let by_name = env.list(&["SA"]);
    assert!(by_name.contains("Sara") && !by_name.contains("Ali"));

    let by_phone = env.list(&["0101"]);
    assert!(by_phone.contains("Ali") && !by_phone.contains("Sara"));

    let by_email = env.list(&["example.com"]);
    assert!(by_email.contains("Sara"));

    assert_eq!(env.list(&["   "]).lines().count(), 2);
    assert_eq!(env.list(&["zzz"]), "No contacts found\n");
}

#[test]
fn test_empty_sidebars_show_messages() {
    let env = TestEnv::new();
    let ali = env.add("Ali", "01012345678");

    env.cmd().args(["favorite", &ali]).assert().stdout("favorite: on\n");
    env.cmd().args(["favorite", &ali]).assert().stdout("favorite: off\n");

    assert_eq!(env.list(&["--favorites"]), "No favorites yet\n");
    assert_eq!(env.list(&["--emergency"]), "No emergency contacts\n");
}

#[test]
fn test_edit_keeps_identity() {
    let env = TestEnv::new();
    let ali = env.add("Ali", "01012345678");

    env.cmd()
        .args(["edit", &ali, "--name", "Ali Hassan", "--emergency", "true"])
        .assert()
        .success()
        .stdout(format!("{}\n", ali))
        .stderr(predicate::str::contains("Updated!"));

    let stored = env.stored();
    let contacts = stored["contacts"].as_array().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["id"], ali.as_str());
    assert_eq!(contacts[0]["name"], "Ali Hassan");
    assert_eq!(contacts[0]["phone"], "01012345678");
    assert_eq!(contacts[0]["isEmergency"], true);

    env.cmd()
        .args(["edit", "404", "--name", "Nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no contact with id 404"));
}

#[test]
fn test_delete_declined_keeps_contact() {
    let env = TestEnv::new();
    let ali = env.add("Ali", "01012345678");

    env.cmd()
        .args(["delete", &ali])
        .write_stdin("n\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Delete Ali ?"))
        .stderr(predicate::str::contains("Cancelled."));

    assert!(env.list(&[]).contains("Ali"));

    env.cmd()
        .args(["delete", "404", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no contact with id 404"));
}

#[test]
fn test_call_and_email_open_links() {
    let env = TestEnv::new();
    let ali = env.add("Ali", "01012345678");

    env.cmd()
        .args(["call", &ali])
        .assert()
        .success()
        .stdout("tel:01012345678\n");

    env.cmd()
        .args(["email", &ali])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ali has no email address."));

    env.cmd()
        .args(["edit", &ali, "--email", "ali@example.com"])
        .assert()
        .success();
    env.cmd()
        .args(["email", &ali])
        .assert()
        .success()
        .stdout("mailto:ali@example.com\n");
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_legacy_array_is_loaded_and_upgraded() {
    let env = TestEnv::with_store(
        r#"[{"id":"1700000000000","name":"Ali","phone":"01012345678","email":"","isFavorite":true}]"#,
    );

    let listed = env.list(&[]);
    assert_eq!(listed, "1700000000000\tAli\t01012345678\t-\tfavorite\n");

    env.cmd()
        .args(["emergency", "1700000000000"])
        .assert()
        .success()
        .stdout("emergency: on\n");

    let stored = env.stored();
    assert_eq!(stored["version"], 1);
    assert_eq!(stored["contacts"][0]["id"], "1700000000000");
    assert_eq!(stored["contacts"][0]["isFavorite"], true);
    assert!(stored["contacts"][0].get("email").is_none());
}

#[test]
fn test_import_merges_browser_export() {
    let env = TestEnv::new();
    env.add("Ali", "01012345678");

    let export = env.temp_dir.path().join("export.json");
    fs::write(
        &export,
        r#"[
            {"id":"1","name":"Sara","phone":"01122223333","isEmergency":true},
            {"id":"2","name":"","phone":"01555555555"},
            {"id":"3","name":"Bob"},
            {"id":"1","name":"Sara again","phone":"01122223333"}
        ]"#,
    )
    .unwrap();

    env.cmd()
        .arg("import")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 contacts."))
        .stdout(predicate::str::contains("Skipped 3 contacts"));

    assert_eq!(env.list(&["--emergency"]), "1\tSara\t01122223333\t-\temergency\n");
    assert_eq!(env.list(&[]).lines().count(), 2);
}

#[test]
fn test_import_warns_on_phone_shared_within_file() {
    let env = TestEnv::new();
    let export = env.temp_dir.path().join("export.json");
    fs::write(
        &export,
        r#"[
            {"id":"1","name":"Sara","phone":"01122223333"},
            {"id":"2","name":"Sara Work","phone":"01122223333"}
        ]"#,
    )
    .unwrap();

    env.cmd()
        .arg("import")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 contacts."))
        .stderr(predicate::str::contains("shares a phone number"));
}

#[test]
fn test_store_record_without_phone_keeps_the_rest() {
    let original = r#"[{"id":"1","name":"Ali","phone":"01012345678"},{"id":"2","name":"Bob"}]"#;
    let env = TestEnv::with_store(original);

    assert_eq!(env.list(&[]), "1\tAli\t01012345678\t-\t\n");
    env.add("Sara", "01122223333");

    let names: Vec<String> = env.stored()["contacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Ali", "Sara"]);

    let backup = env.store_path.with_file_name("contacts.json.bak");
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
}

#[test]
fn test_newer_schema_survives_first_save() {
    let original = r#"{"version":2,"contacts":[{"id":"1","name":"Ali","phone":"01012345678"}]}"#;
    let env = TestEnv::with_store(original);

    env.cmd()
        .args(["add", "--name", "Sara", "--phone", "01122223333"])
        .assert()
        .success()
        .stderr(predicate::str::contains("contacts.json.bak"));

    let backup = env.store_path.with_file_name("contacts.json.bak");
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
    assert_eq!(env.stored()["version"], 1);
}

#[test]
fn test_corrupt_store_loads_empty() {
    let env = TestEnv::with_store("{not json");
    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout("No contacts found\n")
        .stderr(predicate::str::contains("WARN"));
}

#[test]
fn test_list_json_uses_stored_field_names() {
    let env = TestEnv::new();
    env.add("Ali", "01012345678");

    let raw = env.list(&["--json"]);
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let contacts = value.as_array().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["name"], "Ali");
    assert_eq!(contacts[0]["isFavorite"], false);
    assert_eq!(contacts[0]["isEmergency"], false);
}

#[test]
fn test_store_flag_overrides_config() {
    let env = TestEnv::new();
    let other = env.temp_dir.path().join("other.json");

    env.cmd()
        .arg("--store")
        .arg(&other)
        .args(["add", "--name", "Ali", "--phone", "01012345678"])
        .assert()
        .success();

    assert!(other.exists());
    assert!(!env.store_path.exists());
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    quickdial_cmd()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_custom_phone_pattern() {
    let env = TestEnv::new();
    let mut config = fs::read_to_string(&env.config_path).unwrap();
    config.push_str("\n[validation]\nphone_pattern = '^\\+[0-9]{8,15}$'\n");
    fs::write(&env.config_path, config).unwrap();

    env.cmd()
        .args(["check-phone", "+4915112345678"])
        .assert()
        .success();
    env.cmd()
        .args(["check-phone", "01012345678"])
        .assert()
        .failure();
}
