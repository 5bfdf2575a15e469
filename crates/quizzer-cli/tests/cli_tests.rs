//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quizzer() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("quizzer").unwrap()
}

/// Write a config with absolute paths inside `dir` and return its path.
fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let courses = dir.path().join("courses");
    std::fs::create_dir_all(&courses).unwrap();

    let config_path = dir.path().join("quizzer.toml");
    std::fs::write(
        &config_path,
        format!(
            "courses_root = {:?}\ndb_path = {:?}\nreports_dir = {:?}\n",
            courses,
            dir.path().join("quizzer.db"),
            dir.path().join("reports"),
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn help_output() {
    quizzer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Grounded quiz generation"));
}

#[test]
fn version_output() {
    quizzer()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quizzer"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    quizzer()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quizzer.toml"))
        .stdout(predicate::str::contains("Created courses/"));

    assert!(dir.path().join("quizzer.toml").exists());
    assert!(dir.path().join("courses").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    quizzer()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    quizzer()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn courses_with_empty_root() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    quizzer()
        .arg("courses")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("No courses found"));
}

#[test]
fn courses_lists_material_availability() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    std::fs::create_dir_all(dir.path().join("courses/nlp/notes")).unwrap();

    quizzer()
        .arg("courses")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("nlp"))
        .stdout(predicate::str::contains("no material"));
}

#[test]
fn register_then_profile() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    quizzer()
        .arg("register")
        .arg("--user")
        .arg("TestUser1")
        .arg("--config")
        .arg(&config)
        .write_stdin("MyPass123!\nMyPass123!\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered 'TestUser1'"));

    quizzer()
        .arg("profile")
        .arg("--user")
        .arg("TestUser1")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("TestUser1"))
        .stdout(predicate::str::contains("Beginner"));
}

#[test]
fn register_password_mismatch() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    quizzer()
        .arg("register")
        .arg("--user")
        .arg("TestUser1")
        .arg("--config")
        .arg(&config)
        .write_stdin("MyPass123!\nDifferent!\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("do not match"));
}

#[test]
fn profile_unknown_user() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    quizzer()
        .arg("profile")
        .arg("--user")
        .arg("Nobody")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user named"));
}

#[test]
fn quiz_rejects_wrong_password() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    quizzer()
        .arg("register")
        .arg("--user")
        .arg("TestUser1")
        .arg("--config")
        .arg(&config)
        .write_stdin("MyPass123!\nMyPass123!\n")
        .assert()
        .success();

    quizzer()
        .arg("quiz")
        .arg("--user")
        .arg("TestUser1")
        .arg("--course")
        .arg("nlp")
        .arg("--config")
        .arg(&config)
        .write_stdin("WrongPass1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid username or password"));
}

#[test]
fn quiz_rejects_unknown_question_type() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    quizzer()
        .arg("quiz")
        .arg("--user")
        .arg("TestUser1")
        .arg("--course")
        .arg("nlp")
        .arg("--types")
        .arg("essay")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown question type"));
}

#[test]
fn check_reports_unreachable_endpoint() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("quizzer.toml");
    // Nothing listens on this port.
    std::fs::write(
        &config_path,
        "[providers.ollama]\ntype = \"ollama\"\nbase_url = \"http://127.0.0.1:59999\"\n",
    )
    .unwrap();

    quizzer()
        .arg("check")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not reachable"));
}
