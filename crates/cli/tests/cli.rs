use assert_cmd::Command;

const COMPLETION: &str = "Database initialization completed";

/// Command isolated from the developer's `.env`, config files and variables.
fn mongoseed(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mongoseed-cli").unwrap();
    for (key, _) in std::env::vars() {
        if key.starts_with("MONGOSEED_") {
            cmd.env_remove(key);
        }
    }
    cmd.current_dir(dir.path())
        .env("MONGOSEED_CONFIG_DIR", dir.path())
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn plan_prints_demo_plan_without_password() {
    let dir = tempfile::tempdir().unwrap();
    let assert = mongoseed(&dir)
        .env("MONGOSEED_BOOTSTRAP__PASSWORD", "demo_password")
        .arg("plan")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let plan: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(plan["database"], "demo");
    assert_eq!(plan["user"]["name"], "demo_user");
    assert_eq!(plan["user"]["roles"][0]["role"], "readWrite");
    assert_eq!(plan["user"]["roles"][0]["db"], "demo");
    assert_eq!(plan["collections"][0]["name"], "posts");
    assert_eq!(plan["collections"][1]["name"], "files");
    assert_eq!(plan["policy"], "fail");
    assert!(!stdout.contains("demo_password"));
}

#[test]
fn plan_honours_idempotent_flag() {
    let dir = tempfile::tempdir().unwrap();
    let assert = mongoseed(&dir)
        .env("MONGOSEED_BOOTSTRAP__PASSWORD", "demo_password")
        .args(["plan", "--idempotent"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("\"policy\": \"skip\""));
}

#[test]
fn missing_password_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let assert = mongoseed(&dir).arg("run").assert().failure();

    let output = assert.get_output();
    assert!(!String::from_utf8_lossy(&output.stdout).contains(COMPLETION));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no password configured"));
}

#[test]
fn unreachable_server_fails_without_completion_line() {
    let dir = tempfile::tempdir().unwrap();
    let assert = mongoseed(&dir)
        .env("MONGOSEED_BOOTSTRAP__PASSWORD", "demo_password")
        .env("MONGOSEED_MONGO__SERVER_SELECTION_TIMEOUT_MS", "200")
        .env("MONGOSEED_MONGO__CONNECT_TIMEOUT_MS", "200")
        .args(["--uri", "mongodb://127.0.0.1:1"])
        .assert()
        .failure();

    let output = assert.get_output();
    assert!(!String::from_utf8_lossy(&output.stdout).contains(COMPLETION));
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not reach the database server"));
}
