use std::path::PathBuf;
use std::process::{Command, Output};

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "dexhelper-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data")
}

fn run(profiles: &PathBuf, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dexhelper"))
        .arg("--data-dir")
        .arg(data_dir())
        .arg("--profiles")
        .arg(profiles)
        .args(args)
        .output()
        .expect("run cli")
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "cli failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json report")
}

#[test]
fn cli_clock_reports_a_valid_time() {
    let profiles = temp_path("clock");
    let clock = json(&run(&profiles, &["clock", "--report", "json"]));
    let time = clock["time"].as_str().unwrap();
    assert_eq!(time.len(), 5);
    assert!(["Morning", "Day", "Night"].contains(&clock["period"].as_str().unwrap()));
    assert!(clock["next_in_seconds"].as_i64().unwrap() > 0);
}

#[test]
fn cli_spots_writes_json_to_output_file() {
    let profiles = temp_path("spots-profiles");
    let output_path = temp_path("spots");
    let output = run(
        &profiles,
        &[
            "spots",
            "--report",
            "json",
            "--sort",
            "catchable",
            "--limit",
            "3",
            "--output",
            output_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    let spots: serde_json::Value = serde_json::from_str(&content).unwrap();
    let spots = spots.as_array().unwrap();
    assert!(!spots.is_empty() && spots.len() <= 3);
    assert!(spots[0]["catchable_count"].as_u64().unwrap() > 0);
}

#[test]
fn cli_catch_then_export_round_trips() {
    let profiles = temp_path("catch");
    let caught = json(&run(&profiles, &["catch-line", "bulbasaur", "--report", "json"]));
    assert_eq!(caught["species"], serde_json::json!(["Bulbasaur", "Ivysaur", "Venusaur"]));

    let export_path = temp_path("export");
    let output = run(&profiles, &["export", export_path.to_str().unwrap()]);
    assert!(output.status.success());
    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(exported["2"]["caught"], true);
    assert_eq!(exported["10"]["caught"], false);

    let fresh = temp_path("import");
    let imported = json(&run(
        &fresh,
        &["import", export_path.to_str().unwrap(), "--report", "json"],
    ));
    assert_eq!(imported["skipped"], 0);
    let summary = json(&run(&fresh, &["summary", "--report", "json"]));
    assert_eq!(summary["caught"], 3);
    assert_eq!(summary["first_catch"], "Bulbasaur");
}

#[test]
fn cli_profiles_keep_separate_collections() {
    let profiles = temp_path("profiles");
    assert!(run(&profiles, &["catch", "pidgey"]).status.success());
    assert!(
        run(&profiles, &["profile", "create", "Second"])
            .status
            .success()
    );

    let listing = json(&run(&profiles, &["profile", "list", "--report", "json"]));
    assert_eq!(listing["active"], "Second");
    assert_eq!(listing["profiles"], serde_json::json!(["Default", "Second"]));

    let second = json(&run(&profiles, &["summary", "--report", "json"]));
    assert_eq!(second["caught"], 0);
    let first = json(&run(
        &profiles,
        &["summary", "--profile", "Default", "--report", "json"],
    ));
    assert_eq!(first["caught"], 1);
}

#[test]
fn cli_profile_commands_report_their_action() {
    let profiles = temp_path("profile-actions");
    let last = run(&profiles, &["profile", "delete", "Default"]);
    assert!(!last.status.success());
    assert!(String::from_utf8_lossy(&last.stderr).contains("only remaining profile"));

    let created = json(&run(&profiles, &["profile", "create", "Alt", "--report", "json"]));
    assert_eq!(created["action"], "created profile");
    let switched = json(&run(
        &profiles,
        &["profile", "switch", "Default", "--report", "json"],
    ));
    assert_eq!(switched["species"], serde_json::json!(["Default"]));
    let deleted = json(&run(&profiles, &["profile", "delete", "Alt", "--report", "json"]));
    assert_eq!(deleted["action"], "deleted profile");

    let listing = json(&run(&profiles, &["profile", "list", "--report", "json"]));
    assert_eq!(listing["profiles"], serde_json::json!(["Default"]));
}

#[test]
fn cli_strategy_and_line_reports() {
    let profiles = temp_path("line");
    let line = json(&run(&profiles, &["line", "metapod", "--report", "json"]));
    let names: Vec<&str> = line
        .as_array()
        .unwrap()
        .iter()
        .map(|member| member["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Caterpie", "Metapod", "Butterfree"]);

    let strategies = json(&run(
        &profiles,
        &["strategy", "caterpie", "--top-k", "2", "--report", "json"],
    ));
    for strategy in strategies.as_array().unwrap() {
        assert!(strategy["cost_ranking"].as_array().unwrap().len() <= 2);
    }
}

#[test]
fn cli_dex_filters_by_caught_state() {
    let profiles = temp_path("dex");
    assert!(run(&profiles, &["catch", "eevee"]).status.success());
    let rows = json(&run(
        &profiles,
        &["dex", "--caught", "true", "--report", "json"],
    ));
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Eevee");
}

#[test]
fn cli_watch_stops_after_requested_ticks() {
    let profiles = temp_path("watch");
    let output = run(&profiles, &["watch", "--ticks", "1", "--report", "markdown"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Game Clock"));
    assert!(stdout.contains("# Best Catching Spots"));
}

#[test]
fn cli_fails_cleanly_on_bad_input() {
    let profiles = temp_path("bad");
    let output = Command::new(env!("CARGO_BIN_EXE_dexhelper"))
        .args(["--data-dir", "/definitely/not/here", "--profiles"])
        .arg(&profiles)
        .arg("clock")
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open data directory"));
    assert!(stderr.contains("monsters.json"));

    let unknown = run(&profiles, &["catch", "missingno"]);
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("unknown species"));
}
