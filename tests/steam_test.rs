mod common;

use common::{game, registry_with, steam_config, MockSource, RecordingWriter, SharedBuffer};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use turbine::error::Error;
use turbine::processor::{execute, FileEmitter};

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

#[test_log::test(tokio::test)]
async fn test_per_game_produces_one_context_per_record() {
    let source = MockSource::with_games(&["Half-Life: Source", "Portal", "Team Fortress 2"]);
    let registry = registry_with(source.clone());
    let config = steam_config(&registry, &["-o", "f", "-t", "t"]);
    let writer = Arc::new(RecordingWriter::default());

    registry.get("steam").unwrap().generate(&config, writer.clone()).await.unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(writer.names(), vec!["Half-Life: Source", "Portal", "Team Fortress 2"]);
    let contexts = writer.contexts.lock().unwrap();
    assert!(contexts.iter().all(|c| c.get("safeName").is_some()));
}

#[tokio::test]
async fn test_per_user_produces_a_single_context() {
    let source = MockSource::with_games(&["Half-Life: Source", "Portal"]);
    let registry = registry_with(source);
    let config = steam_config(&registry, &["-o", "f", "-t", "t", "--output-type", "per-user"]);
    let writer = Arc::new(RecordingWriter::default());

    registry.get("steam").unwrap().generate(&config, writer.clone()).await.unwrap();

    let contexts = writer.contexts.lock().unwrap();
    assert_eq!(contexts.len(), 1);
    let games = contexts[0].get("games").and_then(Value::as_array).unwrap();
    assert_eq!(games.len(), 2);
    assert_eq!(games[0]["safeName"], json!("Half-Life - Source"));
    assert_eq!(contexts[0].get("gameCount"), Some(&json!(2)));
}

#[tokio::test]
async fn test_schema_mismatch_aborts_before_writing() {
    let mut broken = game(400, "Portal");
    broken["rtime_last_played"] = json!("yesterday");
    let source = MockSource::new(json!({
        "response": {"game_count": 2, "games": [game(220, "Half-Life 2"), broken]}
    }));
    let registry = registry_with(source);
    let config = steam_config(&registry, &["-o", "f", "-t", "t"]);
    let writer = Arc::new(RecordingWriter::default());

    let result = registry.get("steam").unwrap().generate(&config, writer.clone()).await;

    assert!(matches!(result, Err(Error::ValidationError(_))));
    assert_eq!(writer.count(), 0);
}

#[tokio::test]
async fn test_upstream_failure_aborts_before_writing() {
    let source = MockSource::failing(403);
    let registry = registry_with(source.clone());
    let config = steam_config(&registry, &["-o", "f", "-t", "t"]);
    let writer = Arc::new(RecordingWriter::default());

    let result = registry.get("steam").unwrap().generate(&config, writer.clone()).await;

    assert!(matches!(result, Err(Error::UpstreamStatus { status: 403 })));
    assert_eq!(source.calls(), 1);
    assert_eq!(writer.count(), 0);
}

#[tokio::test]
async fn test_upstream_failure_end_to_end_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_with(MockSource::failing(500));
    let filename_template = format!("{}/{}", temp_dir.path().display(), "{{safeName}}.md");
    let config = steam_config(&registry, &["-o", &filename_template, "-t", "x", "-d"]);

    let result = execute(&registry, config).await;

    assert!(matches!(result, Err(Error::UpstreamStatus { status: 500 })));
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_end_to_end_per_game() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_with(MockSource::with_games(&["Half-Life: Source", "Portal"]));
    let filename_template = format!("{}/{}", temp_dir.path().display(), "{{safeName}}.md");
    let config = steam_config(&registry, &["-o", &filename_template, "-t", "# {{name}}"]);

    execute(&registry, config).await.unwrap();

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("Half-Life - Source.md")).unwrap(),
        "# Half-Life: Source"
    );
    assert_eq!(fs::read_to_string(temp_dir.path().join("Portal.md")).unwrap(), "# Portal");
    let expected = Path::new(FIXTURES).join("steam_per_game");
    assert!(!dir_diff::is_different(temp_dir.path(), &expected).unwrap());
}

#[tokio::test]
async fn test_end_to_end_per_user_with_mkdirp() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_with(MockSource::with_games(&["Portal", "Half-Life: Source"]));
    let filename_template = format!("{}/library/games.md", temp_dir.path().display());
    let config = steam_config(
        &registry,
        &[
            "-o",
            &filename_template,
            "-t",
            "{% for game in games %}- {{ game.name }} ({{ game.playtime_forever }} min)\n{% endfor %}",
            "--output-type",
            "per-user",
            "--mkdirp",
        ],
    );

    execute(&registry, config).await.unwrap();

    let written = fs::read_to_string(temp_dir.path().join("library/games.md")).unwrap();
    assert_eq!(written, "- Portal (42 min)\n- Half-Life: Source (42 min)\n");
}

#[tokio::test]
async fn test_dry_run_end_to_end_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_with(MockSource::with_games(&["Half-Life: Source", "Portal"]));
    let filename_template = format!("{}/out/{}", temp_dir.path().display(), "{{safeName}}.md");
    let config = steam_config(&registry, &["-o", &filename_template, "-t", "# {{name}}", "-d", "--dry-run"]);
    let buffer = SharedBuffer::default();
    let emitter = FileEmitter::new(config.templates.clone(), config.mkdirp, Some(Box::new(buffer.clone())));

    registry.get("steam").unwrap().generate(&config, Arc::new(emitter)).await.unwrap();

    let lines = buffer.lines();
    assert_eq!(lines.len(), 4);
    for pair in lines.chunks(2) {
        assert_eq!(pair[0]["action"], json!("create directory"));
        assert_eq!(pair[1]["action"], json!("write file"));
    }
    let mut written: Vec<&str> = lines
        .iter()
        .filter_map(|line| line.get("content").and_then(Value::as_str))
        .collect();
    written.sort();
    assert_eq!(written, vec!["# Half-Life: Source", "# Portal"]);
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_names_with_continue_policy() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_with(MockSource::with_games(&["Portal", "CON", "Half-Life: Source"]));
    let filename_template = format!("{}/{}", temp_dir.path().display(), "{{safeName}}.md");
    let config = steam_config(&registry, &["-o", &filename_template, "-t", "x", "--on-error", "continue"]);

    let result = execute(&registry, config).await;

    assert!(matches!(result, Err(Error::EmissionFailed { failed: 1, total: 3 })));
    assert!(temp_dir.path().join("Portal.md").is_file());
    assert!(temp_dir.path().join("Half-Life - Source.md").is_file());
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);
}
