use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

const SPEC_JSON: &str = r#"{"requirements":"Build a bot.","design":"Use \"queues\".\nThen scale: café","tasks":"Step 1\tStep 2"}"#;

fn architect_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("architect");
    path
}

fn setup_test_env(extra_config: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let knowledge_dir = root.join("knowledge");
    fs::create_dir_all(knowledge_dir.join("patterns")).unwrap();
    fs::write(
        knowledge_dir.join("01_FOUNDATIONS.md"),
        "# Foundations\n## When not to build an agent\nFixed rules and predictable inputs call for a script.\n## Tool use\nAgents act through tools with clear schemas.",
    )
    .unwrap();
    fs::write(
        knowledge_dir.join("patterns/03_ARCHITECTURE_PATTERNS.md"),
        "## Router\nClassify the request and hand it to one specialist.\n## Supervisor\nA coordinator delegates to workers and merges results.",
    )
    .unwrap();
    fs::write(knowledge_dir.join("notes.txt"), "## Not markdown\nIgnored.").unwrap();

    let config_content = format!(
        r#"[knowledge]
root = "{}/knowledge"
index_path = "{}/data/knowledge-index.json"

[server]
bind = "127.0.0.1:7341"
{}
"#,
        root.display(),
        root.display(),
        extra_config
    );

    let config_path = config_dir.join("architect.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_architect(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_architect_with(config_path, args, None, &[])
}

fn run_architect_with(
    config_path: &Path,
    args: &[&str],
    stdin: Option<&str>,
    env: &[(&str, &str)],
) -> (String, String, bool) {
    let binary = architect_binary();
    let mut child = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .envs(env.iter().copied())
        .env_remove("VOYAGE_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run architect binary at {:?}: {}", binary, e));

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_extract(args: &[&str], stdin: &str) -> (String, String, bool) {
    let mut full = vec!["extract"];
    full.extend_from_slice(args);
    run_architect_with(
        Path::new("/nonexistent/architect.toml"),
        &full,
        Some(stdin),
        &[],
    )
}

fn parse_lines(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .map(|line| {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            (
                v["field"].as_str().unwrap().to_string(),
                v["text"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

// ============ extract ============

#[test]
fn test_extract_scenario_single_fragment() {
    let input = r#"{"requirements":"Build a bot.","design":"Use queues.","tasks":"Step 1"}"#;
    let (stdout, stderr, success) = run_extract(&["--chunk-size", "0"], input);
    assert!(success, "extract failed: stderr={}", stderr);
    assert_eq!(
        parse_lines(&stdout),
        vec![
            ("requirements".to_string(), "Build a bot.".to_string()),
            ("design".to_string(), "Use queues.".to_string()),
            ("tasks".to_string(), "Step 1".to_string()),
        ]
    );
}

#[test]
fn test_extract_assembled_same_for_every_chunk_size() {
    let expected = serde_json::json!({
        "requirements": "Build a bot.",
        "design": "Use \"queues\".\nThen scale: café",
        "tasks": "Step 1\tStep 2"
    });
    for size in ["0", "1", "2", "3", "5", "8", "13"] {
        let (stdout, stderr, success) =
            run_extract(&["--chunk-size", size, "--assemble"], SPEC_JSON);
        assert!(success, "extract failed at chunk size {}: {}", size, stderr);
        let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
        assert_eq!(value, expected, "chunk size {}", size);
    }
}

#[test]
fn test_extract_single_char_fragments_emit_per_char() {
    let (stdout, _, success) = run_extract(&["--chunk-size", "1"], r#"{"tasks":"abc"}"#);
    assert!(success);
    let lines = parse_lines(&stdout);
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|(f, t)| f == "tasks" && t.chars().count() == 1));
}

#[test]
fn test_extract_custom_field() {
    let input = r#"{"summary":"short","design":"ignored"}"#;
    let (stdout, _, success) =
        run_extract(&["--field", "summary", "--assemble", "--chunk-size", "4"], input);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(value, serde_json::json!({"summary": "short"}));
}

#[test]
fn test_extract_legacy_unicode() {
    let (stdout, _, success) = run_extract(
        &["--legacy-unicode", "--assemble"],
        r#"{"design":"caf\u00e9"}"#,
    );
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(value["design"], "cafu00e9");
}

#[test]
fn test_extract_empty_stdin_fails() {
    let (_, stderr, success) = run_extract(&[], "");
    assert!(!success);
    assert!(stderr.contains("No input on stdin"));
}

// ============ config ============

#[test]
fn test_missing_config_fails() {
    let (_, stderr, success) =
        run_architect(Path::new("/nonexistent/architect.toml"), &["index", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_invalid_provider_rejected() {
    let (_tmp, config_path) = setup_test_env("[embedding]\nprovider = \"magic\"\n");
    let (_, stderr, success) = run_architect(&config_path, &["index", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("Unknown embedding provider"));
}

// ============ index / search ============

#[test]
fn test_index_dry_run_counts() {
    let (_tmp, config_path) = setup_test_env("");
    let (stdout, stderr, success) = run_architect(&config_path, &["index", "--dry-run"]);
    assert!(success, "dry run failed: {}", stderr);
    assert!(stdout.contains("index (dry-run)"));
    assert!(stdout.contains("files found: 2"));
    // Foundations title + 2 sections, plus 2 pattern sections
    assert!(stdout.contains("chunks: 5"), "stdout={}", stdout);
}

#[test]
fn test_index_requires_embeddings() {
    let (tmp, config_path) = setup_test_env("");
    let (_, stderr, success) = run_architect(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("requires embeddings"));
    assert!(!tmp.path().join("data/knowledge-index.json").exists());
}

#[test]
fn test_voyage_without_key_fails() {
    let (_tmp, config_path) = setup_test_env("[embedding]\nprovider = \"voyage\"\n");
    let (_, stderr, success) = run_architect(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("VOYAGE_API_KEY"));
}

#[test]
fn test_search_requires_embeddings() {
    let (_tmp, config_path) = setup_test_env("");
    let (_, stderr, success) = run_architect(&config_path, &["search", "router pattern"]);
    assert!(!success);
    assert!(stderr.contains("requires embeddings"));
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env("");
    let (stdout, _, success) = run_architect(&config_path, &["search", "  "]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

// ============ generate ============

#[test]
fn test_generate_rejects_short_idea_before_model_call() {
    let (_tmp, config_path) = setup_test_env("");
    let (_, stderr, success) = run_architect_with(
        &config_path,
        &["generate", "a bot"],
        None,
        &[("ANTHROPIC_API_KEY", "test-key")],
    );
    assert!(!success);
    assert!(
        stderr.contains("Query is too short"),
        "stderr={}",
        stderr
    );
}

#[test]
fn test_generate_without_api_key_fails() {
    let (_tmp, config_path) = setup_test_env("");
    let mut cmd = Command::new(architect_binary());
    let output = cmd
        .arg("--config")
        .arg(&config_path)
        .args(["generate", "an agent that triages support tickets"])
        .env_remove("ANTHROPIC_API_KEY")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ANTHROPIC_API_KEY"));
}
