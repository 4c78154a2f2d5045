//! SkillForge CLI
//!
//! The `skillforge` command turns a task into a validated skill.
//!
//! ## Commands
//!
//! - `run`: execute a task against recorded collaborator responses and
//!   stream the run's events to stdout as NDJSON
//! - `validate`: check a `SKILL.md` file (and optional test cases) against
//!   the quality gate
//! - `skills`: list or show stored skills

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use skillforge_core::domain::skill::{DEFAULT_DESCRIPTION, UNTITLED_SKILL};
use skillforge_core::telemetry::init_tracing;
use skillforge_core::{
    validate, AgentService, Event, ForgeConfig, MiddlewareChain, RecordedResponses, RunStatus,
    SkillSpec, SourceSet, TestCaseSpec, ToolRegistry, METRICS,
};
use skillforge_store::{parse_frontmatter, strip_frontmatter, FsSkillStore, SkillStore};
use tracing::info;

#[derive(Parser)]
#[command(name = "skillforge")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn tasks into validated, reusable skills", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SKILLFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task and stream its events as NDJSON
    Run(RunArgs),

    /// Validate a SKILL.md file
    Validate {
        /// Path to the SKILL.md file
        #[arg(long)]
        skill: PathBuf,

        /// JSON array of test cases
        #[arg(long)]
        tests: Option<PathBuf>,
    },

    /// Inspect stored skills
    Skills {
        #[command(subcommand)]
        action: SkillsAction,

        /// Skills directory (default: <output_dir>/skills)
        #[arg(long, env = "SKILLFORGE_SKILLS_DIR")]
        skills_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Task description
    #[arg(short, long)]
    task: String,

    /// Comma-separated sources (skills.sh, github, bilibili, youtube, web)
    #[arg(short, long, default_value = "")]
    sources: String,

    /// Draft rounds before giving up
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Recorded collaborator responses (JSON)
    #[arg(long, env = "SKILLFORGE_FIXTURES")]
    fixtures: PathBuf,

    /// Skills directory (default: <output_dir>/skills)
    #[arg(long, env = "SKILLFORGE_SKILLS_DIR")]
    skills_dir: Option<PathBuf>,

    /// Run artifacts directory (default: <output_dir>/runs)
    #[arg(long, env = "SKILLFORGE_RUNS_DIR")]
    runs_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SkillsAction {
    /// List stored skills, newest first
    List,
    /// Print one stored skill
    Show {
        /// Skill slug
        slug: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.json, cli.verbose);

    let mut out = std::io::stdout().lock();
    let result = dispatch(cli, &mut out).await;
    METRICS.flush();
    result
}

async fn dispatch(cli: Cli, out: &mut impl Write) -> Result<ExitCode> {
    match cli.command {
        Commands::Run(args) => {
            let config = load_config(
                cli.config.as_deref(),
                args.skills_dir.clone(),
                args.runs_dir.clone(),
            )?;
            let status = cmd_run(&config, &args, out).await?;
            Ok(exit_code(status == RunStatus::Ok))
        }
        Commands::Validate { skill, tests } => {
            let passed = cmd_validate(&skill, tests.as_deref(), out)?;
            Ok(exit_code(passed))
        }
        Commands::Skills { action, skills_dir } => {
            let config = load_config(cli.config.as_deref(), skills_dir, None)?;
            let store = FsSkillStore::new(config.skills_dir())
                .context("Failed to open skills directory")?;
            match action {
                SkillsAction::List => cmd_skills_list(&store, out).await?,
                SkillsAction::Show { slug } => cmd_skills_show(&store, &slug, out).await?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Config file plus environment, then explicit directory flags on top.
fn load_config(
    path: Option<&Path>,
    skills_dir: Option<PathBuf>,
    runs_dir: Option<PathBuf>,
) -> Result<ForgeConfig> {
    let mut config = ForgeConfig::load(path).context("Failed to load configuration")?;
    if skills_dir.is_some() {
        config.skills_dir = skills_dir;
    }
    if runs_dir.is_some() {
        config.runs_dir = runs_dir;
    }
    Ok(config)
}

/// Status carried by a terminal `done` event; anything unreadable is a failure.
fn terminal_status(event: &Event) -> RunStatus {
    event
        .payload
        .get("result")
        .and_then(|result| result.get("status"))
        .and_then(|status| serde_json::from_value(status.clone()).ok())
        .unwrap_or(RunStatus::Fail)
}

async fn cmd_run(config: &ForgeConfig, args: &RunArgs, out: &mut impl Write) -> Result<RunStatus> {
    let sources = SourceSet::parse_list(&args.sources);
    let fixtures = RecordedResponses::load(&args.fixtures).with_context(|| {
        format!("Failed to load fixtures from {}", args.fixtures.display())
    })?;
    info!(fixtures = %args.fixtures.display(), sources = ?sources.names(), "starting run");

    let mut tools = ToolRegistry::from_shared(Arc::new(fixtures));
    if let Some(limit) = config.tool_timeout() {
        tools = tools.with_timeout(limit);
    }
    let store =
        FsSkillStore::new(config.skills_dir()).context("Failed to open skills directory")?;
    let service = AgentService::from_config(config, Arc::new(tools), Arc::new(store));

    let max_rounds = args.max_rounds.unwrap_or(config.max_rounds);
    let mut events = service.stream(
        args.task.clone(),
        sources,
        MiddlewareChain::standard(),
        max_rounds,
    );

    let mut status = RunStatus::Fail;
    while let Some(event) = events.next().await {
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
        if event.is_terminal() {
            status = terminal_status(&event);
        }
    }
    out.flush()?;
    info!(status = %status, "run finished");
    Ok(status)
}

/// Run the quality gate over a skill file. Returns whether it passed.
fn cmd_validate(skill_path: &Path, tests_path: Option<&Path>, out: &mut impl Write) -> Result<bool> {
    let text = std::fs::read_to_string(skill_path)
        .with_context(|| format!("Failed to read {}", skill_path.display()))?;
    let header = parse_frontmatter(&text);
    let field = |key: &str, fallback: &str| {
        header
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    };
    let skill = SkillSpec::new(
        field("name", UNTITLED_SKILL),
        field("description", DEFAULT_DESCRIPTION),
        Vec::<String>::new(),
        strip_frontmatter(&text).trim(),
    );

    let tests: Vec<TestCaseSpec> = match tests_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid test cases in {}", path.display()))?
        }
        None => Vec::new(),
    };

    let report = validate(&skill, &tests);
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(report.passed)
}

async fn cmd_skills_list(store: &FsSkillStore, out: &mut impl Write) -> Result<()> {
    let entries = store.list().await.context("Failed to list skills")?;
    if entries.is_empty() {
        writeln!(out, "No skills in {}", store.root().display())?;
        return Ok(());
    }
    for entry in entries {
        writeln!(out, "{}\t{}\t{}", entry.slug, entry.name, entry.description)?;
    }
    Ok(())
}

async fn cmd_skills_show(store: &FsSkillStore, slug: &str, out: &mut impl Write) -> Result<()> {
    let skill = store
        .get(slug)
        .await
        .with_context(|| format!("Failed to load skill '{slug}'"))?;
    writeln!(out, "# {}", skill.entry.name)?;
    writeln!(out, "{}", skill.entry.description)?;
    writeln!(out, "source: {}  digest: {}", skill.entry.source, skill.entry.digest)?;
    writeln!(out)?;
    writeln!(out, "{}", skill.content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::{json, Value};
    use skillforge_store::NewSkill;

    const GOOD_CONTENT: &str = "# Digest\n1. Fetch the list\n2. Rank by stars\n3. Write the report";

    fn write_fixtures(dir: &Path, skills: Value) -> PathBuf {
        let fixtures = json!({
            "web": [{"title": "Guide", "content": "How to digest", "url": "https://example.com"}],
            "skills": skills,
            "tests": [[{"name": "happy", "input": "list", "expected": "report"}]],
        });
        let path = dir.join("fixtures.json");
        std::fs::write(&path, fixtures.to_string()).unwrap();
        path
    }

    fn run_args(dir: &Path, fixtures: PathBuf) -> (ForgeConfig, RunArgs) {
        let config = ForgeConfig {
            output_dir: dir.to_path_buf(),
            ..ForgeConfig::default()
        };
        let args = RunArgs {
            task: "digest repositories".to_string(),
            sources: "web".to_string(),
            max_rounds: Some(2),
            fixtures,
            skills_dir: None,
            runs_dir: None,
        };
        (config, args)
    }

    fn parse_lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "skillforge",
            "run",
            "--task",
            "digest",
            "--sources",
            "github,web",
            "--fixtures",
            "f.json",
            "--max-rounds",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.task, "digest");
                assert_eq!(args.sources, "github,web");
                assert_eq!(args.max_rounds, Some(3));
            }
            _ => panic!("expected run"),
        }
    }

    #[tokio::test]
    async fn run_streams_ndjson_and_saves_skill() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = write_fixtures(
            dir.path(),
            json!([{"name": "Repo Digest", "description": "Rank repos", "content": GOOD_CONTENT}]),
        );
        let (config, args) = run_args(dir.path(), fixtures);

        let mut out = Vec::new();
        let status = cmd_run(&config, &args, &mut out).await.unwrap();

        assert_eq!(status, RunStatus::Ok);
        let lines = parse_lines(&out);
        let done = lines.last().unwrap();
        assert_eq!(done["stage"], "done");
        assert_eq!(done["terminal"], true);
        assert_eq!(done["payload"]["result"]["status"], "ok");
        assert!(lines[0]["timestamp"].is_i64());
        assert!(dir.path().join("skills/repo-digest/SKILL.md").exists());
    }

    #[tokio::test]
    async fn run_reports_fail_status() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = write_fixtures(dir.path(), json!([{"name": "Thin", "content": "abc"}]));
        let (config, args) = run_args(dir.path(), fixtures);

        let mut out = Vec::new();
        let status = cmd_run(&config, &args, &mut out).await.unwrap();

        assert_eq!(status, RunStatus::Fail);
        assert!(!dir.path().join("skills/thin").exists());
    }

    #[tokio::test]
    async fn run_with_only_unknown_sources_fails_without_drafting() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = write_fixtures(
            dir.path(),
            json!([{"name": "Repo Digest", "content": GOOD_CONTENT}]),
        );
        let (config, mut args) = run_args(dir.path(), fixtures);
        args.sources = "pinterest".to_string();

        let mut out = Vec::new();
        let status = cmd_run(&config, &args, &mut out).await.unwrap();

        assert_eq!(status, RunStatus::Fail);
        let lines = parse_lines(&out);
        let done = lines.last().unwrap();
        assert_eq!(
            done["payload"]["result"]["errors"],
            json!(["No executable path matched this task."])
        );
        assert!(lines.iter().all(|e| e["agent"] != "skill_generator"));
        assert!(!dir.path().join("skills/repo-digest").exists());
    }

    #[test]
    fn validate_flags_missing_tests() {
        let dir = tempfile::tempdir().unwrap();
        let skill = dir.path().join("SKILL.md");
        std::fs::write(&skill, format!("---\nname: Digest\n---\n{GOOD_CONTENT}\n")).unwrap();

        let mut out = Vec::new();
        let passed = cmd_validate(&skill, None, &mut out).unwrap();

        assert!(!passed);
        let report: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["issues"], json!(["No test cases generated."]));
    }

    #[test]
    fn validate_passes_with_tests() {
        let dir = tempfile::tempdir().unwrap();
        let skill = dir.path().join("SKILL.md");
        std::fs::write(&skill, GOOD_CONTENT).unwrap();
        let tests = dir.path().join("tests.json");
        std::fs::write(&tests, r#"[{"name": "a", "input": "x", "expected": "y"}]"#).unwrap();

        let mut out = Vec::new();
        assert!(cmd_validate(&skill, Some(&tests), &mut out).unwrap());
    }

    #[tokio::test]
    async fn skills_list_and_show() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSkillStore::new(dir.path()).unwrap();

        let mut out = Vec::new();
        cmd_skills_list(&store, &mut out).await.unwrap();
        assert!(String::from_utf8_lossy(&out).starts_with("No skills in "));

        store
            .save(NewSkill::new("Repo Digest", "Rank repos", GOOD_CONTENT, "generated"))
            .await
            .unwrap();

        let mut out = Vec::new();
        cmd_skills_list(&store, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "repo-digest\tRepo Digest\tRank repos\n"
        );

        let mut out = Vec::new();
        cmd_skills_show(&store, "repo-digest", &mut out).await.unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("# Repo Digest\nRank repos\n"));
        assert!(text.ends_with(&format!("{GOOD_CONTENT}\n")));

        let mut out = Vec::new();
        assert!(cmd_skills_show(&store, "missing", &mut out).await.is_err());
    }
}
