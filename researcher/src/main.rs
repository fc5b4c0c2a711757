//! `researcher` command-line interface.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::warn;

use researcher::exit_codes;
use researcher::io::config::load_config;
use researcher::io::init::init_workspace;
use researcher::{MissionError, Researcher, error_chain, logging};

#[derive(Parser)]
#[command(
    name = "researcher",
    version,
    about = "Plan, execute, and synthesize multi-step research missions"
)]
struct Cli {
    /// Config file (missing file means defaults).
    #[arg(long, global = true, default_value = ".researcher/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.researcher/` with a default config.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Run a full mission and print the report to stdout.
    Run {
        /// Research query. Read from stdin when omitted.
        query: Vec<String>,
        /// Also write the report to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the whole outcome (plan, findings, report) as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the validated plan for a query as JSON.
    Plan {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Add a text file to the local document store.
    Ingest {
        file: PathBuf,
        /// Source label (defaults to the file name).
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Run a single registered tool.
    Search {
        /// Tool id, e.g. `web_search` or `document_search`.
        #[arg(short, long)]
        tool: String,
        #[arg(required = true)]
        query: Vec<String>,
    },
}

fn main() {
    load_dotenv();
    logging::init(logging::CLI_FILTER);
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("warning: failed to load .env: {err}");
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Run {
            query,
            output,
            json,
        } => cmd_run(&cli.config, query, output.as_deref(), json),
        Command::Plan { query } => cmd_plan(&cli.config, &query.join(" ")),
        Command::Ingest { file, source } => cmd_ingest(&cli.config, &file, source),
        Command::Search { tool, query } => cmd_search(&cli.config, &tool, &query.join(" ")),
    }
}

fn researcher(config_path: &Path) -> Result<Researcher> {
    let config = load_config(config_path)?;
    Researcher::from_config(&config)
}

fn cmd_init(force: bool) -> Result<i32> {
    let paths = init_workspace(Path::new("."), force)?;
    println!("initialized {}", paths.researcher_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_run(config_path: &Path, query: Vec<String>, output: Option<&Path>, json: bool) -> Result<i32> {
    let query = if query.is_empty() {
        read_query_from_stdin()?
    } else {
        query.join(" ")
    };
    let query = query.trim();
    if query.is_empty() {
        bail!("query must be non-empty");
    }

    let researcher = researcher(config_path)?;
    let result = researcher.run(query, |event| eprintln!("{event}"));
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => return Ok(report_mission_failure(&err)),
    };

    if let Some(path) = output {
        fs::write(path, &outcome.final_answer)
            .with_context(|| format!("write report {}", path.display()))?;
    }
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &outcome).context("write outcome json")?;
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "{}", outcome.final_answer.trim_end())?;
    }
    Ok(exit_codes::OK)
}

fn report_mission_failure(err: &MissionError) -> i32 {
    eprintln!("{}", error_chain(err));
    match serde_json::to_string_pretty(err.progress()) {
        Ok(progress) => eprintln!("partial progress:\n{progress}"),
        Err(json_err) => warn!(error = %json_err, "failed to serialize mission progress"),
    }
    exit_codes::MISSION_FAILED
}

fn read_query_from_stdin() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read query from stdin")?;
    Ok(line)
}

fn cmd_plan(config_path: &Path, query: &str) -> Result<i32> {
    let researcher = researcher(config_path)?;
    let validated = researcher.plan(query);
    if let Some(reason) = validated.fallback_reason() {
        eprintln!("planner output rejected, using fallback plan: {reason}");
    }
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &validated.plan).context("write plan json")?;
    writeln!(stdout)?;
    Ok(exit_codes::OK)
}

fn cmd_ingest(config_path: &Path, file: &Path, source: Option<String>) -> Result<i32> {
    let text = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let source = match source {
        Some(source) => source,
        None => file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("no file name in {}", file.display()))?,
    };
    let researcher = researcher(config_path)?;
    let chunks = researcher.ingest(&text, &source)?;
    println!("ingested {chunks} chunk(s) from {source}");
    Ok(exit_codes::OK)
}

fn cmd_search(config_path: &Path, tool: &str, query: &str) -> Result<i32> {
    let researcher = researcher(config_path)?;
    let text = researcher.search(tool, query)?;
    println!("{}", text.trim_end());
    Ok(exit_codes::OK)
}
