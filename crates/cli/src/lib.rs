use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use jsontools_engine::{EngineConfig, EngineError, JsonTools};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "jsontools")]
#[command(about = "Query and script-update JSON / NDJSON files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Script budget in milliseconds (overrides JSONTOOLS_EVAL_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the values matched by a JSONPath expression
    Query(QueryArgs),

    /// Print matched values together with their paths
    Nodes(QueryArgs),

    /// Run a script over one file
    Eval(EvalArgs),

    /// Run a script over several files
    #[command(name = "multi-eval")]
    MultiEval(MultiEvalArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// JSON or NDJSON file
    file: PathBuf,

    /// JSONPath expression, e.g. '$.items[*].id'
    json_path: String,

    /// Maximum number of results (0 = all)
    #[arg(long, short = 'n')]
    count: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct CodeArgs {
    /// Script source
    #[arg(long, short = 'e', conflicts_with = "code_file")]
    code: Option<String>,

    /// Read the script from a file ('-' for stdin)
    #[arg(long)]
    code_file: Option<PathBuf>,
}

impl CodeArgs {
    fn load(self) -> Result<String> {
        if let Some(code) = self.code {
            return Ok(code);
        }
        let code = match self.code_file {
            Some(path) if path.as_os_str() == "-" => {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read script from stdin")?;
                buffer
            }
            Some(path) => fs::read_to_string(&path)
                .with_context(|| format!("Failed to read script {}", path.display()))?,
            None => anyhow::bail!("No script given. Pass --code or --code-file."),
        };
        if code.trim().is_empty() {
            anyhow::bail!("Script is empty.");
        }
        Ok(code)
    }
}

#[derive(Args)]
struct EvalArgs {
    /// JSON or NDJSON file, bound to `data`
    file: PathBuf,

    #[command(flatten)]
    code: CodeArgs,
}

#[derive(Args)]
struct MultiEvalArgs {
    /// JSON or NDJSON files; `data` is the array of their contents in this order
    #[arg(required = true, num_args = 1..)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    code: CodeArgs,
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&text)
}

fn engine_config(cli: &Cli) -> EngineConfig {
    let config = EngineConfig::from_env();
    match cli.timeout_ms {
        Some(ms) => config.with_timeout(Duration::from_millis(ms.max(1))),
        None => config,
    }
}

async fn dispatch(tools: &JsonTools, command: Commands) -> Result<Result<(), EngineError>> {
    match command {
        Commands::Query(args) => match tools.query(&args.file, &args.json_path, args.count).await {
            Ok(values) => print_json(&values, args.pretty).map(Ok),
            Err(err) => Ok(Err(err)),
        },
        Commands::Nodes(args) => match tools.nodes(&args.file, &args.json_path, args.count).await {
            Ok(nodes) => print_json(&nodes, args.pretty).map(Ok),
            Err(err) => Ok(Err(err)),
        },
        Commands::Eval(args) => {
            let code = args.code.load()?;
            match tools.eval(&args.file, &code).await {
                Ok(report) => print_stdout(&report.render_text()).map(Ok),
                Err(err) => Ok(Err(err)),
            }
        }
        Commands::MultiEval(args) => {
            let code = args.code.load()?;
            match tools.multi_eval(&args.files, &code).await {
                Ok(report) => print_stdout(&report.render_text()).map(Ok),
                Err(err) => Ok(Err(err)),
            }
        }
    }
}

pub async fn main_entry() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let tools = JsonTools::new(engine_config(&cli));
    log::debug!("script budget {} ms", tools.config().timeout.as_millis());

    match dispatch(&tools, cli.command).await? {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("{}", err.to_envelope().render_text());
            Ok(ExitCode::FAILURE)
        }
    }
}
