use backport_py::fs::transfer_dir;
use backport_py::fs::transfer_file;
use backport_py::fs::BatchPolicy;
use backport_py::hook::BuildHook;
use backport_py::pipeline::TargetVersion;
use backport_py::watch::WatchSession;
use backport_py::TransferError;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use parse_py::ast::node::Node;
use parse_py::ast::stmt::Module;
use serde::Serialize;
use std::fs;
use std::io;
use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use symbol_py::compute_scopes;
use symbol_py::ScopeData;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(author, version, about = "Backports newer Python syntax to older Python versions")]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Most verbose log level written to stderr.
  #[arg(long, global = true, default_value = "warn")]
  log_level: Level,

  /// Write logs as JSON, including span timings.
  #[arg(long, global = true)]
  json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Backport one file, in place unless an output is given.
  Transfer(TransferArgs),
  /// Backport every `*.py` file under a directory into another directory.
  TransferDir(TransferDirArgs),
  /// Keep a backported copy of a file up to date.
  Watch(WatchArgs),
  /// Keep a backported copy of a directory up to date.
  WatchDir(WatchArgs),
  /// Run the build hook for a project and print the plan as JSON.
  Build(BuildArgs),
  /// Print the syntax tree of a file as JSON.
  Parse(ParseArgs),
}

#[derive(Args)]
struct TargetArg {
  /// Oldest Python version the output must run on, e.g. 3.8 or py39.
  #[arg(short, long, default_value = "3.8")]
  target: TargetVersion,
}

#[derive(Args)]
struct TransferArgs {
  src: PathBuf,

  #[arg(short, long)]
  output: Option<PathBuf>,

  #[command(flatten)]
  target: TargetArg,
}

#[derive(Args)]
struct TransferDirArgs {
  src: PathBuf,
  dst: PathBuf,

  #[command(flatten)]
  target: TargetArg,

  /// Carry on past files that fail and report them at the end.
  #[arg(long)]
  keep_going: bool,
}

#[derive(Args)]
struct WatchArgs {
  src: PathBuf,
  dst: PathBuf,

  #[command(flatten)]
  target: TargetArg,

  #[arg(long, default_value_t = 500)]
  interval_ms: u64,
}

#[derive(Args)]
struct BuildArgs {
  #[arg(long, default_value = ".")]
  project_dir: PathBuf,

  #[arg(long)]
  build_dir: PathBuf,
}

#[derive(Args)]
struct ParseArgs {
  file: PathBuf,

  /// Include the resolved scopes.
  #[arg(long)]
  scopes: bool,
}

#[derive(Serialize)]
struct ParseOutput<'a> {
  ast: &'a Node<Module>,
  #[serde(skip_serializing_if = "Option::is_none")]
  scopes: Option<&'a [ScopeData]>,
}

fn init_tracing(level: Level, json: bool) {
  let builder = tracing_subscriber::fmt()
    .with_max_level(level)
    .with_writer(io::stderr);
  let _ = if json {
    builder
      .with_span_events(FmtSpan::CLOSE)
      .json()
      .with_ansi(false)
      .try_init()
  } else {
    builder.try_init()
  };
}

fn write_json<T: Serialize>(value: &T) -> Result<(), TransferError> {
  serde_json::to_writer_pretty(stdout(), value).map_err(|e| TransferError::io("<stdout>", e.into()))?;
  println!();
  Ok(())
}

fn run(command: Commands) -> Result<ExitCode, TransferError> {
  match command {
    Commands::Transfer(args) => {
      let dst = args.output.as_ref().unwrap_or(&args.src);
      transfer_file(&args.src, dst, args.target.target)?;
    }
    Commands::TransferDir(args) => {
      let policy = if args.keep_going {
        BatchPolicy::Continue
      } else {
        BatchPolicy::Abort
      };
      let report = transfer_dir(&args.src, &args.dst, args.target.target, policy)?;
      for (path, err) in report.failed.iter() {
        eprintln!("{}: {err}", path.display());
      }
      if !report.is_success() {
        return Ok(ExitCode::FAILURE);
      };
    }
    Commands::Watch(args) => {
      let mut session = WatchSession::file(args.src, args.dst, args.target.target);
      session.run(Duration::from_millis(args.interval_ms), || false)?;
    }
    Commands::WatchDir(args) => {
      let mut session = WatchSession::dir(args.src, args.dst, args.target.target);
      session.run(Duration::from_millis(args.interval_ms), || false)?;
    }
    Commands::Build(args) => {
      let hook = BuildHook::load(&args.project_dir)?;
      let plan = hook.run(&args.build_dir)?;
      write_json(&plan)?;
    }
    Commands::Parse(args) => {
      let source = fs::read_to_string(&args.file).map_err(|e| TransferError::io(&args.file, e))?;
      let module = parse_py::parse(&source)?;
      let scopes = args.scopes.then(|| compute_scopes(&module));
      write_json(&ParseOutput {
        ast: &module,
        scopes: scopes.as_ref().map(|s| s.scopes()),
      })?;
    }
  };
  Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.log_level, cli.json_logs);
  match run(cli.command) {
    Ok(code) => code,
    Err(err) => {
      eprintln!("error: {err}");
      ExitCode::FAILURE
    }
  }
}
