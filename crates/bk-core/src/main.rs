//! Banker - deadlock avoidance for a fixed pool of processes and resources
//!
//! The main entry point for the `banker` CLI, handling:
//! - Loading and validating resource-accounting states
//! - Need derivation and safety analysis
//! - Request evaluation, optionally adopting a granted state in place

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use bk_common::error::{format_error_human, StructuredError};
use bk_common::{Error, OutputFormat, ProcessMatrix, Request, Result, Shape, Units};
use bk_config::{
    get_preset, list_presets, resolve_state_path, validate_state, PresetInfo, PresetName,
    StateFile, StateSnapshot, StateSource, SystemShape, STATE_SCHEMA_VERSION,
};
use bk_core::banker::{analyze_safety, derive_need, RequestResult, SafetyResult};
use bk_core::exit_codes::ExitCode;
use bk_core::log_event;
use bk_core::logging::{
    event_names, generate_run_id, get_host_id, init_logging, LogConfig, LogContext, LogFormat,
    Stage,
};
use bk_core::output::{self, Envelope};
use bk_core::Ledger;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::field::display;

/// Banker's algorithm - check states for safety and evaluate resource requests
#[derive(Parser)]
#[command(name = "banker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// State file (falls back to BANKER_STATE, then BANKER_CONFIG_DIR and XDG config)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Use a built-in state instead of a file (see `banker presets`)
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a zero-filled state for a new system shape
    Init(InitArgs),

    /// List built-in states
    Presets,

    /// Validate the state (shapes, signs, claims, conservation)
    Validate,

    /// Print the need matrix (max - allocation)
    Need,

    /// Derive need and decide whether the state is safe
    Check,

    /// Evaluate a resource request from one process
    Request(RequestArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Number of processes
    #[arg(long, short = 'p')]
    processes: usize,

    /// Number of resource types
    #[arg(long, short = 'r')]
    resources: usize,

    /// Write the state here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Index of the requesting process
    #[arg(long)]
    process: usize,

    /// Units requested per resource type, comma-separated (e.g. 1,0,2)
    #[arg(
        long,
        required = true,
        value_delimiter = ',',
        value_parser = clap::value_parser!(i64).range(0..)
    )]
    resources: Vec<Units>,

    /// On grant, write the new state back to the state file
    #[arg(long)]
    write: bool,
}

/// A validated state and where it came from.
struct LoadedState {
    state: StateFile,
    snapshot: StateSnapshot,
    path: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp
                | clap::error::ErrorKind::DisplayVersion
                | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    ExitCode::Clean
                }
                _ => ExitCode::ArgsError,
            };
            std::process::exit(code.as_i32());
        }
    };

    // JSON payloads on stdout get JSONL logs on stderr.
    let log_format = match cli.global.format {
        OutputFormat::Json => Some(LogFormat::Jsonl),
        _ => None,
    };
    let log_level = LogConfig::level_from_verbosity(cli.global.verbose, cli.global.quiet);
    init_logging(&LogConfig::from_env(log_level, log_format));

    let ctx = LogContext::new(generate_run_id(), get_host_id());
    log_event!(ctx, DEBUG, event_names::RUN_STARTED, Stage::Init, "Starting banker run");

    let exit_code = match &cli.command {
        Commands::Init(args) => run_init(&cli.global, &ctx, args),
        Commands::Presets => run_presets(&cli.global, &ctx),
        Commands::Validate => run_validate(&cli.global, ctx),
        Commands::Need => run_need(&cli.global, ctx),
        Commands::Check => run_check(&cli.global, ctx),
        Commands::Request(args) => run_request(&cli.global, ctx, args),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// State loading
// ============================================================================

fn load_state(global: &GlobalOpts, ctx: &LogContext) -> Result<LoadedState> {
    if let Some(name) = &global.preset {
        let preset: PresetName = name.parse()?;
        let state = get_preset(preset);
        let snapshot = StateSnapshot::capture(&state, StateSource::Preset, None);
        return Ok(LoadedState {
            state,
            snapshot,
            path: None,
        });
    }

    let resolved = resolve_state_path(global.state.as_deref());
    let path = resolved.path.ok_or_else(|| {
        Error::Config(
            "no state given: pass --state or --preset, or set BANKER_STATE".to_string(),
        )
    })?;
    log_event!(
        ctx,
        DEBUG,
        event_names::STATE_RESOLVED,
        Stage::Load,
        "State path resolved",
        path = display(path.display()),
        source = display(resolved.source)
    );

    let state = StateFile::load(&path)?;
    validate_state(&state)?;
    let snapshot = StateSnapshot::capture(&state, resolved.source, Some(&path));
    Ok(LoadedState {
        state,
        snapshot,
        path: Some(path),
    })
}

/// Load the state and attach its ID to the log context.
fn load_for(
    global: &GlobalOpts,
    ctx: LogContext,
) -> std::result::Result<(LoadedState, LogContext), ExitCode> {
    match load_state(global, &ctx) {
        Ok(loaded) => {
            let ctx = ctx.with_state_id(loaded.snapshot.state_id());
            log_event!(
                ctx,
                DEBUG,
                event_names::STATE_LOADED,
                Stage::Load,
                "State loaded",
                shape = display(loaded.snapshot.shape),
                source = display(&loaded.snapshot.source)
            );
            Ok((loaded, ctx))
        }
        Err(err) => {
            log_event!(
                ctx,
                WARN,
                event_names::STATE_INVALID,
                Stage::Load,
                "State could not be loaded",
                code = err.code()
            );
            Err(output_error(global, &err))
        }
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_init(global: &GlobalOpts, ctx: &LogContext, args: &InitArgs) -> ExitCode {
    let shape = SystemShape::new(args.processes, args.resources);
    if let Err(e) = shape.validate() {
        return output_error(global, &Error::Config(e.to_string()));
    }
    let state = shape.zeroed_state();

    if let Some(path) = &args.output {
        if let Err(e) = std::fs::write(path, state.to_json_pretty()) {
            return output_error(global, &Error::Io(e));
        }
        log_event!(
            ctx,
            INFO,
            event_names::RUN_FINISHED,
            Stage::Report,
            "Zero-filled state written",
            path = display(path.display())
        );
    }

    match global.format {
        OutputFormat::Json if args.output.is_none() => println!("{}", state.to_json_pretty()),
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "written": args.output.as_ref().map(|p| p.display().to_string()),
                "shape": shape.as_shape(),
            });
            println!("{}", Envelope::new(&ctx.run_id, "init", payload).to_json_pretty());
        }
        OutputFormat::Md => {
            println!("# Initial State ({})", shape.as_shape());
            println!();
            println!("```json\n{}\n```", state.to_json_pretty());
        }
        OutputFormat::Summary => println!("zero-filled {} state", shape.as_shape()),
        OutputFormat::Exitcode => {}
    }
    ExitCode::Clean
}

#[derive(Serialize)]
struct PresetsPayload {
    presets: Vec<PresetInfo>,
}

fn run_presets(global: &GlobalOpts, ctx: &LogContext) -> ExitCode {
    let presets = list_presets();
    match global.format {
        OutputFormat::Json => {
            let env = Envelope::new(&ctx.run_id, "presets", PresetsPayload { presets });
            println!("{}", env.to_json_pretty());
        }
        OutputFormat::Md => print!("{}", output::presets_markdown(&presets)),
        OutputFormat::Summary => {
            let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
            println!("presets: {}", names.join(", "));
        }
        OutputFormat::Exitcode => {}
    }
    ExitCode::Clean
}

#[derive(Serialize)]
struct ValidatePayload {
    status: &'static str,
    shape: Shape,
    conservation_checked: bool,
}

fn run_validate(global: &GlobalOpts, ctx: LogContext) -> ExitCode {
    let (loaded, ctx) = match load_for(global, ctx) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let payload = ValidatePayload {
        status: "valid",
        shape: loaded.snapshot.shape,
        conservation_checked: loaded.state.total.is_some(),
    };

    match global.format {
        OutputFormat::Json => {
            let env = Envelope::new(&ctx.run_id, "validate", payload).with_snapshot(&loaded.snapshot);
            println!("{}", env.to_json_pretty());
        }
        OutputFormat::Md => {
            println!("# State Validation");
            println!();
            println!("Status: ✓ Valid");
            println!("Shape: {}", payload.shape);
            if let Some(path) = &loaded.path {
                println!("Path: {}", path.display());
            } else {
                println!("Source: {}", loaded.snapshot.source);
            }
        }
        OutputFormat::Summary => println!("[{}] validate: OK ({})", ctx.run_id, payload.shape),
        OutputFormat::Exitcode => {}
    }
    ExitCode::Clean
}

#[derive(Serialize)]
struct NeedPayload {
    shape: Shape,
    need: ProcessMatrix,
}

fn run_need(global: &GlobalOpts, ctx: LogContext) -> ExitCode {
    let (loaded, ctx) = match load_for(global, ctx) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let need = match derive_need(&loaded.state.allocation, &loaded.state.max) {
        Ok(need) => need,
        Err(e) => return output_error(global, &e),
    };
    log_event!(ctx, DEBUG, event_names::NEED_DERIVED, Stage::Derive, "Need derived");

    let shape = loaded.snapshot.shape;
    match global.format {
        OutputFormat::Json => {
            let env = Envelope::new(&ctx.run_id, "need", NeedPayload { shape, need })
                .with_snapshot(&loaded.snapshot);
            println!("{}", env.to_json_pretty());
        }
        OutputFormat::Md => print!("{}", output::need_markdown(&need, shape.resources)),
        OutputFormat::Summary => println!("{}", output::need_summary(&need)),
        OutputFormat::Exitcode => {}
    }
    ExitCode::Clean
}

#[derive(Serialize)]
struct CheckPayload<'a> {
    shape: Shape,
    need: &'a ProcessMatrix,
    #[serde(flatten)]
    result: &'a SafetyResult,
}

fn run_check(global: &GlobalOpts, ctx: LogContext) -> ExitCode {
    let (loaded, ctx) = match load_for(global, ctx) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let state = &loaded.state;
    let need = match derive_need(&state.allocation, &state.max) {
        Ok(need) => need,
        Err(e) => return output_error(global, &e),
    };
    let result = match analyze_safety(&state.available, &state.allocation, &need) {
        Ok(result) => result,
        Err(e) => return output_error(global, &e),
    };
    log_event!(
        ctx,
        INFO,
        event_names::SAFETY_VERDICT,
        Stage::Analyze,
        "Safety analysis complete",
        safe = result.is_safe()
    );

    let shape = loaded.snapshot.shape;
    match global.format {
        OutputFormat::Json => {
            let payload = CheckPayload {
                shape,
                need: &need,
                result: &result,
            };
            let env = Envelope::new(&ctx.run_id, "check", payload).with_snapshot(&loaded.snapshot);
            println!("{}", env.to_json_pretty());
        }
        OutputFormat::Md => print!(
            "{}",
            output::safety_markdown(&result, &need, shape.resources)
        ),
        OutputFormat::Summary => println!("{}", output::safety_summary(&result)),
        OutputFormat::Exitcode => {}
    }
    ExitCode::from_safety(&result)
}

#[derive(Serialize)]
struct RequestPayload<'a> {
    request: &'a Request,
    #[serde(flatten)]
    result: &'a RequestResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_state: Option<&'a StateFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<String>,
}

fn run_request(global: &GlobalOpts, ctx: LogContext, args: &RequestArgs) -> ExitCode {
    let (loaded, ctx) = match load_for(global, ctx) {
        Ok(v) => v,
        Err(code) => return code,
    };
    if args.write && loaded.path.is_none() {
        return output_error(
            global,
            &Error::Config("--write needs a state file, not a preset".to_string()),
        );
    }

    let request = Request::new(args.process, args.resources.clone());
    let mut ledger = match Ledger::from_state(loaded.state.clone()) {
        Ok(ledger) => ledger,
        Err(e) => return output_error(global, &e),
    };
    let result = match ledger.request(&request) {
        Ok(result) => result,
        Err(e) => return output_error(global, &e),
    };
    log_event!(
        ctx,
        INFO,
        event_names::REQUEST_EVALUATED,
        Stage::Evaluate,
        "Request evaluated",
        process = request.process as u64,
        outcome = result.outcome_name()
    );

    // The adopted state keeps max, description and total from the input.
    let next_state = result.is_granted().then(|| StateFile {
        available: ledger.available().clone(),
        allocation: ledger.allocation().clone(),
        ..loaded.state.clone()
    });

    let mut written = None;
    if let (true, Some(next), Some(path)) = (args.write, &next_state, &loaded.path) {
        if let Err(e) = write_state(path, next) {
            return output_error(global, &e);
        }
        log_event!(
            ctx,
            INFO,
            event_names::REQUEST_GRANTED,
            Stage::Commit,
            "Granted state written back",
            path = display(path.display())
        );
        written = Some(path.display().to_string());
    }

    let shape = loaded.snapshot.shape;
    match global.format {
        OutputFormat::Json => {
            let payload = RequestPayload {
                request: &request,
                result: &result,
                next_state: next_state.as_ref(),
                written,
            };
            let env = Envelope::new(&ctx.run_id, "request", payload).with_snapshot(&loaded.snapshot);
            println!("{}", env.to_json_pretty());
        }
        OutputFormat::Md => print!(
            "{}",
            output::request_markdown(&result, request.process, shape.resources)
        ),
        OutputFormat::Summary => println!("{}", output::request_summary(&result, request.process)),
        OutputFormat::Exitcode => {}
    }

    if let Some(reason) = result.denial_reason() {
        log_event!(
            ctx,
            DEBUG,
            event_names::REQUEST_DENIED,
            Stage::Evaluate,
            "Request denied",
            reason = display(&reason)
        );
    }
    ExitCode::from_request(&result)
}

fn write_state(path: &Path, state: &StateFile) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

// ============================================================================
// Shared output helpers
// ============================================================================

fn print_version(global: &GlobalOpts) {
    let version_info = serde_json::json!({
        "banker_version": env!("CARGO_PKG_VERSION"),
        "state_schema_version": STATE_SCHEMA_VERSION,
        "output_schema_version": output::OUTPUT_SCHEMA_VERSION,
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });

    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&version_info).unwrap_or_default()
            );
        }
        OutputFormat::Exitcode => {}
        _ => {
            println!("banker {}", env!("CARGO_PKG_VERSION"));
            println!("state schema version: {}", STATE_SCHEMA_VERSION);
        }
    }
}

/// Report an error on stderr in the requested format and pick the exit code.
fn output_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    let exit_code = ExitCode::from_error(err);
    match global.format {
        OutputFormat::Json => {
            let structured =
                StructuredError::from(err).with_context("exit_code", exit_code.code_name());
            eprintln!("{}", structured.to_json_pretty());
        }
        OutputFormat::Exitcode => {}
        _ => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(err, use_color));
        }
    }
    exit_code
}
