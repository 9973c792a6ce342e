//! Halldyll stacks CLI entrypoint.
//!
//! This is the main entrypoint for the halldyll-stacks command-line tool.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use halldyll_deploy_stacks::cli::{Cli, Commands, LogFormat, OutputFormatter};
use halldyll_deploy_stacks::config::{
    AutoConfirm, ConfigParser, ConfigValidator, Confirmer, PromptConfirmer, StackDeployConfig,
    ValidationResult, find_config_file,
};
use halldyll_deploy_stacks::error::Result;
use halldyll_deploy_stacks::orchestrator::StackDeployer;
use halldyll_deploy_stacks::stack::{
    CancelSignal, CloudFormationProvider, EventSummary, OutputExtractor, StackExistenceProbe,
    StackProvider,
};

use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", formatter.format_error(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over the verbosity flag when set.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { remote } => cmd_validate(config_path, remote, formatter).await,
        Commands::Deploy {
            yes,
            timeout,
            no_wait,
        } => cmd_deploy(config_path, yes, timeout, no_wait, formatter).await,
        Commands::Delete {
            yes,
            timeout,
            no_wait,
        } => cmd_delete(config_path, yes, timeout, no_wait, formatter).await,
        Commands::Status => cmd_status(config_path, formatter).await,
        Commands::Events { limit } => cmd_events(config_path, limit, formatter).await,
        Commands::Outputs => cmd_outputs(config_path, formatter).await,
    }
}

/// A loaded, structurally valid configuration.
struct Loaded {
    config: StackDeployConfig,
    validation: ValidationResult,
    parser: ConfigParser,
}

/// Initialize a new project.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new stack project in: {}", path.display());

    let files: [(&str, &str); 3] = [
        (
            "halldyll.stack.yaml",
            include_str!("../templates/halldyll.stack.yaml"),
        ),
        ("template.yaml", include_str!("../templates/template.yaml")),
        (".env.example", include_str!("../templates/.env.example")),
    ];

    let config_path = path.join(files[0].0);
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    for (name, contents) in files {
        let target = path.join(name);
        if !force && target.exists() {
            eprintln!("Skipped (exists): {}", target.display());
            continue;
        }
        std::fs::write(&target, contents)?;
        eprintln!("Created: {}", target.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and set your AWS profile or region");
    eprintln!("  2. Edit halldyll.stack.yaml and replace the placeholder parameters");
    eprintln!("  3. Run 'halldyll-stacks validate --remote' to check the template");
    eprintln!("  4. Run 'halldyll-stacks deploy' to create the stack");

    Ok(())
}

/// Validate configuration and optionally the template.
async fn cmd_validate(
    config_path: Option<&Path>,
    remote: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let loaded = load_config(config_path)?;
    let template = loaded.parser.load_template(&loaded.config)?;

    if remote {
        let provider = create_provider(&loaded.config).await;
        provider.validate_template(&template).await?;
        info!("Template validated successfully!");
    }

    emit(&formatter.format_validation(
        &loaded.config,
        &loaded.validation,
        template.len(),
        remote,
    ))
}

/// Create or update the stack.
async fn cmd_deploy(
    config_path: Option<&Path>,
    yes: bool,
    timeout: Option<u64>,
    no_wait: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let loaded = load_config(config_path)?;
    let template = loaded.parser.load_template(&loaded.config)?;
    let request = loaded.config.to_request(template);

    let provider = create_provider(&loaded.config).await;
    let deployer = build_deployer(&provider, &loaded.config, timeout, no_wait);

    let mut confirmer: Box<dyn Confirmer> = if yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(PromptConfirmer::stdio())
    };

    let report = deployer.deploy(&request, confirmer.as_mut()).await?;
    emit(&formatter.format_deploy(&report))
}

/// Delete the stack.
async fn cmd_delete(
    config_path: Option<&Path>,
    yes: bool,
    timeout: Option<u64>,
    no_wait: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let loaded = load_config(config_path)?;
    let stack_name = loaded.config.stack.name.clone();

    if !yes && !confirm(&format!(
        "Delete stack {stack_name} and all its resources? [y/N]: "
    ))? {
        eprintln!("Delete cancelled.");
        return Ok(());
    }

    let provider = create_provider(&loaded.config).await;
    let report = build_deployer(&provider, &loaded.config, timeout, no_wait)
        .destroy(&stack_name)
        .await?;
    emit(&formatter.format_delete(&report))
}

/// Show the current stack status.
async fn cmd_status(config_path: Option<&Path>, formatter: &OutputFormatter) -> Result<()> {
    let loaded = load_config(config_path)?;
    let provider = create_provider(&loaded.config).await;

    let presence = StackExistenceProbe::new(&provider)
        .probe(&loaded.config.stack.name)
        .await?;
    emit(&formatter.format_status(&loaded.config.stack.name, &presence))
}

/// Show recent stack events.
async fn cmd_events(
    config_path: Option<&Path>,
    limit: Option<usize>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let loaded = load_config(config_path)?;
    let provider = create_provider(&loaded.config).await;
    let limit = limit.unwrap_or(loaded.config.diagnostics.event_limit);

    let events = provider.list_events(&loaded.config.stack.name).await?;
    let summary = EventSummary::from_events(&events, limit);
    emit(&formatter.format_events(&summary))
}

/// Show stack outputs.
async fn cmd_outputs(config_path: Option<&Path>, formatter: &OutputFormatter) -> Result<()> {
    let loaded = load_config(config_path)?;
    let provider = create_provider(&loaded.config).await;

    let outputs = OutputExtractor::new(&provider)
        .extract(&loaded.config.stack.name)
        .await?;
    emit(&formatter.format_outputs(&outputs))
}

/// Resolves, loads, and validates the configuration file.
fn load_config(config_path: Option<&Path>) -> Result<Loaded> {
    let config_file = resolve_config_path(config_path)?;
    let base = config_file
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    let validation = ConfigValidator::new().validate(&config)?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    Ok(Loaded {
        config,
        validation,
        parser,
    })
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    find_config_file(cwd)
}

async fn create_provider(config: &StackDeployConfig) -> CloudFormationProvider {
    CloudFormationProvider::new(config.stack.region.as_deref()).await
}

fn build_deployer<'a>(
    provider: &'a CloudFormationProvider,
    config: &StackDeployConfig,
    timeout: Option<u64>,
    no_wait: bool,
) -> StackDeployer<'a, CloudFormationProvider> {
    let mut deployer = StackDeployer::new(provider, config)
        .with_cancellation(cancellation_signal())
        .with_wait(!no_wait);

    if let Some(secs) = timeout {
        debug!("Overriding polling timeout: {secs}s");
        deployer = deployer.with_polling(config.polling.clone().with_timeout_secs(secs));
    }
    deployer
}

/// Flips to `true` on Ctrl-C. Observation stops; the remote operation does not.
fn cancellation_signal() -> CancelSignal {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping observation; the stack operation keeps running");
            let _ = tx.send(true);
        }
    });
    rx
}

/// Asks a yes/no question on the terminal.
fn confirm(question: &str) -> Result<bool> {
    eprint!("{question}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Writes a rendered report to stdout.
fn emit(rendered: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
