//! Pyscrub CLI - Command-line interface for the pre-commit formatting pipeline
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like process exit codes and terminal output
//! - Provides clean separation between user interface and business logic

use clap::{Parser, Subcommand, ValueEnum};
use pyscrub::domain::rules::RULES;
use pyscrub::{
    hook, OutputFormat, ReportFormatter, ReportOptions, RunOptions, ScrubConfig, ScrubPipeline,
    ScrubResult, Severity,
};
use std::path::PathBuf;
use std::process;

/// Pyscrub - Pre-commit formatting pipeline for Python sources
#[derive(Parser)]
#[command(name = "pyscrub")]
#[command(version = "0.1.0")]
#[command(about = "Pre-commit formatting pipeline that scrubs and stages Python sources")]
#[command(
    long_about = "Pyscrub collects the Python files in the configured directories, repairs fixable style violations, keeps import blocks ordered, and stages rewritten files so the commit picks them up. Designed to run as a git pre-commit hook."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository root to operate in
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrub the configured directories and stage rewritten files
    Run {
        /// Rewrite files but leave the git index alone
        #[arg(long)]
        no_stage: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Minimum severity level to report
        #[arg(short, long, value_enum)]
        severity: Option<SeverityArg>,

        /// Maximum number of violations to report
        #[arg(long)]
        max_violations: Option<usize>,
    },

    /// Detect violations without rewriting any file
    Check {
        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Minimum severity level to report
        #[arg(short, long, value_enum)]
        severity: Option<SeverityArg>,

        /// Maximum number of violations to report
        #[arg(long)]
        max_violations: Option<usize>,
    },

    /// List the rules in the catalog
    Rules {
        /// Show only enabled rules
        #[arg(long)]
        enabled_only: bool,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn run_command(cli: Cli) -> ScrubResult<i32> {
    let use_colors = !cli.no_color;
    let command = cli.command.unwrap_or(Commands::Run {
        no_stage: false,
        format: OutputFormatArg::Human,
        severity: None,
        max_violations: None,
    });

    match command {
        Commands::Run {
            no_stage,
            format,
            severity,
            max_violations,
        } => run_scrub(
            &cli.root,
            cli.config,
            no_stage,
            format,
            severity,
            max_violations,
            use_colors,
        ),
        Commands::Check {
            format,
            severity,
            max_violations,
        } => run_check(
            &cli.root,
            cli.config,
            format,
            severity,
            max_violations,
            use_colors,
        ),
        Commands::Rules { enabled_only } => run_list_rules(&cli.root, cli.config, enabled_only),
        Commands::ValidateConfig { config_file } => {
            run_validate_config(config_file.or(cli.config))
        }
    }
}

/// Load the configuration the way the hook does: explicit path first, then
/// discovery in the root, then built-in defaults
fn load_config(root: &std::path::Path, config_path: Option<PathBuf>) -> ScrubResult<ScrubConfig> {
    if let Some(path) = config_path {
        return ScrubConfig::load_from_file(path);
    }
    match ScrubConfig::discover_in(root) {
        Some(path) => ScrubConfig::load_from_file(path),
        None => Ok(ScrubConfig::with_defaults()),
    }
}

fn build_pipeline(
    root: &std::path::Path,
    config_path: Option<PathBuf>,
    severity: Option<SeverityArg>,
    max_violations: Option<usize>,
    use_colors: bool,
) -> ScrubResult<ScrubPipeline> {
    let config = load_config(root, config_path)?;
    let pipeline =
        ScrubPipeline::with_config(root, config)?.with_report_formatter(ReportFormatter::new(
            ReportOptions {
                use_colors,
                max_violations,
                min_severity: severity.map(Into::into),
                ..Default::default()
            },
        ));
    Ok(pipeline)
}

fn run_scrub(
    root: &std::path::Path,
    config_path: Option<PathBuf>,
    no_stage: bool,
    format: OutputFormatArg,
    severity: Option<SeverityArg>,
    max_violations: Option<usize>,
    use_colors: bool,
) -> ScrubResult<i32> {
    let pipeline = build_pipeline(root, config_path, severity, max_violations, use_colors)?;

    let options = RunOptions {
        apply_fixes: true,
        stage: !no_stage,
    };
    let report = pipeline.run_with_options(&options)?;

    let formatted = pipeline.format_report(&report, format.into())?;
    println!("{}", formatted);

    Ok(if hook::should_block(&report) { 1 } else { 0 })
}

fn run_check(
    root: &std::path::Path,
    config_path: Option<PathBuf>,
    format: OutputFormatArg,
    severity: Option<SeverityArg>,
    max_violations: Option<usize>,
    use_colors: bool,
) -> ScrubResult<i32> {
    let pipeline = build_pipeline(root, config_path, severity, max_violations, use_colors)?;
    let report = pipeline.check()?;

    let formatted = pipeline.format_report(&report, format.into())?;
    println!("{}", formatted);

    Ok(if hook::should_block(&report) { 1 } else { 0 })
}

fn run_list_rules(
    root: &std::path::Path,
    config_path: Option<PathBuf>,
    enabled_only: bool,
) -> ScrubResult<i32> {
    let config = load_config(root, config_path)?;

    println!("📋 Rule Catalog\n");

    for rule in RULES {
        let enabled = config.rule_enabled(rule.code);
        if enabled_only && !enabled {
            continue;
        }

        let status = if enabled { "✅" } else { "❌" };
        let fix = match rule.fixed_by {
            Some(stage) => stage.as_str(),
            None => "detect only",
        };

        println!(
            "{} {} [{}] ({}) - {}",
            status,
            rule.code,
            rule.severity.as_str(),
            fix,
            rule.summary
        );
    }

    Ok(0)
}

fn run_validate_config(config_path: Option<PathBuf>) -> ScrubResult<i32> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("pyscrub.yaml"));

    println!("Validating configuration: {}", config_path.display());

    match ScrubConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");

            println!("📊 Configuration summary:");
            println!("  Directories: {}", config.paths.directories.join(", "));
            println!("  Exclude patterns: {}", config.paths.exclude.len());
            println!(
                "  Style: line length {}, tab width {}, max blank lines {}",
                config.style.line_length, config.style.tab_width, config.style.max_blank_lines
            );
            println!(
                "  Rules: {} of {} enabled",
                config.enabled_rules().count(),
                RULES.len()
            );

            Ok(0)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {}", e);
            Ok(1)
        }
    }
}

/// The default INFO level covers the per-file progress lines;
/// `--verbose` adds the engines' debug output.
fn log_level(verbose: bool) -> tracing::Level {
    if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    }
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_target(false)
        .init();
}
