use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use fw_release::cli::{self, BuildTarget, PublishWorkflowArgs};
use fw_release::config::{self, Settings};
use fw_release::env_file;
use fw_release::git::{Git2Repository, Repository};
use fw_release::process::SystemRunner;
use fw_release::resolver::ConfigResolver;
use fw_release::ui::{self, Stage};
use fw_release::version::VersionStrings;

#[derive(Parser)]
#[command(
    name = "fw-release",
    version,
    about = "Stamp firmware builds with a build number and publish release artifacts"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom settings file path")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        default_value = ".",
        help = "Firmware project root"
    )]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-build hook: bump the build counter and print the version constants
    Stamp {
        #[arg(short, long, help = "Build environment name")]
        env: String,

        #[arg(long, value_enum, default_value_t = StampFormat::Flags)]
        format: StampFormat,
    },
    /// Post-build hook: publish the artifact of a release build and optionally tag it
    Publish {
        #[arg(short, long, help = "Build environment name")]
        env: String,

        #[arg(long, help = "Artifact directory (default: <build_root>/<env>)")]
        build_dir: Option<PathBuf>,

        #[arg(long, help = "Show what would run without publishing or tagging")]
        dry_run: bool,
    },
    /// Print the resolved publish configuration
    ShowConfig {
        #[arg(short, long, help = "Build environment name")]
        env: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StampFormat {
    /// -DFW_VERSION="…" lines followed by PROGNAME=…
    Flags,
    /// KEY=value lines
    Env,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match config::load_settings(args.config.as_deref(), &args.project_dir) {
        Ok(settings) => settings,
        Err(e) => {
            // Publishing must never break the build; fall back to defaults.
            ui::display_warning(Stage::Publish, &format!("{}; using defaults", e));
            Settings::default()
        }
    };

    match args.command {
        Commands::Stamp { env, format } => stamp(&args.project_dir, env, format, &settings),
        Commands::Publish {
            env,
            build_dir,
            dry_run,
        } => {
            publish(&args.project_dir, env, build_dir, dry_run, &settings);
            Ok(())
        }
        Commands::ShowConfig { env } => show_config(&args.project_dir, &env, &settings),
    }
}

fn open_repository(project_dir: &Path) -> Option<Git2Repository> {
    Git2Repository::open(project_dir).ok()
}

fn stamp(project_dir: &Path, env: String, format: StampFormat, settings: &Settings) -> Result<()> {
    let target = BuildTarget {
        project_root: project_dir.to_path_buf(),
        environment_name: env,
    };
    let repo = open_repository(project_dir);
    let strings = cli::run_stamp_workflow(
        &target,
        settings,
        repo.as_ref().map(|r| r as &dyn Repository),
    )
    .context("Failed to persist the build counter")?;

    print_stamp(&strings, format)
}

fn print_stamp(strings: &VersionStrings, format: StampFormat) -> Result<()> {
    match format {
        StampFormat::Flags => {
            for flag in strings.build_flags() {
                println!("{}", flag);
            }
            println!("PROGNAME={}", strings.program_name);
        }
        StampFormat::Env => {
            println!("FW_VERSION={}", strings.long);
            println!("FW_VERSION_SHORT={}", strings.short);
            println!("PROGNAME={}", strings.program_name);
        }
        StampFormat::Json => println!("{}", serde_json::to_string_pretty(strings)?),
    }
    Ok(())
}

fn publish(
    project_dir: &Path,
    env: String,
    build_dir: Option<PathBuf>,
    dry_run: bool,
    settings: &Settings,
) {
    let args = PublishWorkflowArgs {
        target: BuildTarget {
            project_root: project_dir.to_path_buf(),
            environment_name: env,
        },
        build_dir,
        dry_run,
    };
    let repo = open_repository(project_dir);
    let process_env = env_file::process_env();

    cli::run_publish_workflow(
        &args,
        settings,
        process_env,
        &SystemRunner::streaming(),
        repo.as_ref().map(|r| r as &dyn Repository),
    );
}

fn show_config(project_dir: &Path, env: &str, settings: &Settings) -> Result<()> {
    let resolution = ConfigResolver::from_process_env(settings).resolve(project_dir, env);
    for warning in &resolution.warnings {
        ui::display_warning(Stage::Publish, warning);
    }

    let report = serde_json::json!({
        "config": resolution.config,
        "publish_eligible": resolution.config.is_publish_eligible(),
        "override_files": resolution.applied_files,
        "build_dir": settings.build_dir(project_dir, env),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
