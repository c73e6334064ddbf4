//! `pmsi` command-line front end
//!
//! Subcommands:
//! - `dump`: decode files and write the JSON stay document
//! - `pack`: decode files and save a stay pack
//! - `summary`: print stay, error and flag counts

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod summary;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::{CliConfig, LogFormat};
use pmsi_stays::pack::save_pack;
use pmsi_stays::{write_json, LoadSummary, StaySet, StaySetBuilder, StayTests};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use summary::StaySummary;
use tracing_subscriber::EnvFilter;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn files_arg() -> Arg {
    Arg::new("files")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help("Stay files (.rss, .grp, .rsa, .txt, .dmpak, .json, optionally .gz)")
}

/// Build the command-line definition
#[must_use]
pub fn build_cli() -> Command {
    Command::new("pmsi")
        .version(VERSION)
        .about("Decode MCO hospital stay files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More logging (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only log errors"),
        )
        .subcommand(
            Command::new("dump")
                .about("Write decoded stays as JSON")
                .arg(files_arg())
                .arg(
                    Arg::new("tests")
                        .long("tests")
                        .action(ArgAction::SetTrue)
                        .help("Include reference grouping results"),
                )
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .action(ArgAction::SetTrue)
                        .help("Pretty-print JSON"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file (default: stdout)"),
                ),
        )
        .subcommand(
            Command::new("pack")
                .about("Save decoded stays as a stay pack")
                .arg(files_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Pack file (.dmpak, optionally .gz)"),
                ),
        )
        .subcommand(
            Command::new("summary")
                .about("Print stay, error and flag counts")
                .arg(files_arg())
                .arg(
                    Arg::new("tests")
                        .long("tests")
                        .action(ArgAction::SetTrue)
                        .help("Also count reference grouping results"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

/// Read the configuration named by `--config`, or defaults
///
/// # Errors
/// Fails when the file cannot be read or parsed.
pub fn load_config(matches: &ArgMatches) -> anyhow::Result<CliConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => CliConfig::load(path),
        None => Ok(CliConfig::new()),
    }
}

/// Tracing filter: `RUST_LOG`, then `-v`/`-q`, then the configured level
#[must_use]
pub fn log_filter(matches: &ArgMatches, config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match (matches.get_count("verbose"), matches.get_flag("quiet")) {
            (_, true) => "error",
            (0, false) => config.log_level.as_str(),
            (1, false) => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    })
}

/// Install the global subscriber, logging to stderr
pub fn init_tracing(matches: &ArgMatches, config: &CliConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(matches, config))
        .with_writer(std::io::stderr);

    let result = match config.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(err) = result {
        eprintln!("warning: cannot install log subscriber: {err}");
    }
}

/// Run the selected subcommand
///
/// Returns `false` when the run should exit with a failure status while
/// output was still produced.
///
/// # Errors
/// Fails when output cannot be written.
pub fn run(matches: &ArgMatches, config: &CliConfig) -> anyhow::Result<bool> {
    match matches.subcommand() {
        Some(("dump", args)) => {
            let want_tests = args.get_flag("tests") || config.tests;
            let pretty = args.get_flag("pretty") || config.pretty;
            let (set, tests, summary) = load_inputs(args, want_tests);

            let mut writer: Box<dyn Write> = match args.get_one::<PathBuf>("output") {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
                )),
                None => Box::new(std::io::stdout().lock()),
            };
            write_json(&mut writer, &set.stays, tests.as_ref(), pretty).context("cannot write JSON output")?;
            writer.flush().context("cannot write JSON output")?;

            Ok(succeeded(&summary, config))
        }
        Some(("pack", args)) => {
            let (set, _, summary) = load_inputs(args, false);
            let Some(output) = args.get_one::<PathBuf>("output") else {
                anyhow::bail!("missing --output");
            };
            save_pack(output, &set.stays).with_context(|| format!("cannot save pack {}", output.display()))?;
            tracing::info!(path = %output.display(), stays = set.len(), "pack saved");

            Ok(succeeded(&summary, config))
        }
        Some(("summary", args)) => {
            let want_tests = args.get_flag("tests") || config.tests;
            let (set, tests, summary) = load_inputs(args, want_tests);
            let stats = StaySummary::compute(&set, tests.as_ref());

            let mut stdout = std::io::stdout().lock();
            if args.get_flag("json") {
                serde_json::to_writer_pretty(&mut stdout, &stats)?;
                writeln!(stdout)?;
            } else {
                write!(stdout, "{}", stats.render_text())?;
            }

            Ok(succeeded(&summary, config))
        }
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given"),
    }
}

/// Load every input file of a subcommand
fn load_inputs(args: &ArgMatches, want_tests: bool) -> (StaySet, Option<StayTests>, LoadSummary) {
    let files: Vec<PathBuf> = args
        .get_many::<PathBuf>("files")
        .map(|files| files.cloned().collect())
        .unwrap_or_default();

    let mut builder = StaySetBuilder::new();
    let mut tests = want_tests.then(StayTests::new);
    let summary = builder.load_files(&files, tests.as_mut());
    let set = builder.finish();

    tracing::info!(
        files = summary.files_loaded,
        failed = summary.failed.len(),
        stays = set.len(),
        line_errors = summary.line_errors,
        "inputs loaded"
    );
    (set, tests, summary)
}

fn succeeded(summary: &LoadSummary, config: &CliConfig) -> bool {
    if !summary.is_success() {
        return false;
    }
    !(config.fail_on_line_errors && summary.line_errors > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["pmsi", "dump", "a.rss", "-vv", "--pretty"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        let (_, args) = matches.subcommand().unwrap();
        assert!(args.get_flag("pretty"));
    }

    #[test]
    fn pack_requires_output() {
        assert!(build_cli().try_get_matches_from(["pmsi", "pack", "a.rss"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(build_cli()
            .try_get_matches_from(["pmsi", "-q", "-v", "summary", "a.rss"])
            .is_err());
    }

    #[test]
    fn line_errors_fail_only_when_configured() {
        let summary = LoadSummary {
            files_loaded: 1,
            line_errors: 3,
            ..LoadSummary::default()
        };
        assert!(succeeded(&summary, &CliConfig::new()));
        assert!(!succeeded(&summary, &CliConfig::new().with_fail_on_line_errors(true)));

        let failed = LoadSummary {
            failed: vec![PathBuf::from("x.rss")],
            ..LoadSummary::default()
        };
        assert!(!succeeded(&failed, &CliConfig::new()));
    }
}
