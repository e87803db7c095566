//! Command-line interface for the province economy simulation.

use lexopt::prelude::*;
use std::path::PathBuf;

/// Command-line arguments for the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: Command,
    pub config_file: Option<PathBuf>,
    pub days: u64,
    pub output_file: PathBuf,
    pub snapshot_file: Option<PathBuf>,
    /// (province id, template id) pairs built before the first tick.
    pub builds: Vec<(String, String)>,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run,
    Analyze { file: PathBuf },
    Help,
}

pub const DEFAULT_DAYS: u64 = 100;
pub const DEFAULT_EVENTS_FILE: &str = "simulation_events.json";

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: Command::Run,
            config_file: None,
            days: DEFAULT_DAYS,
            output_file: PathBuf::from(DEFAULT_EVENTS_FILE),
            snapshot_file: None,
            builds: Vec::new(),
            verbose: false,
            quiet: false,
        }
    }
}

impl CliArgs {
    /// Default log filter implied by the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

pub fn parse_args() -> Result<CliArgs, lexopt::Error> {
    parse_from(std::env::args_os().skip(1))
}

pub fn parse_from<I>(args: I) -> Result<CliArgs, lexopt::Error>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString>,
{
    let mut args = lexopt::Parser::from_args(args);
    let mut cli_args = CliArgs::default();
    let mut subcommand = None;
    let mut analyze_file = None;

    while let Some(arg) = args.next()? {
        match arg {
            Value(val) => {
                let val_str = val.string()?;
                if subcommand.is_none() {
                    subcommand = Some(val_str);
                } else if subcommand.as_deref() == Some("analyze") {
                    analyze_file = Some(PathBuf::from(val_str));
                } else {
                    return Err(lexopt::Error::from(format!("Unexpected argument {}", val_str)));
                }
            }
            Long("config") | Short('c') => {
                cli_args.config_file = Some(PathBuf::from(args.value()?.string()?));
            }
            Long("days") | Short('d') => {
                cli_args.days = args.value()?.parse()?;
            }
            Long("output") | Short('o') => {
                cli_args.output_file = PathBuf::from(args.value()?.string()?);
            }
            Long("snapshot") => {
                cli_args.snapshot_file = Some(PathBuf::from(args.value()?.string()?));
            }
            Long("build") | Short('b') => {
                let build = args.value()?.string()?;
                match build.split_once(':') {
                    Some((province, template)) if !province.is_empty() && !template.is_empty() => {
                        cli_args
                            .builds
                            .push((province.to_string(), template.to_string()));
                    }
                    _ => {
                        return Err(lexopt::Error::from(format!(
                            "Invalid build '{}', expected PROVINCE:TEMPLATE",
                            build
                        )));
                    }
                }
            }
            Long("verbose") | Short('v') => cli_args.verbose = true,
            Long("quiet") | Short('q') => cli_args.quiet = true,
            Long("help") | Short('h') => {
                cli_args.command = Command::Help;
                return Ok(cli_args);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    cli_args.command = match subcommand.as_deref() {
        Some("run") | None => Command::Run,
        Some("analyze") => Command::Analyze {
            file: analyze_file.unwrap_or_else(|| PathBuf::from(DEFAULT_EVENTS_FILE)),
        },
        Some("help") => Command::Help,
        Some(cmd) => return Err(lexopt::Error::from(format!("Unknown command: {}", cmd))),
    };

    Ok(cli_args)
}

pub fn print_help() {
    println!("\nProvince Economy Simulation\n");
    println!("USAGE:");
    println!("    province-economy-sim [COMMAND] [OPTIONS]\n");

    println!("COMMANDS:");
    println!("    run              Run the simulation (default)");
    println!("    analyze [FILE]   Print metrics for a saved event log\n");

    println!("SIMULATION OPTIONS:");
    println!("    -c, --config <FILE>        Load configuration from JSON or YAML");
    println!("                               (default: built-in standard world)");
    println!("    -d, --days <N>             Number of days to simulate (default: {})", DEFAULT_DAYS);
    println!("    -b, --build <P:T>          Construct template T in province P before day 1");
    println!("                               (can be used multiple times)\n");

    println!("OUTPUT OPTIONS:");
    println!("    -o, --output <FILE>        Write events to FILE (default: {})", DEFAULT_EVENTS_FILE);
    println!("    --snapshot <FILE>          Write final province snapshots as JSON");
    println!("    -v, --verbose              Enable debug logging");
    println!("    -q, --quiet                Only log warnings");
    println!("    -h, --help                 Print help information\n");

    println!("EXAMPLES:");
    println!("    province-economy-sim run --days 365 -b northmarch:IronMine");
    println!("    province-economy-sim run --config world.yaml --snapshot final.json");
    println!("    province-economy-sim analyze simulation_events.json");
}
