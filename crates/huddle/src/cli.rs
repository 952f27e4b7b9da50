//! Command-line interface handling for the huddle room server.
//!
//! Options given here override the matching settings of the configuration
//! file.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the distance under which two people meet
    pub min_distance: Option<f64>,
    /// Optional override for the radius a group holds its members in
    pub group_radius: Option<f64>,
}

impl CliArgs {
    /// Parses the process arguments.
    ///
    /// Exits with a usage message when an argument is malformed.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list, first item being the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn command() -> Command {
        Command::new("Huddle Room Server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Presence and proximity grouping for shared 2D rooms")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("min-distance")
                    .long("min-distance")
                    .value_name("PIXELS")
                    .help("Distance under which two participants form a group")
                    .value_parser(clap::value_parser!(f64)),
            )
            .arg(
                Arg::new("group-radius")
                    .long("group-radius")
                    .value_name("PIXELS")
                    .help("Distance from the group centre beyond which a member drops out")
                    .value_parser(clap::value_parser!(f64)),
            )
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            min_distance: matches.get_one::<f64>("min-distance").copied(),
            group_radius: matches.get_one::<f64>("group-radius").copied(),
        }
    }
}
