#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo binary.
//!
//! Flags are parsed by hand. Environment variables with the `FANOUT_DEMO_*`
//! prefix supply defaults that explicit flags override.

use std::env;
use std::fmt;
use std::process;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
fanout-demo: observer, multicast, mediator and flyweight walkthroughs

USAGE:
    fanout-demo [OPTIONS]

OPTIONS:
    --scenario=NAME      Which walkthrough to run: 'observer', 'multicast',
                         'mediator', 'flyweight' or 'all' (default: all)
    --log-format=FMT     Log output format: 'text' or 'json' (default: text)
    --log-level=LEVEL    Log filter directive when RUST_LOG is unset (default: info)
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT:
    FANOUT_DEMO_SCENARIO     Same as --scenario
    FANOUT_DEMO_LOG_FORMAT   Same as --log-format
    FANOUT_DEMO_LOG_LEVEL    Same as --log-level
    RUST_LOG                 Full tracing filter; wins over --log-level";

/// Walkthrough selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    Observer,
    Multicast,
    Mediator,
    Flyweight,
    #[default]
    All,
}

impl Scenario {
    /// Individual walkthroughs in the order `All` runs them.
    pub const EACH: [Self; 4] = [
        Self::Observer,
        Self::Multicast,
        Self::Mediator,
        Self::Flyweight,
    ];

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "observer" => Some(Self::Observer),
            "multicast" => Some(Self::Multicast),
            "mediator" => Some(Self::Mediator),
            "flyweight" => Some(Self::Flyweight),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Observer => "observer",
            Self::Multicast => "multicast",
            Self::Mediator => "mediator",
            Self::Flyweight => "flyweight",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    pub scenario: Scenario,
    pub log_format: LogFormat,
    /// Filter directive used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            scenario: Scenario::All,
            log_format: LogFormat::Text,
            log_level: "info".into(),
        }
    }
}

/// Why parsing stopped before producing [`Opts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help => f.write_str("help requested"),
            Self::Version => f.write_str("version requested"),
            Self::InvalidValue { flag, value } => write!(f, "invalid {flag} value: {value}"),
            Self::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl Opts {
    /// Parse process arguments and environment, exiting on help, version or
    /// bad input.
    pub fn parse() -> Self {
        match Self::parse_from(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("fanout-demo {VERSION}");
                process::exit(0);
            }
            Err(err @ ParseError::InvalidValue { .. }) => {
                eprintln!("{err}");
                process::exit(1);
            }
            Err(err @ ParseError::UnknownArg(_)) => {
                eprintln!("{err}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with `get_env` standing in for the process environment.
    ///
    /// Unparseable environment values are ignored; unparseable flags are
    /// errors.
    pub fn parse_from<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(val) = get_env("FANOUT_DEMO_SCENARIO")
            && let Some(scenario) = Scenario::from_name(&val)
        {
            opts.scenario = scenario;
        }
        if let Some(val) = get_env("FANOUT_DEMO_LOG_FORMAT")
            && let Some(format) = LogFormat::from_name(&val)
        {
            opts.log_format = format;
        }
        if let Some(val) = get_env("FANOUT_DEMO_LOG_LEVEL")
            && !val.trim().is_empty()
        {
            opts.log_level = val.trim().to_string();
        }

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                other => {
                    if let Some(val) = other.strip_prefix("--scenario=") {
                        opts.scenario =
                            Scenario::from_name(val).ok_or_else(|| ParseError::InvalidValue {
                                flag: "--scenario",
                                value: val.to_string(),
                            })?;
                    } else if let Some(val) = other.strip_prefix("--log-format=") {
                        opts.log_format =
                            LogFormat::from_name(val).ok_or_else(|| ParseError::InvalidValue {
                                flag: "--log-format",
                                value: val.to_string(),
                            })?;
                    } else if let Some(val) = other.strip_prefix("--log-level=") {
                        if val.trim().is_empty() {
                            return Err(ParseError::InvalidValue {
                                flag: "--log-level",
                                value: val.to_string(),
                            });
                        }
                        opts.log_level = val.trim().to_string();
                    } else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    }
                }
            }
        }

        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse_with_env(
        args: &[&str],
        env_pairs: &[(&'static str, &'static str)],
    ) -> Result<Opts, ParseError> {
        let map: HashMap<&str, &str> = env_pairs.iter().copied().collect();
        Opts::parse_from(args, |key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn default_opts() {
        let opts = Opts::default();
        assert_eq!(opts.scenario, Scenario::All);
        assert_eq!(opts.log_format, LogFormat::Text);
        assert_eq!(opts.log_level, "info");
    }

    #[test]
    fn no_args_gives_defaults() {
        assert_eq!(parse_with_env(&[], &[]).unwrap(), Opts::default());
    }

    #[test]
    fn scenario_flag() {
        let opts = parse_with_env(&["--scenario=mediator"], &[]).unwrap();
        assert_eq!(opts.scenario, Scenario::Mediator);
    }

    #[test]
    fn scenario_names_are_case_insensitive() {
        assert_eq!(Scenario::from_name("FlyWeight"), Some(Scenario::Flyweight));
        assert_eq!(Scenario::from_name("nope"), None);
    }

    #[test]
    fn invalid_scenario_is_rejected() {
        let err = parse_with_env(&["--scenario=chain"], &[]).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue {
                flag: "--scenario",
                value: "chain".into()
            }
        );
        assert_eq!(err.to_string(), "invalid --scenario value: chain");
    }

    #[test]
    fn log_flags() {
        let opts = parse_with_env(&["--log-format=json", "--log-level=fanout_core=trace"], &[])
            .unwrap();
        assert_eq!(opts.log_format, LogFormat::Json);
        assert_eq!(opts.log_level, "fanout_core=trace");
    }

    #[test]
    fn empty_log_level_is_rejected() {
        assert!(matches!(
            parse_with_env(&["--log-level="], &[]),
            Err(ParseError::InvalidValue {
                flag: "--log-level",
                ..
            })
        ));
    }

    #[test]
    fn env_supplies_defaults() {
        let opts = parse_with_env(
            &[],
            &[
                ("FANOUT_DEMO_SCENARIO", "observer"),
                ("FANOUT_DEMO_LOG_FORMAT", "json"),
                ("FANOUT_DEMO_LOG_LEVEL", "debug"),
            ],
        )
        .unwrap();
        assert_eq!(opts.scenario, Scenario::Observer);
        assert_eq!(opts.log_format, LogFormat::Json);
        assert_eq!(opts.log_level, "debug");
    }

    #[test]
    fn flags_override_env() {
        let opts = parse_with_env(
            &["--scenario=flyweight"],
            &[("FANOUT_DEMO_SCENARIO", "observer")],
        )
        .unwrap();
        assert_eq!(opts.scenario, Scenario::Flyweight);
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let opts = parse_with_env(
            &[],
            &[
                ("FANOUT_DEMO_SCENARIO", "strategy"),
                ("FANOUT_DEMO_LOG_FORMAT", "xml"),
                ("FANOUT_DEMO_LOG_LEVEL", "  "),
            ],
        )
        .unwrap();
        assert_eq!(opts, Opts::default());
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse_with_env(&["-h"], &[]), Err(ParseError::Help));
        assert_eq!(
            parse_with_env(&["--scenario=bogus", "--version"], &[]),
            Err(ParseError::InvalidValue {
                flag: "--scenario",
                value: "bogus".into()
            })
        );
        assert_eq!(parse_with_env(&["--version"], &[]), Err(ParseError::Version));
    }

    #[test]
    fn unknown_arg() {
        assert_eq!(
            parse_with_env(&["--verbose"], &[]),
            Err(ParseError::UnknownArg("--verbose".into()))
        );
    }

    #[test]
    fn help_text_lists_every_scenario() {
        for scenario in Scenario::EACH {
            assert!(HELP_TEXT.contains(scenario.name()));
        }
        assert!(!VERSION.is_empty());
    }
}
