use getopts::Options;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Args(#[from] getopts::Fail),

    #[error("invalid value `{value}` for --{flag}, expected milliseconds")]
    InvalidNumber { flag: &'static str, value: String },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub groups: Option<Vec<String>>,
    pub test_filter: Option<String>,
    pub timeout_ms: u64, // How long the runner waits for a single test.
    pub latency_ms: u64, // Simulated backend latency of the to-do table.
    pub verbose: bool,
    pub log_level: String,

    #[serde(skip)]
    pub list: bool,
    #[serde(skip)]
    pub help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            groups: None,
            test_filter: None,
            timeout_ms: 10_000,
            latency_ms: 0,
            verbose: false,
            log_level: "info".to_string(),
            list: false,
            help: false,
        }
    }
}

impl Config {
    /// Builds the configuration from the process arguments.
    pub fn build_config() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::from_args(&args)
    }

    /// Reads the YAML file (if any) and overrides it with command line flags.
    ///
    /// The default `config.yaml` is optional; a file named with `--config` must exist.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let matches = options().parse(args)?;

        let mut config = match matches.opt_str("c") {
            Some(path) => Self::load(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };

        let groups = matches.opt_strs("g");
        if !groups.is_empty() {
            config.groups = Some(groups);
        }
        if let Some(filter) = matches.opt_str("f") {
            config.test_filter = Some(filter);
        }
        if let Some(timeout) = matches.opt_str("t") {
            config.timeout_ms = parse_millis("timeout", timeout)?;
        }
        if let Some(latency) = matches.opt_str("l") {
            config.latency_ms = parse_millis("latency", latency)?;
        }

        // flags can only switch these on
        config.verbose |= matches.opt_present("v");
        config.list = matches.opt_present("list");
        config.help = matches.opt_present("h");

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn usage(program: &str) -> String {
        let version = env!("CARGO_PKG_VERSION");
        let program_name = program.split('/').last().unwrap_or(program);
        let description = "End-to-end test runner for the to-do quickstart";
        let brief = format!(
            "{} {}: {}\nUsage: {} [options]",
            program_name, version, description, program_name
        );
        options().usage(&brief)
    }
}

fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("c", "config", "Read settings from FILE", "FILE");
    opts.optmulti("g", "group", "Run only the named group (repeatable)", "NAME");
    opts.optopt("f", "filter", "Run only tests whose name contains TEXT", "TEXT");
    opts.optopt("t", "timeout", "Wait at most MS for each test", "MS");
    opts.optopt("l", "latency", "Simulated backend latency", "MS");
    opts.optflag("", "list", "List the groups and tests, run nothing");
    opts.optflag("v", "verbose", "Print the log of passing tests too");
    opts.optflag("h", "help", "Print this help menu");
    opts
}

fn parse_millis(flag: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber { flag, value })
}
