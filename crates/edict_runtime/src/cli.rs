//! Command-line parsing.

use std::fs;
use std::path::PathBuf;

use tracing::Level;

use crate::runtime::RuntimeError;

/// Where the script comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptSource {
    /// Script text given with `-e`.
    Inline(String),
    /// Path to a script file.
    File(PathBuf),
}

/// CLI configuration parsed from arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// The script to run.
    pub script: Option<ScriptSource>,
    /// Log throw/catch transitions and continuation threads.
    pub trace: bool,
    /// Log every dispatched opcode.
    pub trace_vm: bool,
    /// Print usage and exit.
    pub show_help: bool,
    /// Print the version and exit.
    pub show_version: bool,
}

impl CliConfig {
    /// Parses arguments, skipping the program name.
    ///
    /// # Errors
    /// Returns `Usage` for unknown options, a missing `-e` value, or more
    /// than one script.
    pub fn parse<I, S>(args: I) -> Result<Self, RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter().map(Into::into).skip(1);

        while let Some(arg) = args.next() {
            let script = match arg.as_str() {
                "-h" | "--help" => {
                    config.show_help = true;
                    continue;
                }
                "-V" | "--version" => {
                    config.show_version = true;
                    continue;
                }
                "--trace" => {
                    config.trace = true;
                    continue;
                }
                "--trace-vm" => {
                    config.trace_vm = true;
                    continue;
                }
                "-e" | "--eval" => match args.next() {
                    Some(text) => ScriptSource::Inline(text),
                    None => return Err(RuntimeError::Usage(format!("{arg} requires a script"))),
                },
                other if other.starts_with('-') && other.len() > 1 => {
                    return Err(RuntimeError::Usage(format!("unknown option: {other}")));
                }
                path => ScriptSource::File(PathBuf::from(path)),
            };
            if config.script.replace(script).is_some() {
                return Err(RuntimeError::Usage("only one script may be given".to_string()));
            }
        }

        Ok(config)
    }

    /// Returns the most verbose log level the flags ask for.
    #[must_use]
    pub fn log_level(&self) -> Level {
        if self.trace_vm {
            Level::TRACE
        } else if self.trace {
            Level::DEBUG
        } else {
            Level::WARN
        }
    }
}

/// A parsed command line with its script text loaded.
#[derive(Clone, Debug)]
pub struct Bootstrap {
    /// The flags.
    pub config: CliConfig,
    /// Script name for diagnostics: the path, or `<eval>`.
    pub name: String,
    /// Script text.
    pub source: String,
}

impl Bootstrap {
    /// Parses arguments and reads the script they name.
    ///
    /// Returns `Ok(None)` when the flags ask for help or version output
    /// only.
    ///
    /// # Errors
    /// Returns `Usage` for bad flags or no script, and `Io` when the script
    /// file cannot be read.
    pub fn from_args<I, S>(args: I) -> Result<Option<Self>, RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = CliConfig::parse(args)?;
        if config.show_help || config.show_version {
            return Ok(None);
        }
        let (name, source) = match &config.script {
            Some(ScriptSource::Inline(text)) => ("<eval>".to_string(), text.clone()),
            Some(ScriptSource::File(path)) => {
                let source = fs::read_to_string(path).map_err(|source| RuntimeError::Io {
                    path: path.clone(),
                    source,
                })?;
                (path.display().to_string(), source)
            }
            None => return Err(RuntimeError::Usage("no script given".to_string())),
        };
        Ok(Some(Self { config, name, source }))
    }
}
