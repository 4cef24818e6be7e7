//! Command-line interface for the bpmn-graph utility
//!
//! Loads a JSON diagram document, runs one designer operation against it and
//! prints the result as JSON.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use bpmn_graph::core::logging::{init_logging, LOG_FORMAT_ENV, LOG_LEVEL_ENV};
use bpmn_graph::designer::Designer;
use bpmn_graph::engine::{restore_scale, set_scale, PropertyPatch, UpdateOutcome};
use bpmn_graph::DesignerConfig;

/// bpmn-graph - Query and edit BPMN element graphs
#[derive(Parser)]
#[command(name = "bpmn-graph")]
#[command(about = "Query and edit BPMN element graphs stored as JSON documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Designer configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Set log level (trace|debug|info|warn|error|off)
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the export record of every element
    Elements {
        /// Diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the export record of the root process
    Root {
        /// Diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print every element upstream of an element
    Fronts {
        /// Diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Selected element id
        #[arg(long)]
        id: String,

        /// Only keep elements of this BPMN kind (e.g. UserTask)
        #[arg(long)]
        bpmn: Option<String>,
    },

    /// Print the nearest upstream element that is not a sequence flow
    Front {
        /// Diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Selected element id
        #[arg(long)]
        id: String,
    },

    /// Apply a property patch and write the updated document
    Update {
        /// Diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the updated document (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Element to patch; omit with --process
        #[arg(long, required_unless_present = "process")]
        id: Option<String>,

        /// Patch the root process instead of an element
        #[arg(long, conflicts_with = "id")]
        process: bool,

        /// Patch as JSON: {"original": {...}, "extensions": [...]}
        #[arg(long)]
        patch: String,
    },

    /// Clone an element and print the clone
    Clone {
        /// Diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Element to clone
        #[arg(long)]
        id: String,
    },

    /// Scale every number in a JSON value
    Scale {
        /// JSON value (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Scale factor; defaults to the configured scale
        #[arg(long)]
        factor: Option<f64>,

        /// Divide instead of multiply
        #[arg(long)]
        restore: bool,
    },
}

/// Main CLI application
pub struct BpmnGraphApp {
    config: DesignerConfig,
}

impl BpmnGraphApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::with_config(DesignerConfig::default())
    }

    /// Create a new application instance with a designer config
    pub fn with_config(config: DesignerConfig) -> Self {
        Self { config }
    }

    /// Create an application from the `--config` flag, if any
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        match &cli.config {
            Some(path) => {
                let config = DesignerConfig::load(path)
                    .with_context(|| format!("Failed to load config '{}'", path.display()))?;
                Ok(Self::with_config(config))
            }
            None => Ok(Self::new()),
        }
    }

    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let log_level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| cli.log_level.as_str().to_string());
        let log_format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .unwrap_or_else(|| cli.log_format.as_str().to_string());

        if let Err(e) = init_logging(Some(&log_level), Some(&log_format)) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("bpmn-graph v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Elements { input } => self.elements_command(input),
            Commands::Root { input } => self.root_command(input),
            Commands::Fronts { input, id, bpmn } => self.fronts_command(input, &id, bpmn),
            Commands::Front { input, id } => self.front_command(input, &id),
            Commands::Update {
                input,
                output,
                id,
                process,
                patch,
            } => self.update_command(input, output, id, process, &patch),
            Commands::Clone { input, id } => self.clone_command(input, &id),
            Commands::Scale {
                input,
                factor,
                restore,
            } => self.scale_command(input, factor, restore),
        }
    }

    fn elements_command(&self, input: Option<PathBuf>) -> Result<()> {
        let designer = self.load(input)?;
        self.print_json(&designer.get_all_elements())
    }

    fn root_command(&self, input: Option<PathBuf>) -> Result<()> {
        let designer = self.load(input)?;
        self.print_json(&designer.get_root_element())
    }

    fn fronts_command(
        &self,
        input: Option<PathBuf>,
        id: &str,
        bpmn: Option<String>,
    ) -> Result<()> {
        let designer = self.load(input)?;
        let fronts = match bpmn.as_deref() {
            Some(bpmn_name) => designer.get_front_elements_by_bpmn(Some(id), bpmn_name)?,
            None => designer.get_front_elements(Some(id))?,
        };
        debug!(element_id = id, front_count = fronts.len(), "Fronts computed");
        self.print_json(&fronts)
    }

    fn front_command(&self, input: Option<PathBuf>, id: &str) -> Result<()> {
        let designer = self.load(input)?;
        self.print_json(&designer.get_front_element(Some(id))?)
    }

    fn update_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        id: Option<String>,
        process: bool,
        patch: &str,
    ) -> Result<()> {
        let patch: PropertyPatch =
            serde_json::from_str(patch).map_err(|e| anyhow!("Invalid patch: {}", e))?;
        let designer = self.load(input)?;

        let outcome = match id.as_deref() {
            Some(id) if !process => designer.update_properties(id, &patch, || {})?,
            _ => designer.update_process_properties(&patch, || {})?,
        };
        match outcome {
            UpdateOutcome::Updated => info!("Patch applied"),
            UpdateOutcome::NotFound => {
                return Err(anyhow!(
                    "Nothing to update: {} not found",
                    id.as_deref().unwrap_or("process")
                ))
            }
            UpdateOutcome::ReadOnly => return Err(anyhow!("Designer is read-only")),
        }

        let document = designer.export()?;
        let pretty: Value = serde_json::from_str(&document)?;
        self.write_output(output, &serde_json::to_string_pretty(&pretty)?)
    }

    fn clone_command(&self, input: Option<PathBuf>, id: &str) -> Result<()> {
        let designer = self.load(input)?;
        let clone = designer
            .clone_element(id)?
            .ok_or_else(|| anyhow!("Element '{}' could not be cloned", id))?;
        self.print_json(&clone)
    }

    fn scale_command(
        &self,
        input: Option<PathBuf>,
        factor: Option<f64>,
        restore: bool,
    ) -> Result<()> {
        let factor = factor.unwrap_or(self.config.scale);
        if !factor.is_finite() || factor == 0.0 {
            return Err(anyhow!("Scale factor must be a finite nonzero number"));
        }
        let content = self.read_input(input)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Input is not valid JSON: {}", e))?;
        let scaled = if restore {
            restore_scale(&value, factor)
        } else {
            set_scale(&value, factor)
        };
        self.print_json(&scaled)
    }

    fn load(&self, input: Option<PathBuf>) -> Result<Designer> {
        let content = self.read_input(input)?;
        let designer = Designer::new(self.config.clone())?;
        let count = designer.import(&content)?;
        debug!(element_count = count, "Document loaded");
        Ok(designer)
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        self.write_output(None, &serde_json::to_string_pretty(value)?)
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let stdout_content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", stdout_content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for BpmnGraphApp {
    fn default() -> Self {
        Self::new()
    }
}
