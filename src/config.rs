//! Command-line and environment configuration.
//!
//! Every flag falls back to an environment variable so the service can be
//! configured entirely from its deployment environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::credentials::RefreshingToken;
use crate::error::{Result, TwinError};
use crate::execution::TripleStoreReader;
use crate::graph::{GraphFormat, MalformedPolicy, Namespaces, DEFAULT_BASE_IRI};
use crate::querying::TableSpec;
use crate::sources::{
    SegmentedTripleLog, SqliteTripleSource, TripleSink, TripleSource, WarehouseConfig,
    WarehouseSource,
};
use crate::storage::util::LogConfig;

/// Environment variable holding the warehouse bearer token.
pub const TOKEN_ENV: &str = "DATABRICKS_TOKEN";

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "twingraph", version)]
#[command(about = "Point-in-time RDF graphs from a versioned triple log", long_about = None)]
pub struct Cli {
    /// Where the log lives
    #[command(flatten)]
    pub source: SourceArgs,

    /// How graphs are built and rendered
    #[command(flatten)]
    pub reader: ReaderArgs,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve /latest and /pit over HTTP
    Serve {
        /// Address to bind
        #[arg(short = 'H', long, env = "TWIN_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Print the latest graph
    Latest,
    /// Print the graph as of a timestamp (exclusive)
    Pit {
        /// Cutoff, exclusive
        #[arg(short, long)]
        timestamp: String,
    },
    /// Append a file of log entries to the configured log
    Ingest {
        /// File to read
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = IngestKind::Ntriples)]
        kind: IngestKind,
    },
}

/// Ingestion input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IngestKind {
    /// `<timestamp> <s> <p> <o> .` lines
    Ntriples,
    /// JSON lines of sensor readings
    SensorJson,
}

/// Log backend selected with `--source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Local segmented log
    Segmented,
    /// SQLite table
    Sqlite,
    /// SQL warehouse over REST
    Warehouse,
}

/// Backend selection and location.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Log backend
    #[arg(long = "source", env = "TWIN_SOURCE", value_enum, default_value_t = Backend::Segmented, global = true)]
    pub backend: Backend,

    /// Segmented log directory
    #[arg(long, env = "TWIN_LOG_DIR", default_value = "./data/twin-log", global = true)]
    pub log_dir: PathBuf,

    /// SQLite database file
    #[arg(long, env = "TWIN_SQLITE_PATH", default_value = "./data/triples.db", global = true)]
    pub sqlite_path: PathBuf,

    /// Triple table, optionally catalog and schema qualified
    #[arg(long, env = "TRIPLE_TABLE_FULL_NAME", default_value = "sensor_triples", global = true)]
    pub table: String,

    /// Column that orders rows with equal timestamps
    #[arg(long, env = "TWIN_SEQUENCE_COLUMN", global = true)]
    pub sequence_column: Option<String>,

    /// Warehouse workspace host
    #[arg(long, env = "DATABRICKS_HOST", global = true)]
    pub databricks_host: Option<String>,

    /// Warehouse id
    #[arg(long, env = "WAREHOUSE_ID", global = true)]
    pub warehouse_id: Option<String>,

    /// Seconds between bearer token re-reads
    #[arg(long, env = "TOKEN_REFRESH_SECONDS", default_value_t = 900, global = true)]
    pub token_refresh_seconds: u64,
}

impl SourceArgs {
    fn table_spec(&self) -> Result<TableSpec> {
        let spec = TableSpec::new(&self.table)?;
        match &self.sequence_column {
            Some(column) => spec.with_sequence_column(column),
            None => Ok(spec),
        }
    }

    fn warehouse(&self) -> Result<WarehouseSource> {
        let host = self
            .databricks_host
            .as_deref()
            .ok_or_else(|| TwinError::Config("DATABRICKS_HOST is required for the warehouse source".into()))?;
        let warehouse_id = self
            .warehouse_id
            .as_deref()
            .ok_or_else(|| TwinError::Config("WAREHOUSE_ID is required for the warehouse source".into()))?;

        let credentials = RefreshingToken::from_env(
            TOKEN_ENV,
            Duration::from_secs(self.token_refresh_seconds),
        );
        WarehouseSource::new(
            WarehouseConfig::new(host, warehouse_id, self.table_spec()?),
            Arc::new(credentials),
        )
    }

    /// Open the configured backend for reading.
    pub fn open_source(&self) -> Result<Arc<dyn TripleSource>> {
        let source: Arc<dyn TripleSource> = match self.backend {
            Backend::Segmented => Arc::new(SegmentedTripleLog::open(LogConfig::at(&self.log_dir))?),
            Backend::Sqlite => {
                Arc::new(SqliteTripleSource::open(&self.sqlite_path, &self.table)?)
            }
            Backend::Warehouse => Arc::new(self.warehouse()?),
        };
        info!(source = %source.describe(), "opened triple source");
        Ok(source)
    }

    /// Open the configured backend for appending. The warehouse is read-only.
    pub fn open_sink(&self) -> Result<Box<dyn TripleSink>> {
        match self.backend {
            Backend::Segmented => Ok(Box::new(SegmentedTripleLog::open(LogConfig::at(&self.log_dir))?)),
            Backend::Sqlite => Ok(Box::new(SqliteTripleSource::open(&self.sqlite_path, &self.table)?)),
            Backend::Warehouse => {
                Err(TwinError::Config("the warehouse source is read-only".to_string()))
            }
        }
    }
}

/// Reconstruction and output settings.
#[derive(Args, Debug, Clone)]
pub struct ReaderArgs {
    /// Base IRI for identifiers without a scheme
    #[arg(long, env = "TWIN_BASE_IRI", default_value = DEFAULT_BASE_IRI, global = true)]
    pub base_iri: String,

    /// Extra prefixes as `prefix=iri`, comma separated in the environment
    #[arg(long = "prefix", env = "TWIN_PREFIXES", value_delimiter = ',', global = true)]
    pub prefixes: Vec<String>,

    /// What to do with rows that cannot become triples (reject or skip)
    #[arg(long, env = "TWIN_ON_MALFORMED", default_value = "reject", global = true)]
    pub on_malformed: MalformedPolicy,

    /// Output format: turtle, ntriples or rdfxml
    #[arg(long, env = "TWIN_FORMAT", default_value = "turtle", global = true)]
    pub format: String,
}

impl ReaderArgs {
    /// Default prefixes plus the configured base and bindings.
    pub fn namespaces(&self) -> Result<Namespaces> {
        self.prefixes
            .iter()
            .filter(|b| !b.trim().is_empty())
            .try_fold(Namespaces::default().with_base(&self.base_iri)?, |ns, binding| {
                ns.with_binding(binding)
            })
    }

    /// Reader over `source` with these settings.
    pub fn build_reader(&self, source: Arc<dyn TripleSource>) -> Result<TripleStoreReader> {
        let format = GraphFormat::from_string(&self.format)
            .ok_or_else(|| TwinError::Config(format!("unsupported format '{}'", self.format)))?;

        Ok(TripleStoreReader::new(source)
            .with_namespaces(self.namespaces()?)
            .with_policy(self.on_malformed)
            .with_format(format))
    }
}
