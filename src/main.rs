//! odata-influxdb CLI
//!
//! Command-line front end for the translation engine:
//! - Generate the schema document
//! - List collections
//! - Run paged queries against a collection

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use odata_influxdb::{
    config::{write_default_config, Config},
    parse_filter, write_schema_document, Engine, GroupTerm, Projection, SchemaDocumentOptions,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "odata-influxdb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Expose InfluxDB measurements as OData entity sets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured DSN
    #[arg(long, global = true)]
    dsn: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the schema and write the EDMX document
    Metadata {
        /// Output path (default: metadata.metadata_file, "-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List discovered collections
    Collections {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Query one collection
    Query {
        /// Collection id, e.g. mydb__cpu
        collection: String,
        /// $filter expression
        #[arg(long)]
        filter: Option<String>,
        /// $select field list (comma-separated)
        #[arg(long)]
        select: Option<String>,
        /// Aggregate function applied to each selected field
        #[arg(long)]
        aggregate: Option<String>,
        /// Group-by term: a tag name or time(<interval>)
        #[arg(long)]
        group_by: Vec<String>,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long)]
        skip: Option<usize>,
        #[arg(long)]
        skip_token: Option<usize>,
        /// Walk every page instead of one
        #[arg(long)]
        all: bool,
        /// Print only the estimated count
        #[arg(long)]
        count: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(dsn) = cli.dsn {
        config.influxdb.dsn = dsn;
    }

    init_logging(&config);

    match cli.command {
        Commands::Config { output } => match output {
            Some(path) => {
                write_default_config(&path)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", odata_influxdb::config::generate_default_config()),
        },

        Commands::Metadata { output } => {
            let engine = Engine::from_config(&config)?;
            let path = output.unwrap_or_else(|| config.metadata.metadata_file.clone());

            if !config.metadata.autogenerate && path.exists() {
                tracing::info!("Autogenerate disabled, keeping {:?}", path);
                return Ok(());
            }

            engine
                .refresh_catalog()
                .context("schema discovery failed")?;

            if path.as_os_str() == "-" {
                print!("{}", engine.schema_document()?);
            } else {
                let options = SchemaDocumentOptions::default()
                    .with_timestamp_alias(config.query.timestamp_field.as_str());
                write_schema_document(&engine.catalog(), &options, &path)?;
                println!("Schema document written to {:?}", path);
            }
        }

        Commands::Collections { format } => {
            let engine = Engine::from_config(&config)?;
            let catalog = engine
                .refresh_catalog()
                .context("schema discovery failed")?;

            match format {
                OutputFormat::Json => {
                    let ids: Vec<&str> = catalog.ids().collect();
                    println!("{}", serde_json::to_string_pretty(&ids)?);
                }
                OutputFormat::Table => {
                    if catalog.is_empty() {
                        println!("No collections found.");
                        return Ok(());
                    }
                    println!("{:<40} {:<20} {:<30} {}", "Collection", "Database", "Measurement", "Fields");
                    println!("{}", "-".repeat(100));
                    for collection in catalog.collections() {
                        println!(
                            "{:<40} {:<20} {:<30} {}",
                            collection.mangled_id,
                            collection.database,
                            collection.measurement,
                            collection.fields.len()
                        );
                    }
                }
            }
        }

        Commands::Query {
            collection,
            filter,
            select,
            aggregate,
            group_by,
            top,
            skip,
            skip_token,
            all,
            count,
        } => {
            let engine = Engine::from_config(&config)?;
            engine
                .refresh_catalog()
                .context("schema discovery failed")?;
            let handler = engine.collection(&collection)?;

            let mut spec = handler.query();
            if let Some(filter) = filter {
                spec = spec.filter(parse_filter(&filter)?);
            }
            if let Some(select) = select {
                let fields: Vec<&str> = select.split(',').map(str::trim).collect();
                spec = spec.projection(Projection::from_list(&fields));
            }
            if let Some(func) = aggregate {
                spec = spec.aggregate(func);
            }
            for term in &group_by {
                spec = spec.group_by(GroupTerm::parse(term)?);
            }

            if count {
                println!("{}", handler.count(&spec)?);
                return Ok(());
            }

            let mut paginator = handler.paginator(&spec);
            paginator.set_page(top, skip, skip_token);

            if all {
                for record in paginator.iterate_all() {
                    println!("{}", serde_json::to_string(&record?)?);
                }
            } else {
                for record in paginator.iterate_page()? {
                    println!("{}", serde_json::to_string(&record?)?);
                }
                if let Some(token) = paginator.next_skip_token() {
                    eprintln!("next $skiptoken={}", token);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("odata_influxdb={}", config.logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
