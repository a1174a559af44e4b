use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pipeline_datasets::{
    application::{
        builder::{CatalogDataset, DatasetBuilder},
        codecs::{BinaryContainerCodec, ContainerLoadArgs, Member},
        Dataset,
    },
    config::{CatalogEntry, LoggingConfig},
    domain::entities::TabularData,
};

#[derive(Parser)]
#[command(name = "pipeline-datasets", version, about = "Inspect and drive pipeline datasets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tree of an HDF5 file
    Inspect {
        file: PathBuf,
        /// Print the decoded tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a dataset's description as JSON
    Describe { config: PathBuf },
    /// Build a chart from a CSV file and save it through a chart dataset
    Plot { config: PathBuf, csv: PathBuf },
    /// Print whether a dataset exists
    Exists { config: PathBuf },
}

fn init_logging() -> anyhow::Result<()> {
    let config = LoggingConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;

    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid DATASETS_LOG '{}'", config.filter))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.is_json() {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn load_entry(path: &Path) -> anyhow::Result<CatalogDataset> {
    let entry = CatalogEntry::from_path(path)?;
    let dataset = DatasetBuilder::from_entry(entry)?;
    info!("Loaded {}", dataset);
    Ok(dataset)
}

fn print_member(path: &str, member: &Member) {
    match member {
        Member::Group { members } => {
            println!("{}/  group, {} members", path, members.len());
            for (name, child) in members {
                print_member(&format!("{}/{}", path, name), child);
            }
        }
        Member::Dataset { dtype, shape } => {
            println!("{}  dataset {} shape {:?}", path, dtype, shape)
        }
    }
}

fn inspect(file: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
    let root = BinaryContainerCodec::shared().layout(&bytes, &ContainerLoadArgs::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&root)?);
        return Ok(());
    }

    println!("{} ({} bytes)", file.display(), bytes.len());
    print_member("", &root);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    match cli.command {
        Command::Inspect { file, json } => inspect(&file, json)?,
        Command::Describe { config } => {
            let dataset = load_entry(&config)?;
            println!("{}", serde_json::to_string_pretty(&dataset.describe())?);
        }
        Command::Plot { config, csv } => {
            let CatalogDataset::Chart(dataset) = load_entry(&config)? else {
                bail!("{} is not a chart dataset", config.display());
            };
            let table = TabularData::from_csv_path(&csv)?;
            info!(
                rows = table.num_rows(),
                columns = table.num_columns(),
                "Read {}",
                csv.display()
            );
            dataset.save(&table)?;
            println!("{}", dataset);
        }
        Command::Exists { config } => {
            let dataset = load_entry(&config)?;
            println!("{}", dataset.exists()?);
        }
    }
    Ok(())
}
