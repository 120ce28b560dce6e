//! File handler command line
//!
//! Lists, deletes, prints and transfers files on local paths or `s3://`
//! locations. The store is configured from `s3config/config.yaml`, the
//! `S3_ENDPOINT` / `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` environment
//! variables, or `--config <file>`.
//!
//! Usage:
//!   filehandler ls s3://bucket/prefix --ext .json
//!   filehandler rm /data/out --name old.json
//!   filehandler put ./model.bin s3://bucket/models

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use filehandler::{FileHandler, FileQuery};
use store_core::{BatchReport, StoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "filehandler")]
#[command(about = "Read, list and delete files on local disk or S3-compatible stores")]
struct Args {
    /// YAML config file with S3_ENDPOINT, AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List files under a location
    Ls {
        path: String,
        /// Only check these file names
        #[arg(long = "name")]
        names: Vec<String>,
        /// Only keep these suffixes, e.g. .json
        #[arg(long = "ext")]
        extensions: Vec<String>,
    },
    /// Delete files under a location
    Rm {
        path: String,
        #[arg(long = "name")]
        names: Vec<String>,
        #[arg(long = "ext")]
        extensions: Vec<String>,
    },
    /// Print a text file
    Cat { path: String, filename: String },
    /// Upload a local file
    Put {
        local_file: PathBuf,
        path: String,
        /// Store under this name instead of the local file name
        #[arg(long = "as")]
        name: Option<String>,
    },
    /// Download a file into a local directory
    Get {
        path: String,
        filename: String,
        #[arg(long)]
        to: Option<PathBuf>,
    },
    /// Upload a local directory tree
    PushDir {
        input: PathBuf,
        output: String,
        directory: String,
    },
}

fn query(names: Vec<String>, extensions: Vec<String>) -> FileQuery {
    let query = if names.is_empty() {
        FileQuery::all()
    } else {
        FileQuery::named(names)
    };

    if extensions.is_empty() {
        query
    } else {
        query.with_extensions(extensions)
    }
}

fn print_report(report: &BatchReport) -> Result<()> {
    for item in &report.items {
        println!("{}\t{}", item.outcome, item.name);
    }

    let faults = report.faults().len();
    if faults > 0 {
        bail!("{} of {} items failed", faults, report.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filehandler=info,storage=info,store_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::load()?,
    };
    let handler = FileHandler::new(config);

    match args.command {
        Command::Ls {
            path,
            names,
            extensions,
        } => {
            let listing = handler.enumerate(&path, &query(names, extensions)).await?;
            for entry in &listing.entries {
                println!("{}", entry);
            }
            for item in listing.report.items.iter().filter(|i| !i.outcome.is_success()) {
                eprintln!("{}\t{}", item.outcome, item.name);
            }
        }
        Command::Rm {
            path,
            names,
            extensions,
        } => {
            let report = handler.delete(&path, &query(names, extensions)).await?;
            print_report(&report)?;
        }
        Command::Cat { path, filename } => {
            print!("{}", handler.read_text(&path, &filename).await?);
        }
        Command::Put {
            local_file,
            path,
            name,
        } => {
            let filename = match name {
                Some(name) => name,
                None => match local_file.file_name() {
                    Some(name) => name.to_string_lossy().into_owned(),
                    None => bail!("{} has no file name", local_file.display()),
                },
            };
            let size = handler.upload_file(&local_file, &path, &filename).await?;
            tracing::info!(%filename, size, "Uploaded");
        }
        Command::Get { path, filename, to } => {
            let target = handler.download_file(&path, &filename, to.as_deref()).await?;
            println!("{}", target.display());
        }
        Command::PushDir {
            input,
            output,
            directory,
        } => {
            let report = handler.upload_directory(&input, &output, &directory).await?;
            print_report(&report)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_flags() {
        assert_eq!(query(vec![], vec![]), FileQuery::all());

        let q = query(vec!["a.json".to_string()], vec![".json".to_string()]);
        assert_eq!(q.names, Some(vec!["a.json".to_string()]));
        assert!(q.extensions.unwrap().matches("a.json"));
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from(["filehandler", "rm", "s3://b/p", "--ext", ".fth", "--ext", ".json"])
            .unwrap();
        match args.command {
            Command::Rm { path, names, extensions } => {
                assert_eq!(path, "s3://b/p");
                assert!(names.is_empty());
                assert_eq!(extensions, vec![".fth", ".json"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
