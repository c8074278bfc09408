use std::{error::Error, io, path::PathBuf};

use clap::Parser;
use shelfmark::{Catalog, Config, Shell};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Command-line arguments for the library catalog
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with `data_dir`, `loan_period_days` and `daily_fine`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding books.txt, users.txt and authors.txt
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log catalog activity and state transitions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).with_writer(io::stderr).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    tracing::debug!(?config, "starting");

    let mut catalog = Catalog::open(config.store(), config.policy());
    let mut shell = Shell::new(io::stdin().lock(), io::stdout().lock());
    shell.run(&mut catalog)?;

    Ok(())
}
