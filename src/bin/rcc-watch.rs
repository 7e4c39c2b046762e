//! rcc-watch - Follow a configuration binding from the command line.
//!
//! Loads a client configuration file, starts the client and prints the
//! current values followed by every change event until Ctrl+C.

use std::{error::Error, path::PathBuf};

use clap::Parser;
use futures::StreamExt;
use rcc_client::{
    client::{ChangeEvent, ChangeKind, Client},
    config::Conf,
    tracing_config,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "rcc-watch")]
#[command(about = "Print and follow the configuration of one project/environment")]
struct Cli {
    /// Client configuration file (TOML)
    #[arg(short, long, default_value = "rcc.toml")]
    config: PathBuf,

    /// Only print these keys
    #[arg(short, long)]
    key: Vec<String>,

    /// Print the current values and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_config::init()?;
    let cli = Cli::parse();

    let mut conf = Conf::from_file(&cli.config)?;
    conf.enable_callback = !cli.once;

    let client = Client::new(conf)?;
    client.start().await?;
    print_values(&client, &cli.key);

    if cli.once {
        client.stop();
        return Ok(());
    }

    let mut changes = client.watch_update()?;
    info!("Watching for changes, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = changes.next() => match event {
                Some(event) => print_event(&event, &cli.key),
                None => break,
            },
        }
    }

    client.stop();
    Ok(())
}

fn print_values(client: &Client, filter: &[String]) {
    let mut keys = if filter.is_empty() {
        client.get_all_keys()
    } else {
        filter.to_vec()
    };
    keys.sort();

    for key in keys {
        println!("{key} = {}", client.get_value(&key, "<unset>"));
    }
}

fn print_event(event: &ChangeEvent, filter: &[String]) {
    let mut changes: Vec<_> = event
        .iter()
        .filter(|change| filter.is_empty() || filter.contains(&change.key))
        .collect();
    changes.sort_by(|a, b| a.key.cmp(&b.key));

    for change in changes {
        let old = change.old_value.as_deref().unwrap_or("");
        let new = change.new_value.as_deref().unwrap_or("");
        match change.kind {
            ChangeKind::Add => println!("+ {} = {new}", change.key),
            ChangeKind::Modify => println!("~ {} = {old} -> {new}", change.key),
            ChangeKind::Delete => println!("- {} (was {old})", change.key),
        }
    }
}
