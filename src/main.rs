mod config;
mod storage;
mod store;
mod ui;

use std::path::PathBuf;
use std::process::Command as ProcessCommand;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use config::{CommandExec, Config};
use storage::LocalStore;
use store::{Profile, ProfileStore};

#[derive(Parser, Debug)]
#[command(name = "whoson")]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the profile storage (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored profiles
    List,
    /// Print the id of the active profile
    Active,
    /// Clear stored profiles and the active profile; the next run reseeds defaults
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let backend = open_backend(&cli, &config)?;

    match cli.command {
        Some(Command::List) => handle_list(backend),
        Some(Command::Active) => handle_active(backend),
        Some(Command::Reset) => handle_reset(backend),
        None => run_picker(backend, &config),
    }
}

fn open_backend(cli: &Cli, config: &Config) -> Result<LocalStore> {
    match cli.data_dir.as_deref().or(config.data_dir.as_deref()) {
        Some(dir) => LocalStore::open_in(dir),
        None => LocalStore::open(),
    }
}

fn handle_list(backend: LocalStore) -> Result<()> {
    let store = ProfileStore::open(backend).context("failed to load profiles")?;
    for profile in store.profiles().iter().filter(|p| p.selectable()) {
        let marker = if profile.is_admin { " (admin)" } else { "" };
        println!("{}\t{}\t{}{}", profile.id, profile.avatar, profile.name, marker);
    }
    Ok(())
}

fn handle_active(backend: LocalStore) -> Result<()> {
    let store = ProfileStore::open(backend).context("failed to load profiles")?;
    match store.active() {
        Some(id) => {
            println!("{}", id);
            Ok(())
        }
        None => {
            eprintln!("no active profile");
            std::process::exit(1);
        }
    }
}

fn handle_reset(backend: LocalStore) -> Result<()> {
    // Reset works even when the stored list is corrupt
    let (mut store, warning) = ProfileStore::open_or_default(backend);
    if let Some(err) = warning {
        eprintln!("warning: {}", err);
    }
    store.reset()?;
    println!("Cleared stored profiles and active profile.");
    Ok(())
}

fn run_picker(backend: LocalStore, config: &Config) -> Result<()> {
    let (store, warning) = ProfileStore::open_or_default(backend);
    if let Some(err) = &warning {
        eprintln!("warning: {}", err);
    }

    let mut app = ui::app::App::new(store, config, warning);
    let activated = app.run()?;

    if let Some(profile) = activated {
        match &config.commands.launch {
            Some(exec) => launch_home(exec, &profile)?,
            None => println!("Active profile: {} ({})", profile.name, profile.id),
        }
    }
    Ok(())
}

/// Hand control to the home screen once a profile is active.
fn launch_home(exec: &CommandExec, profile: &Profile) -> Result<()> {
    let args: Vec<String> = exec
        .args
        .iter()
        .map(|arg| {
            arg.replace("{id}", &profile.id)
                .replace("{name}", &profile.name)
        })
        .collect();

    let status = ProcessCommand::new(&exec.program)
        .args(&args)
        .status()
        .with_context(|| format!("failed to run launch command `{}`", exec.program))?;

    if !status.success() {
        anyhow::bail!("launch command `{}` exited with {}", exec.program, status);
    }
    Ok(())
}
