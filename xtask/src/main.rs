//! Build script.
//!
//! Use `cargo xtask` to execute.

use clap::{Parser, Subcommand};
use devx_cmd::cmd;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Build and test the BMS firmware.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the firmware image.
    Build {
        /// Build without RTT logging.
        #[arg(long)]
        no_rtt: bool,
    },
    /// Run the L9961 driver tests and check every logging backend.
    Test,
}

fn project_root() -> PathBuf {
    Path::new(&env!("CARGO_MANIFEST_DIR")).ancestors().nth(1).unwrap().to_path_buf()
}

fn build(cargo: &str, no_rtt: bool) -> anyhow::Result<()> {
    let firmware = "bms_firmware";
    let features: &[&str] = if no_rtt { &["--no-default-features"] } else { &[] };

    fs::create_dir_all(project_root().join("image"))?;

    cmd!(cargo, "build", "--release")
        .args(features)
        .current_dir(project_root().join("bms-firmware"))
        .run()?;
    cmd!(cargo, "objcopy", "--release")
        .args(features)
        .args(["--", "-O", "binary"])
        .arg(format!("../image/{firmware}.bin"))
        .current_dir(project_root().join("bms-firmware"))
        .run()?;

    println!();
    println!("Built BMS firmware image/{firmware}.bin");

    Ok(())
}

fn test(cargo: &str) -> anyhow::Result<()> {
    cmd!(cargo, "test", "--package", "l9961").current_dir(project_root()).run()?;
    cmd!(cargo, "test", "--package", "l9961", "--features", "log").current_dir(project_root()).run()?;

    // defmt needs a global logger to link, thus it is only type checked.
    cmd!(cargo, "check", "--package", "l9961", "--features", "defmt").current_dir(project_root()).run()?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cargo = env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());

    match args.command.unwrap_or(Command::Build { no_rtt: false }) {
        Command::Build { no_rtt } => build(&cargo, no_rtt),
        Command::Test => test(&cargo),
    }
}
