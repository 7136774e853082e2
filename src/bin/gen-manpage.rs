//! Man page generator for rtectl
//!
//! Writes `rtectl.1` and one page per subcommand, named after the command
//! path (`rtectl-rte.1`, `rtectl-rte-flash.1`, ...). Parent pages list their
//! subcommands under those names.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::{Command, CommandFactory};
use clap_mangen::Man;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

/// The rtectl command tree, ready for rendering
fn command_tree() -> Command {
    let mut cmd = cli::Cli::command().disable_help_subcommand(true);
    // Assigns the `rtectl-<sub>` display names pages are filed under
    cmd.build();
    cmd
}

/// Render `cmd` and its visible subcommands into `dir`, parents first
fn render_tree(cmd: &Command, dir: &Path, pages: &mut Vec<PathBuf>) -> io::Result<()> {
    pages.push(Man::new(cmd.clone()).generate_to(dir)?);
    for sub in cmd.get_subcommands().filter(|sub| !sub.is_hide_set()) {
        render_tree(sub, dir, pages)?;
    }
    Ok(())
}

fn main() -> io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let mut pages = Vec::new();
    render_tree(&command_tree(), &output_dir, &mut pages)?;

    println!(
        "Generated {} man pages in {}",
        pages.len(),
        output_dir.display()
    );
    for page in &pages {
        println!("  {}", page.display());
    }
    println!("\nTo view the man page:");
    println!("  man -l {}", output_dir.join("rtectl.1").display());
    println!("\nTo install system-wide (requires sudo):");
    println!(
        "  sudo cp {}/*.1 /usr/local/share/man/man1/",
        output_dir.display()
    );
    println!("  sudo mandb");

    Ok(())
}
