//! `sonoff` command

use super::{invasive, registered, Registry};
use crate::cli::{SonoffCommands, SonoffTarget};
use rtectl_core::power::{PowerSwitch, PsuState};
use rtectl_core::Error;
use rtectl_http::SonoffPlug;

/// Resolve the plug address from the command line or the registry
fn plug_ip(
    target: &SonoffTarget,
    registry: Option<&mut Registry>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(ip) = &target.sonoff_ip {
        return Ok(ip.clone());
    }
    let rte_ip = target.rte_ip.as_deref().ok_or(Error::SonoffNotConfigured)?;
    let registry = registry.ok_or("Looking up a Sonoff by RTE IP needs the asset registry")?;
    match registry.sonoff_ip_for_rte(rte_ip)? {
        Some(ip) => Ok(ip),
        None => {
            println!("No Sonoff Device found with RTE IP: {}", rte_ip);
            Err(Error::SonoffNotConfigured.into())
        }
    }
}

/// Run a `sonoff` subcommand
pub fn run(
    target: &SonoffTarget,
    command: &SonoffCommands,
    mut registry: Option<&mut Registry>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ip = plug_ip(target, registry.as_deref_mut())?;
    let asset = match registry.as_deref_mut() {
        Some(r) => registered(r.find_by_sonoff_ip(&ip))?,
        None => None,
    };

    let mut plug = SonoffPlug::new(&ip);
    invasive(registry, asset.as_ref(), || execute(command, &mut plug))?;
    Ok(())
}

fn execute(command: &SonoffCommands, plug: &mut SonoffPlug) -> rtectl_core::Result<()> {
    match command {
        SonoffCommands::On => {
            println!("Turning on Sonoff relay...");
            plug.turn_on()?;
        }
        SonoffCommands::Off => {
            println!("Turning off Sonoff relay...");
            plug.turn_off()?;
        }
        SonoffCommands::Get => {
            println!("Getting Sonoff relay state...");
            println!("Sonoff relay state: {}", plug.state()?);
        }
        SonoffCommands::Tgl => {
            println!("Toggling Sonoff relay state...");
            match plug.state()? {
                PsuState::On => {
                    plug.turn_off()?;
                    println!("Sonoff relay state toggled off.");
                }
                PsuState::Off => {
                    plug.turn_on()?;
                    println!("Sonoff relay state toggled on.");
                }
            }
        }
    }
    Ok(())
}
