//! `snipeit` commands

use super::Registry;
use crate::cli::AssetSelector;
use rtectl_core::inventory::{check_out_asset, Asset, Checkout};

fn select(
    registry: &mut Registry,
    selector: &AssetSelector,
) -> Result<Asset, Box<dyn std::error::Error>> {
    match (selector.asset_id, &selector.rte_ip) {
        (Some(id), _) => Ok(registry.asset(id)?),
        (None, Some(rte_ip)) => Ok(registry.find_by_rte_ip(rte_ip)?),
        (None, None) => Err("Either --asset-id or --rte-ip is required".into()),
    }
}

/// Check an asset out to the configured user
pub fn cmd_check_out(
    registry: &mut Registry,
    selector: &AssetSelector,
) -> Result<(), Box<dyn std::error::Error>> {
    let asset = select(registry, selector)?;
    match check_out_asset(registry, &asset)? {
        Checkout::CheckedOut => println!("Asset {} successfully checked out.", asset.id),
        Checkout::AlreadyOurs => println!("Asset {} is already checked out by you", asset.id),
    }
    Ok(())
}

/// Check an asset back in
pub fn cmd_check_in(
    registry: &mut Registry,
    selector: &AssetSelector,
) -> Result<(), Box<dyn std::error::Error>> {
    let asset = select(registry, selector)?;
    registry.check_in(asset.id)?;
    println!("Asset {} successfully checked in.", asset.id);
    Ok(())
}
