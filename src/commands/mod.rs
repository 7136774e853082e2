//! CLI command implementations
//!
//! `rte` and `sonoff` act on a physical DUT. When an asset registry is
//! configured they run with the DUT's asset checked out, see [`invasive`].

pub mod mecheck;
pub mod models;
pub mod rte;
pub mod snipeit;
pub mod sonoff;

use rtectl_core::inventory::{with_checkout, Asset, AssetRegistry};
use rtectl_core::Error;

/// Asset registry as configured for this invocation
pub type Registry = Box<dyn AssetRegistry>;

/// Turn a lookup miss into `None`, keeping real failures
fn registered(lookup: rtectl_core::Result<Asset>) -> rtectl_core::Result<Option<Asset>> {
    match lookup {
        Ok(asset) => Ok(Some(asset)),
        Err(Error::AssetNotFound(what)) => {
            println!("No asset found for {}", what);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run `f` with `asset` checked out when both a registry and an asset are known
fn invasive<T>(
    registry: Option<&mut Registry>,
    asset: Option<&Asset>,
    f: impl FnOnce() -> rtectl_core::Result<T>,
) -> rtectl_core::Result<T> {
    match (registry, asset) {
        (Some(registry), Some(asset)) => {
            println!(
                "This command is invasive, checking first that asset {} is not in use...",
                asset.id
            );
            with_checkout(registry, asset, f)
        }
        _ => f(),
    }
}
