//! Asset checkout bookkeeping
//!
//! Invasive commands run against a DUT only while its asset is checked out
//! to the current user. [`with_checkout`] checks the asset out if needed,
//! runs the command and checks it back in only if it was this call that
//! checked it out.

use crate::error::{Error, Result};

/// Asset as seen by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Registry id
    pub id: u64,
    /// Model name, used as the DUT model when none is given
    pub model: Option<String>,
    /// User the asset is checked out to
    pub assigned_to: Option<u64>,
}

/// Asset registry capability
pub trait AssetRegistry {
    /// Id of the user acting on assets
    fn user_id(&self) -> u64;

    /// Find the asset whose RTE sits at `rte_ip`
    fn find_by_rte_ip(&mut self, rte_ip: &str) -> Result<Asset>;

    /// Find the asset whose Sonoff plug sits at `sonoff_ip`
    fn find_by_sonoff_ip(&mut self, sonoff_ip: &str) -> Result<Asset>;

    /// Sonoff plug address recorded for the asset at `rte_ip`
    fn sonoff_ip_for_rte(&mut self, rte_ip: &str) -> Result<Option<String>>;

    /// Fetch an asset by id
    fn asset(&mut self, id: u64) -> Result<Asset>;

    /// Check an asset out to [`AssetRegistry::user_id`]
    fn check_out(&mut self, id: u64) -> Result<()>;

    /// Check an asset back in
    fn check_in(&mut self, id: u64) -> Result<()>;
}

impl<R: AssetRegistry + ?Sized> AssetRegistry for Box<R> {
    fn user_id(&self) -> u64 {
        (**self).user_id()
    }

    fn find_by_rte_ip(&mut self, rte_ip: &str) -> Result<Asset> {
        (**self).find_by_rte_ip(rte_ip)
    }

    fn find_by_sonoff_ip(&mut self, sonoff_ip: &str) -> Result<Asset> {
        (**self).find_by_sonoff_ip(sonoff_ip)
    }

    fn sonoff_ip_for_rte(&mut self, rte_ip: &str) -> Result<Option<String>> {
        (**self).sonoff_ip_for_rte(rte_ip)
    }

    fn asset(&mut self, id: u64) -> Result<Asset> {
        (**self).asset(id)
    }

    fn check_out(&mut self, id: u64) -> Result<()> {
        (**self).check_out(id)
    }

    fn check_in(&mut self, id: u64) -> Result<()> {
        (**self).check_in(id)
    }
}

/// Outcome of [`check_out_asset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    /// This call checked the asset out
    CheckedOut,
    /// The asset already belonged to the current user
    AlreadyOurs,
}

/// Make sure `asset` is checked out to the current user
pub fn check_out_asset<R: AssetRegistry + ?Sized>(
    registry: &mut R,
    asset: &Asset,
) -> Result<Checkout> {
    match asset.assigned_to {
        None => {
            log::info!("Checking out asset {}", asset.id);
            registry.check_out(asset.id)?;
            Ok(Checkout::CheckedOut)
        }
        Some(user) if user == registry.user_id() => {
            log::debug!("Asset {} is already checked out to us", asset.id);
            Ok(Checkout::AlreadyOurs)
        }
        Some(_) => Err(Error::AssetUnavailable(asset.id)),
    }
}

/// Run `f` with `asset` checked out to the current user
///
/// The asset is checked back in after `f` returns, whether it failed or not,
/// if and only if this call checked it out. A failing check-in is logged
/// and does not mask the result of `f`.
pub fn with_checkout<R, T, F>(registry: &mut R, asset: &Asset, f: F) -> Result<T>
where
    R: AssetRegistry + ?Sized,
    F: FnOnce() -> Result<T>,
{
    let checkout = check_out_asset(registry, asset)?;
    let result = f();

    if checkout == Checkout::CheckedOut {
        log::info!("Checking in asset {}", asset.id);
        if let Err(e) = registry.check_in(asset.id) {
            log::error!("Failed to check in asset {}: {}", asset.id, e);
        }
    }
    result
}
