//! Snipe-IT asset registry client
//!
//! Assets carry the addresses of their test equipment in the `RTE IP` and
//! `Sonoff IP` custom fields. Lookups by address walk the whole hardware
//! list, which is fetched once per client.

use std::path::Path;
use std::time::Duration;

use rtectl_core::inventory::{Asset, AssetRegistry};

use crate::error::{HttpError, Result};

/// Custom field holding the RTE address
pub const RTE_IP_FIELD: &str = "RTE IP";
/// Custom field holding the Sonoff plug address
pub const SONOFF_IP_FIELD: &str = "Sonoff IP";

const PAGE_SIZE: u64 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Contents of `snipeit.toml`
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnipeItConfig {
    /// API root, e.g. `https://snipeit.example.com/api/v1`
    pub api_url: String,
    /// Personal API token
    pub api_token: String,
    /// Id of the user assets are checked out to
    pub user_id: u64,
}

impl SnipeItConfig {
    /// Parse and validate a configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| HttpError::Config(e.to_string()))?;
        if config.api_url.trim().is_empty() || config.api_token.trim().is_empty() {
            return Err(HttpError::Config(
                "api_url and api_token must not be empty".into(),
            ));
        }
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HttpError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, serde::Deserialize)]
struct HardwarePage {
    #[serde(default)]
    rows: Vec<HardwareRow>,
    total_pages: Option<u64>,
    total: Option<u64>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct HardwareRow {
    id: u64,
    #[serde(default)]
    custom_fields: serde_json::Value,
    model: Option<NamedRef>,
    assigned_to: Option<IdRef>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct IdRef {
    id: u64,
}

impl HardwareRow {
    /// Value of a custom field; an asset without custom fields reports `[]`
    fn custom_field(&self, name: &str) -> Option<&str> {
        self.custom_fields
            .get(name)?
            .get("value")?
            .as_str()
            .filter(|v| !v.is_empty())
    }

    fn to_asset(&self) -> Asset {
        Asset {
            id: self.id,
            model: self.model.as_ref().map(|m| m.name.clone()),
            assigned_to: self.assigned_to.as_ref().map(|a| a.id),
        }
    }
}

fn find_by_field<'a>(rows: &'a [HardwareRow], field: &str, value: &str) -> Option<&'a HardwareRow> {
    rows.iter().find(|row| row.custom_field(field) == Some(value))
}

/// Reject bodies carrying `"status": "error"`
fn check_status(body: &serde_json::Value) -> Result<()> {
    if body.get("status").and_then(|s| s.as_str()) == Some("error") {
        let messages = body
            .get("messages")
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unknown error".into());
        return Err(HttpError::Api(messages));
    }
    Ok(())
}

/// Snipe-IT REST client
#[derive(Debug)]
pub struct SnipeIt {
    agent: ureq::Agent,
    config: SnipeItConfig,
    assets: Option<Vec<HardwareRow>>,
}

impl SnipeIt {
    /// Create a client
    pub fn new(config: SnipeItConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            config,
            assets: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        request
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", self.config.api_token))
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        log::debug!("GET {}", url);
        let mut request = self.authorize(self.agent.get(url));
        for (key, value) in query {
            request = request.query(key, value);
        }
        let body: serde_json::Value = request
            .call()
            .map_err(|e| HttpError::from_ureq(url, e))?
            .into_json()
            .map_err(|e| HttpError::invalid(url, e))?;
        check_status(&body)?;
        Ok(body)
    }

    fn post_json(&self, url: &str, payload: serde_json::Value) -> Result<serde_json::Value> {
        log::debug!("POST {}", url);
        let body: serde_json::Value = self
            .authorize(self.agent.post(url))
            .send_json(payload)
            .map_err(|e| HttpError::from_ureq(url, e))?
            .into_json()
            .map_err(|e| HttpError::invalid(url, e))?;
        check_status(&body)?;
        Ok(body)
    }

    fn all_assets(&mut self) -> Result<&[HardwareRow]> {
        if self.assets.is_none() {
            let url = self.url("/hardware");
            let mut rows = Vec::new();
            let mut page = 1;
            loop {
                let query = [
                    ("limit", PAGE_SIZE.to_string()),
                    ("offset", ((page - 1) * PAGE_SIZE).to_string()),
                ];
                let body = self.get_json(&url, &query)?;
                let data: HardwarePage =
                    serde_json::from_value(body).map_err(|e| HttpError::invalid(&url, e))?;
                let fetched = data.rows.len();
                rows.extend(data.rows);

                let more = match (data.total_pages, data.total) {
                    (Some(pages), _) => pages > page,
                    (None, Some(total)) => (rows.len() as u64) < total,
                    (None, None) => false,
                };
                if !more || fetched == 0 {
                    break;
                }
                page += 1;
            }
            log::debug!("Fetched {} assets", rows.len());
            self.assets = Some(rows);
        }
        Ok(self.assets.as_deref().unwrap_or_default())
    }

    fn find(&mut self, field: &str, value: &str) -> rtectl_core::Result<Asset> {
        let rows = self.all_assets()?;
        find_by_field(rows, field, value)
            .map(HardwareRow::to_asset)
            .ok_or_else(|| rtectl_core::Error::AssetNotFound(format!("{} {}", field, value)))
    }
}

impl AssetRegistry for SnipeIt {
    fn user_id(&self) -> u64 {
        self.config.user_id
    }

    fn find_by_rte_ip(&mut self, rte_ip: &str) -> rtectl_core::Result<Asset> {
        self.find(RTE_IP_FIELD, rte_ip)
    }

    fn find_by_sonoff_ip(&mut self, sonoff_ip: &str) -> rtectl_core::Result<Asset> {
        self.find(SONOFF_IP_FIELD, sonoff_ip)
    }

    fn sonoff_ip_for_rte(&mut self, rte_ip: &str) -> rtectl_core::Result<Option<String>> {
        let rows = self.all_assets()?;
        Ok(find_by_field(rows, RTE_IP_FIELD, rte_ip)
            .and_then(|row| row.custom_field(SONOFF_IP_FIELD))
            .map(str::to_string))
    }

    fn asset(&mut self, id: u64) -> rtectl_core::Result<Asset> {
        let url = self.url(&format!("/hardware/{}", id));
        let body = self.get_json(&url, &[])?;
        let row: HardwareRow =
            serde_json::from_value(body).map_err(|e| HttpError::invalid(&url, e))?;
        Ok(row.to_asset())
    }

    fn check_out(&mut self, id: u64) -> rtectl_core::Result<()> {
        let url = self.url(&format!("/hardware/{}/checkout", id));
        let payload = serde_json::json!({
            "asset_id": id,
            "assigned_user": self.config.user_id,
            "checkout_to_type": "user",
        });
        self.post_json(&url, payload)?;
        self.assets = None;
        Ok(())
    }

    fn check_in(&mut self, id: u64) -> rtectl_core::Result<()> {
        let url = self.url(&format!("/hardware/{}/checkin", id));
        self.post_json(&url, serde_json::json!({}))?;
        self.assets = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "total": 3,
        "rows": [
            {
                "id": 11,
                "model": {"id": 2, "name": "protectli-vp4670"},
                "assigned_to": null,
                "custom_fields": {
                    "RTE IP": {"field": "_snipeit_rte_ip_1", "value": "192.168.10.5"},
                    "Sonoff IP": {"field": "_snipeit_sonoff_ip_2", "value": "192.168.10.6"}
                }
            },
            {
                "id": 12,
                "model": {"id": 3, "name": "msi-pro-z690-a-ddr5"},
                "assigned_to": {"id": 7, "username": "lab"},
                "custom_fields": {
                    "RTE IP": {"field": "_snipeit_rte_ip_1", "value": "192.168.10.7"},
                    "Sonoff IP": {"field": "_snipeit_sonoff_ip_2", "value": ""}
                }
            },
            {"id": 13, "model": null, "custom_fields": []}
        ]
    }"#;

    fn rows() -> Vec<HardwareRow> {
        serde_json::from_str::<HardwarePage>(PAGE).unwrap().rows
    }

    #[test]
    fn test_lookup_by_custom_field() {
        let rows = rows();
        let asset = find_by_field(&rows, RTE_IP_FIELD, "192.168.10.5")
            .unwrap()
            .to_asset();
        assert_eq!(asset.id, 11);
        assert_eq!(asset.model.as_deref(), Some("protectli-vp4670"));
        assert_eq!(asset.assigned_to, None);

        let asset = find_by_field(&rows, SONOFF_IP_FIELD, "192.168.10.6")
            .unwrap()
            .to_asset();
        assert_eq!(asset.id, 11);

        assert!(find_by_field(&rows, RTE_IP_FIELD, "10.0.0.1").is_none());
    }

    #[test]
    fn test_assignment_and_empty_fields() {
        let rows = rows();
        let row = find_by_field(&rows, RTE_IP_FIELD, "192.168.10.7").unwrap();
        assert_eq!(row.to_asset().assigned_to, Some(7));
        assert_eq!(row.custom_field(SONOFF_IP_FIELD), None);
        assert_eq!(rows[2].custom_field(RTE_IP_FIELD), None);
        assert_eq!(rows[2].to_asset().model, None);
    }

    #[test]
    fn test_status_error_body() {
        let body = serde_json::json!({
            "status": "error",
            "messages": "That asset is not available for checkout!",
            "payload": {"asset": "LAB-0012"}
        });
        assert!(matches!(check_status(&body), Err(HttpError::Api(_))));
        assert!(check_status(&serde_json::json!({"status": "success"})).is_ok());
    }

    #[test]
    fn test_config() {
        let config = SnipeItConfig::from_toml_str(
            "api_url = \"https://snipeit.lab/api/v1\"\napi_token = \"abc\"\nuser_id = 7\n",
        )
        .unwrap();
        assert_eq!(config.user_id, 7);

        assert!(SnipeItConfig::from_toml_str(
            "api_url = \"https://snipeit.lab/api/v1\"\napi_token = \"abc\"\nuser_id = \"me\"\n"
        )
        .is_err());
        assert!(SnipeItConfig::from_toml_str(
            "api_url = \"\"\napi_token = \"abc\"\nuser_id = 7\n"
        )
        .is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snipeit.toml");
        std::fs::write(&path, "api_url = \"u\"\napi_token = \"t\"\nuser_id = 1\n").unwrap();
        assert_eq!(SnipeItConfig::from_file(&path).unwrap().api_url, "u");
        assert!(matches!(
            SnipeItConfig::from_file(&dir.path().join("missing.toml")),
            Err(HttpError::Config(_))
        ));
    }

    #[test]
    fn test_url_join() {
        let client = SnipeIt::new(SnipeItConfig {
            api_url: "https://snipeit.lab/api/v1/".into(),
            api_token: "t".into(),
            user_id: 1,
        });
        assert_eq!(client.url("/hardware/3"), "https://snipeit.lab/api/v1/hardware/3");
    }
}
