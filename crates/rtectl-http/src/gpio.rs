//! RTE GPIO REST client
//!
//! The RTE exposes its GPIO lines at `http://<ip>:8000/api/v1/gpio`. A line
//! is read with `GET /gpio/<n>` and driven with `PATCH /gpio/<n>` carrying
//! the raw value, the direction and an optional hold time in seconds.

use std::time::Duration;

use rtectl_core::gpio::{GpioTransport, Pin};

use crate::error::{HttpError, Result};

/// TCP port of the RTE control API
pub const RTE_API_PORT: u16 = 8000;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, serde::Deserialize)]
struct GpioReply {
    state: u64,
}

#[derive(Debug, serde::Serialize)]
struct GpioRequest {
    state: u8,
    direction: &'static str,
    time: u64,
}

/// GPIO lines of one RTE, reached over HTTP
///
/// Clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RteGpio {
    agent: ureq::Agent,
    base_url: String,
}

impl RteGpio {
    /// Client for the RTE at `ip`
    pub fn new(ip: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            base_url: format!("http://{}:{}/api/v1", ip, RTE_API_PORT),
        }
    }

    /// Root of the REST API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn gpio_url(&self, pin: Option<Pin>) -> String {
        match pin {
            Some(pin) => format!("{}/gpio/{}", self.base_url, pin.index()),
            None => format!("{}/gpio", self.base_url),
        }
    }

    /// Raw description of every line as reported by the RTE
    pub fn list(&self) -> Result<serde_json::Value> {
        let url = self.gpio_url(None);
        log::debug!("GET {}", url);
        self.agent
            .get(&url)
            .set("Accept", "application/json")
            .call()
            .map_err(|e| HttpError::from_ureq(&url, e))?
            .into_json()
            .map_err(|e| HttpError::invalid(&url, e))
    }

    fn read(&self, pin: Pin) -> Result<u8> {
        let url = self.gpio_url(Some(pin));
        log::trace!("GET {}", url);
        let reply: GpioReply = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .call()
            .map_err(|e| HttpError::from_ureq(&url, e))?
            .into_json()
            .map_err(|e| HttpError::invalid(&url, e))?;
        Ok((reply.state % 2) as u8)
    }

    fn write(&self, pin: Pin, raw: u8, hold: Duration) -> Result<()> {
        let url = self.gpio_url(Some(pin));
        let body = GpioRequest {
            state: raw,
            direction: "out",
            time: hold.as_secs(),
        };
        log::trace!("PATCH {} {:?}", url, body);
        self.agent
            .request("PATCH", &url)
            .set("Accept", "application/json")
            .send_json(&body)
            .map_err(|e| HttpError::from_ureq(&url, e))?;
        Ok(())
    }
}

impl GpioTransport for RteGpio {
    fn read_raw(&mut self, pin: Pin) -> rtectl_core::Result<u8> {
        Ok(self.read(pin)?)
    }

    fn write_raw(&mut self, pin: Pin, raw: u8, hold: Duration) -> rtectl_core::Result<()> {
        Ok(self.write(pin, raw, hold)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let gpio = RteGpio::new("192.168.10.5");
        assert_eq!(gpio.base_url(), "http://192.168.10.5:8000/api/v1");
        assert_eq!(
            gpio.gpio_url(Some(Pin::POWER)),
            "http://192.168.10.5:8000/api/v1/gpio/9"
        );
        assert_eq!(gpio.gpio_url(None), "http://192.168.10.5:8000/api/v1/gpio");
    }

    #[test]
    fn test_request_body() {
        let body = GpioRequest {
            state: 1,
            direction: "out",
            time: 6,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"state": 1, "direction": "out", "time": 6})
        );
    }

    #[test]
    fn test_unreachable_rte_is_a_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let mut gpio = RteGpio {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_millis(500))
                .build(),
            base_url: "http://127.0.0.1:9/api/v1".into(),
        };
        let err = gpio.read_raw(Pin::RELAY).unwrap_err();
        assert!(err.is_transport());
    }
}
