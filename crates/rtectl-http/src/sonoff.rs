//! Sonoff smart plug (Tasmota HTTP API)

use std::time::Duration;

use rtectl_core::power::{PowerSwitch, PsuState};

use crate::error::{HttpError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, serde::Deserialize)]
struct PowerReply {
    #[serde(rename = "POWER")]
    power: Option<String>,
}

/// A Sonoff plug switching the DUT power supply
#[derive(Debug, Clone)]
pub struct SonoffPlug {
    agent: ureq::Agent,
    base_url: String,
}

impl SonoffPlug {
    /// Client for the plug at `ip`
    pub fn new(ip: &str) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            base_url: format!("http://{}", ip),
        }
    }

    fn command_url(&self, command: &str) -> String {
        format!("{}/cm?cmnd={}", self.base_url, command)
    }

    fn post(&self, command: &str) -> Result<()> {
        let url = self.command_url(command);
        log::debug!("POST {}", url);
        self.agent
            .post(&url)
            .call()
            .map_err(|e| HttpError::from_ureq(&url, e))?;
        Ok(())
    }

    /// State reported by the plug
    pub fn get_state(&self) -> Result<PsuState> {
        let url = self.command_url("Power");
        log::debug!("GET {}", url);
        let reply: PowerReply = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| HttpError::from_ureq(&url, e))?
            .into_json()
            .map_err(|e| HttpError::invalid(&url, e))?;
        parse_power(reply).map_err(|msg| HttpError::invalid(&url, msg))
    }
}

fn parse_power(reply: PowerReply) -> std::result::Result<PsuState, String> {
    let power = reply.power.ok_or("no POWER field in reply")?;
    power.parse().map_err(|_| format!("unknown power state '{}'", power))
}

impl PowerSwitch for SonoffPlug {
    fn turn_on(&mut self) -> rtectl_core::Result<()> {
        Ok(self.post("Power%20On")?)
    }

    fn turn_off(&mut self) -> rtectl_core::Result<()> {
        Ok(self.post("Power%20off")?)
    }

    fn state(&mut self) -> rtectl_core::Result<PsuState> {
        Ok(self.get_state()?)
    }
}
