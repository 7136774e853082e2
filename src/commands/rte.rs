//! `rte` command: DUT control through its harness

use super::{invasive, mecheck, registered, Registry};
use crate::cli::{
    FlashCommands, GpioCommands, OnOff, PowerCommands, PsuCommands, RelayCommands, RteArgs,
    RteCommands, SpiCommands,
};
use crate::progress::SpinnerDelay;
use rtectl_core::flash::{ConsoleSink, Flasher};
use rtectl_core::gpio::{GpioPort, Pin, PinState};
use rtectl_core::model::{ModelConfig, ModelDatabase, PowerControl};
use rtectl_core::power::{PowerSwitch, PsuState, RelaySwitch};
use rtectl_core::sequence::Rte;
use rtectl_core::Error;
use rtectl_http::{RteGpio, SonoffPlug};
use rtectl_ssh::SshConnector;
use std::io;
use std::time::Duration;

type Harness = Rte<RteGpio, Box<dyn PowerSwitch>, SpinnerDelay>;

/// Run an `rte` subcommand and return the process exit status
pub fn run(
    args: &RteArgs,
    db: &ModelDatabase,
    mut registry: Option<&mut Registry>,
) -> Result<i32, Box<dyn std::error::Error>> {
    let asset = match registry.as_deref_mut() {
        Some(r) => registered(r.find_by_rte_ip(&args.rte_ip))?,
        None => None,
    };

    let model_name = match (&args.model, asset.as_ref().and_then(|a| a.model.as_ref())) {
        (Some(model), _) => {
            println!("DUT model retrieved from cmdline, skipping Snipe-IT query");
            model.clone()
        }
        (None, Some(model)) => {
            println!("DUT model retrieved from snipeit: {}", model);
            model.clone()
        }
        (None, None) => {
            return Err(
                "Failed to retrieve the DUT model from Snipe-IT, provide it with --model".into(),
            )
        }
    };

    let mut model = db.load(&model_name)?;
    if let RteCommands::Spi(SpiCommands::On {
        voltage: Some(voltage),
    }) = &args.command
    {
        model.flash_chip.voltage = voltage.parse()?;
    }

    if let RteCommands::Flash(FlashCommands::Write { rom, bios, force }) = &args.command {
        if !mecheck::allow_write(rom, *bios, *force, io::stdout().lock())? {
            return Err(format!(
                "{} failed the region checks, not writing it (--force overrides)",
                rom.display()
            )
            .into());
        }
    }

    let sonoff_ip = match (&args.sonoff_ip, registry.as_deref_mut()) {
        (Some(ip), _) => Some(ip.clone()),
        (None, Some(r)) if model.power_control == PowerControl::Sonoff => {
            r.sonoff_ip_for_rte(&args.rte_ip)?
        }
        _ => None,
    };

    let gpio = RteGpio::new(&args.rte_ip);
    let psu = power_switch(&model, &gpio, sonoff_ip.as_deref())?;
    let rte = Rte::new(GpioPort::new(gpio.clone()), psu, SpinnerDelay, model);
    let ssh = SshConnector::new(&args.rte_ip, &args.ssh_user, &args.ssh_password);

    Ok(invasive(registry, asset.as_ref(), || {
        execute(&args.command, rte, &gpio, ssh)
    })?)
}

/// The PSU switch declared by the model
fn power_switch(
    model: &ModelConfig,
    gpio: &RteGpio,
    sonoff_ip: Option<&str>,
) -> rtectl_core::Result<Box<dyn PowerSwitch>> {
    match model.power_control {
        PowerControl::Relay => Ok(Box::new(RelaySwitch::new(GpioPort::new(gpio.clone())))),
        PowerControl::Sonoff => {
            let ip = sonoff_ip.ok_or(Error::SonoffNotConfigured)?;
            log::debug!("Switching PSU through Sonoff at {}", ip);
            Ok(Box::new(SonoffPlug::new(ip)))
        }
    }
}

fn execute(
    command: &RteCommands,
    mut rte: Harness,
    gpio: &RteGpio,
    ssh: SshConnector,
) -> rtectl_core::Result<i32> {
    match command {
        RteCommands::Rel(cmd) => match cmd {
            RelayCommands::Tgl => {
                let state = rte.relay_toggle()?;
                println!("Relay state toggled. New state: {}", state);
            }
            RelayCommands::Get => println!("Relay state: {}", rte.relay_get()?),
            RelayCommands::Set { state } => {
                let state = match state {
                    OnOff::On => PsuState::On,
                    OnOff::Off => PsuState::Off,
                };
                rte.relay_set(state)?;
                println!("Relay state set to {}", state);
            }
        },
        RteCommands::Gpio(cmd) => match cmd {
            GpioCommands::Get { gpio_no } => {
                let pin = Pin::new(*gpio_no)?;
                println!("GPIO {} state: {}", pin, rte.gpio_get(pin)?);
            }
            GpioCommands::Set { gpio_no, state } => {
                let pin = Pin::new(*gpio_no)?;
                let state: PinState = state.parse()?;
                rte.gpio_set(pin, state, Duration::ZERO)?;
                println!("GPIO {} state set to {}", pin, state);
            }
            GpioCommands::List => {
                println!("GPIO list");
                println!("{:#}", gpio.list()?);
            }
        },
        RteCommands::Pwr(cmd) => match cmd {
            PowerCommands::On { time } => {
                println!("Powering on...");
                rte.power_on(Duration::from_secs(*time))?;
            }
            PowerCommands::Off { time } => {
                println!("Powering off...");
                rte.power_off(Duration::from_secs(*time))?;
            }
            PowerCommands::Reset { time } => {
                println!("Pressing reset button...");
                rte.reset(Duration::from_secs(*time))?;
            }
        },
        RteCommands::Psu(cmd) => match cmd {
            PsuCommands::On => {
                println!("Turning power supply on...");
                rte.psu_on()?;
            }
            PsuCommands::Off => {
                println!("Turning power supply off...");
                rte.psu_off()?;
            }
            PsuCommands::Get => println!("Power supply state: {}", rte.psu_get()?),
        },
        RteCommands::Spi(cmd) => match cmd {
            SpiCommands::On { .. } => {
                println!("Enabling SPI...");
                rte.spi_enable()?;
            }
            SpiCommands::Off => {
                println!("Disabling SPI...");
                rte.spi_disable()?;
            }
        },
        RteCommands::Cmos => {
            println!("Clearing CMOS...");
            rte.reset_cmos()?;
        }
        RteCommands::Led => {
            let lit = rte.power_led()?;
            println!("Power LED: {}", if lit { "ON" } else { "OFF" });
        }
        RteCommands::Flash(cmd) => return flash(cmd, rte, ssh),
    }
    Ok(0)
}

fn flash(cmd: &FlashCommands, rte: Harness, ssh: SshConnector) -> rtectl_core::Result<i32> {
    let mut flasher = Flasher::new(rte, ssh, ConsoleSink);
    match cmd {
        FlashCommands::Probe => {
            println!("Probing flash...");
            flasher.probe()
        }
        FlashCommands::Read { rom } => {
            println!("Reading from flash...");
            let rc = flasher.read(rom)?;
            if rc == 0 {
                println!("Read flash content saved to {}", rom.display());
            }
            Ok(rc)
        }
        FlashCommands::Write { rom, bios, .. } => {
            println!("Writing {} to flash...", rom.display());
            let rc = flasher.write(rom, *bios)?;
            if rc == 0 {
                println!("Flash written successfully");
            } else {
                println!("Flash write failed with code {}", rc);
            }
            Ok(rc)
        }
        FlashCommands::Erase => {
            println!("Erasing DUT flash...");
            let rc = flasher.erase()?;
            if rc == 0 {
                println!("Flash erased");
            }
            Ok(rc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SONOFF_MODEL: &str = r#"
[programmer]
name = "rte_1_1"

[flash_chip]
voltage = "3.3V"

[pwr_ctrl]
sonoff = true
relay = false
flashing_power_state = "G3"
"#;

    #[test]
    fn test_sonoff_model_without_plug_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("board.toml"), SONOFF_MODEL).unwrap();
        let model = ModelDatabase::new(dir.path()).load("board").unwrap();

        let gpio = RteGpio::new("192.0.2.1");
        let err = power_switch(&model, &gpio, None).err().unwrap();
        assert!(matches!(err, Error::SonoffNotConfigured));
        assert!(power_switch(&model, &gpio, Some("192.0.2.2")).is_ok());
    }
}
