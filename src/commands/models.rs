//! Model database commands

use rtectl_core::model::{ModelConfig, ModelDatabase, PowerControl};
use std::io::{self, Write};

/// List every model with its validation status
pub fn cmd_list(db: &ModelDatabase) -> Result<(), Box<dyn std::error::Error>> {
    let models = db.list()?;
    if models.is_empty() {
        println!("No models found in {}", db.dir().display());
        return Ok(());
    }

    println!("{:<32} STATUS", "MODEL");
    println!("{}", "-".repeat(44));
    for status in &models {
        match &status.error {
            None => println!("{:<32} VERIFIED", status.name),
            Some(e) => {
                println!("{:<32} INCOMPLETE", status.name);
                log::debug!("{}: {}", status.name, e);
            }
        }
    }

    let verified = models.iter().filter(|m| m.is_verified()).count();
    println!("\n{} models, {} verified", models.len(), verified);
    Ok(())
}

/// Show the parsed configuration of one model
pub fn cmd_show(db: &ModelDatabase, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let model = db.load(name)?;
    print_model(&model, io::stdout().lock())?;
    Ok(())
}

fn print_model(model: &ModelConfig, mut out: impl Write) -> io::Result<()> {
    let chip = &model.flash_chip;
    let power = match model.power_control {
        PowerControl::Relay => "RTE relay",
        PowerControl::Sonoff => "Sonoff",
    };

    writeln!(out, "Model:              {}", model.name)?;
    writeln!(out, "Programmer:         {}", model.programmer)?;
    writeln!(out, "Flash voltage:      {}", chip.voltage)?;
    if let Some(chip_model) = &chip.model {
        writeln!(out, "Flash chip:         {}", chip_model)?;
    }
    writeln!(out, "Power control:      {}", power)?;
    writeln!(out, "Flashing power:     {}", model.flashing_power_state)?;
    writeln!(out, "Reset CMOS:         {}", yes_no(model.reset_cmos))?;
    writeln!(out, "Disable WP:         {}", yes_no(model.disable_wp))?;

    if model.has_layout() {
        writeln!(out, "Layout:")?;
        for line in model.layout_file_contents().lines() {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_model_with_layout() {
        let content = r#"
reset_cmos = true

[programmer]
name = "ch341a"

[flash_chip]
voltage = "1.8V"
model = "MX25U25635F"
layout = [ { range = "0x00000000:0x00000fff", name = "fd" } ]

[pwr_ctrl]
sonoff = false
relay = true
flashing_power_state = "S5"
"#;
        let model = ModelConfig::from_toml_str("board", content).unwrap();
        let mut out = Vec::new();
        print_model(&model, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Flash chip:         MX25U25635F"));
        assert!(text.contains("Power control:      RTE relay"));
        assert!(text.contains("Reset CMOS:         yes"));
        assert!(text.contains("Layout:\n  0x00000000:0x00000fff fd\n"));
    }
}
