//! flashrom runs bracketed by the power sequencer

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use super::args::{FlashOp, FW_PATH_READ, FW_PATH_WRITE, LAYOUT_PATH};
use super::remote::{stream_output, Connector, OutputSink, StreamConfig};
use crate::delay::Delay;
use crate::error::Result;
use crate::gpio::GpioTransport;
use crate::power::PowerSwitch;
use crate::sequence::Rte;

/// Wait between the end of a write and the optional CMOS clear
pub const POST_WRITE_SETTLE: Duration = Duration::from_secs(2);

/// Runs flashrom on the harness against one DUT
pub struct Flasher<G, P, D, C, S> {
    rte: Rte<G, P, D>,
    connector: C,
    sink: S,
    stream: StreamConfig,
}

impl<G, P, D, C, S> Flasher<G, P, D, C, S>
where
    G: GpioTransport,
    P: PowerSwitch,
    D: Delay,
    C: Connector,
    S: OutputSink,
{
    /// Create a flasher around a sequencer and a session factory
    pub fn new(rte: Rte<G, P, D>, connector: C, sink: S) -> Self {
        Self {
            rte,
            connector,
            sink,
            stream: StreamConfig::default(),
        }
    }

    /// Override the output polling parameters
    pub fn with_stream_config(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// The sequencer, for power operations outside of flashing
    pub fn rte_mut(&mut self) -> &mut Rte<G, P, D> {
        &mut self.rte
    }

    /// Run one flashrom invocation and return its exit code
    ///
    /// The DUT is brought into its flashing power state first and restored
    /// afterwards, including when the session or the command fails. A
    /// non-zero exit code is returned, not raised.
    pub fn run(
        &mut self,
        op: FlashOp,
        read_file: Option<&Path>,
        write_file: Option<&Path>,
    ) -> Result<i32> {
        let command = op.command(self.rte.model());
        let layout = self
            .rte
            .model()
            .has_layout()
            .then(|| self.rte.model().layout_file_contents());

        let mut guard = self.rte.power_for_flash()?;

        let mut session = self.connector.connect()?;

        if let Some(path) = write_file {
            log::info!("Uploading {} to {}", path.display(), FW_PATH_WRITE);
            session.upload(path, FW_PATH_WRITE)?;
        }

        if let Some(contents) = layout {
            let mut file = tempfile::NamedTempFile::new()?;
            file.write_all(contents.as_bytes())?;
            file.flush()?;
            log::debug!("Uploading layout to {}", LAYOUT_PATH);
            session.upload(file.path(), LAYOUT_PATH)?;
        }

        log::info!("Executing command: {}", command);
        let mut channel = session.exec(&command)?;
        let rc = stream_output(
            channel.as_mut(),
            &mut self.sink,
            guard.delay_mut(),
            self.stream,
        )?;
        log::debug!("flashrom exited with {}", rc);

        if let Some(path) = read_file {
            log::info!("Downloading {} to {}", FW_PATH_READ, path.display());
            session.download(FW_PATH_READ, path)?;
        }

        Ok(rc)
    }

    /// Probe the flash chip
    pub fn probe(&mut self) -> Result<i32> {
        self.run(FlashOp::Probe, None, None)
    }

    /// Read the flash chip into `path`
    pub fn read(&mut self, path: &Path) -> Result<i32> {
        self.run(FlashOp::Read, Some(path), None)
    }

    /// Erase the flash chip
    pub fn erase(&mut self) -> Result<i32> {
        self.run(FlashOp::Erase, None, None)
    }

    /// Write `path` to the flash chip
    ///
    /// Clears write protection first when the model asks for it. A write
    /// exiting 0 is followed by a CMOS clear pulse when the model asks for it.
    pub fn write(&mut self, path: &Path, bios_only: bool) -> Result<i32> {
        if self.rte.model().disable_wp {
            let rc = self.run(FlashOp::DisableWp, None, None)?;
            if rc != 0 {
                log::warn!("Disabling write protection returned {}", rc);
            }
        }

        let rc = self.run(FlashOp::Write { bios_only }, None, Some(path))?;
        self.rte.sleep(POST_WRITE_SETTLE);

        if rc == 0 && self.rte.model().reset_cmos {
            self.rte.reset_cmos()?;
        }
        Ok(rc)
    }
}
