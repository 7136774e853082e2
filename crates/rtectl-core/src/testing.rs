//! Recording test doubles for the hardware and remote collaborators
//!
//! Every double appends to a shared [`Log`] so tests can assert the global
//! order of GPIO writes, PSU switching, sleeps and remote calls.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use crate::delay::Delay;
use crate::error::{Error, Result};
use crate::flash::{Connector, OutputSink, RemoteChannel, RemoteSession};
use crate::gpio::{GpioTransport, Pin, GPIO_MAX};
use crate::power::{PowerSwitch, PsuState};

/// Something a double observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Raw GPIO write, hold in whole seconds
    Gpio { pin: u8, raw: u8, hold: u64 },
    /// PSU commanded to a state
    Psu(PsuState),
    /// Blocking wait
    Sleep(Duration),
    /// Remote session opened
    Connect,
    /// File uploaded to the harness
    Upload { remote: String, contents: Vec<u8> },
    /// File downloaded from the harness
    Download { remote: String },
    /// Remote command started
    Exec(String),
}

/// Shared, ordered event log
#[derive(Debug, Clone, Default)]
pub struct Log(Rc<RefCell<Vec<Event>>>);

impl Log {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    /// Events without the sleeps
    pub fn actions(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Sleep(_)))
            .collect()
    }

    /// Only the sleeps
    pub fn sleeps(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Sleep(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Commands passed to `exec`, in order
    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Exec(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct GpioFlags {
    fail_writes: bool,
    fail_reads: bool,
    reject_writes: bool,
}

/// In-memory RTE GPIO lines; clones share the same lines
#[derive(Debug, Clone)]
pub struct MockGpio {
    log: Log,
    lines: Rc<RefCell<[u8; GPIO_MAX as usize + 1]>>,
    flags: Rc<RefCell<GpioFlags>>,
}

impl MockGpio {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            lines: Rc::new(RefCell::new([0; GPIO_MAX as usize + 1])),
            flags: Rc::default(),
        }
    }

    /// Writes are logged but fail with a connection error
    pub fn fail_writes(&mut self, fail: bool) {
        self.flags.borrow_mut().fail_writes = fail;
    }

    /// Reads fail with a connection error
    pub fn fail_reads(&mut self, fail: bool) {
        self.flags.borrow_mut().fail_reads = fail;
    }

    /// Writes are refused by the remote end
    pub fn reject_writes(&mut self, reject: bool) {
        self.flags.borrow_mut().reject_writes = reject;
    }

    /// Raw value currently on a line
    pub fn raw(&self, index: u8) -> u8 {
        self.lines.borrow()[index as usize]
    }

    /// Force a raw value, as if driven from outside
    pub fn set_raw(&self, index: u8, raw: u8) {
        self.lines.borrow_mut()[index as usize] = raw;
    }
}

impl GpioTransport for MockGpio {
    fn read_raw(&mut self, pin: Pin) -> Result<u8> {
        if self.flags.borrow().fail_reads {
            return Err(Error::Transport("connection refused".into()));
        }
        Ok(self.raw(pin.index()))
    }

    fn write_raw(&mut self, pin: Pin, raw: u8, hold: Duration) -> Result<()> {
        self.log.push(Event::Gpio {
            pin: pin.index(),
            raw,
            hold: hold.as_secs(),
        });
        let flags = self.flags.borrow();
        if flags.fail_writes {
            return Err(Error::Transport("connection refused".into()));
        }
        if flags.reject_writes {
            return Err(Error::Rejected("HTTP 400".into()));
        }
        self.set_raw(pin.index(), raw);
        Ok(())
    }
}

/// PSU switch whose state can be made to ignore commands
#[derive(Debug)]
pub struct MockPsu {
    log: Log,
    state: PsuState,
    stuck: bool,
    unreachable: bool,
}

impl MockPsu {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            state: PsuState::Off,
            stuck: false,
            unreachable: false,
        }
    }

    /// Commands are accepted but the state never changes
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Every call fails with a connection error
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    fn switch(&mut self, state: PsuState) -> Result<()> {
        if self.unreachable {
            return Err(Error::Transport("connection refused".into()));
        }
        self.log.push(Event::Psu(state));
        if !self.stuck {
            self.state = state;
        }
        Ok(())
    }
}

impl PowerSwitch for MockPsu {
    fn turn_on(&mut self) -> Result<()> {
        self.switch(PsuState::On)
    }

    fn turn_off(&mut self) -> Result<()> {
        self.switch(PsuState::Off)
    }

    fn state(&mut self) -> Result<PsuState> {
        if self.unreachable {
            return Err(Error::Transport("connection refused".into()));
        }
        Ok(self.state)
    }
}

/// Records requested waits without sleeping
#[derive(Debug)]
pub struct MockDelay {
    log: Log,
}

impl MockDelay {
    pub fn new(log: Log) -> Self {
        Self { log }
    }
}

impl Delay for MockDelay {
    fn sleep(&mut self, duration: Duration) {
        self.log.push(Event::Sleep(duration));
    }
}

/// Behaviour of the scripted remote end
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// `connect` fails with a connection error
    pub fail_connect: bool,
    /// `exec` fails with a connection error
    pub fail_exec: bool,
    /// Bytes the command prints on stdout
    pub stdout: Vec<u8>,
    /// Bytes the command prints on stderr
    pub stderr: Vec<u8>,
    /// Polls answered "still running" before the command completes
    pub running_polls: usize,
    /// Exit status of every command
    pub exit_code: i32,
    /// Contents served for downloads
    pub remote_file: Vec<u8>,
}

/// Connector handing out scripted sessions
#[derive(Debug, Clone)]
pub struct MockConnector {
    log: Log,
    script: Script,
}

impl MockConnector {
    pub fn new(log: Log, script: Script) -> Self {
        Self { log, script }
    }
}

impl Connector for MockConnector {
    fn connect(&mut self) -> Result<Box<dyn RemoteSession>> {
        self.log.push(Event::Connect);
        if self.script.fail_connect {
            return Err(Error::Transport("no route to host".into()));
        }
        Ok(Box::new(MockSession {
            log: self.log.clone(),
            script: self.script.clone(),
        }))
    }
}

struct MockSession {
    log: Log,
    script: Script,
}

impl RemoteSession for MockSession {
    fn upload(&mut self, local: &Path, remote: &str) -> Result<()> {
        let contents = std::fs::read(local)?;
        self.log.push(Event::Upload {
            remote: remote.to_string(),
            contents,
        });
        Ok(())
    }

    fn download(&mut self, remote: &str, local: &Path) -> Result<()> {
        self.log.push(Event::Download {
            remote: remote.to_string(),
        });
        std::fs::write(local, &self.script.remote_file)?;
        Ok(())
    }

    fn exec(&mut self, command: &str) -> Result<Box<dyn RemoteChannel>> {
        self.log.push(Event::Exec(command.to_string()));
        if self.script.fail_exec {
            return Err(Error::Transport("channel closed".into()));
        }
        Ok(Box::new(MockChannel {
            stdout: self.script.stdout.iter().copied().collect(),
            stderr: self.script.stderr.iter().copied().collect(),
            running_polls: self.script.running_polls,
            exit_code: self.script.exit_code,
        }))
    }
}

/// Hands out at most 3 bytes per read to exercise chunked streaming
struct MockChannel {
    stdout: VecDeque<u8>,
    stderr: VecDeque<u8>,
    running_polls: usize,
    exit_code: i32,
}

fn drain_into(queue: &mut VecDeque<u8>, buf: &mut [u8]) -> usize {
    let n = queue.len().min(buf.len()).min(3);
    for (dst, src) in buf.iter_mut().zip(queue.drain(..n)) {
        *dst = src;
    }
    n
}

impl RemoteChannel for MockChannel {
    fn exit_status_ready(&mut self) -> Result<bool> {
        if self.running_polls == 0 {
            return Ok(true);
        }
        self.running_polls -= 1;
        Ok(false)
    }

    fn read_stdout(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(drain_into(&mut self.stdout, buf))
    }

    fn read_stderr(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(drain_into(&mut self.stderr, buf))
    }

    fn exit_status(&mut self) -> Result<i32> {
        Ok(self.exit_code)
    }
}

/// Collects streamed output
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    pub stdout: Rc<RefCell<Vec<u8>>>,
    pub stderr: Rc<RefCell<Vec<u8>>>,
}

impl OutputSink for BufferSink {
    fn stdout(&mut self, data: &[u8]) {
        self.stdout.borrow_mut().extend_from_slice(data);
    }

    fn stderr(&mut self, data: &[u8]) {
        self.stderr.borrow_mut().extend_from_slice(data);
    }
}

/// A validated model for sequencing tests
pub fn model(
    programmer: &str,
    voltage: &str,
    power_state: &str,
    extra: &str,
) -> crate::model::ModelConfig {
    let content = format!(
        "{extra}\n[programmer]\nname = \"{programmer}\"\n\n[flash_chip]\nvoltage = \"{voltage}\"\n\n[pwr_ctrl]\nsonoff = false\nrelay = true\nflashing_power_state = \"{power_state}\"\n"
    );
    match crate::model::ModelConfig::from_toml_str("test", &content) {
        Ok(model) => model,
        Err(e) => panic!("invalid test model: {}", e),
    }
}
