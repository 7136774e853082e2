//! Remote command session abstraction
//!
//! The executor only needs file transfer and a command channel with
//! separately readable stdout and stderr. `rtectl-ssh` implements these on
//! top of SSH/SFTP.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::delay::Delay;
use crate::error::Result;

/// A running remote command
pub trait RemoteChannel {
    /// Whether the command finished and its exit status can be read
    fn exit_status_ready(&mut self) -> Result<bool>;

    /// Read available stdout bytes without blocking, 0 if none are pending
    fn read_stdout(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read available stderr bytes without blocking, 0 if none are pending
    fn read_stderr(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Exit status of the finished command
    fn exit_status(&mut self) -> Result<i32>;
}

/// An authenticated session to the harness
///
/// Dropping the session closes it.
pub trait RemoteSession {
    /// Copy a local file to `remote`
    fn upload(&mut self, local: &Path, remote: &str) -> Result<()>;

    /// Copy `remote` to a local file
    fn download(&mut self, remote: &str, local: &Path) -> Result<()>;

    /// Start `command` on the harness
    fn exec(&mut self, command: &str) -> Result<Box<dyn RemoteChannel>>;
}

/// Opens a fresh [`RemoteSession`] for every flashing run
pub trait Connector {
    /// Connect and authenticate
    fn connect(&mut self) -> Result<Box<dyn RemoteSession>>;
}

impl<C: Connector + ?Sized> Connector for Box<C> {
    fn connect(&mut self) -> Result<Box<dyn RemoteSession>> {
        (**self).connect()
    }
}

/// Destination of remote command output
pub trait OutputSink {
    /// Bytes received on stdout
    fn stdout(&mut self, data: &[u8]);

    /// Bytes received on stderr
    fn stderr(&mut self, data: &[u8]);
}

/// Forwards remote output to the local stdout and stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn stdout(&mut self, data: &[u8]) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(data);
        let _ = out.flush();
    }

    fn stderr(&mut self, data: &[u8]) {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(data);
        let _ = err.flush();
    }
}

/// Polling parameters of [`stream_output`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Wait between polls of a running command
    pub poll_interval: Duration,
    /// Largest chunk read per stream and poll
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            chunk_size: 1024,
        }
    }
}

/// Forward a command's output until it exits and return its exit status
///
/// There is no client side timeout: flashing may legitimately take minutes.
/// Output of the two streams is forwarded as received; everything pending
/// once the command exits is drained before the status is read.
pub fn stream_output(
    channel: &mut dyn RemoteChannel,
    sink: &mut dyn OutputSink,
    delay: &mut dyn Delay,
    config: StreamConfig,
) -> Result<i32> {
    let mut buf = vec![0u8; config.chunk_size.max(1)];

    loop {
        delay.sleep(config.poll_interval);

        if channel.exit_status_ready()? {
            break;
        }
        let n = channel.read_stdout(&mut buf)?;
        if n > 0 {
            sink.stdout(&buf[..n]);
        }
        let n = channel.read_stderr(&mut buf)?;
        if n > 0 {
            sink.stderr(&buf[..n]);
        }
    }

    loop {
        let n = channel.read_stdout(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.stdout(&buf[..n]);
    }
    loop {
        let n = channel.read_stderr(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.stderr(&buf[..n]);
    }

    channel.exit_status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BufferSink, Log, MockConnector, MockDelay, Script};

    #[test]
    fn test_all_output_arrives_before_exit_status() {
        let log = Log::default();
        let script = Script {
            stdout: b"Found Winbond flash chip \"W25Q128.V\"\n".to_vec(),
            stderr: b"Warning: chip is write protected\n".to_vec(),
            running_polls: 4,
            exit_code: 3,
            ..Default::default()
        };
        let mut session = MockConnector::new(log.clone(), script).connect().unwrap();
        let mut channel = session.exec("flashrom -p ch341a_spi").unwrap();
        let mut sink = BufferSink::default();
        let mut delay = MockDelay::new(log.clone());

        let rc = stream_output(
            channel.as_mut(),
            &mut sink,
            &mut delay,
            StreamConfig::default(),
        )
        .unwrap();

        assert_eq!(rc, 3);
        assert_eq!(
            sink.stdout.borrow().as_slice(),
            b"Found Winbond flash chip \"W25Q128.V\"\n"
        );
        assert_eq!(
            sink.stderr.borrow().as_slice(),
            b"Warning: chip is write protected\n"
        );
        // One sleep per poll, including the final one
        assert_eq!(log.sleeps().len(), 5);
    }

    #[test]
    fn test_instant_exit_still_drains() {
        let log = Log::default();
        let script = Script {
            stdout: vec![b'x'; 5000],
            ..Default::default()
        };
        let mut session = MockConnector::new(log.clone(), script).connect().unwrap();
        let mut channel = session.exec("true").unwrap();
        let mut sink = BufferSink::default();

        let rc = stream_output(
            channel.as_mut(),
            &mut sink,
            &mut MockDelay::new(log),
            StreamConfig {
                poll_interval: Duration::from_millis(1),
                chunk_size: 16,
            },
        )
        .unwrap();

        assert_eq!(rc, 0);
        assert_eq!(sink.stdout.borrow().len(), 5000);
    }
}
