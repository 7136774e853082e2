//! SSH/SFTP implementation of the remote session traits

use std::fs::File;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use rtectl_core::flash::{Connector, RemoteChannel, RemoteSession};
use ssh2::{Channel, Session};

use crate::error::{Result, SshError};

/// Default SSH port
pub const SSH_PORT: u16 = 22;
/// Default user of the RTE image
pub const DEFAULT_USER: &str = "root";
/// Default password of the RTE image
pub const DEFAULT_PASSWORD: &str = "meta-rte";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens password-authenticated SSH sessions to one harness
#[derive(Debug, Clone)]
pub struct SshConnector {
    host: String,
    port: u16,
    user: String,
    password: String,
}

impl SshConnector {
    /// Connector for `host` on the default port
    pub fn new(host: &str, user: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            port: SSH_PORT,
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    /// Use a non-standard port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    fn open(&self) -> Result<SshSession> {
        let target = format!("{}:{}", self.host, self.port);
        let connect_err = |source: io::Error| SshError::Connect {
            host: target.clone(),
            source,
        };

        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| {
                connect_err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no address for host",
                ))
            })?;
        let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(connect_err)?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        let auth = session.userauth_password(&self.user, &self.password);
        if let Err(e) = &auth {
            log::debug!("Password authentication failed: {}", e);
        }
        if auth.is_err() || !session.authenticated() {
            return Err(SshError::AuthFailed {
                user: self.user.clone(),
            });
        }
        log::debug!("SSH session to {} as {} established", target, self.user);
        Ok(SshSession { session })
    }
}

impl Connector for SshConnector {
    fn connect(&mut self) -> rtectl_core::Result<Box<dyn RemoteSession>> {
        Ok(Box::new(self.open()?))
    }
}

/// One SSH connection to the harness
pub struct SshSession {
    session: Session,
}

impl SshSession {
    fn upload_file(&mut self, local: &Path, remote: &str) -> Result<()> {
        self.session.set_blocking(true);
        let sftp = self.session.sftp()?;
        let mut src = File::open(local)?;
        let mut dst = sftp.create(Path::new(remote))?;
        let n = io::copy(&mut src, &mut dst)?;
        log::debug!("Uploaded {} bytes to {}", n, remote);
        Ok(())
    }

    fn download_file(&mut self, remote: &str, local: &Path) -> Result<()> {
        self.session.set_blocking(true);
        let sftp = self.session.sftp()?;
        let mut src = sftp.open(Path::new(remote))?;
        let mut dst = File::create(local)?;
        let n = io::copy(&mut src, &mut dst)?;
        log::debug!("Downloaded {} bytes from {}", n, remote);
        Ok(())
    }

    fn exec_command(&mut self, command: &str) -> Result<SshChannel> {
        self.session.set_blocking(true);
        let mut channel = self.session.channel_session()?;
        channel.exec(command)?;
        // Output is polled
        self.session.set_blocking(false);
        Ok(SshChannel {
            session: self.session.clone(),
            channel,
        })
    }
}

impl RemoteSession for SshSession {
    fn upload(&mut self, local: &Path, remote: &str) -> rtectl_core::Result<()> {
        Ok(self.upload_file(local, remote)?)
    }

    fn download(&mut self, remote: &str, local: &Path) -> rtectl_core::Result<()> {
        Ok(self.download_file(remote, local)?)
    }

    fn exec(&mut self, command: &str) -> rtectl_core::Result<Box<dyn RemoteChannel>> {
        Ok(Box::new(self.exec_command(command)?))
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.session.set_blocking(true);
        if let Err(e) = self.session.disconnect(None, "done", None) {
            log::debug!("SSH disconnect failed: {}", e);
        }
    }
}

/// A command running over SSH
pub struct SshChannel {
    session: Session,
    channel: Channel,
}

/// Non-blocking read, 0 when nothing is pending
fn read_pending(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    match reader.read(buf) {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(e.into()),
    }
}

impl RemoteChannel for SshChannel {
    fn exit_status_ready(&mut self) -> rtectl_core::Result<bool> {
        Ok(self.channel.eof())
    }

    fn read_stdout(&mut self, buf: &mut [u8]) -> rtectl_core::Result<usize> {
        Ok(read_pending(&mut self.channel, buf)?)
    }

    fn read_stderr(&mut self, buf: &mut [u8]) -> rtectl_core::Result<usize> {
        Ok(read_pending(&mut self.channel.stderr(), buf)?)
    }

    fn exit_status(&mut self) -> rtectl_core::Result<i32> {
        self.session.set_blocking(true);
        self.channel.wait_close().map_err(SshError::from)?;
        Ok(self.channel.exit_status().map_err(SshError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Script(Vec<io::Result<usize>>);

    impl Read for Script {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            self.0.remove(0)
        }
    }

    #[test]
    fn test_would_block_reads_as_nothing() {
        let mut buf = [0u8; 8];
        let mut script = Script(vec![
            Err(io::ErrorKind::WouldBlock.into()),
            Ok(4),
            Err(io::ErrorKind::BrokenPipe.into()),
        ]);
        assert_eq!(read_pending(&mut script, &mut buf).unwrap(), 0);
        assert_eq!(read_pending(&mut script, &mut buf).unwrap(), 4);
        assert!(read_pending(&mut script, &mut buf).is_err());
    }

    #[test]
    fn test_refused_connection_is_transport() {
        // Nothing listens on the discard port of localhost
        let mut connector =
            SshConnector::new("127.0.0.1", DEFAULT_USER, DEFAULT_PASSWORD).with_port(9);
        let err = connector.connect().err().unwrap();
        assert!(err.is_transport());
    }

    #[test]
    fn test_auth_failure_is_rejected() {
        let err: rtectl_core::Error = SshError::AuthFailed {
            user: "root".into(),
        }
        .into();
        assert!(matches!(err, rtectl_core::Error::Rejected(_)));
    }
}
