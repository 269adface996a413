//! TCP transport over `std::net`

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use super::{Transport, TransportError};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Non-blocking TCP byte stream.
///
/// The socket is switched to non-blocking mode after connect so that
/// `read_byte` and `available` never stall; the response reader above this
/// layer turns polling into a bounded cooperative wait.
#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    connect_timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(timeout: Duration) -> Self {
        Self {
            stream: None,
            connect_timeout: Some(timeout),
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        self.stop();

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?
            .next()
            .ok_or_else(|| {
                TransportError::ConnectFailed(format!("no address for {host}:{port}"))
            })?;

        let timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        stream
            .set_nonblocking(true)
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let _ = stream.set_nodelay(true);

        debug!(%addr, "connected");
        self.stream = Some(stream);
        Ok(())
    }

    fn connected(&self) -> bool {
        self.stream.is_some()
    }

    fn available(&mut self) -> usize {
        let Some(stream) = &self.stream else {
            return 0;
        };
        let mut probe = [0u8; 1];
        match stream.peek(&mut probe) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(0) => {
                self.stop();
                Err(TransportError::Closed)
            }
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(_) => {
                self.stop();
                Err(TransportError::Closed)
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let mut written = 0;
        while written < data.len() {
            match stream.write(&data[written..]) {
                Ok(0) => return Err(TransportError::SendFailed("stream closed".to_string())),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::SendFailed(e.to_string())),
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
