use std::{io, ops::ControlFlow, time::Duration};

use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use vio_protocol::{
    Action, Command, DEFAULT_PORT, DeviceIdentity, MAX_CONTROLLERS, Response, VIO_4K_MODEL,
    codec::LineBuffer, error::ActionError, model_name,
};

use crate::{Host, Level, LinkState, error::LinkError};

const READ_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// IP address or host name of the device
    pub host: String,
    pub port: u16,
    /// Name of the device used in messages to the user
    pub label: String,
    /// Upper bound for establishing the connection. `None` waits for the operating system.
    pub connect_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "192.168.2.140".to_string(),
            port: DEFAULT_PORT,
            label: "VIO 4K".to_string(),
            connect_timeout: None,
        }
    }
}

impl Config {
    /// The `host:port` address the link connects to.
    pub fn target(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Builder to create a [DeviceLink] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use vio_client::{LogHost, link::Builder};
/// use std::time::Duration;
///
/// let link = Builder::new()
///     .host("10.0.0.20")
///     .label("Stage left")
///     .connect_timeout(Duration::from_secs(3))
///     .build(LogHost);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Only needed for test setups, the device always listens on [`DEFAULT_PORT`].
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Build and return the link. It is not connected yet.
    pub fn build<H: Host>(self, host: H) -> DeviceLink<H> {
        DeviceLink::new(host, self.config)
    }
}

struct Connection {
    target: String,
    stream: TcpStream,
}

/// The connection to one VIO.
///
/// All methods take `&mut self`; the link is meant to be driven by a single task that
/// alternates between [`read_chunk`](DeviceLink::read_chunk) /
/// [`on_bytes`](DeviceLink::on_bytes) and [`send`](DeviceLink::send).
pub struct DeviceLink<H: Host> {
    host: H,
    config: Config,
    state: LinkState,
    connection: Option<Connection>,
    lines: LineBuffer,
    identity: DeviceIdentity,
}

impl<H: Host> DeviceLink<H> {
    pub fn new(host: H, config: Config) -> DeviceLink<H> {
        DeviceLink {
            host,
            config,
            state: LinkState::Idle,
            connection: None,
            lines: LineBuffer::new(),
            identity: DeviceIdentity::default(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// What the device told about itself in the current session.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connects if a host is configured.
    pub async fn init(&mut self) {
        if !self.config.host.is_empty() {
            // failures are reported to the host
            let _ = self.connect().await;
        }
    }

    /// Replaces the configuration.
    ///
    /// A changed target address closes the current connection and connects to the new
    /// target, if one is configured.
    pub async fn update_config(&mut self, config: Config) {
        let target_changed = config.target() != self.config.target();
        self.config = config;
        if target_changed {
            log::debug!("Target changed to {}", self.config.target());
            self.teardown().await;
            self.init().await;
        }
    }

    /// Closes the connection for good.
    pub async fn destroy(&mut self) {
        self.teardown().await;
        log::debug!("Destroyed link to {}", self.config.label);
    }

    /// Opens a new connection to the configured target, replacing any existing one.
    ///
    /// Once connected, the empty diagnostic command is sent to start the handshake.
    pub async fn connect(&mut self) -> Result<(), LinkError> {
        self.close_connection().await;
        self.identity = DeviceIdentity::default();

        if self.config.host.is_empty() {
            self.set_state(LinkState::Idle, Some("No host configured"));
            return Err(LinkError::NoHost);
        }

        let target = self.config.target();
        self.set_state(LinkState::Connecting, None);
        log::debug!("Connecting to {}", target);

        let result = match self.config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(&target))
                .await
                .unwrap_or_else(|_| {
                    Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no answer within {:?}", timeout),
                    ))
                }),
            None => TcpStream::connect(&target).await,
        };

        match result {
            Ok(stream) => {
                log::info!("Connected to {}", target);
                self.connection = Some(Connection { target, stream });
                self.set_state(LinkState::Connected, None);
                self.write(&Command::diagnostic()).await
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Closes the connection if there is one. Calling it again has no effect.
    pub async fn teardown(&mut self) {
        self.close_connection().await;
        if self.state != LinkState::Idle {
            self.set_state(LinkState::Idle, Some("Disconnected"));
        }
    }

    /// Sends a command, connecting first if there is no connection to the configured target.
    ///
    /// Commands that cannot be transmitted are dropped, not queued.
    /// Returns whether the command was written to the connection.
    pub async fn send(&mut self, command: impl Into<Command>) -> bool {
        let command = command.into();
        let configured = self.config.target();
        let reconnect = self
            .connection
            .as_ref()
            .is_none_or(|connection| connection.target != configured);

        // connection failures are reported to the host
        if reconnect && self.connect().await.is_err() {
            log::debug!("Not connected, dropping command '{}'", command);
            return false;
        }
        self.write(&command).await.is_ok()
    }

    /// Encodes and sends an action.
    pub async fn execute(&mut self, action: &Action) -> Result<bool, ActionError> {
        let command = action.command()?;
        log::debug!("Executing '{}'", action);
        Ok(self.send(command).await)
    }

    /// Waits for the next chunk of bytes from the device.
    ///
    /// Never completes while there is no connection. An empty chunk means the device
    /// closed the connection. This method is cancel safe.
    pub async fn read_chunk(&mut self) -> Result<BytesMut, LinkError> {
        let Some(connection) = self.connection.as_mut() else {
            return std::future::pending().await;
        };

        let mut chunk = BytesMut::with_capacity(READ_CHUNK_SIZE);
        let read = connection.stream.read_buf(&mut chunk).await;
        match read {
            Ok(0) => {
                log::info!("Connection closed by {}", connection.target);
                self.connection = None;
                self.lines.reset();
                self.set_state(LinkState::Idle, Some("Connection closed by device"));
                Ok(chunk)
            }
            Ok(_) => Ok(chunk),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Reads the next chunk from the device and handles all lines it completes.
    ///
    /// Returns the number of bytes read, `0` when the device closed the connection.
    pub async fn poll(&mut self) -> Result<usize, LinkError> {
        let chunk = self.read_chunk().await?;
        self.on_bytes(&chunk).await;
        Ok(chunk.len())
    }

    /// Handles bytes received from the device.
    ///
    /// Incomplete lines are kept until a later chunk completes them.
    pub async fn on_bytes(&mut self, chunk: &[u8]) {
        for line in self.lines.push(chunk) {
            if self.handle_line(&line).await.is_break() {
                break;
            }
        }
    }

    /// Interprets one response line.
    ///
    /// Breaks when the link closed the connection because of the line; anything the
    /// line or the rest of the stream contained afterwards is discarded.
    pub async fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        log::trace!("Received line from {}: {:?}", self.config.label, line);
        for response in Response::parse_all(line) {
            self.handle_response(response, line).await?;
        }
        ControlFlow::Continue(())
    }

    async fn handle_response(&mut self, response: Response, line: &str) -> ControlFlow<()> {
        let label = self.config.label.clone();
        match response {
            Response::ConnectionCount(count) if count < MAX_CONTROLLERS - 1 => {
                let message = format!(
                    "{} has {} other connected controller(s).",
                    label,
                    count.saturating_sub(1)
                );
                self.host.log(Level::Info, &message);
                self.send(Command::query()).await;
            }
            Response::ConnectionCount(count) if count == MAX_CONTROLLERS - 1 => {
                let message = format!(
                    "{} has {} other connected controllers. Maximum reached.",
                    label, count
                );
                self.host.log(Level::Warning, &message);
                self.send(Command::query()).await;
            }
            Response::ConnectionCount(count) => {
                let message = format!(
                    "{} connection limit exceeded! Max {} controllers possible, but got {}. Closing connection now.",
                    label, MAX_CONTROLLERS, count
                );
                self.host.log(Level::Error, &message);
                self.close_deliberately("Connection limit exceeded").await;
                return ControlFlow::Break(());
            }
            Response::Device(model) => {
                self.identity.record_model(model);
                if model == VIO_4K_MODEL {
                    self.send(Command::version_request()).await;
                } else {
                    let message = format!(
                        "{} is not connected to a VIO, it is connected to {}. Closing connection now.",
                        label,
                        model_name(model)
                    );
                    self.host.log(Level::Error, &message);
                    self.close_deliberately("Wrong model").await;
                    return ControlFlow::Break(());
                }
            }
            Response::Version { command_set, .. } => {
                self.identity.record_command_set_version(command_set);
                let message = format!("Command set version of {} is {}", label, command_set);
                self.host.log(Level::Info, &message);
            }
            Response::ReadbackIdle => {
                log::debug!("No parameter readback running on {}", label);
            }
            Response::Error(code) => {
                let message = format!(
                    "Received {} from {}: {}",
                    code.description(),
                    label,
                    line
                );
                self.host.log(Level::Error, &message);
            }
        }
        ControlFlow::Continue(())
    }

    async fn write(&mut self, command: &Command) -> Result<(), LinkError> {
        let Some(connection) = self.connection.as_mut() else {
            log::debug!("Not connected, dropping command '{}'", command);
            return Err(LinkError::NotConnected);
        };
        log::debug!("Sending '{}' to {}", command, connection.target);
        let result = connection.stream.write_all(&command.to_bytes()).await;
        result.map_err(|err| self.fail(err))
    }

    /// Drops the connection after a socket fault and reports it.
    fn fail(&mut self, err: io::Error) -> LinkError {
        self.connection = None;
        self.lines.reset();
        let message = format!("Network error: {}", err);
        self.host.log(Level::Error, &message);
        self.set_state(LinkState::Error, Some(&err.to_string()));
        LinkError::IoError(err)
    }

    async fn close_deliberately(&mut self, reason: &str) {
        self.close_connection().await;
        self.set_state(LinkState::Idle, Some(reason));
    }

    /// Gracefully closes the current connection, if any.
    async fn close_connection(&mut self) {
        self.lines.reset();
        if let Some(mut connection) = self.connection.take() {
            // the device may already have gone away
            let _ = connection.stream.shutdown().await;
            log::debug!("Closed connection to {}", connection.target);
        }
    }

    fn set_state(&mut self, state: LinkState, message: Option<&str>) {
        self.state = state;
        self.host.status(state, message);
    }
}
