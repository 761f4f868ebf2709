//! A scripted stand-in for a VIO and helpers to drive a [`DeviceLink`] against it.
use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_util::codec::{Decoder, LinesCodec};
use vio_client::{Host, Level, LinkState, link::DeviceLink};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Maps a received command to the response lines of the device, without delimiter.
pub type Script = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Answers the handshake like a VIO 4K with `controllers` connected controllers
/// (including the one under test) and command set version 3.
pub fn vio_4k(controllers: u32) -> impl Fn(&str) -> Vec<String> + Send + Sync + 'static {
    device(controllers, 1024)
}

/// Answers the handshake like an Analog Way device with the given model code.
pub fn device(controllers: u32, model: u32) -> impl Fn(&str) -> Vec<String> + Send + Sync + 'static {
    move |command: &str| match command {
        "" => vec![format!("TPcon{}", controllers)],
        "?" => vec![format!("DEV{}", model)],
        "0,TPver" => vec!["TPver0,3".to_string(), "TPdie0".to_string()],
        _ => vec![],
    }
}

/// Fake device accepting any number of controllers on a local port.
///
/// Every command received is recorded. The server stops when the value is dropped.
pub struct FakeVio {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeVio {
    pub async fn start(script: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> io::Result<FakeVio> {
        Self::start_with_chunk_size(script, usize::MAX).await
    }

    /// Like [`FakeVio::start`], but responses are written in pieces of at most `chunk_size` bytes.
    pub async fn start_with_chunk_size(
        script: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
        chunk_size: usize,
    ) -> io::Result<FakeVio> {
        Self::serve(TcpListener::bind("127.0.0.1:0").await?, script, chunk_size)
    }

    /// Like [`FakeVio::start`], but listens on a given address, e.g. one a link already targets.
    pub async fn start_on(
        addr: SocketAddr,
        script: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
    ) -> io::Result<FakeVio> {
        Self::serve(TcpListener::bind(addr).await?, script, usize::MAX)
    }

    fn serve(
        listener: TcpListener,
        script: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
        chunk_size: usize,
    ) -> io::Result<FakeVio> {
        let addr = listener.local_addr()?;
        let script: Script = Arc::new(script);
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = {
            let received = received.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    let script = script.clone();
                    let received = received.clone();
                    tokio::spawn(async move {
                        // the controller may hang up at any time
                        let _ = handle_controller(tcp, script, received, chunk_size).await;
                    });
                }
            })
        };

        Ok(FakeVio {
            addr,
            received,
            connections,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// All commands received so far, over all connections.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Waits until the recorded commands satisfy `done`.
    pub async fn wait_for(&self, done: impl Fn(&[String]) -> bool) {
        tokio::time::timeout(TIMEOUT, async {
            while !done(&self.received()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("device did not receive the expected commands in time")
    }
}

impl Drop for FakeVio {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_controller(
    mut tcp: TcpStream,
    script: Script,
    received: Arc<Mutex<Vec<String>>>,
    chunk_size: usize,
) -> io::Result<()> {
    let mut codec = LinesCodec::new();
    let mut buf = BytesMut::with_capacity(256);
    loop {
        if tcp.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
        while let Some(command) = codec.decode(&mut buf).map_err(io::Error::other)? {
            if let Ok(mut received) = received.lock() {
                received.push(command.clone());
            }
            let mut out = Vec::new();
            for line in script(&command) {
                out.extend_from_slice(line.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            for piece in out.chunks(chunk_size) {
                tcp.write_all(piece).await?;
                tcp.flush().await?;
                if chunk_size != usize::MAX {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
        }
    }
}

/// Host that records everything the link reports.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub states: Vec<(LinkState, Option<String>)>,
    pub logs: Vec<(Level, String)>,
}

impl RecordingHost {
    /// Messages logged with the given level.
    pub fn messages(&self, level: Level) -> Vec<&str> {
        self.logs
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

impl Host for RecordingHost {
    fn status(&mut self, state: LinkState, message: Option<&str>) {
        self.states.push((state, message.map(str::to_string)));
    }

    fn log(&mut self, level: Level, message: &str) {
        self.logs.push((level, message.to_string()));
    }
}

/// Polls the link until `done` holds.
pub async fn pump_until<H: Host>(link: &mut DeviceLink<H>, done: impl Fn(&DeviceLink<H>) -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !done(link) {
            // errors are recorded by the host
            let _ = link.poll().await;
        }
    })
    .await
    .expect("link did not reach the expected state in time")
}
