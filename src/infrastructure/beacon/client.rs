//! Validator status feed client over line-delimited JSON on TCP.
//!
//! Every outbound payload is written as one line. Every inbound line is
//! published on [`BEACON_CLIENT_MESSAGE_TOPIC`] for whoever is subscribed.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::models::{BusEvent, FeedClientId, BEACON_CLIENT_MESSAGE_TOPIC};
use crate::domain::ports::{FeedError, StatusFeed};
use crate::services::EventBus;

/// Connected status feed client
pub struct BeaconFeedClient {
    id: FeedClientId,
    writer: Mutex<OwnedWriteHalf>,
    connected: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl BeaconFeedClient {
    /// Connect to `address` and start forwarding inbound lines to `bus`
    pub async fn connect(address: &str, bus: Arc<EventBus>) -> Result<Self, FeedError> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let id = FeedClientId::new();
        let connected = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_loop(id, read_half, bus, Arc::clone(&connected)));

        info!(%address, client = %id, "Connected to beacon status feed");

        Ok(Self {
            id,
            writer: Mutex::new(write_half),
            connected,
            reader,
        })
    }

    pub fn id(&self) -> FeedClientId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn read_loop(
    id: FeedClientId,
    read_half: OwnedReadHalf,
    bus: Arc<EventBus>,
    connected: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let event = BusEvent::BeaconClientMessage {
                    client: id,
                    message: line.into_bytes(),
                };
                let delivered = bus.publish(BEACON_CLIENT_MESSAGE_TOPIC, event).await;
                debug!(client = %id, delivered, "feed message published");
            }
            Ok(None) => {
                warn!(client = %id, "Beacon status feed closed the connection");
                break;
            }
            Err(e) => {
                warn!(client = %id, error = %e, "Error reading from beacon status feed");
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}

#[async_trait]
impl StatusFeed for BeaconFeedClient {
    async fn send(&self, payload: &[u8]) -> Result<(), FeedError> {
        if !self.is_connected() {
            return Err(FeedError::NotConnected);
        }
        if payload.contains(&b'\n') {
            return Err(FeedError::Rejected("payload contains a newline".into()));
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(payload).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

impl Drop for BeaconFeedClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
