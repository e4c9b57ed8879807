//! The participant's connection to the coordinator.

use std::time::Duration;

use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tracing::debug;

use runlink_core::message::{DecodeError, FromBytes, Order, Report, ToBytes};

/// Error raised on the link between a participant and the coordinator.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to reach the coordinator: {0}")]
    Io(#[from] std::io::Error),
    #[error("the coordinator closed the connection")]
    Closed,
    #[error("received a malformed order: {0}")]
    Decode(DecodeError),
}

/// The two connections a participant keeps to the coordinator: a
/// write-only fan-in stream for reports, and a read-only fan-out
/// stream on which every broadcast order arrives.
///
/// The fan-out stream is drained by a background task into a queue, so
/// that polling with a timeout never loses a partially received line.
pub struct TcpLink {
    fan_in: TcpStream,
    orders: mpsc::UnboundedReceiver<Result<Order, LinkError>>,
    reader: JoinHandle<()>,
}

impl TcpLink {
    /// Open both connections to the coordinator.
    pub async fn connect(fan_in: &str, fan_out: &str) -> Result<Self, LinkError> {
        let fan_in = TcpStream::connect(fan_in).await?;
        let fan_out = TcpStream::connect(fan_out).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_orders(fan_out, tx));
        Ok(Self {
            fan_in,
            orders: rx,
            reader,
        })
    }

    /// Push one report onto the fan-in channel.
    pub(crate) async fn send(&mut self, report: &Report) -> Result<(), LinkError> {
        let mut line = report.to_bytes();
        line.push(b'\n');
        self.fan_in.write_all(&line).await?;
        Ok(())
    }

    /// Wait up to `wait` for the next broadcast order. `Ok(None)`
    /// means the bound elapsed without a message.
    pub(crate) async fn poll(&mut self, wait: Duration) -> Result<Option<Order>, LinkError> {
        match timeout(wait, self.orders.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(Ok(order))) => Ok(Some(order)),
            Ok(Some(Err(e))) => Err(e),
            Ok(None) => Err(LinkError::Closed),
        }
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_orders(stream: TcpStream, orders: mpsc::UnboundedSender<Result<Order, LinkError>>) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        let result = match lines.next_line().await {
            Ok(Some(line)) => match Order::from_bytes(&line) {
                Ok(order) => {
                    debug!("received order `{}`", order);
                    if orders.send(Ok(order)).is_err() {
                        // The link was dropped, nobody is listening.
                        return;
                    }
                    continue;
                }
                Err(e) => Err(LinkError::Decode(e)),
            },
            Ok(None) => Err(LinkError::Closed),
            Err(e) => Err(LinkError::Io(e)),
        };
        let _ = orders.send(result);
        return;
    }
}
