//! The coordinator's two TCP endpoints.
//!
//! The fan-in endpoint merges the reports of every connected
//! participant into a single queue; the fan-out endpoint broadcasts
//! every order to every connected participant. A fan-out subscriber
//! only receives what is broadcast after it attached, which is why the
//! registration handshake retries until it is acknowledged.

use std::{io, net::SocketAddr, time::Duration};

use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, warn};

use runlink_core::message::{FromBytes, Order, Report, ToBytes};

/// Per-subscriber order buffer. Orders are rare and tiny; a subscriber
/// lagging this far behind is broken.
const ORDER_BUFFER: usize = 1024;

/// Failure of a transport endpoint. Fatal for the coordinator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("the fan-in listener terminated")]
    FanInClosed,
}

/// The many-to-one endpoint on which participants push their reports.
pub struct FanIn {
    reports: mpsc::UnboundedReceiver<Report>,
    local_addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

impl FanIn {
    /// Bind the fan-in listener and start accepting connections.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let acceptor = tokio::spawn(accept_reports(listener, tx));
        Ok(Self {
            reports: rx,
            local_addr,
            acceptor,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait up to `wait` for the next report. `Ok(None)` means the
    /// bound elapsed without a message.
    pub(crate) async fn poll(&mut self, wait: Duration) -> Result<Option<Report>, TransportError> {
        match timeout(wait, self.reports.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(report)) => Ok(Some(report)),
            Ok(None) => Err(TransportError::FanInClosed),
        }
    }

    /// Pull a report that is already queued, without waiting.
    pub(crate) fn try_recv(&mut self) -> Option<Report> {
        self.reports.try_recv().ok()
    }
}

impl Drop for FanIn {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn accept_reports(listener: TcpListener, reports: mpsc::UnboundedSender<Report>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("fan-in connection from {}", peer);
                tokio::spawn(read_reports(stream, reports.clone()));
            }
            Err(e) => warn!("failed to accept fan-in connection: {}", e),
        }
    }
}

async fn read_reports(stream: TcpStream, reports: mpsc::UnboundedSender<Report>) {
    let peer = stream.peer_addr().ok();
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match Report::from_bytes(&line) {
                Ok(report) => {
                    if reports.send(report).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(
                        "dropping fan-in connection from {:?}: malformed report: {}",
                        peer, e
                    );
                    return;
                }
            },
            Ok(None) => return,
            Err(e) => {
                debug!("fan-in connection from {:?} failed: {}", peer, e);
                return;
            }
        }
    }
}

/// The one-to-many endpoint broadcasting every order to every
/// connected participant.
pub struct FanOut {
    orders: broadcast::Sender<Order>,
    local_addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

impl FanOut {
    /// Bind the fan-out listener and start accepting subscribers.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, _) = broadcast::channel(ORDER_BUFFER);
        let acceptor = tokio::spawn(accept_subscribers(listener, tx.clone()));
        Ok(Self {
            orders: tx,
            local_addr,
            acceptor,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Broadcast one order to every currently connected participant.
    pub(crate) fn broadcast(&self, order: Order) {
        debug!("broadcasting `{}`", order);
        // An error means there is no subscriber right now; a run can
        // legitimately have zero devices.
        let _ = self.orders.send(order);
    }
}

impl Drop for FanOut {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn accept_subscribers(listener: TcpListener, orders: broadcast::Sender<Order>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("fan-out subscriber from {}", peer);
                tokio::spawn(write_orders(stream, orders.subscribe()));
            }
            Err(e) => warn!("failed to accept fan-out subscriber: {}", e),
        }
    }
}

async fn write_orders(mut stream: TcpStream, mut orders: broadcast::Receiver<Order>) {
    loop {
        match orders.recv().await {
            Ok(order) => {
                let mut line = order.to_bytes();
                line.push(b'\n');
                if let Err(e) = stream.write_all(&line).await {
                    debug!("fan-out subscriber went away: {}", e);
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("fan-out subscriber lagged behind by {} orders", n);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
