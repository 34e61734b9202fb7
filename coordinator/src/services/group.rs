//! TCP star transport for a participant group
//!
//! The coordinator (rank 0) holds one connection per member. Members only
//! talk to the coordinator, which is all the fixture protocol needs: greetings
//! and farewells flow to rank 0, barriers and broadcasts are driven by it.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};

use shared::messages::is_disconnect;
use shared::{rank_debug, rank_info, rank_warn, read_frame, write_frame, Frame, FrameKind, Rank, SharedError};

use crate::config::GroupConfig;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::traits::GroupCommunicator;

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// One end of a coordinator/member connection
struct PeerLink {
    peer: Rank,
    /// `None` once the peer has gone away
    stream: Option<TcpStream>,
    /// Frames that arrived ahead of the operation waiting for them
    pending: VecDeque<Frame>,
}

impl PeerLink {
    fn new(peer: Rank, stream: TcpStream) -> Self {
        Self {
            peer,
            stream: Some(stream),
            pending: VecDeque::new(),
        }
    }

    fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns `false` if the peer is gone
    async fn send(&mut self, frame: &Frame) -> CoordinatorResult<bool> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };

        match write_frame(stream, frame).await {
            Ok(()) => Ok(true),
            Err(SharedError::Io(e)) if is_disconnect(&e) => {
                self.stream = None;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Next frame accepted by `accept`, queueing anything else.
    /// Returns `None` if the peer goes away first.
    async fn next_matching<F>(&mut self, accept: F) -> CoordinatorResult<Option<Frame>>
    where
        F: Fn(&Frame) -> bool,
    {
        if let Some(pos) = self.pending.iter().position(&accept) {
            return Ok(self.pending.remove(pos));
        }

        loop {
            let Some(stream) = self.stream.as_mut() else {
                return Ok(None);
            };

            match read_frame(stream).await? {
                Some(frame) if accept(&frame) => return Ok(Some(frame)),
                Some(frame) => self.pending.push_back(frame),
                None => {
                    self.stream = None;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }
}

enum Topology {
    /// Group of one
    Alone,
    /// Rank 0, one link per member keyed by member rank
    Coordinator(Mutex<BTreeMap<Rank, PeerLink>>),
    /// Any other rank, single link to rank 0
    Member(Mutex<PeerLink>),
}

/// Real group communicator using TCP + bincode frames
pub struct RealGroupCommunicator {
    rank: Rank,
    size: u32,
    topology: Topology,
}

impl fmt::Debug for RealGroupCommunicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.topology {
            Topology::Alone => "alone",
            Topology::Coordinator(_) => "coordinator",
            Topology::Member(_) => "member",
        };
        f.debug_struct("RealGroupCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("role", &role)
            .finish()
    }
}

impl RealGroupCommunicator {
    /// Bootstrap this process into its group
    pub async fn connect(config: &GroupConfig) -> CoordinatorResult<Self> {
        if config.size == 1 {
            return Ok(Self::alone());
        }

        if config.rank.is_coordinator() {
            let listener = TcpListener::bind(config.coordinator_addr)
                .await
                .map_err(|e| CoordinatorError::ConnectError {
                    addr: config.coordinator_addr.to_string(),
                    message: format!("Failed to bind coordinator listener: {e}"),
                })?;
            Self::accept_members(listener, config.size, config.connect_timeout).await
        } else {
            Self::join(config.coordinator_addr, config.rank, config.size, config.connect_timeout).await
        }
    }

    /// A group of one
    pub fn alone() -> Self {
        Self {
            rank: Rank::COORDINATOR,
            size: 1,
            topology: Topology::Alone,
        }
    }

    /// Coordinator side of bootstrap: wait for every member to join
    pub async fn accept_members(
        listener: TcpListener,
        size: u32,
        connect_timeout: Duration,
    ) -> CoordinatorResult<Self> {
        let me = Rank::COORDINATOR;
        let local_addr = listener.local_addr()?;
        let expected = size.saturating_sub(1) as usize;
        let mut peers: BTreeMap<Rank, PeerLink> = BTreeMap::new();

        rank_info!(me, "🔊 Waiting for {} member(s) on {}", expected, local_addr);

        let accept_all = async {
            while peers.len() < expected {
                let (mut stream, addr) = listener.accept().await?;
                stream.set_nodelay(true)?;

                match read_frame(&mut stream).await? {
                    Some(Frame::Join { rank })
                        if rank.0 >= 1 && rank.0 < size && !peers.contains_key(&rank) =>
                    {
                        rank_debug!(me, "🔗 Rank {} joined from {}", rank, addr);
                        peers.insert(rank, PeerLink::new(rank, stream));
                    }
                    other => {
                        rank_warn!(me, "⚠️ Rejected connection from {}: {:?}", addr, other);
                    }
                }
            }
            Ok::<(), CoordinatorError>(())
        };

        timeout(connect_timeout, accept_all)
            .await
            .map_err(|_| CoordinatorError::ConnectError {
                addr: local_addr.to_string(),
                message: format!("Only some members joined within {connect_timeout:?}"),
            })??;

        rank_info!(me, "✅ All {} member(s) joined", expected);

        Ok(Self {
            rank: me,
            size,
            topology: Topology::Coordinator(Mutex::new(peers)),
        })
    }

    /// Member side of bootstrap: connect to the coordinator, retrying until it listens
    pub async fn join(
        coordinator_addr: SocketAddr,
        rank: Rank,
        size: u32,
        connect_timeout: Duration,
    ) -> CoordinatorResult<Self> {
        if rank.is_coordinator() || rank.0 >= size {
            return Err(CoordinatorError::InvalidRank { rank, size });
        }

        let deadline = Instant::now() + connect_timeout;
        let mut stream = loop {
            match TcpStream::connect(coordinator_addr).await {
                Ok(stream) => break stream,
                Err(e) if Instant::now() < deadline => {
                    rank_debug!(rank, "Coordinator not reachable yet: {}", e);
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
                Err(e) => {
                    return Err(CoordinatorError::ConnectError {
                        addr: coordinator_addr.to_string(),
                        message: format!("Failed to connect to coordinator: {e}"),
                    })
                }
            }
        };

        stream.set_nodelay(true)?;
        write_frame(&mut stream, &Frame::Join { rank }).await?;
        rank_debug!(rank, "🔗 Joined coordinator at {}", coordinator_addr);

        Ok(Self {
            rank,
            size,
            topology: Topology::Member(Mutex::new(PeerLink::new(Rank::COORDINATOR, stream))),
        })
    }

    fn unroutable(&self, to: Rank) -> CoordinatorError {
        CoordinatorError::Unroutable { from: self.rank, to }
    }
}

fn is_data_with_tag(frame: &Frame, tag: u32) -> bool {
    matches!(frame, Frame::Data { tag: t, .. } if *t == tag)
}

fn into_payload(frame: Frame) -> CoordinatorResult<Vec<u8>> {
    match frame {
        Frame::Data { payload, .. } | Frame::Broadcast { payload } => Ok(payload),
        other => Err(CoordinatorError::ProtocolError {
            message: format!("Expected a payload frame, got {:?}", other.kind()),
        }),
    }
}

#[async_trait]
impl GroupCommunicator for RealGroupCommunicator {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    async fn barrier(&self) -> CoordinatorResult<()> {
        match &self.topology {
            Topology::Alone => Ok(()),
            Topology::Coordinator(peers) => {
                let mut peers = peers.lock().await;

                for link in peers.values_mut().filter(|link| link.is_live()) {
                    let entered = link
                        .next_matching(|frame| frame.kind() == FrameKind::BarrierEnter)
                        .await?;
                    if entered.is_none() {
                        rank_warn!(self.rank, "⚠️ Rank {} left the group before the barrier", link.peer);
                    }
                }

                for link in peers.values_mut().filter(|link| link.is_live()) {
                    if !link.send(&Frame::BarrierRelease).await? {
                        rank_warn!(self.rank, "⚠️ Rank {} left the group during barrier release", link.peer);
                    }
                }

                Ok(())
            }
            Topology::Member(link) => {
                let mut link = link.lock().await;

                if !link.send(&Frame::BarrierEnter).await? {
                    return Err(CoordinatorError::CoordinatorLost);
                }
                link.next_matching(|frame| frame.kind() == FrameKind::BarrierRelease)
                    .await?
                    .ok_or(CoordinatorError::CoordinatorLost)?;
                Ok(())
            }
        }
    }

    async fn broadcast(&self, root: Rank, payload: Option<Vec<u8>>) -> CoordinatorResult<Vec<u8>> {
        if !root.is_coordinator() {
            return Err(CoordinatorError::ProtocolError {
                message: format!("Broadcast root must be the coordinator, got rank {root}"),
            });
        }

        match &self.topology {
            Topology::Alone | Topology::Coordinator(_) => {
                let payload = payload.ok_or_else(|| CoordinatorError::ProtocolError {
                    message: "Broadcast root must supply a payload".to_string(),
                })?;

                if let Topology::Coordinator(peers) = &self.topology {
                    let mut peers = peers.lock().await;
                    let frame = Frame::Broadcast {
                        payload: payload.clone(),
                    };
                    for link in peers.values_mut().filter(|link| link.is_live()) {
                        if !link.send(&frame).await? {
                            rank_warn!(self.rank, "⚠️ Rank {} left the group before the broadcast", link.peer);
                        }
                    }
                }

                Ok(payload)
            }
            Topology::Member(link) => {
                let mut link = link.lock().await;
                let frame = link
                    .next_matching(|frame| frame.kind() == FrameKind::Broadcast)
                    .await?
                    .ok_or(CoordinatorError::CoordinatorLost)?;
                into_payload(frame)
            }
        }
    }

    async fn send(&self, dest: Rank, tag: u32, payload: Vec<u8>) -> CoordinatorResult<()> {
        let frame = Frame::Data { tag, payload };

        match &self.topology {
            Topology::Member(link) if dest.is_coordinator() => {
                if link.lock().await.send(&frame).await? {
                    Ok(())
                } else {
                    Err(CoordinatorError::CoordinatorLost)
                }
            }
            Topology::Coordinator(peers) => {
                let mut peers = peers.lock().await;
                let link = peers.get_mut(&dest).ok_or_else(|| self.unroutable(dest))?;
                if link.send(&frame).await? {
                    Ok(())
                } else {
                    Err(CoordinatorError::PeerDeparted { rank: dest })
                }
            }
            _ => Err(self.unroutable(dest)),
        }
    }

    async fn recv(&self, source: Rank, tag: u32) -> CoordinatorResult<Vec<u8>> {
        match &self.topology {
            Topology::Member(link) if source.is_coordinator() => {
                let frame = link
                    .lock()
                    .await
                    .next_matching(|frame| is_data_with_tag(frame, tag))
                    .await?
                    .ok_or(CoordinatorError::CoordinatorLost)?;
                into_payload(frame)
            }
            Topology::Coordinator(peers) => {
                let mut peers = peers.lock().await;
                let link = peers.get_mut(&source).ok_or_else(|| self.unroutable(source))?;
                let frame = link
                    .next_matching(|frame| is_data_with_tag(frame, tag))
                    .await?
                    .ok_or(CoordinatorError::PeerDeparted { rank: source })?;
                into_payload(frame)
            }
            _ => Err(self.unroutable(source)),
        }
    }

    async fn departed(&self) -> Vec<Rank> {
        match &self.topology {
            Topology::Alone => Vec::new(),
            Topology::Coordinator(peers) => peers
                .lock()
                .await
                .values()
                .filter(|link| !link.is_live())
                .map(|link| link.peer)
                .collect(),
            Topology::Member(link) => {
                if link.lock().await.is_live() {
                    Vec::new()
                } else {
                    vec![Rank::COORDINATOR]
                }
            }
        }
    }

    async fn finalize(&self) -> CoordinatorResult<()> {
        match &self.topology {
            Topology::Alone => {}
            Topology::Coordinator(peers) => {
                for link in peers.lock().await.values_mut() {
                    link.close().await;
                }
            }
            Topology::Member(link) => link.lock().await.close().await,
        }

        rank_debug!(self.rank, "Group connections closed");
        Ok(())
    }
}
