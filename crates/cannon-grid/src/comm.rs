//! Point-to-point message passing between workers.
//!
//! Workers share no memory; every block moves through a `Communicator`.
//! `LocalComm` is the in-process implementation: one endpoint per worker,
//! connected by `std::sync::mpsc` channels, so a whole grid can be
//! simulated with threads.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use cannon_matrix::Element;
use tracing::trace;

use crate::distribute::Verdict;
use crate::error::CommError;

/// Identifies which protocol step a message belongs to. Receives match on
/// `(source, tag)`, so per-round tags keep shifts in lock-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Verdict,
    ScatterA,
    ScatterB,
    SkewA,
    SkewB,
    ShiftA(usize),
    ShiftB(usize),
    Gather,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Verdict => write!(f, "verdict"),
            Tag::ScatterA => write!(f, "scatter-a"),
            Tag::ScatterB => write!(f, "scatter-b"),
            Tag::SkewA => write!(f, "skew-a"),
            Tag::SkewB => write!(f, "skew-b"),
            Tag::ShiftA(round) => write!(f, "shift-a[{}]", round),
            Tag::ShiftB(round) => write!(f, "shift-b[{}]", round),
            Tag::Gather => write!(f, "gather"),
        }
    }
}

/// Payload of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<T> {
    /// Outcome of input validation, broadcast by the origin.
    Verdict(Verdict),
    /// A row-major block.
    Block(Vec<T>),
}

/// A message in flight, stamped with its sender and tag.
#[derive(Debug)]
enum Envelope<T> {
    Data {
        src: usize,
        tag: Tag,
        message: Message<T>,
    },
    /// The sender failed; matches any pending receive.
    Abort { src: usize },
}

/// Message-passing context handed to every component of a run.
///
/// `send` never waits for the receiver. `recv` blocks until a message with
/// the requested source and tag arrives; messages that do not match are
/// kept and delivered to a later `recv`.
pub trait Communicator<T: Element> {
    /// This worker's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of workers in the run.
    fn size(&self) -> usize;

    fn send(&self, dest: usize, tag: Tag, message: Message<T>) -> Result<(), CommError>;

    fn recv(&self, src: usize, tag: Tag) -> Result<Message<T>, CommError>;

    /// Receive the next message with `tag` from any source.
    fn recv_any(&self, tag: Tag) -> Result<(usize, Message<T>), CommError>;

    /// Tell every peer the run is over. Best effort.
    fn abort(&self);

    fn send_block(&self, dest: usize, tag: Tag, block: Vec<T>) -> Result<(), CommError> {
        self.send(dest, tag, Message::Block(block))
    }

    /// Receive a block and check it has `expected_len` elements.
    fn recv_block(&self, src: usize, tag: Tag, expected_len: usize) -> Result<Vec<T>, CommError> {
        expect_block(src, tag, self.recv(src, tag)?, expected_len)
    }

    /// Send `block` to `dest` and replace it with the block received from
    /// `src`. Returns once the receive has resolved.
    fn send_recv_replace(
        &self,
        block: &mut Vec<T>,
        dest: usize,
        src: usize,
        tag: Tag,
    ) -> Result<(), CommError> {
        let len = block.len();
        let outgoing = std::mem::take(block);
        self.send_block(dest, tag, outgoing)?;
        *block = self.recv_block(src, tag, len)?;
        Ok(())
    }
}

/// Unwrap a block payload, rejecting verdicts and wrong lengths.
pub fn expect_block<T>(
    src: usize,
    tag: Tag,
    message: Message<T>,
    expected_len: usize,
) -> Result<Vec<T>, CommError> {
    match message {
        Message::Block(block) if block.len() == expected_len => Ok(block),
        Message::Block(block) => Err(CommError::Malformed {
            src,
            tag,
            reason: format!("expected {} elements, got {}", expected_len, block.len()),
        }),
        Message::Verdict(_) => Err(CommError::Malformed {
            src,
            tag,
            reason: "expected a block, got a verdict".to_string(),
        }),
    }
}

/// In-process communicator endpoint.
///
/// Create a connected set with [`LocalComm::world`] and move one endpoint
/// into each worker thread.
pub struct LocalComm<T> {
    rank: usize,
    peers: Vec<Option<Sender<Envelope<T>>>>,
    inbox: Receiver<Envelope<T>>,
    parked: RefCell<VecDeque<Envelope<T>>>,
    recv_timeout: Option<Duration>,
}

impl<T: Element> LocalComm<T> {
    /// Build `size` fully connected endpoints, indexed by rank.
    pub fn world(size: usize) -> Vec<LocalComm<T>> {
        Self::world_with_timeout(size, None)
    }

    /// Like [`LocalComm::world`], but every receive gives up after
    /// `recv_timeout` when set.
    pub fn world_with_timeout(size: usize, recv_timeout: Option<Duration>) -> Vec<LocalComm<T>> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size)
            .map(|_| mpsc::channel::<Envelope<T>>())
            .unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| {
                let peers = senders
                    .iter()
                    .enumerate()
                    .map(|(dest, tx)| if dest == rank { None } else { Some(tx.clone()) })
                    .collect();
                LocalComm {
                    rank,
                    peers,
                    inbox,
                    parked: RefCell::new(VecDeque::new()),
                    recv_timeout,
                }
            })
            .collect()
    }

    fn check_rank(&self, rank: usize) -> Result<(), CommError> {
        if rank >= self.peers.len() {
            return Err(CommError::InvalidRank {
                rank,
                size: self.peers.len(),
            });
        }
        Ok(())
    }

    fn take_parked(&self, matches: &impl Fn(usize, Tag) -> bool) -> Option<Envelope<T>> {
        let mut parked = self.parked.borrow_mut();
        let pos = parked.iter().position(|env| match env {
            Envelope::Data { src, tag, .. } => matches(*src, *tag),
            Envelope::Abort { .. } => true,
        })?;
        parked.remove(pos)
    }

    fn next_incoming(&self, tag: Tag) -> Result<Envelope<T>, CommError> {
        match self.recv_timeout {
            None => self.inbox.recv().map_err(|_| CommError::Disconnected {
                rank: self.rank,
                tag,
            }),
            Some(after) => self.inbox.recv_timeout(after).map_err(|e| match e {
                RecvTimeoutError::Timeout => CommError::Timeout {
                    rank: self.rank,
                    tag,
                    after,
                },
                RecvTimeoutError::Disconnected => CommError::Disconnected {
                    rank: self.rank,
                    tag,
                },
            }),
        }
    }

    fn recv_matching(
        &self,
        tag: Tag,
        matches: impl Fn(usize, Tag) -> bool,
    ) -> Result<(usize, Message<T>), CommError> {
        let envelope = match self.take_parked(&matches) {
            Some(env) => env,
            None => loop {
                let env = self.next_incoming(tag)?;
                let hit = match &env {
                    Envelope::Data { src, tag, .. } => matches(*src, *tag),
                    Envelope::Abort { .. } => true,
                };
                if hit {
                    break env;
                }
                self.parked.borrow_mut().push_back(env);
            },
        };

        match envelope {
            Envelope::Data { src, message, .. } => Ok((src, message)),
            Envelope::Abort { src } => Err(CommError::Aborted { peer: src }),
        }
    }
}

impl<T: Element> Communicator<T> for LocalComm<T> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, dest: usize, tag: Tag, message: Message<T>) -> Result<(), CommError> {
        self.check_rank(dest)?;
        trace!(src = self.rank, dest, %tag, "send");
        let envelope = Envelope::Data {
            src: self.rank,
            tag,
            message,
        };
        match &self.peers[dest] {
            Some(tx) => tx
                .send(envelope)
                .map_err(|_| CommError::PeerUnreachable { peer: dest }),
            None => {
                self.parked.borrow_mut().push_back(envelope);
                Ok(())
            }
        }
    }

    fn recv(&self, src: usize, tag: Tag) -> Result<Message<T>, CommError> {
        self.check_rank(src)?;
        let (_, message) = self.recv_matching(tag, |s, t| s == src && t == tag)?;
        trace!(rank = self.rank, src, %tag, "recv");
        Ok(message)
    }

    fn recv_any(&self, tag: Tag) -> Result<(usize, Message<T>), CommError> {
        let (src, message) = self.recv_matching(tag, |_, t| t == tag)?;
        trace!(rank = self.rank, src, %tag, "recv");
        Ok((src, message))
    }

    fn abort(&self) {
        for tx in self.peers.iter().flatten() {
            let _ = tx.send(Envelope::Abort { src: self.rank });
        }
    }
}

impl<T> Drop for LocalComm<T> {
    fn drop(&mut self) {
        // A panicking worker would otherwise leave its peers blocked forever.
        if std::thread::panicking() {
            for tx in self.peers.iter().flatten() {
                let _ = tx.send(Envelope::Abort { src: self.rank });
            }
        }
    }
}
