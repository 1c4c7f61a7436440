//! Correlates submitted transaction hashes with the stream of confirmed
//! ("reduced") hashes coming back from the chain.
//!
//! A short history of recent confirmations is kept so that a hash confirmed
//! between `submit` returning and the caller asking to wait is not missed.
//! Waiters whose futures were dropped are pruned on every publish and
//! registration.

use crate::error::ClientError;
use chrono::{DateTime, Utc};
use emojimon_common::TxHash;
use futures::channel::oneshot;
use futures::{Stream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::task::{Context, Poll};

/// Proof that a transaction became part of the world state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub hash: TxHash,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    recent: VecDeque<Receipt>,
    waiters: HashMap<TxHash, Vec<oneshot::Sender<Receipt>>>,
    closed: bool,
}

impl Inner {
    fn prune_abandoned(&mut self) {
        self.waiters.retain(|_, senders| {
            senders.retain(|s| !s.is_canceled());
            !senders.is_empty()
        });
    }
}

pub struct TxStream {
    inner: Mutex<Inner>,
    history: usize,
}

impl TxStream {
    /// `history` bounds how many past confirmations are remembered
    pub fn new(history: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            history: history.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a confirmed hash and wake everyone waiting on it
    pub fn publish(&self, hash: TxHash) {
        let receipt = Receipt {
            hash,
            confirmed_at: Utc::now(),
        };
        let mut inner = self.lock();
        if inner.closed {
            log::warn!("confirmation {} arrived after the stream closed", hash);
            return;
        }
        if let Some(senders) = inner.waiters.remove(&hash) {
            for sender in senders {
                // receiver may have been dropped in the meantime
                let _ = sender.send(receipt);
            }
        }
        inner.recent.push_back(receipt);
        while inner.recent.len() > self.history {
            inner.recent.pop_front();
        }
        inner.prune_abandoned();
        log::debug!("confirmed {}", hash);
    }

    /// Future resolving the first time `hash` is confirmed
    pub fn wait_for(&self, hash: TxHash) -> Confirmation {
        let mut inner = self.lock();
        if inner.closed {
            return Confirmation::new(hash, State::Lost);
        }
        if let Some(receipt) = inner.recent.iter().rev().find(|r| r.hash == hash) {
            return Confirmation::new(hash, State::Ready(Some(*receipt)));
        }
        inner.prune_abandoned();
        let (sender, receiver) = oneshot::channel();
        inner.waiters.entry(hash).or_default().push(sender);
        Confirmation::new(hash, State::Pending(receiver))
    }

    /// Feed confirmations from a stream until it ends, then close
    pub async fn pump<S>(&self, stream: S)
    where
        S: Stream<Item = TxHash>,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(hash) = stream.next().await {
            self.publish(hash);
        }
        self.close();
    }

    /// Fail every pending and future wait
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        let dropped: usize = inner.waiters.values().map(Vec::len).sum();
        inner.waiters.clear();
        if dropped > 0 {
            log::warn!("confirmation stream closed with {} waiters pending", dropped);
        }
    }

    /// Registered waiters still alive
    pub fn pending_waiters(&self) -> usize {
        let mut inner = self.lock();
        inner.prune_abandoned();
        inner.waiters.values().map(Vec::len).sum()
    }

    pub fn is_confirmed(&self, hash: &TxHash) -> bool {
        self.lock().recent.iter().any(|r| r.hash == *hash)
    }
}

enum State {
    Ready(Option<Receipt>),
    Pending(oneshot::Receiver<Receipt>),
    Lost,
}

/// Single-shot wait for one hash. Dropping it abandons the wait.
pub struct Confirmation {
    hash: TxHash,
    state: State,
}

impl Confirmation {
    fn new(hash: TxHash, state: State) -> Self {
        Self { hash, state }
    }
}

impl Future for Confirmation {
    type Output = Result<Receipt, ClientError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let lost = ClientError::ConfirmationLost(this.hash);
        match &mut this.state {
            State::Ready(receipt) => Poll::Ready(receipt.take().ok_or(lost)),
            State::Pending(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(receipt)) => Poll::Ready(Ok(receipt)),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(lost)),
                Poll::Pending => Poll::Pending,
            },
            State::Lost => Poll::Ready(Err(lost)),
        }
    }
}
