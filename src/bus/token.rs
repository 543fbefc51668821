use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// A listener's answer to a fired event.
#[derive(Debug)]
pub enum Signal {
    Proceed,
    Abort,
    /// Answer later through the paired [`Deferred`].
    Defer(DeferredSignal),
}

impl From<bool> for Signal {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Proceed } else { Self::Abort }
    }
}

/// Settling half of a deferred listener answer. Dropping it unsettled counts
/// as a resolve.
#[derive(Debug)]
pub struct Deferred {
    tx: oneshot::Sender<Verdict>,
}

#[derive(Debug)]
pub struct DeferredSignal {
    rx: oneshot::Receiver<Verdict>,
}

pub fn deferred() -> (Deferred, Signal) {
    let (tx, rx) = oneshot::channel();
    (Deferred { tx }, Signal::Defer(DeferredSignal { rx }))
}

impl Deferred {
    pub fn resolve(self) {
        self.settle(Verdict::Accepted);
    }

    pub fn reject(self) {
        self.settle(Verdict::Rejected);
    }

    pub fn settle(self, verdict: Verdict) {
        let _ = self.tx.send(verdict);
    }

    /// The firing this answer belonged to no longer waits for it, e.g.
    /// another listener already rejected it.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
enum TokenState {
    Settled(Verdict),
    Pending(Vec<oneshot::Receiver<Verdict>>),
}

/// Combined answer of every listener of one firing: rejected as soon as any
/// listener rejects, accepted once all have accepted.
#[derive(Debug)]
pub struct CancellationToken {
    state: TokenState,
}

impl CancellationToken {
    pub fn resolved() -> Self {
        Self {
            state: TokenState::Settled(Verdict::Accepted),
        }
    }

    pub fn rejected() -> Self {
        Self {
            state: TokenState::Settled(Verdict::Rejected),
        }
    }

    pub fn combine(signals: impl IntoIterator<Item = Signal>) -> Self {
        let mut pending = Vec::new();
        for signal in signals {
            match signal {
                Signal::Proceed => {}
                Signal::Abort => return Self::rejected(),
                Signal::Defer(deferred) => pending.push(deferred.rx),
            }
        }
        if pending.is_empty() {
            Self::resolved()
        } else {
            Self {
                state: TokenState::Pending(pending),
            }
        }
    }

    pub fn settled(&self) -> Option<Verdict> {
        match &self.state {
            TokenState::Settled(verdict) => Some(*verdict),
            TokenState::Pending(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.settled() == Some(Verdict::Rejected)
    }

    pub async fn verdict(self) -> Verdict {
        let receivers = match self.state {
            TokenState::Settled(verdict) => return verdict,
            TokenState::Pending(receivers) => receivers,
        };

        let mut waiting = receivers.into_iter().collect::<FuturesUnordered<_>>();
        while let Some(answer) = waiting.next().await {
            if matches!(answer, Ok(Verdict::Rejected)) {
                return Verdict::Rejected;
            }
        }
        Verdict::Accepted
    }
}
