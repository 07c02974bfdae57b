//! Request-budget scheduler.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::FutureExt;
use futures::future::BoxFuture;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::Instant;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// The request budget a [`RateLimiter`] enforces.
///
/// Defaults match the public Jikan API: 45 requests per rolling minute, and
/// no two requests closer than 400ms apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Maximum dispatches inside any rolling [`window`](Self::window).
    pub max_requests: usize,
    /// Length of the rolling window.
    pub window: Duration,
    /// Minimum time between two consecutive dispatches.
    pub min_gap: Duration,
}
impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            max_requests: 45,
            window: Duration::from_secs(60),
            min_gap: Duration::from_millis(400),
        }
    }
}

/// What the drain loop should do next.
enum Next {
    Idle,
    Wait(Duration),
    Run(Job),
}

struct State {
    queue: VecDeque<Job>,
    draining: bool,
    /// Dispatch instants still inside the rolling window, oldest first. The
    /// front entry is the start of the current window.
    window: VecDeque<Instant>,
    last_dispatch: Option<Instant>,
}
impl State {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            draining: false,
            window: VecDeque::new(),
            last_dispatch: None,
        }
    }

    /// How long until the head of the queue may be dispatched, or `None` if
    /// it may go right now.
    fn delay(&mut self, policy: &RatePolicy, now: Instant) -> Option<Duration> {
        while self.window.front().is_some_and(|start| now.duration_since(*start) >= policy.window) {
            self.window.pop_front();
        }
        if self.window.len() >= policy.max_requests
            && let Some(start) = self.window.front()
        {
            return Some((*start + policy.window).saturating_duration_since(now));
        }
        if let Some(last) = self.last_dispatch {
            let ready = last + policy.min_gap;
            if ready > now {
                return Some(ready - now);
            }
        }
        None
    }

    fn record(&mut self, now: Instant) {
        self.window.push_back(now);
        self.last_dispatch = Some(now);
    }
}

struct Inner {
    policy: RatePolicy,
    state: Mutex<State>,
}
impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // Nothing panics while holding the lock, but a poisoned queue is
        // still a perfectly usable queue.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide the next step of the drain loop. Kept synchronous so the guard
    /// never lives across an `.await`.
    fn next(&self) -> Next {
        let mut state = self.lock();
        if state.queue.is_empty() {
            state.draining = false;
            return Next::Idle;
        }
        let now = Instant::now();
        if let Some(delay) = state.delay(&self.policy, now) {
            return Next::Wait(delay);
        }
        match state.queue.pop_front() {
            Some(job) => {
                state.record(now);
                Next::Run(job)
            },
            None => {
                state.draining = false;
                Next::Idle
            },
        }
    }
}

/// A FIFO work queue that dispatches at most [`RatePolicy::max_requests`]
/// units per rolling window, spaced at least [`RatePolicy::min_gap`] apart.
///
/// Units run one at a time on a single drain task which is spawned on demand
/// by [`schedule`](Self::schedule) and exits when the queue empties. Cloning
/// the limiter clones a handle to the same queue, so every clone shares one
/// budget.
///
/// ```
/// # use tankobon_asyncutils::{RateLimiter, RatePolicy};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let limiter = RateLimiter::new(RatePolicy::default());
/// let answer = limiter.schedule(|| async { 6 * 7 }).await.unwrap();
/// assert_eq!(answer, 42);
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}
impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.inner.policy)
            .field("pending", &self.pending())
            .finish()
    }
}
impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                state: Mutex::new(State::new()),
            }),
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.inner.policy
    }

    /// Number of units waiting for a dispatch slot.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Queue a unit of work.
    ///
    /// The returned [`Scheduled`] resolves with whatever the work itself
    /// returns (errors included, they're part of `T`). Work is never
    /// reordered or dropped; if it panics the caller receives
    /// [`ErrorKind::Cancelled`] and the queue carries on.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F, Fut, T>(&self, work: F) -> Scheduled<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let output = work().await;
                // Whether the caller is still listening is their business.
                let _ = tx.send(output);
            }
            .boxed()
        });
        let start_drain = {
            let mut state = self.inner.lock();
            state.queue.push_back(job);
            !std::mem::replace(&mut state.draining, true)
        };
        if start_drain {
            match Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(drain(Draining::new(Arc::clone(&self.inner))));
                },
                Err(_) => {
                    // No drain loop means nothing else can be queued either,
                    // so the only job in here is ours. Dropping it drops the
                    // sender and the caller sees a cancellation.
                    tracing::error!("Rate limiter used outside of a Tokio runtime");
                    let mut state = self.inner.lock();
                    state.queue.clear();
                    state.draining = false;
                },
            }
        }
        Scheduled { rx }
    }
}

/// Ownership of the drain loop. If the task is dropped before the queue
/// empties (its runtime shut down), the flag is released so a later
/// [`RateLimiter::schedule`] can start a new loop.
struct Draining {
    inner: Arc<Inner>,
    idle: bool,
}
impl Draining {
    fn new(inner: Arc<Inner>) -> Self {
        Self { inner, idle: false }
    }
}
impl Drop for Draining {
    fn drop(&mut self) {
        if !self.idle {
            self.inner.lock().draining = false;
        }
    }
}

async fn drain(mut guard: Draining) {
    loop {
        match guard.inner.next() {
            Next::Idle => {
                // `next` already cleared the flag under the lock, and another
                // loop may own it by now.
                guard.idle = true;
                return;
            },
            Next::Wait(delay) => {
                tracing::trace!(delay_ms = delay.as_millis(), "Request budget exhausted; waiting");
                tokio::time::sleep(delay).await;
            },
            Next::Run(job) => {
                if AssertUnwindSafe(job()).catch_unwind().await.is_err() {
                    tracing::warn!("Scheduled work panicked; continuing with the rest of the queue");
                }
            },
        }
    }
}

pin_project! {
    /// Resolves with the output of a unit of work once a [`RateLimiter`] has
    /// dispatched and run it.
    #[must_use = "the work runs regardless, but its output is lost unless awaited"]
    pub struct Scheduled<T> {
        #[pin]
        rx: oneshot::Receiver<T>,
    }
}
impl<T> Future for Scheduled<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().rx.poll(cx).map(|received| received.or_raise(|| ErrorKind::Cancelled))
    }
}
