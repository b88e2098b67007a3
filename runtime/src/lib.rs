//! # Triage Runtime
//!
//! Runtime for the triage bot's reducers.
//!
//! ## Core Components
//!
//! - **Store**: runs a reducer for one inbound event at a time per key,
//!   executes the effects it returns and feeds produced actions back
//! - **Effect Executor**: turns effect descriptions into platform calls
//! - **Metrics**: Prometheus exporter bootstrap
//!
//! ## Keyed, transient runs
//!
//! The engines keep no state between events: the platform is the system of
//! record. A run therefore starts from `S::default()`, loads whatever it
//! needs through effects, and its final state is handed back to the caller
//! and then dropped.
//!
//! Runs for the same key (a request message, a voice room name) are
//! serialized; runs for different keys proceed in parallel.
//!
//! ## Example
//!
//! ```ignore
//! use triage_runtime::Store;
//!
//! let store = Store::new("requests", RequestReducer::new(), environment);
//!
//! // Process an event inline and inspect how the run ended
//! let state = store.send(message_id, RequestAction::ReactionAdded(event)).await?;
//!
//! // Or hand it off without blocking the dispatch path
//! store.dispatch(message_id, RequestAction::RequestPosted(posted));
//! ```

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// A spawned run panicked or was cancelled
        #[error("Run task failed: {0}")]
        TaskJoin(#[from] tokio::task::JoinError),

        /// Store is shutting down and not accepting new runs
        ///
        /// Returned by `send()` after `shutdown()` was initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for in-flight runs
        #[error("Shutdown timed out with {0} runs still in flight")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Store module - the keyed reducer runtime
pub mod store {
    use crate::error::StoreError;
    use futures::future::join_all;
    use std::collections::{HashMap, VecDeque};
    use std::fmt;
    use std::future::Future;
    use std::hash::Hash;
    use std::marker::PhantomData;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use triage_core::{effect::Effect, reducer::Reducer};

    /// Per-key lock registry.
    type KeyLocks<K> = Arc<Mutex<HashMap<K, Arc<Mutex<()>>>>>;

    /// Decrements the in-flight count when dropped, so a panicking run still counts down.
    struct InFlightGuard {
        count: Arc<AtomicUsize>,
        store: &'static str,
    }

    impl InFlightGuard {
        fn enter(count: &Arc<AtomicUsize>, store: &'static str) -> Self {
            let running = count.fetch_add(1, Ordering::SeqCst) + 1;
            record_in_flight(store, running);
            Self {
                count: Arc::clone(count),
                store,
            }
        }
    }

    impl Drop for InFlightGuard {
        fn drop(&mut self) {
            let running = self.count.fetch_sub(1, Ordering::SeqCst) - 1;
            record_in_flight(self.store, running);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_in_flight(store: &'static str, running: usize) {
        metrics::gauge!("triage_store_in_flight", "store" => store).set(running as f64);
    }

    /// The Store - runtime for one reducer
    ///
    /// The Store manages:
    /// 1. Reducer (business logic)
    /// 2. Environment (injected dependencies)
    /// 3. Per-key serialization of runs
    /// 4. Effect execution (with feedback loop)
    /// 5. In-flight accounting for graceful shutdown
    ///
    /// # Type Parameters
    ///
    /// - `K`: Serialization key
    /// - `S`: Transient run state
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<K, S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        name: &'static str,
        reducer: Arc<R>,
        environment: Arc<E>,
        locks: KeyLocks<K>,
        shutdown: Arc<AtomicBool>,
        in_flight: Arc<AtomicUsize>,
        _run: PhantomData<fn() -> (S, A)>,
    }

    impl<K, S, A, E, R> Store<K, S, A, E, R>
    where
        K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        S: Default + Send + 'static,
        A: Send + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store
        ///
        /// # Arguments
        ///
        /// - `name`: Label used in logs and metrics (e.g. `"requests"`)
        /// - `reducer`: The reducer implementation (business logic)
        /// - `environment`: Injected dependencies
        #[must_use]
        pub fn new(name: &'static str, reducer: R, environment: E) -> Self {
            Self {
                name,
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                locks: Arc::new(Mutex::new(HashMap::new())),
                shutdown: Arc::new(AtomicBool::new(false)),
                in_flight: Arc::new(AtomicUsize::new(0)),
                _run: PhantomData,
            }
        }

        /// Label of this store
        #[must_use]
        pub const fn name(&self) -> &'static str {
            self.name
        }

        /// The injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }

        /// Number of runs currently executing or waiting for their key
        #[must_use]
        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// `true` once `shutdown()` was called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::SeqCst)
        }

        /// Number of keys with a live lock entry
        pub async fn tracked_keys(&self) -> usize {
            self.locks.lock().await.len()
        }

        /// Process one action for `key` and return the final run state
        ///
        /// Waits for any other run on the same key, then:
        /// 1. Starts from `S::default()`
        /// 2. Reduces the action
        /// 3. Executes the returned effects in order, queueing produced actions
        /// 4. Repeats until no actions are left
        ///
        /// The key stays locked for the whole run, including effect execution.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, key, action), fields(store = self.name, key = %key), name = "store_send")]
        pub async fn send(&self, key: K, action: A) -> Result<S, StoreError> {
            if self.is_shutting_down() {
                return Err(StoreError::ShutdownInProgress);
            }

            let _in_flight = InFlightGuard::enter(&self.in_flight, self.name);

            let slot = self.acquire_slot(&key).await;
            let state = {
                let _serialized = slot.lock().await;
                let started = Instant::now();
                let state = self.run(action).await;
                metrics::histogram!("triage_store_run_duration_seconds", "store" => self.name)
                    .record(started.elapsed().as_secs_f64());
                state
            };
            self.release_slot(&key, slot).await;

            metrics::counter!("triage_store_runs_total", "store" => self.name).increment(1);
            Ok(state)
        }

        /// Process an action on a background task
        ///
        /// The dispatch path returns immediately; platform latency of this run
        /// never delays runs for other keys.
        pub fn dispatch(&self, key: K, action: A) -> JoinHandle<Result<S, StoreError>> {
            let store = self.clone();
            tokio::spawn(async move {
                let result = store.send(key, action).await;
                if let Err(error) = &result {
                    tracing::warn!(store = store.name, %error, "Run rejected");
                }
                result
            })
        }

        /// Stop accepting runs and wait for in-flight ones to finish
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] with the number of runs still
        /// in flight when `timeout` elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            self.shutdown.store(true, Ordering::SeqCst);
            tracing::info!(store = self.name, "Store shutting down");

            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let remaining = self.in_flight();
                if remaining == 0 {
                    tracing::info!(store = self.name, "Store drained");
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    tracing::warn!(store = self.name, remaining, "Shutdown timed out");
                    return Err(StoreError::ShutdownTimeout(remaining));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        async fn run(&self, action: A) -> S {
            let mut state = S::default();
            let mut queue = VecDeque::from([action]);

            while let Some(action) = queue.pop_front() {
                let effects = self.reducer.reduce(&mut state, action, &self.environment);
                for effect in effects {
                    queue.extend(execute(effect, self.name).await);
                }
            }

            state
        }

        async fn acquire_slot(&self, key: &K) -> Arc<Mutex<()>> {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.clone()).or_default())
        }

        async fn release_slot(&self, key: &K, slot: Arc<Mutex<()>>) {
            let mut locks = self.locks.lock().await;
            // Only the registry and this handle left: nobody is waiting on the key.
            if Arc::strong_count(&slot) == 2 {
                locks.remove(key);
            }
        }
    }

    impl<K, S, A, E, R> Clone for Store<K, S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                name: self.name,
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                locks: Arc::clone(&self.locks),
                shutdown: Arc::clone(&self.shutdown),
                in_flight: Arc::clone(&self.in_flight),
                _run: PhantomData,
            }
        }
    }

    /// Execute one effect and collect the actions it produced
    ///
    /// - `None`: No-op
    /// - `Future`: Awaits the computation, keeps the action if `Some`
    /// - `Sequential`: Executes effects in order, waiting for each to complete
    /// - `Parallel`: Executes effects concurrently
    fn execute<A>(effect: Effect<A>, store: &'static str) -> Pin<Box<dyn Future<Output = Vec<A>> + Send>>
    where
        A: Send + 'static,
    {
        Box::pin(async move {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    Vec::new()
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("triage_store_effects_total", "store" => store, "type" => "future")
                        .increment(1);
                    fut.await.into_iter().collect()
                },
                Effect::Sequential(effects) => {
                    tracing::trace!("Executing Effect::Sequential with {} effects", effects.len());
                    let mut produced = Vec::new();
                    for effect in effects {
                        produced.extend(execute(effect, store).await);
                    }
                    produced
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    join_all(effects.into_iter().map(|effect| execute(effect, store)))
                        .await
                        .into_iter()
                        .flatten()
                        .collect()
                },
            }
        })
    }
}

// Re-export for convenience
pub use store::Store;
