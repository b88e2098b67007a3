//! # Triage Core
//!
//! Core traits and types for the triage bot.
//!
//! This crate provides the abstractions both engines are built from:
//!
//! - **State**: what one engine run knows about the resource it manages
//! - **Action**: every input to a reducer (inbound platform events and the
//!   results of platform calls fed back by effects)
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: descriptions of platform calls, executed by the runtime
//! - **Environment**: injected dependencies (clock, platform ports)
//!
//! It also defines the typed inbound events ([`event`]), the identifier
//! newtypes ([`ids`]) and the platform ports ([`platform`]) so the engines
//! never touch a chat SDK object graph directly.
//!
//! ## Example
//!
//! ```ignore
//! use triage_core::*;
//!
//! impl Reducer for RoomReducer {
//!     type State = RoomState;
//!     type Action = RoomAction;
//!     type Environment = RoomEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut RoomState,
//!         action: RoomAction,
//!         env: &RoomEnvironment,
//!     ) -> SmallVec<[Effect<RoomAction>; 4]> {
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod event;
pub mod ids;
pub mod platform;

/// The decision half of an engine.
///
/// `reduce` never awaits: it inspects the state and the action, records what
/// it decided and hands back the platform calls to make as effects.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Business logic of one engine.
    pub trait Reducer {
        /// What a single run learns and decides; starts from `Default`
        type State;

        /// Inbound events plus the results fed back by effects
        type Action;

        /// Configuration, clock and platform ports
        type Environment;

        /// Apply `action` to `state` and return the platform work it requires.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Platform work returned by reducers and executed by the runtime.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// A deferred platform call.
    ///
    /// The action a future resolves to, if any, is reduced next within the
    /// same run.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another
        Sequential(Vec<Effect<Action>>),

        /// One async step; `Some(action)` continues the run
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Box `fut` as an effect
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Run `effects` concurrently
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Run `effects` in order
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Injected dependencies that are not platform ports.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the timestamp embedded in thread names.
    pub trait Clock: Send + Sync {
        /// Current time in UTC
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock used in production
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
