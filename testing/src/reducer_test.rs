//! Given-When-Then harness for reducer decisions.
//!
//! Reducer runs start from a default state and stop at the first effect that
//! touches the platform, so most decisions can be checked without executing
//! anything. [`execute_effects`] follows the feedback loop one step further
//! when a test needs the produced action.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use futures::future::{BoxFuture, join_all};
use triage_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Reduces a list of actions and checks the resulting state and effects.
///
/// # Example
///
/// ```ignore
/// use triage_testing::ReducerTest;
///
/// ReducerTest::new(RequestReducer::new())
///     .with_env(environment)
///     .given_state(RequestState::default())
///     .when_action(RequestAction::SnapshotLoaded { reaction, snapshot: None })
///     .then_state(|state| {
///         assert_eq!(state.outcome, Some(Outcome::Ignored(IgnoreReason::MessageGone)));
///     })
///     .then_effects(|effects| {
///         assertions::assert_no_effects(effects);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Harness around `reducer`.
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Environment passed to every `reduce` call.
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// State the first action is reduced in; usually `S::default()`.
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// The single action under test.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions = vec![action];
        self
    }

    /// Several actions reduced in order, as a run feeds them back.
    ///
    /// Effect assertions see the effects of the last action only.
    #[must_use]
    pub fn when_actions(mut self, actions: Vec<A>) -> Self {
        self.actions = actions;
        self
    }

    /// Check the state after the last action.
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Check the effects returned by the last action.
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Reduce the actions and run every assertion.
    ///
    /// # Panics
    ///
    /// Panics if the state, an action or the environment is missing, or if
    /// an assertion fails.
    #[allow(clippy::panic, clippy::expect_used)] // Test harness
    pub fn run(self) {
        let mut state = self.initial_state.expect("given_state() was not called");
        let env = self.environment.expect("with_env() was not called");
        assert!(!self.actions.is_empty(), "when_action() was not called");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        self.state_assertions
            .into_iter()
            .for_each(|assertion| assertion(&state));
        self.effect_assertions
            .into_iter()
            .for_each(|assertion| assertion(&effects));
    }
}

/// Execute effects the way the Store does and return the actions they produce.
pub fn execute_effects<A>(effects: Vec<Effect<A>>) -> BoxFuture<'static, Vec<A>>
where
    A: Send + 'static,
{
    Box::pin(async move {
        let mut produced = Vec::new();
        for effect in effects {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => produced.extend(fut.await),
                Effect::Sequential(inner) => produced.extend(execute_effects(inner).await),
                Effect::Parallel(inner) => {
                    let batches = join_all(inner.into_iter().map(|effect| execute_effects(vec![effect]))).await;
                    produced.extend(batches.into_iter().flatten());
                },
            }
        }
        produced
    })
}

/// Effect assertions shared by reducer tests.
pub mod assertions {
    use triage_core::effect::Effect;

    /// The run ends here: every effect is `Effect::None`.
    ///
    /// # Panics
    ///
    /// Panics if any effect does work.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "run should end here, got {effects:?}"
        );
    }

    /// Exactly `expected` top-level effects.
    ///
    /// # Panics
    ///
    /// Panics on any other count.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(effects.len(), expected, "unexpected number of effects");
    }

    /// At least one effect, possibly nested, calls the platform.
    ///
    /// # Panics
    ///
    /// Panics if no future is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            count_futures(effects) > 0,
            "expected a platform call, found only no-ops"
        );
    }

    /// Futures in `effects`, counting inside groups.
    #[must_use]
    pub fn count_futures<A>(effects: &[Effect<A>]) -> usize {
        effects
            .iter()
            .map(|effect| match effect {
                Effect::None => 0,
                Effect::Future(_) => 1,
                Effect::Parallel(inner) | Effect::Sequential(inner) => count_futures(inner),
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::effect::Effect;
    use triage_core::reducer::Reducer;
    use triage_core::{SmallVec, smallvec};

    /// Counts reports and asks for a deletion once three arrived.
    #[derive(Debug, Default)]
    struct Tally {
        reports: u32,
        deleted: bool,
    }

    #[derive(Debug, PartialEq)]
    enum TallyAction {
        Report,
        Deleted,
    }

    struct TallyReducer;

    impl Reducer for TallyReducer {
        type State = Tally;
        type Action = TallyAction;
        type Environment = u32;

        fn reduce(
            &self,
            state: &mut Tally,
            action: TallyAction,
            threshold: &u32,
        ) -> SmallVec<[Effect<TallyAction>; 4]> {
            match action {
                TallyAction::Report => {
                    state.reports += 1;
                    if state.reports >= *threshold {
                        smallvec![Effect::future(async { Some(TallyAction::Deleted) })]
                    } else {
                        smallvec![Effect::None]
                    }
                },
                TallyAction::Deleted => {
                    state.deleted = true;
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[test]
    fn below_threshold_ends_the_run() {
        ReducerTest::new(TallyReducer)
            .with_env(3)
            .given_state(Tally::default())
            .when_actions(vec![TallyAction::Report, TallyAction::Report])
            .then_state(|state| assert_eq!(state.reports, 2))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn threshold_asks_for_a_platform_call() {
        ReducerTest::new(TallyReducer)
            .with_env(1)
            .given_state(Tally::default())
            .when_action(TallyAction::Report)
            .then_state(|state| assert!(!state.deleted))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn nested_futures_are_counted() {
        let effects: Vec<Effect<TallyAction>> = vec![
            Effect::None,
            Effect::chain(vec![
                Effect::future(async { None }),
                Effect::merge(vec![Effect::future(async { None }), Effect::None]),
            ]),
        ];
        assert_eq!(assertions::count_futures(&effects), 2);
    }

    #[tokio::test]
    async fn executed_effects_return_feedback_in_order() {
        let effects = vec![
            Effect::future(async { Some(TallyAction::Report) }),
            Effect::chain(vec![
                Effect::future(async { None }),
                Effect::future(async { Some(TallyAction::Deleted) }),
            ]),
        ];
        assert_eq!(
            execute_effects(effects).await,
            vec![TallyAction::Report, TallyAction::Deleted]
        );
    }
}
