//! Given-When-Then harness for reducers
//!
//! Reducers are pure, so most behaviour can be pinned down without a store:
//! start from a state, apply one or more actions, then inspect the resulting
//! state and the effects returned by the last action.

#![allow(clippy::module_name_repetitions)]

use shopfront_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent reducer test
///
/// # Example
///
/// ```ignore
/// use shopfront_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(CartReducer::new())
///     .with_env(test_environment())
///     .given_state(ShoppingCart::default())
///     .when_action(CartAction::AddItem { product, delta: 2 })
///     .then_state(|cart| assert_eq!(cart.items.len(), 1))
///     .then_effects(assertions::assert_no_effects)
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
    /// Start a test for `reducer`
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

    /// Environment passed to every `reduce` call
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Given
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// When
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// When, for a sequence of actions
    ///
    /// Effect assertions see only the effects of the last action.
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Then, on the final state
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Then, on the effects of the last action
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Apply the actions and run every assertion
    ///
    /// # Panics
    ///
    /// Panics if the state, environment or at least one action is missing,
    /// or if an assertion fails.
    #[allow(clippy::panic, clippy::expect_used)]
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use shopfront_core::effect::{Effect, EffectId};

    /// Assert that there are no effects (an empty list or a lone `Effect::None`)
    ///
    /// # Panics
    ///
    /// Panics if a real effect is present.
    #[allow(clippy::panic)]
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the count differs.
    #[allow(clippy::panic)]
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {expected} effects, but found {}",
            effects.len()
        );
    }

    /// Assert that an effect is registered for cancellation under `id`
    ///
    /// # Panics
    ///
    /// Panics if none is found.
    #[allow(clippy::panic)]
    pub fn assert_has_cancellable_effect<A>(effects: &[Effect<A>], id: EffectId) {
        assert!(
            effects.iter().any(|e| e.cancellation_id() == Some(id)),
            "Expected a cancellable effect with id {id}, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::effect::{Effect, EffectId};
    use shopfront_core::{SmallVec, smallvec};

    const SEARCH: EffectId = EffectId::new("search");

    #[derive(Clone, Debug)]
    struct TestState {
        query: String,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Type(char),
        Clear,
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Type(c) => {
                    state.query.push(c);
                    smallvec![Effect::Future(Box::pin(async { None })).cancellable(SEARCH)]
                },
                TestAction::Clear => {
                    state.query.clear();
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[test]
    fn test_single_action() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { query: String::new() })
            .when_action(TestAction::Type('a'))
            .then_state(|state| assert_eq!(state.query, "a"))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_cancellable_effect(effects, SEARCH);
            })
            .run();
    }

    #[test]
    fn test_action_sequence_reports_last_effects() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { query: String::new() })
            .when_actions([TestAction::Type('a'), TestAction::Type('b'), TestAction::Clear])
            .then_state(|state| assert!(state.query.is_empty()))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
        assertions::assert_no_effects::<TestAction>(&[]);
    }

    #[test]
    #[should_panic(expected = "Expected no effects")]
    fn test_assertions_no_effects_fails_on_future() {
        assertions::assert_no_effects::<TestAction>(&[Effect::Future(Box::pin(async { None }))]);
    }
}
