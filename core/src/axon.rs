//! # Axon: Executable Transition Chain
//!
//! An `Axon` is a reusable pipeline `In -> Out` built from [`Transition`]
//! steps. It carries a [`Schematic`] describing its steps so the wiring can be
//! logged or inspected without running it.
//!
//! * **Builder pattern**: `Axon::new("label").then(StepA).then(StepB)`
//! * **Faults short-circuit**: a `Fault` skips every remaining step

use crate::bus::Bus;
use crate::outcome::Outcome;
use crate::transition::Transition;
use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Type alias for async boxed futures used in Axon execution.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executor type for Axon steps.
pub type Executor<In, Out, E, R> =
    Arc<dyn for<'a> Fn(In, Arc<R>, &'a mut Bus) -> BoxFuture<'a, Outcome<Out, E>> + Send + Sync>;

/// Helper to extract a readable type name from a type.
fn type_name_of<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Static description of an Axon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schematic {
    pub name: String,
    pub steps: Vec<StepInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub label: String,
    pub input_type: String,
    pub output_type: String,
    pub description: Option<String>,
}

impl Schematic {
    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.label.as_str()).collect()
    }
}

/// The Axon Builder and Runtime.
pub struct Axon<In, Out, E, R> {
    schematic: Schematic,
    executor: Executor<In, Out, E, R>,
}

impl<In, Out, E, R> Clone for Axon<In, Out, E, R> {
    fn clone(&self) -> Self {
        Self {
            schematic: self.schematic.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<In, E, R> Axon<In, In, E, R>
where
    In: Send + 'static,
    E: Send + 'static,
    R: Send + Sync + 'static,
{
    /// Start an identity Axon (`In -> In`).
    pub fn new(label: &str) -> Self {
        let executor: Executor<In, In, E, R> = Arc::new(
            move |input: In, _res: Arc<R>, _bus: &mut Bus| -> BoxFuture<'_, Outcome<In, E>> {
                Box::pin(std::future::ready(Outcome::Next(input)))
            },
        );

        Self {
            schematic: Schematic {
                name: label.to_string(),
                steps: Vec::new(),
            },
            executor,
        }
    }
}

impl<In, Out, E, R> Axon<In, Out, E, R>
where
    In: Send + 'static,
    Out: Send + 'static,
    E: Send + std::fmt::Display + 'static,
    R: Send + Sync + 'static,
{
    /// Chain a transition to this Axon.
    pub fn then<Next, Trans>(self, transition: Trans) -> Axon<In, Next, E, R>
    where
        Next: Send + 'static,
        Trans: Transition<Out, Next, Error = E, Resources = R>,
    {
        let label = type_name_of::<Trans>();
        let Axon {
            mut schematic,
            executor: prev_executor,
        } = self;

        schematic.steps.push(StepInfo {
            label: label.clone(),
            input_type: type_name_of::<Out>(),
            output_type: type_name_of::<Next>(),
            description: transition.description(),
        });

        let transition = Arc::new(transition);
        let next_executor: Executor<In, Next, E, R> = Arc::new(
            move |input: In, res: Arc<R>, bus: &mut Bus| -> BoxFuture<'_, Outcome<Next, E>> {
                let prev = prev_executor.clone();
                let trans = transition.clone();
                let label = label.clone();

                Box::pin(async move {
                    let state = match prev(input, res.clone(), &mut *bus).await {
                        Outcome::Next(state) => state,
                        Outcome::Fault(e) => return Outcome::Fault(e),
                    };

                    let started = Instant::now();
                    let outcome = trans.run(state, &res, bus).await;
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    match &outcome {
                        Outcome::Next(_) => {
                            tracing::debug!(packtrack.step = %label, elapsed_ms, "Step completed")
                        }
                        Outcome::Fault(e) => {
                            tracing::debug!(packtrack.step = %label, elapsed_ms, error = %e, "Step faulted")
                        }
                    }
                    outcome
                })
            },
        );

        Axon {
            schematic,
            executor: next_executor,
        }
    }

    /// Execute the Axon with the given input.
    pub async fn execute(&self, input: In, resources: &Arc<R>, bus: &mut Bus) -> Outcome<Out, E> {
        let span = tracing::info_span!("Pipeline", packtrack.pipeline = %self.schematic.name);
        (self.executor)(input, resources.clone(), bus)
            .instrument(span)
            .await
    }

    /// Get a reference to the Schematic (structural view).
    pub fn schematic(&self) -> &Schematic {
        &self.schematic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Counter {
        limit: u32,
    }

    #[derive(Clone)]
    struct AddOne;

    #[async_trait]
    impl Transition<u32, u32> for AddOne {
        type Error = String;
        type Resources = Counter;

        async fn run(&self, state: u32, res: &Counter, bus: &mut Bus) -> Outcome<u32, String> {
            bus.insert(state);
            if state >= res.limit {
                Outcome::Fault(format!("limit {} reached", res.limit))
            } else {
                Outcome::Next(state + 1)
            }
        }
    }

    #[derive(Clone)]
    struct Render;

    #[async_trait]
    impl Transition<u32, String> for Render {
        type Error = String;
        type Resources = Counter;

        fn description(&self) -> Option<String> {
            Some("Formats the counter".into())
        }

        async fn run(&self, state: u32, _res: &Counter, _bus: &mut Bus) -> Outcome<String, String> {
            Outcome::Next(format!("#{state}"))
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let axon = Axon::<u32, u32, String, Counter>::new("count")
            .then(AddOne)
            .then(AddOne)
            .then(Render);
        let res = Arc::new(Counter { limit: 10 });
        let mut bus = Bus::new();

        assert_eq!(axon.execute(1, &res, &mut bus).await, Outcome::Next("#3".to_string()));
        assert_eq!(bus.get::<u32>(), Some(&2));
    }

    #[tokio::test]
    async fn test_fault_skips_remaining_steps() {
        let axon = Axon::<u32, u32, String, Counter>::new("count")
            .then(AddOne)
            .then(AddOne)
            .then(Render);
        let res = Arc::new(Counter { limit: 1 });
        let mut bus = Bus::new();

        let outcome = axon.execute(0, &res, &mut bus).await;
        assert_eq!(outcome, Outcome::Fault("limit 1 reached".to_string()));
        assert_eq!(bus.get::<u32>(), Some(&1));
    }

    #[test]
    fn test_schematic_lists_steps() {
        let axon = Axon::<u32, u32, String, Counter>::new("count")
            .then(AddOne)
            .then(Render);
        let schematic = axon.schematic();
        assert_eq!(schematic.name, "count");
        assert_eq!(schematic.labels(), vec!["AddOne", "Render"]);
        assert_eq!(schematic.steps[1].output_type, "String");
        assert_eq!(
            schematic.steps[1].description.as_deref(),
            Some("Formats the counter")
        );
    }
}
