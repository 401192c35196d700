use crate::bus::Bus;
use crate::outcome::Outcome;
use async_trait::async_trait;

/// The contract for a typed pipeline step.
///
/// `Transition` converts state `From` to `Outcome<To, Error>`, with shared
/// `Resources` (stores, clocks) and the per-request [`Bus`] at hand.
#[async_trait]
pub trait Transition<From, To>: Send + Sync + 'static
where
    From: Send + 'static,
    To: Send + 'static,
{
    /// Domain-specific error type
    type Error: Send + Sync + 'static;

    /// Shared resources this step needs
    type Resources: Send + Sync + 'static;

    /// Short human-readable description for the pipeline schematic.
    fn description(&self) -> Option<String> {
        None
    }

    /// Execute the transition
    async fn run(
        &self,
        state: From,
        resources: &Self::Resources,
        bus: &mut Bus,
    ) -> Outcome<To, Self::Error>;
}
