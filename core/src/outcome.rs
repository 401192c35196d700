use serde::{Deserialize, Serialize};

/// The explicit result of a transition step.
///
/// Every step returns an `Outcome` instead of an early `?` so a pipeline can
/// decide how a fault ends the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<T, E> {
    /// Proceed to the next step with this state
    Next(T),

    /// A structural fault (Error path)
    Fault(E),
}

impl<T, E> Outcome<T, E> {
    pub fn map<U, F: FnOnce(T) -> U>(self, op: F) -> Outcome<U, E> {
        match self {
            Outcome::Next(t) => Outcome::Next(op(t)),
            Outcome::Fault(e) => Outcome::Fault(e),
        }
    }

    pub fn map_fault<F2, F: FnOnce(E) -> F2>(self, op: F) -> Outcome<T, F2> {
        match self {
            Outcome::Next(t) => Outcome::Next(t),
            Outcome::Fault(e) => Outcome::Fault(op(e)),
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Fault(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Next(t) => Ok(t),
            Outcome::Fault(e) => Err(e),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(t) => Outcome::Next(t),
            Err(e) => Outcome::Fault(e),
        }
    }
}
