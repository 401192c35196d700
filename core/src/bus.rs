//! Per-request resources for the update pipeline.
//!
//! The ingress puts the [`RequestId`] and the caller's
//! [`SessionContext`](crate::SessionContext) here; steps read them back by
//! type, and a step may leave values such as the previous status for the
//! steps after it.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Resources keyed by their type. At most one value per type.
#[derive(Default)]
pub struct Bus {
    resources: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `resource`, replacing any earlier value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, resource: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(resource));
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("resources", &self.resources.len())
            .finish()
    }
}

/// Correlation id echoed in the `x-request-id` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        RequestId(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionContext;

    #[test]
    fn test_resources_are_found_by_type() {
        let mut bus = Bus::new();
        bus.insert(RequestId("req-1".into()));
        bus.insert(SessionContext::open());

        assert_eq!(bus.get::<RequestId>(), Some(&RequestId("req-1".into())));
        assert!(bus.get::<SessionContext>().is_some_and(SessionContext::is_authenticated));
        assert!(bus.get::<String>().is_none());
    }

    #[test]
    fn test_insert_replaces_same_type() {
        let mut bus = Bus::new();
        bus.insert(SessionContext::anonymous());
        bus.insert(SessionContext::open());
        assert!(bus.get::<SessionContext>().is_some_and(SessionContext::is_authenticated));
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }
}
