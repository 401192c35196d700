//! # Status Transition Guard
//!
//! Decides whether a package may move from its current status to a requested
//! one. The rules are evaluated in order:
//!
//! 1. No current status, or `PENDING`: anything goes (the first transition is
//!    unconstrained, same-status resubmission included).
//! 2. Same status requested again: allowed as an idempotent no-op.
//! 3. `PACKED` may move to `DISPATCHED` or straight to `DELIVERED`.
//! 4. `DISPATCHED` may only move to `DELIVERED`.
//! 5. `DELIVERED` is terminal.
//! 6. A current status outside the lifecycle is allowed to move anywhere.
//!
//! Rule 3 lets packers skip dispatch for hand deliveries. Rule 6 keeps legacy
//! rows editable; [`check_transition`] logs a warning every time it fires so
//! those rows can be found and cleaned up.

use crate::error::{CoreError, CoreResult};
use crate::status::PackageStatus;

/// Pure legality decision for `current → requested`.
pub fn is_transition_allowed(current: Option<&PackageStatus>, requested: &PackageStatus) -> bool {
    let current = match current {
        None | Some(PackageStatus::Pending) => return true,
        Some(current) => current,
    };

    if current == requested {
        return true;
    }

    match current {
        PackageStatus::Pending => true,
        PackageStatus::Packed => matches!(
            requested,
            PackageStatus::Dispatched | PackageStatus::Delivered
        ),
        PackageStatus::Dispatched => matches!(requested, PackageStatus::Delivered),
        PackageStatus::Delivered => false,
        PackageStatus::Other(_) => true,
    }
}

/// Guard wrapper that turns a rejection into [`CoreError::InvalidTransition`].
pub fn check_transition(
    current: Option<&PackageStatus>,
    requested: &PackageStatus,
) -> CoreResult<()> {
    if let Some(PackageStatus::Other(raw)) = current {
        tracing::warn!(
            packtrack.status.current = %raw,
            packtrack.status.requested = %requested,
            "Unknown current status, allowing transition"
        );
    }

    if is_transition_allowed(current, requested) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            current: current.cloned().unwrap_or_default(),
            requested: requested.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PackageStatus::*;

    fn all_statuses() -> Vec<PackageStatus> {
        vec![
            Pending,
            Packed,
            Dispatched,
            Delivered,
            Other("ON_HOLD".to_string()),
        ]
    }

    #[test]
    fn test_absent_or_pending_allows_everything() {
        for requested in all_statuses() {
            assert!(is_transition_allowed(None, &requested));
            assert!(is_transition_allowed(Some(&Pending), &requested));
        }
    }

    #[test]
    fn test_same_status_is_idempotent() {
        for status in all_statuses() {
            assert!(is_transition_allowed(Some(&status), &status), "{status}");
        }
    }

    #[test]
    fn test_packed_may_skip_dispatch() {
        assert!(is_transition_allowed(Some(&Packed), &Dispatched));
        assert!(is_transition_allowed(Some(&Packed), &Delivered));
        assert!(!is_transition_allowed(Some(&Packed), &Pending));
    }

    #[test]
    fn test_dispatched_only_moves_to_delivered() {
        assert!(is_transition_allowed(Some(&Dispatched), &Delivered));
        assert!(!is_transition_allowed(Some(&Dispatched), &Packed));
        assert!(!is_transition_allowed(Some(&Dispatched), &Pending));
    }

    #[test]
    fn test_delivered_is_terminal() {
        for requested in all_statuses() {
            if requested == Delivered {
                continue;
            }
            assert!(!is_transition_allowed(Some(&Delivered), &requested));
        }
    }

    #[test]
    fn test_unknown_current_status_is_permissive() {
        let legacy = Other("IN_TRANSIT".to_string());
        assert!(is_transition_allowed(Some(&legacy), &Pending));
        assert!(is_transition_allowed(Some(&legacy), &Delivered));
    }

    #[test]
    fn test_rejection_names_both_statuses() {
        let err = check_transition(Some(&Delivered), &Packed).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTransition {
                current: Delivered,
                requested: Packed,
            }
        );
        assert_eq!(err.to_string(), "Invalid status transition: DELIVERED → PACKED");
    }
}
