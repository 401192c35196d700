//! packtrack core: package lifecycle rules, operational records and the typed
//! transition pipeline the services are built from.
//!
//! This crate is protocol-agnostic. Storage lives in `packtrack-db`, HTTP in
//! `packtrack-http`.

pub mod attendance;
pub mod axon;
pub mod bus;
pub mod code;
pub mod config;
pub mod daily_log;
pub mod error;
pub mod guard;
pub mod outcome;
pub mod package;
pub mod session;
pub mod status;
pub mod telemetry;
pub mod transition;

pub use axon::{Axon, Schematic};
pub use bus::{Bus, RequestId};
pub use error::{CoreError, CoreResult};
pub use guard::{check_transition, is_transition_allowed};
pub use outcome::Outcome;
pub use package::{PackageQuery, PackageRecord, PackageUpdate, StatusSummary};
pub use session::SessionContext;
pub use status::PackageStatus;
pub use transition::Transition;

pub mod prelude {
    pub use crate::attendance::{AttendanceEntry, AttendanceQuery, AttendanceRecord, AttendanceStatus};
    pub use crate::axon::{Axon, Schematic};
    pub use crate::bus::{Bus, RequestId};
    pub use crate::daily_log::{DailyLog, DailyLogEntry, DailyLogQuery, LogKind};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::guard::{check_transition, is_transition_allowed};
    pub use crate::outcome::Outcome;
    pub use crate::package::{
        PackageQuery, PackageRecord, PackageUpdate, SortField, SortOrder, StatusSummary,
    };
    pub use crate::session::SessionContext;
    pub use crate::status::PackageStatus;
    pub use crate::transition::Transition;
}
