//! # packtrack HTTP
//!
//! JSON over HTTP/1.1 for the package tracker, served with Hyper 1.0.
//!
//! ```rust,ignore
//! let store = packtrack_db::open_store(&config).await?;
//! HttpIngress::new(AppState::new(store, config.passcode.clone()))
//!     .bind(&config.bind)
//!     .run()
//!     .await?;
//! ```

pub mod error;
pub mod ingress;
pub mod response;
pub mod routes;

pub use error::{IngressError, IngressResult};
pub use ingress::{AppState, HttpIngress, IngressService, MAX_BODY_BYTES};
pub use routes::Route;

pub mod prelude {
    pub use crate::error::{IngressError, IngressResult};
    pub use crate::ingress::{AppState, HttpIngress, IngressService};
}
