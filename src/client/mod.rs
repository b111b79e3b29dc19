//! Client-side view-state for the catalog UI.
//!
//! Every screen talks to the backend through [`gateway::Gateway`]. The
//! screens themselves are plain state holders: they issue awaited gateway
//! calls and expose what should be rendered.

pub mod admin;
pub mod form;
pub mod gateway;
pub mod http;
pub mod list;
pub mod memory;
pub mod route;
pub mod session;

pub use admin::AdminBooksScreen;
pub use form::{EditForm, FormError};
pub use gateway::{Gateway, GatewayError, GatewayState, Identity, IdentitySubscription};
pub use http::HttpGateway;
pub use list::{Criteria, DeleteOutcome, ListScreen};
pub use memory::{GatewayCall, InMemoryGateway};
pub use route::Route;
pub use session::{Screen, SessionGuard, SessionState};
