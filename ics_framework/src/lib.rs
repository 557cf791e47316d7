//! ICS Component Runtime
//!
//! Hosts Assembly and HCD component instances. Each instance is one
//! logical actor: a tokio task draining a single message queue, so no two
//! handler invocations for the same instance ever run concurrently. Long
//! running work is handed off to worker tasks and re-enters the queue as a
//! completion message correlated by run id.
//!
//! # Module Structure
//!
//! - [`handlers`] - The `ComponentHandlers` contract and `ComponentContext`
//! - [`component`] - Message loop, `Component::spawn`, `ComponentRef` client
//! - [`location`] - In-process location service with tracking events
//! - [`time`] - Injectable time source
//!
//! # Usage
//!
//! ```rust,ignore
//! let location = LocationService::new();
//! let hcd = Component::spawn(ComponentId::hcd("wfos.lgrip1"), handlers, &location).await?;
//! location.register(hcd.clone());
//! let response = hcd.submit_and_wait(command).await?;
//! ```

pub mod component;
pub mod handlers;
pub mod location;
pub mod time;

pub use component::{Component, ComponentMessage, ComponentRef};
pub use handlers::{ComponentContext, ComponentHandlers, CompletionSender};
pub use location::LocationService;
pub use time::{SystemTimeSource, TimeSource, UtcTime};
