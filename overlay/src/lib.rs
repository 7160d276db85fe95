//! Interaction controller for context annotations.
//!
//! The controller owns the single popup slot of a document view and turns
//! raw gestures (selection, hover, click, keys, outside clicks) and I/O
//! completions into state transitions. It is split the same way the anchoring
//! engine is kept pure: [`controller::Controller`] is a synchronous state
//! machine that returns [`controller::Action`]s, and [`driver::Driver`]
//! executes those actions against the collaborators on a single tokio task.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`controller`] | The popup state machine and the actions it emits |
//! | [`input`] | Events fed into the controller |
//! | [`popup`] | Popup state, identity tokens, and popup views |
//! | [`geometry`] | Rectangles, viewport, and popup placement |
//! | [`config`] | Per-view configuration passed in at construction |
//! | [`store`] | Collaborator traits: comment store, identity |
//! | [`http`] | `CommentStore` over the annotation service's HTTP actions |
//! | [`driver`] | Async executor for actions, timers, and store calls |

pub mod config;
pub mod controller;
pub mod driver;
pub mod geometry;
pub mod http;
pub mod input;
pub mod popup;
pub mod store;

pub use config::OverlayConfig;
pub use controller::{Action, Controller};
pub use driver::{Driver, Surface};
pub use input::Event;
pub use store::{CommentStore, Identity, StaticIdentity, StoreError};
