//! The persistence gateway.
//!
//! A request flows resolver → address mapper → operations, with the dispatcher
//! tying the steps together and the server binding them to HTTP:
//!
//! - [`resolve`]: path + method to a typed [`resource::Route`]
//! - [`address`]: resource reference to store location and collection tags
//! - [`operations`]: store / retrieve / delete of resources
//! - [`search`]: scoped queries over a form's data
//! - [`dispatch`]: transport-neutral request handling
//! - [`server`]: `tiny_http` binding

pub mod address;
pub mod dispatch;
pub mod mime;
pub mod operations;
pub mod resolve;
pub mod resource;
pub mod search;
pub mod server;

pub use dispatch::{Dispatcher, Request, Response};
pub use resolve::Method;
pub use resource::{FormScope, ResourceKind, ResourceRef, Route};
