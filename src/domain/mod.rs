mod dispatcher;
mod error;
mod event;
mod ingest;
mod notification;
mod query;
pub mod reduce;
mod registry;

pub use dispatcher::*;
pub use error::*;
pub use event::*;
pub use ingest::*;
pub use notification::*;
pub use query::*;
pub use reduce::*;
pub use registry::*;
