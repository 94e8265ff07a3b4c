pub mod app;
pub mod context;
pub mod error;
pub mod handler;
pub mod response;

pub use app::{dispatch, signal_shutdown, App};
pub use context::{Context, Values};
pub use error::{Error, WebResult};
pub use handler::{wrap, ArcHandler, Handler, Middleware};
pub use response::{respond, respond_error};
