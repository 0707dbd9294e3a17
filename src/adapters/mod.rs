//! Adapters exposing a built logger to other interfaces

pub mod facade;
pub mod request_log;
pub mod store;

pub use facade::{data_field, error_field, param_field, LogWriter, LoggerWriter};
pub use request_log::{format_request, LevelWriter, RequestLogParams};
pub use store::StoreLogger;
