//! Logger for a data-store client
//!
//! Store clients report through a printf-style hook. [`StoreLogger`] routes
//! those messages to the pipeline at info level, tagged `module=redis`.

use crate::core::Logger;
use parking_lot::RwLock;
use std::fmt;

pub const MODULE_KEY: &str = "module";
pub const STORE_MODULE: &str = "redis";

pub struct StoreLogger {
    base: Logger,
    current: RwLock<Logger>,
}

impl StoreLogger {
    /// Tag `base` with the store module
    pub fn new(base: Logger) -> Self {
        let current = RwLock::new(Self::tagged(&base));
        Self { base, current }
    }

    fn tagged(logger: &Logger) -> Logger {
        logger.with_field(MODULE_KEY, STORE_MODULE)
    }

    /// Log a formatted client message at info
    ///
    /// ```
    /// use rust_log_pipeline::adapters::store::StoreLogger;
    /// use rust_log_pipeline::core::Logger;
    ///
    /// let store = StoreLogger::new(Logger::noop());
    /// store.printf(format_args!("pool: {} idle connections", 4));
    /// ```
    #[track_caller]
    pub fn printf(&self, args: fmt::Arguments<'_>) {
        self.current.read().info(args.to_string());
    }

    /// Swap the logger used from now on
    ///
    /// A supplied logger is used as given; `None` restores the base logger
    /// with the module tag.
    pub fn update(&self, logger: Option<Logger>) {
        let next = match logger {
            Some(logger) => logger,
            None => Self::tagged(&self.base),
        };
        *self.current.write() = next;
    }

    pub fn logger(&self) -> Logger {
        self.current.read().clone()
    }
}

impl fmt::Debug for StoreLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLogger")
            .field("logger", &*self.current.read())
            .finish()
    }
}
