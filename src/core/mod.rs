//! Runtime core: workers, configuration and the driver.
//!
//! The public API from this module is [`Driver`] (with [`DriverBuilder`] and
//! [`Fleet`]), [`Worker`] and [`Config`].
//!
//! Internal modules:
//! - [`worker`]: drift-measuring task built on `SuspendableTask` + `WakeScheduler`;
//! - [`driver`]: starts the fleet, forwards events to subscribers, shuts down;
//! - [`builder`]: assembles bus, subscribers and drift tracker;
//! - [`config`]: runtime settings and command-line parsing;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod config;
mod driver;
mod shutdown;
mod worker;

pub use builder::DriverBuilder;
pub use config::{Config, ParsedArgs, USAGE};
pub use driver::{Driver, Fleet};
pub use worker::Worker;
