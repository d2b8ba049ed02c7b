//! The dispatcher host: owns the supplier set and the shutdown sequence.

mod dispatcher;

pub use dispatcher::Dispatcher;
