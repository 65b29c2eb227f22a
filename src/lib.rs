pub mod command;
pub mod common;
pub mod errors;
pub mod host;
pub mod marks;
pub mod ops;
pub mod resolve;
pub mod session;
pub mod ui;
