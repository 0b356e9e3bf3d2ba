pub mod assistant;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod timer;
