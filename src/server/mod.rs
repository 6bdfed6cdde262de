//! Accept loop and shutdown control

pub mod listener;

pub use listener::{AdmissionPolicy, Listener, ShutdownHandle, run};
