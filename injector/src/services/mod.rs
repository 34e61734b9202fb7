//! Service implementations

pub mod process_injector;


pub use process_injector::ProcessFaultInjector;
