//! Terminal front end: picking a serial device and watching the lag
//! sequence live.

mod device_selector;
mod error;
mod live_scope;

pub use device_selector::device_selector;
pub use error::ScopeGuiError;
pub use live_scope::live_scope;
