//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for `Arc<Mutex<T>>`, disposers, etc.

pub mod aliases;

pub use aliases::*;
