//! Headless, controlled modal components: the state and accessibility
//! attributes live here, the markup comes from the caller.

pub mod components;
pub mod context;
pub mod dom;
pub mod vnode;

pub use components::*;
pub use context::*;
pub use vnode::*;
