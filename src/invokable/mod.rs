//! Invokables: named handlers reachable by command dispatch
//!
//! - `InvokableRegistry` - Name -> handler table, filled at load time
//! - `HandlerDescriptor` - Callable plus declared parameters and sync/async flag
//! - `Param` / `ArgEnv` / `BoundArgs` - Declared-argument binding

pub mod binding;
pub mod registry;

pub use binding::{Arg, ArgEnv, BoundArgs, Param};
pub use registry::{AsyncHandlerFn, HandlerDescriptor, HandlerFn, InvokableRegistry, SyncHandlerFn};
