//! Kernel of the bookstore service: settings, the module lifecycle, and the
//! interceptor pipeline that sits in front of repository operations.

pub mod invocation;
pub mod module;
pub mod registry;
pub mod settings;

pub use invocation::{
    InterceptorChain, Interceptor, InvocationContext, InvocationError, InvocationResult,
    InvocationTarget, Next,
};
pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
