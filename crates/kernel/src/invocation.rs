//! Interceptor pipeline for repository-backed operations.
//!
//! An operation call is described by an [`InvocationContext`]: the operation
//! name plus its positional JSON arguments. An [`InterceptorChain`] runs the
//! context through its interceptors in registration order. Each interceptor
//! may inspect or rewrite the arguments before it hands over to [`Next`], or
//! reject the call by returning an error without calling it. The last stage is
//! an [`InvocationTarget`], which performs the actual operation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result produced by an invocation target and passed back through the chain
pub type InvocationResult = Result<Value, InvocationError>;

/// Errors surfaced by interceptors and invocation targets
#[derive(Error, Debug)]
pub enum InvocationError {
    /// The arguments were rejected before or during the operation
    #[error("{message}")]
    Validation { message: String, status_code: u16 },

    #[error("{message}")]
    NotFound { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl InvocationError {
    /// Client error with status 400
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            status_code: 400,
        }
    }

    /// Well-formed input that the operation cannot process (status 422)
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            status_code: 422,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

/// A single operation call as seen by interceptors
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    method_name: String,
    args: Vec<Value>,
}

impl InvocationContext {
    pub fn new(method_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            args,
        }
    }

    /// Name of the operation being invoked, e.g. `create` or `updateById`
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut Vec<Value> {
        &mut self.args
    }
}

/// One stage of the pipeline
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Run this stage. Call `next.run(ctx)` to continue the chain.
    async fn intercept(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvocationResult;
}

/// The operation at the end of the pipeline
#[async_trait]
pub trait InvocationTarget: Send + Sync {
    async fn invoke(&self, ctx: &mut InvocationContext) -> InvocationResult;
}

/// Continuation handed to an interceptor: the remaining stages plus the target
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    target: &'a dyn InvocationTarget,
}

impl<'a> Next<'a> {
    /// Run the rest of the pipeline with `ctx` and return its result unchanged
    pub async fn run(self, ctx: &mut InvocationContext) -> InvocationResult {
        match self.interceptors.split_first() {
            Some((current, rest)) => {
                tracing::trace!(
                    interceptor = current.name(),
                    method = ctx.method_name(),
                    "entering interceptor"
                );
                let next = Next {
                    interceptors: rest,
                    target: self.target,
                };
                current.intercept(ctx, next).await
            }
            None => self.target.invoke(ctx).await,
        }
    }
}

/// Ordered interceptors composed once at startup
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; it runs after every interceptor added before it
    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Run `ctx` through every interceptor and then `target`
    pub async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        target: &dyn InvocationTarget,
    ) -> InvocationResult {
        Next {
            interceptors: &self.interceptors,
            target,
        }
        .run(ctx)
        .await
    }
}
