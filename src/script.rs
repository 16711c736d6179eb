//! Evaluation of untrusted, user-authored code units.
//!
//! The engine contract is deliberately narrow: evaluate one opaque code unit
//! synchronously and surface any exception as a value. The engine provides no
//! execution timeout and no resource quota; a non-terminating script blocks
//! its realm. Fault isolation across scripts lives in the callers, which
//! evaluate entries independently and never let one failure stop the rest.

#[cfg(feature = "quickjs")]
use crate::error::BridgeError;
use crate::error::BridgeResult;

/// An isolated evaluation scope with synchronous-exception containment.
pub trait ScriptEngine: Send + Sync {
    /// Evaluate `code`. `name` identifies the unit in failure reports.
    fn eval(&self, name: &str, code: &str) -> BridgeResult<()>;
}

/// QuickJS-backed engine. Each evaluation gets a fresh runtime and context,
/// so scripts cannot observe one another's globals.
#[cfg(feature = "quickjs")]
#[derive(Debug, Default)]
pub struct QuickJsEngine;

#[cfg(feature = "quickjs")]
impl QuickJsEngine {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "quickjs")]
impl ScriptEngine for QuickJsEngine {
    fn eval(&self, name: &str, code: &str) -> BridgeResult<()> {
        use rquickjs::{CatchResultExt, Context, Runtime};

        let failed = |message: String| BridgeError::ScriptFailed {
            name: name.to_string(),
            message,
        };

        let runtime = Runtime::new().map_err(|e| failed(e.to_string()))?;
        let context = Context::full(&runtime).map_err(|e| failed(e.to_string()))?;
        context.with(|ctx| {
            ctx.eval::<rquickjs::Value, _>(code)
                .catch(&ctx)
                .map(|_| ())
                .map_err(|caught| failed(caught.to_string()))
        })
    }
}
