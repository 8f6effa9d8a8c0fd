//! Blocking entry points for async use cases.

use crate::env::{InfraError, InfraResult};
use dernek_shared::RequestContext;
use std::future::Future;

/// Run `op` to completion on a single-threaded runtime.
pub fn run_async_with_ctx<F, T>(
    ctx: RequestContext,
    op: impl FnOnce(RequestContext) -> F,
) -> InfraResult<T>
where
    F: Future<Output = InfraResult<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InfraError::from)?;
    runtime.block_on(async { op(ctx).await })
}

/// Cancel `ctx` when the process receives Ctrl-C. Abort the handle once the
/// guarded work finishes.
pub fn spawn_ctrl_c_watcher(ctx: &RequestContext) -> tokio::task::JoinHandle<()> {
    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_future_and_returns_its_result() -> InfraResult<()> {
        let value = run_async_with_ctx(RequestContext::new_request(), |ctx| async move {
            ctx.ensure_not_cancelled("runtime.test")?;
            Ok(7)
        })?;
        assert_eq!(value, 7);
        Ok(())
    }

    #[test]
    fn cancelled_context_surfaces_as_error() {
        let ctx = RequestContext::new_request();
        ctx.cancel();
        let result = run_async_with_ctx(ctx, |ctx| async move {
            ctx.ensure_not_cancelled("runtime.test")?;
            Ok(())
        });
        assert!(result.is_err_and(|error| error.is_cancelled()));
    }
}
