use super::{ConnectionPool, InvocationContext, Transport};
use crate::error::Error;
use futures::future::BoxFuture;
use std::future::IntoFuture;
use std::time::Duration;

/// Pending acquisition of a context's connection.
///
/// `.await` it to get the (possibly already held) connection, or call
/// [`DbAcquire::scope`] to have it released when the closure returns.
#[must_use = "the connection is only acquired once this is awaited or scoped"]
pub struct DbAcquire<'c, T, P: ConnectionPool> {
    ctx: &'c mut InvocationContext<T, P>,
    timeout: Option<Duration>,
}

impl<'c, T, P> DbAcquire<'c, T, P>
where
    T: Transport + 'c,
    P: ConnectionPool + 'c,
{
    pub(super) fn new(ctx: &'c mut InvocationContext<T, P>, timeout: Option<Duration>) -> Self {
        Self { ctx, timeout }
    }

    /// Acquire, run `body` with the connection, then release it.
    ///
    /// The connection is released even when `body` fails.
    pub async fn scope<R, F>(self, body: F) -> Result<R, Error>
    where
        F: for<'b> FnOnce(&'b mut P::Connection) -> BoxFuture<'b, Result<R, Error>>,
    {
        let result = match self.ctx.acquire_held(self.timeout).await {
            Ok(conn) => body(conn).await,
            Err(e) => Err(e),
        };
        self.ctx.release().await;
        result
    }
}

impl<'c, T, P> IntoFuture for DbAcquire<'c, T, P>
where
    T: Transport + 'c,
    P: ConnectionPool + 'c,
{
    type Output = Result<&'c mut P::Connection, Error>;
    type IntoFuture = BoxFuture<'c, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { ctx, timeout } = self;
        Box::pin(ctx.acquire_held(timeout))
    }
}
