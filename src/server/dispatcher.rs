//! The application-facing seam of the bridge.
//!
//! A [`Dispatcher`] receives the adapted request and mutates the adapted
//! response in place. It runs synchronously on whatever thread the
//! configured executor provides, so it may block.

use crate::server::request::RequestAdapter;
use crate::server::response::ResponseAdapter;
use crate::BoxError;

/// Engine invoked once per inbound request.
///
/// Returning `Err` (or panicking) turns the request into a synthesized
/// `500` whose reason phrase is the error description.
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(
        &self,
        request: &mut RequestAdapter,
        response: &mut ResponseAdapter,
    ) -> Result<(), BoxError>;
}

impl<F> Dispatcher for F
where
    F: Fn(&mut RequestAdapter, &mut ResponseAdapter) -> Result<(), BoxError>
        + Send
        + Sync
        + 'static,
{
    fn dispatch(
        &self,
        request: &mut RequestAdapter,
        response: &mut ResponseAdapter,
    ) -> Result<(), BoxError> {
        self(request, response)
    }
}
