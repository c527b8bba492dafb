//! Page-by-page retrieval of GET collections.

use crate::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::types::{Method, Params, Payload, Response};
use crate::Error;

/// Walks `page=1, 2, ...` until the service returns an empty page.
pub(crate) struct Paginator<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> Paginator<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fetches every page and returns their records in page order as
    /// [`Response::Records`].
    ///
    /// The whole collection is buffered before returning. A failure on any
    /// page discards what was gathered so far: callers get the full
    /// collection or an error, never a truncated one.
    ///
    /// A first page that is not structured is handed back untouched as
    /// [`Response::Payload`]. An unstructured page after that fails the call
    /// with [`Error::UnstructuredPage`].
    ///
    /// Only an empty page ends the walk. An endpoint that ignores `page` and
    /// keeps answering with the same non-empty body is fetched forever, so
    /// single-resource reads should pass an explicit page.
    pub(crate) async fn fetch_all(
        &self,
        endpoint: &Endpoint,
        params: Option<&Params>,
    ) -> Result<Response, Error> {
        let resource = endpoint.resource();
        let mut records = Vec::new();
        let mut page: u32 = 1;
        loop {
            let payload = self
                .dispatcher
                .dispatch(Method::Get, endpoint.url(params, Some(page)), None, None)
                .await?;
            if let Payload::Raw(body) = payload {
                if page == 1 {
                    tracing::debug!("{} page 1 is not structured, returning it as is", resource);
                    return Ok(Response::Payload(Payload::Raw(body)));
                }
                tracing::error!(
                    "{} page {} is not structured after {} records",
                    resource,
                    page,
                    records.len()
                );
                return Err(Error::UnstructuredPage {
                    page,
                    fetched: records.len(),
                    body,
                });
            }

            let page_records = payload.into_records(resource);
            if page_records.is_empty() {
                tracing::debug!(
                    "{} page {} is empty; fetched {} records",
                    resource,
                    page,
                    records.len()
                );
                return Ok(Response::Records(records));
            }
            tracing::debug!("{} page {}: {} records", resource, page, page_records.len());
            records.extend(page_records);
            page += 1;
        }
    }
}
