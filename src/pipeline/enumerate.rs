//! Container enumeration with continuation-marker pagination.

use crate::{
    models::object::ObjectReference,
    services::blob_service::{BlobService, StoreResult},
};
use async_stream::try_stream;
use futures::Stream;
use tracing::debug;

/// Listing page size used unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// List every blob in `container`, page by page, in service order.
///
/// Pages are fetched lazily as the stream is polled. The stream ends after
/// the page without a continuation marker, or with the first page error.
///
/// ```ignore
/// let listing = list_blobs(&service, "photos", 5000);
/// pin_mut!(listing);
/// while let Some(blob) = listing.next().await {
///     println!("{}", blob?.name);
/// }
/// ```
pub fn list_blobs<'a>(
    service: &'a dyn BlobService,
    container: &'a str,
    page_size: usize,
) -> impl Stream<Item = StoreResult<ObjectReference>> + 'a {
    try_stream! {
        let mut marker: Option<String> = None;
        let mut page = 0usize;

        loop {
            let segment = service
                .list_blobs_segment(container, marker.as_deref(), page_size)
                .await?;
            page += 1;
            debug!(
                account = service.account_name(),
                container,
                page,
                blobs = segment.names.len(),
                "listed page"
            );

            for name in segment.names {
                yield ObjectReference::new(container, name);
            }

            match segment.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
    }
}
