//! Shared types and pagination for the YouTube API client.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of a list response: the items plus the cursor for the page after it.
#[derive(Debug)]
pub struct Page<T> {
    pub items: VecDeque<T>,
    pub next_page_token: Option<String>,
}

type PendingPage<'a, F, T, E> = Pin<Box<dyn Future<Output = Result<(F, Page<T>), E>> + 'a + Send>>;

/// A paginated stream over a YouTube API list endpoint.
///
/// Yields items one by one in the order the API returned them, requesting the next page with the
/// provider's continuation cursor once the current one is drained. Forward pagination only. After
/// the first error the stream ends.
pub struct PagedStream<'a, T, E, F> {
    /// Items of the most recent page not yet yielded
    current_items: VecDeque<T>,
    /// The in-flight page request, which hands the fetcher back when it completes
    pending_request: Option<PendingPage<'a, F, T, E>>,
    is_done: bool,
}

impl<'a, T, E, F> PagedStream<'a, T, E, F> {
    /// Creates the stream; `fetcher` is called with `None` for the first page and with the
    /// previous page's `next_page_token` afterwards.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<Page<T>, E>> + Send + 'a,
    {
        let first_page = async move {
            let page = fetcher(None).await?;
            Ok((fetcher, page))
        };
        Self {
            pending_request: Some(Box::pin(first_page)),
            current_items: VecDeque::new(),
            is_done: false,
        }
    }
}

impl<'a, T: Unpin, E, F, Fut> Stream for PagedStream<'a, T, E, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = Result<Page<T>, E>> + Send + 'a,
{
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if self.is_done {
                return Poll::Ready(None);
            }

            let Some(pending) = self.pending_request.as_mut() else {
                self.is_done = true;
                return Poll::Ready(None);
            };

            match pending.as_mut().poll(cx) {
                Poll::Ready(Ok((fetcher, page))) => {
                    self.current_items.extend(page.items);

                    if let Some(next_token) = page.next_page_token {
                        // set up the next request, but only poll it once this page is drained
                        self.pending_request = Some(Box::pin(async move {
                            let page = fetcher(Some(next_token)).await?;
                            Ok((fetcher, page))
                        }));
                    } else {
                        self.is_done = true;
                        self.pending_request = None;
                    }
                }
                Poll::Ready(Err(e)) => {
                    self.pending_request = None;
                    self.is_done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
}
