use crate::client::RowStream;
use crate::error::{OrmError, OrmResult};
use crate::row::FromRow;
use futures_core::Stream;
use futures_util::StreamExt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Single-pass iterator over the rows of an executed query.
///
/// Rows are pulled from the driver one at a time and materialized as `T` on the
/// way out. The cursor cannot be rewound: once a row has been consumed, a new
/// traversal fails with [`OrmError::Usage`]. Re-run the query to iterate again.
#[must_use = "a ResultIter yields nothing unless it is polled"]
pub struct ResultIter<T> {
    cursor: RowStream,
    used: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for ResultIter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultIter").field("used", &self.used).finish()
    }
}

impl<T: FromRow> ResultIter<T> {
    pub(crate) fn new(cursor: RowStream) -> Self {
        Self {
            cursor,
            used: false,
            _marker: PhantomData,
        }
    }

    /// Whether any row has been pulled yet.
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Start a traversal from the first row.
    ///
    /// Succeeds only while nothing has been consumed.
    pub fn rewind(&mut self) -> OrmResult<()> {
        if self.used {
            return Err(OrmError::usage("Cannot traverse an already closed query"));
        }
        Ok(())
    }

    /// Advance and materialize the next row.
    pub async fn try_next(&mut self) -> OrmResult<Option<T>> {
        self.used = true;
        match self.cursor.next().await {
            Some(Ok(row)) => T::from_row(row).map(Some),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Walk every remaining row into a `Vec`. Fails if a traversal already started.
    pub async fn collect_all(mut self) -> OrmResult<Vec<T>> {
        self.rewind()?;
        let mut out = Vec::new();
        while let Some(item) = self.try_next().await? {
            out.push(item);
        }
        Ok(out)
    }
}

impl<T: FromRow> Stream for ResultIter<T> {
    type Item = OrmResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.used = true;
        match Pin::new(&mut this.cursor).poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(T::from_row(row))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
