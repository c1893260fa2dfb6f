//! Pagination
//!
//! InfluxDB only pages with `LIMIT`/`OFFSET`, and `COUNT(*)` counts non-null
//! values per column rather than rows. The [`Paginator`] owns the page
//! window for one request and estimates the result size from the count
//! query.
//!
//! # States
//!
//! ```text
//! Idle ── iterate_page() ──▶ SinglePage ──▶ Idle
//! Idle ── iterate_all()  ──▶ AllPages (page, page, ...) ──▶ Idle
//! ```
//!
//! `skip_token` is always an offset from the start of the filtered result
//! set. A skip-token at or past the end yields an empty terminal page.

use crate::error::Result;
use crate::query::{build, count_query, QuerySpec};
use crate::records::{Record, RecordStream, ResultMapper};
use crate::store::{ResultSet, StoreClient, TIME_COLUMN};

/// Paging activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagingMode {
    #[default]
    Idle,
    SinglePage,
    AllPages,
}

/// Page window of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    /// Ceiling (and default) for `top`
    pub top_max: usize,
    pub top: usize,
    pub skip: usize,
    pub skip_token: usize,
    /// Offset of the page after the last one returned
    pub next_skip_token: Option<usize>,
    pub mode: PagingMode,
}

impl PageState {
    pub fn new(top_max: usize) -> Self {
        Self {
            top_max,
            top: top_max,
            skip: 0,
            skip_token: 0,
            next_skip_token: None,
            mode: PagingMode::Idle,
        }
    }

    /// Set the page window
    ///
    /// Absent `top` means the ceiling and larger values are clamped to it;
    /// `Some(0)` is kept and yields an empty page. `skip` is the query
    /// offset and falls back to the skip-token when unset.
    pub fn set_page(&mut self, top: Option<usize>, skip: Option<usize>, skip_token: Option<usize>) {
        self.top = top.map_or(self.top_max, |t| t.min(self.top_max));
        self.skip_token = skip_token.unwrap_or(0);
        self.skip = skip.unwrap_or(self.skip_token);
        self.next_skip_token = None;
    }

    /// True while a page query is being built
    pub fn is_active(&self) -> bool {
        self.mode != PagingMode::Idle
    }

    fn clear(&mut self) {
        self.skip = 0;
        self.skip_token = 0;
        self.next_skip_token = None;
        self.mode = PagingMode::Idle;
    }

    fn advance(&mut self) {
        self.skip_token += self.top;
        self.skip = self.skip_token;
    }
}

/// Pages through one query
pub struct Paginator<'a> {
    store: &'a dyn StoreClient,
    spec: &'a QuerySpec,
    state: PageState,
}

impl<'a> Paginator<'a> {
    pub fn new(store: &'a dyn StoreClient, spec: &'a QuerySpec, top_max: usize) -> Self {
        Self {
            store,
            spec,
            state: PageState::new(top_max),
        }
    }

    /// See [`PageState::set_page`]
    pub fn set_page(&mut self, top: Option<usize>, skip: Option<usize>, skip_token: Option<usize>) {
        self.state.set_page(top, skip, skip_token);
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Skip-token to hand back to the caller, if another page may follow
    pub fn next_skip_token(&self) -> Option<usize> {
        self.state.next_skip_token
    }

    /// Estimated number of results
    ///
    /// Ungrouped: the largest per-column non-null count. Grouped: the number
    /// of returned buckets.
    pub fn count(&self) -> Result<usize> {
        let query = count_query(self.spec)?;
        tracing::debug!(collection = %self.spec.collection.mangled_id, %query, "counting");
        let result = self.store.execute(&query, &self.spec.collection.database)?;

        if self.spec.is_grouped() {
            Ok(result.row_count())
        } else {
            Ok(max_column_count(&result))
        }
    }

    /// Fetch the current page
    ///
    /// Sets the next skip-token when a page is produced. Past the end, the
    /// paging fields are cleared and the stream is empty.
    pub fn iterate_page(&mut self) -> Result<RecordStream> {
        match self.fetch_page() {
            Ok(Some(stream)) => Ok(stream),
            Ok(None) => Ok(RecordStream::empty(ResultMapper::new(self.spec))),
            Err(e) => {
                self.state.mode = PagingMode::Idle;
                Err(e)
            }
        }
    }

    /// Lazily walk every page from the current skip-token onwards
    pub fn iterate_all(&mut self) -> AllPages<'_, 'a> {
        AllPages {
            paginator: self,
            current: None,
            started: false,
            done: false,
        }
    }

    fn fetch_page(&mut self) -> Result<Option<RecordStream>> {
        if self.state.top == 0 {
            self.state.next_skip_token = None;
            return Ok(None);
        }

        let count = self.count()?;
        if self.state.skip_token >= count {
            tracing::debug!(
                skip_token = self.state.skip_token,
                count,
                "skip-token past end of results"
            );
            self.state.clear();
            return Ok(None);
        }

        self.state.next_skip_token = Some(self.state.skip_token + count.min(self.state.top));

        let previous = self.state.mode;
        if previous == PagingMode::Idle {
            self.state.mode = PagingMode::SinglePage;
        }
        let query = build(self.spec, &self.state);
        if previous == PagingMode::Idle {
            self.state.mode = PagingMode::Idle;
        }
        let query = query?;

        let result = self.store.execute(&query, &self.spec.collection.database)?;
        Ok(Some(ResultMapper::new(self.spec).map(result)))
    }
}

/// Lazy iterator over every record of every page
pub struct AllPages<'p, 'a> {
    paginator: &'p mut Paginator<'a>,
    current: Option<RecordStream>,
    started: bool,
    done: bool,
}

impl Iterator for AllPages<'_, '_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(stream) = self.current.as_mut() {
                match stream.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(e)) => {
                        self.current = None;
                        self.done = true;
                        self.paginator.state.mode = PagingMode::Idle;
                        return Some(Err(e.into()));
                    }
                    None => self.current = None,
                }
            }
            if self.done {
                return None;
            }

            if self.started {
                self.paginator.state.advance();
            } else {
                self.started = true;
                self.paginator.state.mode = PagingMode::AllPages;
            }

            match self.paginator.fetch_page() {
                Ok(Some(stream)) => self.current = Some(stream),
                Ok(None) => {
                    self.done = true;
                    self.paginator.state.mode = PagingMode::Idle;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    self.paginator.state.mode = PagingMode::Idle;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Largest numeric non-time value of the first row
fn max_column_count(result: &ResultSet) -> usize {
    let Some(series) = result.series.first() else {
        return 0;
    };
    let Some(row) = series.values.first() else {
        return 0;
    };

    series
        .columns
        .iter()
        .zip(row)
        .filter(|(column, _)| *column != TIME_COLUMN)
        .filter_map(|(_, value)| value.as_u64().or_else(|| value.as_f64().map(|v| v.max(0.0) as u64)))
        .max()
        .unwrap_or(0) as usize
}
