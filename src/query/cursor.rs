use std::sync::Arc;

use crate::collection::Collection;
use crate::value::Document;

use super::eval::{compare_docs, project};
use super::types::{Filter, FindOptions};

/// A restartable query handle. Each [`Cursor::iter`] re-evaluates the filter against the
/// collection's current state.
#[derive(Debug, Clone)]
pub struct Cursor {
    collection: Arc<Collection>,
    filter: Arc<Filter>,
    options: Arc<FindOptions>,
}

impl Cursor {
    pub(crate) fn new(collection: Arc<Collection>, filter: Filter, options: FindOptions) -> Self {
        Self { collection, filter: Arc::new(filter), options: Arc::new(options) }
    }

    #[must_use]
    pub fn iter(&self) -> CursorIter {
        CursorIter {
            collection: Arc::clone(&self.collection),
            filter: Arc::clone(&self.filter),
            options: Arc::clone(&self.options),
            mode: Mode::Scan { after: None, skipped: 0 },
            produced: 0,
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Document> {
        self.iter().collect()
    }

    #[must_use]
    pub fn first(&self) -> Option<Document> {
        self.iter().next()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}

impl IntoIterator for &Cursor {
    type Item = Document;
    type IntoIter = CursorIter;

    fn into_iter(self) -> CursorIter {
        self.iter()
    }
}

#[derive(Debug)]
enum Mode {
    /// Walks the collection in insertion order, one read lock per produced document.
    Scan { after: Option<u64>, skipped: usize },
    /// Sorted results, materialized under a single read lock on first use.
    Sorted(Option<std::vec::IntoIter<Document>>),
}

/// One pass over a [`Cursor`]'s results.
#[derive(Debug)]
pub struct CursorIter {
    collection: Arc<Collection>,
    filter: Arc<Filter>,
    options: Arc<FindOptions>,
    mode: Mode,
    produced: usize,
}

impl CursorIter {
    fn next_scanned(&mut self) -> Option<Document> {
        let skip = self.options.skip.unwrap_or(0);
        loop {
            let Mode::Scan { after, skipped } = &mut self.mode else { return None };
            let (seq, doc) = {
                let st = self.collection.state.read();
                let (seq, doc) = st.next_match(*after, &self.filter)?;
                (seq, doc.clone())
            };
            *after = Some(seq);
            if *skipped < skip {
                *skipped += 1;
                continue;
            }
            return Some(doc);
        }
    }

    fn materialize(&self) -> std::vec::IntoIter<Document> {
        let mut docs: Vec<Document> = {
            let st = self.collection.state.read();
            st.matching_seqs(&self.filter, None)
                .into_iter()
                .filter_map(|seq| st.docs.get(&seq).cloned())
                .collect()
        };
        if let Some(sort) = &self.options.sort {
            // stable, so ties keep insertion order
            docs.sort_by(|a, b| compare_docs(a, b, sort));
        }
        let skip = self.options.skip.unwrap_or(0).min(docs.len());
        docs.drain(..skip);
        docs.into_iter()
    }
}

impl Iterator for CursorIter {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        if self.options.limit.is_some_and(|n| self.produced >= n) {
            return None;
        }
        if self.options.sort.is_some() && matches!(self.mode, Mode::Scan { .. }) {
            self.mode = Mode::Sorted(None);
        }
        let doc = if matches!(self.mode, Mode::Scan { .. }) {
            self.next_scanned()?
        } else {
            if matches!(self.mode, Mode::Sorted(None)) {
                self.mode = Mode::Sorted(Some(self.materialize()));
            }
            let Mode::Sorted(Some(it)) = &mut self.mode else { return None };
            it.next()?
        };
        self.produced += 1;
        Some(match &self.options.projection {
            Some(p) => project(&doc, p),
            None => doc,
        })
    }
}
