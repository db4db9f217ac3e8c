// Shared fixtures: an in-memory contact list with scripted latency and
// failures, recording every call it receives.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use spark_query::{
    CompositeQuery, DataSource, FetchError, ListPipeline, PipelineConfig, SortDirection,
    Subscription, TotalQuery, ViewStream,
};
use tokio::task::LocalSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub name: String,
    pub category: String,
}

pub fn contact(name: &str, category: &str) -> Contact {
    Contact {
        name: name.to_string(),
        category: category.to_string(),
    }
}

pub fn three_contacts() -> Vec<Contact> {
    vec![
        contact("ann", "phone"),
        contact("bob", "email"),
        contact("cyd", "email"),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Page(u32, CompositeQuery),
    Total(u32, TotalQuery),
}

type Latency = Rc<dyn Fn(&CompositeQuery) -> Duration>;

#[derive(Clone)]
pub struct ScriptedSource {
    contacts: Rc<Vec<Contact>>,
    log: Rc<RefCell<Vec<Call>>>,
    page_latency: Latency,
    total_latency: Duration,
    fail_pages: Rc<Cell<usize>>,
    fail_totals: Rc<Cell<usize>>,
}

impl ScriptedSource {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: Rc::new(contacts),
            log: Rc::new(RefCell::new(Vec::new())),
            page_latency: Rc::new(|_| Duration::from_millis(20)),
            total_latency: Duration::from_millis(20),
            fail_pages: Rc::new(Cell::new(0)),
            fail_totals: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_page_latency(mut self, f: impl Fn(&CompositeQuery) -> Duration + 'static) -> Self {
        self.page_latency = Rc::new(f);
        self
    }

    pub fn with_total_latency(mut self, latency: Duration) -> Self {
        self.total_latency = latency;
        self
    }

    /// The next `n` page fetches fail with a 500.
    pub fn fail_next_pages(&self, n: usize) {
        self.fail_pages.set(n);
    }

    pub fn fail_next_totals(&self, n: usize) {
        self.fail_totals.set(n);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn page_calls(&self) -> Vec<(u32, CompositeQuery)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Page(scope, query) => Some((*scope, query.clone())),
                Call::Total(..) => None,
            })
            .collect()
    }

    pub fn total_calls(&self) -> Vec<(u32, TotalQuery)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Total(scope, query) => Some((*scope, query.clone())),
                Call::Page(..) => None,
            })
            .collect()
    }

    fn matching(&self, search: &str, category: &str) -> Vec<Contact> {
        let search = search.trim().to_lowercase();
        self.contacts
            .iter()
            .filter(|c| search.is_empty() || c.name.contains(&search))
            .filter(|c| category.is_empty() || c.category == category)
            .cloned()
            .collect()
    }

    fn take_failure(counter: &Cell<usize>) -> bool {
        let left = counter.get();
        if left == 0 {
            return false;
        }
        counter.set(left - 1);
        true
    }
}

#[async_trait(?Send)]
impl DataSource for ScriptedSource {
    type Scope = u32;
    type Item = Contact;

    async fn fetch_page(
        &self,
        scope: &u32,
        query: &CompositeQuery,
    ) -> Result<Vec<Contact>, FetchError> {
        self.log.borrow_mut().push(Call::Page(*scope, query.clone()));
        let fail = Self::take_failure(&self.fail_pages);
        tokio::time::sleep((self.page_latency)(query)).await;

        if fail {
            return Err(FetchError::rejected(500, "internal error"));
        }

        let mut rows = self.matching(&query.search_text, &query.category_filter);
        match query.sort_key.as_str() {
            "category" => rows.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name))),
            _ => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        if query.direction == SortDirection::Descending {
            rows.reverse();
        }

        Ok(rows
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .collect())
    }

    async fn fetch_total(&self, scope: &u32, query: &TotalQuery) -> Result<u64, FetchError> {
        self.log.borrow_mut().push(Call::Total(*scope, query.clone()));
        let fail = Self::take_failure(&self.fail_totals);
        tokio::time::sleep(self.total_latency).await;

        if fail {
            return Err(FetchError::Timeout);
        }
        Ok(self.matching(&query.search_text, &query.category_filter).len() as u64)
    }
}

/// Build a pipeline over `source` for scope 1 with default config.
pub fn pipeline(source: &ScriptedSource, local: &Rc<LocalSet>) -> ListPipeline<ScriptedSource> {
    ListPipeline::new(source.clone(), 1, PipelineConfig::default(), local)
        .expect("pipeline builds with a runtime")
}

/// Record every value a view produces, replay included.
pub fn record<T: Clone + 'static>(view: &ViewStream<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sub = view.subscribe({
        let seen = seen.clone();
        move |value: &T| seen.borrow_mut().push(value.clone())
    });
    (seen, sub)
}

pub fn names(rows: &[Contact]) -> Vec<&str> {
    rows.iter().map(|c| c.name.as_str()).collect()
}
