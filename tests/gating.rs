//! Which cell writes turn into fetches, and when.

mod common;

use std::rc::Rc;
use std::time::Duration;

use common::{names, pipeline, three_contacts, ScriptedSource};
use spark_query::{ListPipeline, PipelineConfig, SortDirection};
use tokio::task::LocalSet;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_typing_fetches_once_after_quiet_window() {
    let local = Rc::new(LocalSet::new());
    local
        .run_until(async {
            let source = ScriptedSource::new(three_contacts());
            let list = pipeline(&source, &local);

            list.set_search_text("a");
            sleep(Duration::from_millis(300)).await;
            list.set_search_text("an");
            sleep(Duration::from_millis(300)).await;
            list.set_search_text("ann");

            // Last keystroke at 600ms; quiet window ends at 1600ms
            sleep(Duration::from_millis(900)).await;
            assert_eq!(source.page_calls().len(), 1);
            assert_eq!(source.total_calls().len(), 1);

            sleep(Duration::from_millis(200)).await;
            let pages = source.page_calls();
            assert_eq!(pages.len(), 2);
            assert_eq!(pages[1].1.search_text, "ann");
            assert_eq!(source.total_calls().len(), 2);

            let page = list.rows().latest().and_then(Result::ok).unwrap_or_default();
            assert_eq!(names(&page), vec!["ann"]);
            assert_eq!(list.total().latest(), Some(Ok(1)));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_search_back_to_previous_text_is_suppressed() {
    let local = Rc::new(LocalSet::new());
    local
        .run_until(async {
            let source = ScriptedSource::new(three_contacts());
            let list = pipeline(&source, &local);

            list.set_search_text("b");
            sleep(Duration::from_millis(200)).await;
            list.set_search_text("");
            sleep(Duration::from_millis(1500)).await;

            // The gate fired, but the composite equals the cold-start one
            assert_eq!(source.page_calls().len(), 1);
            assert_eq!(list.queries().emissions(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_page_is_fetched_once() {
    let local = Rc::new(LocalSet::new());
    local
        .run_until(async {
            let source = ScriptedSource::new(three_contacts());
            let list = pipeline(&source, &local);
            sleep(Duration::from_millis(50)).await;

            list.set_page(2);
            sleep(Duration::from_millis(50)).await;
            list.set_page(2);
            sleep(Duration::from_millis(50)).await;

            assert_eq!(source.page_calls().len(), 2);
            assert_eq!(list.queries().emissions(), 2);

            list.set_page(0);
            sleep(Duration::from_millis(50)).await;
            assert_eq!(source.page_calls().len(), 3);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_category_flushes_pending_search_immediately() {
    let local = Rc::new(LocalSet::new());
    local
        .run_until(async {
            let source = ScriptedSource::new(three_contacts());
            let list = pipeline(&source, &local);

            list.set_search_text("x");
            list.set_category_filter("email");
            sleep(Duration::from_millis(50)).await;

            // The category write composes right away and picks up the
            // search text still inside its quiet window.
            let pages = source.page_calls();
            assert_eq!(pages.len(), 2);
            assert_eq!(pages[1].1.search_text, "x");
            assert_eq!(pages[1].1.category_filter, "email");

            // When the quiet window ends nothing new is composed
            sleep(Duration::from_millis(1100)).await;
            assert_eq!(source.page_calls().len(), 2);
            assert_eq!(source.total_calls().len(), 2);
            assert_eq!(list.rows().latest(), Some(Ok(vec![])));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_same_tick_writes_compose_once() {
    let local = Rc::new(LocalSet::new());
    local
        .run_until(async {
            let source = ScriptedSource::new(three_contacts());
            let list = pipeline(&source, &local);
            sleep(Duration::from_millis(50)).await;

            list.set_sort("category");
            list.set_direction(SortDirection::Ascending);
            list.set_page(1);
            list.set_page_size(2).expect("valid page size");
            sleep(Duration::from_millis(50)).await;

            let pages = source.page_calls();
            assert_eq!(pages.len(), 2);
            assert_eq!(pages[1].1, list.snapshot());

            let page = list.rows().latest().and_then(Result::ok).unwrap_or_default();
            assert_eq!(names(&page), vec!["ann"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_paging_and_sorting_never_refetch_total() {
    let local = Rc::new(LocalSet::new());
    local
        .run_until(async {
            let source = ScriptedSource::new(three_contacts());
            let list = pipeline(&source, &local);
            sleep(Duration::from_millis(50)).await;

            list.set_page(1);
            sleep(Duration::from_millis(50)).await;
            list.set_sort("category");
            sleep(Duration::from_millis(50)).await;
            list.set_direction(SortDirection::Ascending);
            sleep(Duration::from_millis(50)).await;
            list.set_pagination(0, 5).expect("valid page size");
            sleep(Duration::from_millis(50)).await;

            assert_eq!(source.page_calls().len(), 5);
            assert_eq!(source.total_calls().len(), 1);
            assert_eq!(list.total_queries().emissions(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_quiet_window_is_configurable() {
    let local = Rc::new(LocalSet::new());
    local
        .run_until(async {
            let source = ScriptedSource::new(three_contacts());
            let config = PipelineConfig::default().with_search_quiescence(Duration::from_millis(200));
            let list = ListPipeline::new(source.clone(), 1, config, &local).expect("valid config");

            list.set_search_text("bo");
            sleep(Duration::from_millis(150)).await;
            assert_eq!(source.page_calls().len(), 1);

            sleep(Duration::from_millis(100)).await;
            assert_eq!(source.page_calls().len(), 2);

            sleep(Duration::from_millis(50)).await;
            let page = list.rows().latest().and_then(Result::ok).unwrap_or_default();
            assert_eq!(names(&page), vec!["bob"]);
        })
        .await;
}
