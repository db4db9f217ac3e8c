// ============================================================================
// spark-query - Macros
// ============================================================================

/// Clone handles into a `move` closure.
///
/// Cells, views and composers are cheap `Rc` handles; wiring them into
/// callbacks otherwise means a block of `let x = x.clone();` lines.
///
/// # Usage
///
/// ```rust
/// use spark_query::{cloned, Composer, QueryCell};
/// use std::time::Duration;
///
/// let page = QueryCell::new(0usize);
/// let size = QueryCell::new(10usize);
///
/// let composer = Composer::new(
///     cloned!(page, size => move || (page.current(), size.current())),
///     Duration::ZERO,
/// );
/// assert_eq!(composer.last(), Some((0, 10)));
///
/// // The originals are still usable here
/// page.set(1);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}
