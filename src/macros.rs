// ============================================================================
// spark-stores - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// This reduces the boilerplate of manually cloning `Rc` or `Store` handles
/// before moving them into a closure.
///
/// # Usage
///
/// ```rust
/// use spark_stores::{cloned, writable};
///
/// let a = writable(1);
/// let b = writable(0);
///
/// let _sub = a.subscribe(cloned!(b => move |v: &i32| {
///     b.set(v * 10);
/// }));
/// assert_eq!(b.get(), 10);
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

/// Create a derived store over named sources.
///
/// Inside the body each name is rebound to a reference to that source's
/// current value.
///
/// # Usage
///
/// ```rust
/// use spark_stores::{derived, writable};
///
/// let width = writable(3);
/// let height = writable(4);
///
/// let area = derived!(width, height => width * height);
/// let doubled = derived!(area => area * 2);
///
/// let _sub = doubled.subscribe(|_| {});
/// height.set(5);
/// assert_eq!(doubled.get(), 30);
/// ```
#[macro_export]
macro_rules! derived {
    ($a:ident => $body:expr) => {
        $crate::derived($a.clone(), move |$a| $body)
    };
    ($a:ident, $b:ident => $body:expr) => {
        $crate::derived(($a.clone(), $b.clone()), move |($a, $b)| $body)
    };
    ($a:ident, $b:ident, $c:ident => $body:expr) => {
        $crate::derived(
            ($a.clone(), $b.clone(), $c.clone()),
            move |($a, $b, $c)| $body,
        )
    };
}
