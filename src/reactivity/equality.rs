// ============================================================================
// spark-stores - Equality Functions
// Change-detection predicates supplied to stores at construction
// ============================================================================

use std::rc::Rc;

use crate::core::types::EqualsFn;

// =============================================================================
// STRICT EQUALITY (Default)
// =============================================================================

/// Default strict equality using PartialEq.
/// This is the default for `writable()` and `Store::new()`.
///
/// # Example
/// ```
/// use spark_stores::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&42, &43));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// SAFE EQUALITY (NaN equals NaN)
// =============================================================================

/// Safe not-equal check for f64.
/// NaN is considered equal to NaN, so re-setting NaN does not notify.
///
/// # Example
/// ```
/// use spark_stores::reactivity::equality::safe_not_equal_f64;
///
/// assert!(safe_not_equal_f64(&1.0, &2.0));
/// assert!(!safe_not_equal_f64(&1.0, &1.0));
/// assert!(!safe_not_equal_f64(&f64::NAN, &f64::NAN));
/// assert!(safe_not_equal_f64(&f64::NAN, &1.0));
/// ```
pub fn safe_not_equal_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return !b.is_nan();
    }
    a != b
}

/// Safe equality for f64 values (NaN == NaN).
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    !safe_not_equal_f64(a, b)
}

/// Safe not-equal check for f32.
pub fn safe_not_equal_f32(a: &f32, b: &f32) -> bool {
    if a.is_nan() {
        return !b.is_nan();
    }
    a != b
}

/// Safe equality for f32 values (NaN == NaN).
pub fn safe_equals_f32(a: &f32, b: &f32) -> bool {
    !safe_not_equal_f32(a, b)
}

/// Safe equality for optional f64 values.
///
/// # Example
/// ```
/// use spark_stores::reactivity::equality::safe_equals_option_f64;
///
/// assert!(safe_equals_option_f64(&Some(f64::NAN), &Some(f64::NAN)));
/// assert!(!safe_equals_option_f64(&Some(1.0), &None));
/// ```
pub fn safe_equals_option_f64(a: &Option<f64>, b: &Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => safe_equals_f64(a, b),
        _ => false,
    }
}

// =============================================================================
// SHALLOW AND IDENTITY EQUALITY
// =============================================================================

/// Shallow equality for Vec - compares elements one level deep.
pub fn shallow_equals_vec<T: PartialEq>(a: &Vec<T>, b: &Vec<T>) -> bool {
    shallow_equals_slice(a, b)
}

/// Shallow equality for slices.
pub fn shallow_equals_slice<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

/// Identity equality for shared values: equal only if both point to the
/// same allocation. Cheap change detection for large immutable payloads.
///
/// # Example
/// ```
/// use spark_stores::reactivity::equality::rc_ptr_equals;
/// use std::rc::Rc;
///
/// let a = Rc::new(vec![1, 2, 3]);
/// assert!(rc_ptr_equals(&a, &a.clone()));
/// assert!(!rc_ptr_equals(&a, &Rc::new(vec![1, 2, 3])));
/// ```
pub fn rc_ptr_equals<T>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

// =============================================================================
// FACTORY FUNCTIONS
// =============================================================================

/// Never equal - every `set` notifies, even with an identical value.
///
/// This is the "objects are always changed" policy: use it for values that
/// are mutated in place or where every write must reach subscribers.
///
/// # Example
/// ```
/// use spark_stores::reactivity::equality::never_equals;
///
/// assert!(!never_equals(&42, &42));
/// ```
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// Always equal - `set` never notifies.
pub fn always_equals<T>(_a: &T, _b: &T) -> bool {
    true
}

// =============================================================================
// EQUALITY FUNCTION CONSTRUCTORS (for EqualsFn<T>)
// =============================================================================

/// Get the default equality function for a type.
pub fn default_equals_fn<T: PartialEq + 'static>() -> EqualsFn<T> {
    equals
}

/// Get the never-equals function for a type.
pub fn never_equals_fn<T: 'static>() -> EqualsFn<T> {
    never_equals
}

/// Get the always-equals function for a type.
pub fn always_equals_fn<T: 'static>() -> EqualsFn<T> {
    always_equals
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals() {
        assert!(equals(&42, &42));
        assert!(!equals(&42, &43));
        assert!(equals(&"hello", &"hello"));
    }

    #[test]
    fn test_safe_equals_f64_nan() {
        assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
        assert!(!safe_equals_f64(&f64::NAN, &1.0));
        assert!(!safe_equals_f64(&1.0, &f64::NAN));
        assert!(safe_equals_f64(&-0.0, &0.0));
    }

    #[test]
    fn test_safe_equals_f32() {
        assert!(safe_equals_f32(&1.0f32, &1.0f32));
        assert!(safe_equals_f32(&f32::NAN, &f32::NAN));
        assert!(!safe_equals_f32(&f32::NAN, &1.0f32));
    }

    #[test]
    fn test_safe_equals_option_f64() {
        assert!(safe_equals_option_f64(&None, &None));
        assert!(safe_equals_option_f64(&Some(2.0), &Some(2.0)));
        assert!(!safe_equals_option_f64(&None, &Some(1.0)));
    }

    #[test]
    fn test_shallow_equals() {
        assert!(shallow_equals_vec(&vec![1, 2, 3], &vec![1, 2, 3]));
        assert!(!shallow_equals_vec(&vec![1, 2], &vec![1, 2, 3]));
        assert!(shallow_equals_slice::<i32>(&[], &[]));
    }

    #[test]
    fn test_rc_ptr_equals() {
        let a = Rc::new(String::from("x"));
        let b = a.clone();
        assert!(rc_ptr_equals(&a, &b));
        assert!(!rc_ptr_equals(&a, &Rc::new(String::from("x"))));
    }

    #[test]
    fn test_never_and_always() {
        assert!(!never_equals(&"same", &"same"));
        assert!(always_equals(&1, &2));
    }

    #[test]
    fn test_equality_fn_constructors() {
        let eq: EqualsFn<i32> = default_equals_fn();
        assert!(eq(&42, &42));

        let never: EqualsFn<i32> = never_equals_fn();
        assert!(!never(&42, &42));

        let always: EqualsFn<i32> = always_equals_fn();
        assert!(always(&42, &43));
    }
}
