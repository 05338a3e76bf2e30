//! Authorization gate
//!
//! Decides whether the auth services a caller has already proven satisfy a
//! tool's requirement. Token verification happens in the host; this only
//! compares names.

/// A tool with no requirements is always authorized. Otherwise any single
/// overlap between `required` and `verified` is enough (OR semantics).
pub fn is_authorized<S: AsRef<str>>(required: &[String], verified: &[S]) -> bool {
    if required.is_empty() {
        return true;
    }
    required
        .iter()
        .any(|service| verified.iter().any(|v| v.as_ref() == service))
}
