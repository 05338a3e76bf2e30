//! Query documents and the overlay rule.

use crate::tool::validation::ParamValues;
use serde_json::{Map, Value};

/// A generic document as stored in and returned by the backing store.
pub type Document = Map<String, Value>;

/// A query, filter or pipeline stage: field name → literal or matcher.
pub type QueryDocument = Document;

/// Overlay validated parameters onto a base template.
///
/// Returns a fresh document; `template` is never touched. Each parameter is
/// written under its own name, replacing any template entry with that key.
pub fn overlay(template: &QueryDocument, params: &ParamValues) -> QueryDocument {
    let mut document = template.clone();
    for param in params.iter() {
        document.insert(param.name.clone(), param.value.clone());
    }
    document
}

/// Like [`overlay`], skipping the named parameters.
pub fn overlay_except(
    template: &QueryDocument,
    params: &ParamValues,
    excluded: &[&str],
) -> QueryDocument {
    let mut document = template.clone();
    for param in params.iter().filter(|p| !excluded.contains(&p.name.as_str())) {
        document.insert(param.name.clone(), param.value.clone());
    }
    document
}

/// Remove a (possibly dotted) field path from a document.
///
/// `"meta.embedding"` removes `embedding` inside the `meta` sub-document.
/// Returns the removed value, if any.
pub fn remove_path(document: &mut QueryDocument, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head) {
            Some(Value::Object(inner)) => remove_path(inner, rest),
            _ => None,
        },
    }
}

/// Read a (possibly dotted) field path from a document.
pub fn get_path<'a>(document: &'a QueryDocument, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head) {
            Some(Value::Object(inner)) => get_path(inner, rest),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> QueryDocument {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_overlay_replaces_and_adds() {
        let template = doc(json!({"status": "active", "_id": 0}));
        let params = ParamValues::new().with("_id", 1).with("name", "Alice");

        let bound = overlay(&template, &params);
        assert_eq!(bound, doc(json!({"status": "active", "_id": 1, "name": "Alice"})));
    }

    #[test]
    fn test_overlay_leaves_template_untouched() {
        let template = doc(json!({"status": "active"}));
        let first = overlay(&template, &ParamValues::new().with("status", "archived"));
        let second = overlay(&template, &ParamValues::new().with("_id", 2));

        assert_eq!(template, doc(json!({"status": "active"})));
        assert_eq!(first["status"], "archived");
        assert_eq!(second["status"], "active");
        assert!(second.get("_id").is_some());
    }

    #[test]
    fn test_overlay_except() {
        let params = ParamValues::new().with("indexName", "idx").with("genre", "jazz");
        let bound = overlay_except(&QueryDocument::new(), &params, &["indexName"]);
        assert_eq!(bound, doc(json!({"genre": "jazz"})));
    }

    #[test]
    fn test_remove_path() {
        let mut document = doc(json!({
            "title": "a",
            "embedding": [0.1],
            "meta": {"embedding": [0.2], "lang": "en"}
        }));

        assert_eq!(remove_path(&mut document, "embedding"), Some(json!([0.1])));
        assert_eq!(remove_path(&mut document, "meta.embedding"), Some(json!([0.2])));
        assert_eq!(remove_path(&mut document, "title.missing"), None);
        assert_eq!(document, doc(json!({"title": "a", "meta": {"lang": "en"}})));
    }

    #[test]
    fn test_get_path() {
        let document = doc(json!({"meta": {"lang": "en"}}));
        assert_eq!(get_path(&document, "meta.lang"), Some(&json!("en")));
        assert_eq!(get_path(&document, "meta.missing"), None);
    }
}
