//! Property tests for the reference algebra.

use proptest::prelude::*;
use schemawalk::JsonRef;

fn r(s: &str) -> JsonRef {
    JsonRef::from_string(s).unwrap()
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        "[a-z]{1,4}\\.json",
        Just(".".to_string()),
        Just("..".to_string()),
    ]
}

fn absolute_uri() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("http"), Just("file"), Just("mem")],
        "[a-z]{1,8}",
        prop::collection::vec(segment(), 0..5),
    )
        .prop_map(|(scheme, host, segments)| {
            format!("{}://{}/{}", scheme, host, segments.join("/"))
        })
}

fn relative_uri() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4).prop_map(|segments| segments.join("/"))
}

fn pointer() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9]{0,5}", 0..4).prop_map(|tokens| {
        tokens
            .iter()
            .map(|t| format!("/{}", t))
            .collect::<String>()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // A missing fragment and an empty one name the same schema
    #[test]
    fn empty_fragment_is_no_fragment(uri in absolute_uri()) {
        let bare = r(&uri);
        let hashed = r(&format!("{}#", uri));
        prop_assert_eq!(&bare, &hashed);
        prop_assert!(bare.fragment().is_empty());
        prop_assert_eq!(bare.locator(), hashed.locator());
    }

    // References that differ only in fragment contain each other
    #[test]
    fn containment_ignores_fragment(uri in absolute_uri(), a in pointer(), b in pointer()) {
        let x = r(&format!("{}#{}", uri, a));
        let y = r(&format!("{}#{}", uri, b));
        prop_assert!(x.contains(&y));
        prop_assert!(y.contains(&x));
        prop_assert_eq!(a == b, x == y);
    }

    // Printing and re-parsing a normalized reference changes nothing
    #[test]
    fn normalization_is_idempotent(
        uri in prop_oneof![absolute_uri(), relative_uri()],
        fragment in prop::option::of(pointer()),
    ) {
        let text = match &fragment {
            Some(f) => format!("{}#{}", uri, f),
            None => uri.clone(),
        };
        let once = r(&text);
        let twice = r(&once.to_string());
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.to_string(), twice.to_string());
    }

    // Absolute references resolve to themselves
    #[test]
    fn absolute_reference_wins(base in absolute_uri(), other in absolute_uri(), f in pointer()) {
        let target = r(&format!("{}#{}", other, f));
        prop_assert_eq!(r(&base).resolve(&target), target);
    }

    // Resolution never escapes an archive
    #[test]
    fn archive_resolution_stays_in_archive(entry in relative_uri(), rel in relative_uri()) {
        let base = r(&format!("jar:file:/p/my.jar!/{}#frag", entry));
        let resolved = base.resolve(&r(&rel));
        prop_assert!(
            resolved.to_string().starts_with("jar:file:/p/my.jar!/"),
            "{} resolved against {} gave {}", rel, base, resolved
        );
    }

    // Resolved references always live in the base document or a sibling
    #[test]
    fn fragment_only_reference_keeps_locator(base in absolute_uri(), f in pointer()) {
        let base = r(&base);
        let resolved = base.resolve(&r(&format!("#{}", f)));
        prop_assert!(resolved.contains(&base));
    }
}

#[test]
fn archive_example() {
    let base = r("archive:file:/p/my.jar!/jar/entry.json#frag");
    assert_eq!(
        base.resolve(&r("../x.json#")).to_string(),
        "archive:file:/p/my.jar!/x.json#"
    );
}

#[test]
fn empty_forms_are_one_reference() {
    for s in ["", "#"] {
        assert_eq!(r(s), JsonRef::empty());
        assert!(r(s).is_empty());
    }
}
