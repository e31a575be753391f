//! Cross-engine integration tests: the packed tree, DFA, and instruction
//! matchers must return the same winning endpoint and the same values on
//! every path, and links generated from a template must round-trip
//! through matching.

use std::sync::Arc;

use routex_core::{RouteValue, RouteValues};
use routex_matcher::{
    DfaMatcher, Endpoint, LinkContext, LinkGenerator, Matcher, NamedHandler, ProgramMatcher,
    RouteEntryFinder, RouteOptions, RouteSet, TreeMatcher,
};

fn values(pairs: &[(&str, &str)]) -> RouteValues {
    let mut map = RouteValues::new();
    for (k, v) in pairs {
        map.set(*k, *v);
    }
    map
}

fn route_set(specs: &[(&str, &[(&str, &str)])]) -> RouteSet {
    let mut set = RouteSet::new();
    for (template, defaults) in specs {
        set.add(
            template,
            values(defaults),
            Vec::new(),
            Endpoint::new(*template, NamedHandler::new(*template)).with_address(*template),
        )
        .unwrap();
    }
    set
}

fn engines(set: &RouteSet) -> Vec<(&'static str, Box<dyn Matcher>)> {
    vec![
        ("tree", Box::new(TreeMatcher::build(set).unwrap())),
        ("dfa", Box::new(DfaMatcher::build(set).unwrap())),
        ("program", Box::new(ProgramMatcher::build(set).unwrap())),
    ]
}

/// Asserts that every engine agrees on the winner (by handler name) and on
/// the extracted values for `path`.
fn assert_all_engines(set: &RouteSet, path: &str, expected: Option<(&str, &[(&str, &str)])>) {
    for (name, engine) in engines(set) {
        let result = engine.match_path(path);
        match (&result, expected) {
            (None, None) => {}
            (Some(m), Some((winner, pairs))) => {
                assert_eq!(
                    m.endpoint.display_name(),
                    winner,
                    "{name} picked the wrong endpoint for {path}"
                );
                for (k, v) in pairs {
                    assert_eq!(
                        m.values.get(k),
                        Some(&RouteValue::Str((*v).to_string())),
                        "{name} bound {k} wrong for {path}"
                    );
                }
            }
            _ => panic!("{name} disagreed on {path}: got {result:?}, expected {expected:?}"),
        }
    }
}

#[test]
fn test_single_parameter_round_trip() {
    let set = route_set(&[("{controller}", &[])]);

    let generator =
        LinkGenerator::new(Arc::new(RouteEntryFinder::new(&set)), RouteOptions::default());
    let link = generator
        .try_get_link(
            &LinkContext::new("{controller}").with_supplied(values(&[("controller", "Home")])),
        )
        .unwrap();
    assert_eq!(link, "/Home");

    assert_all_engines(&set, &link, Some(("{controller}", &[("controller", "Home")])));
}

#[test]
fn test_optional_id_round_trip() {
    let set = route_set(&[("{controller}/{action}/{id?}", &[])]);

    let generator =
        LinkGenerator::new(Arc::new(RouteEntryFinder::new(&set)), RouteOptions::default());
    let link = generator
        .try_get_link(
            &LinkContext::new("{controller}/{action}/{id?}").with_supplied(values(&[
                ("controller", "Home"),
                ("action", "Index"),
                ("id", "10"),
            ])),
        )
        .unwrap();
    assert_eq!(link, "/Home/Index/10");

    assert_all_engines(
        &set,
        "/Home/Index",
        Some((
            "{controller}/{action}/{id?}",
            &[("controller", "Home"), ("action", "Index")],
        )),
    );
    for (name, engine) in engines(&set) {
        let m = engine.match_path("/Home/Index").unwrap();
        assert!(!m.values.contains_key("id"), "{name} bound an absent id");
    }
}

#[test]
fn test_specificity_is_engine_independent() {
    let set = route_set(&[
        ("{controller}/{action}/{id?}", &[]),
        ("{controller}/{action}", &[]),
        ("{controller}", &[]),
    ]);

    assert_all_engines(&set, "/Home", Some(("{controller}", &[("controller", "Home")])));
    assert_all_engines(
        &set,
        "/Home/Index",
        Some(("{controller}/{action}", &[("action", "Index")])),
    );
    assert_all_engines(
        &set,
        "/Home/Index/7",
        Some(("{controller}/{action}/{id?}", &[("id", "7")])),
    );
}

#[test]
fn test_literal_case_insensitive_capture_case_preserving() {
    let set = route_set(&[("simple", &[]), ("users/{name}", &[])]);

    assert_all_engines(&set, "/simple", Some(("simple", &[])));
    assert_all_engines(&set, "/Simple", Some(("simple", &[])));
    assert_all_engines(&set, "/SIMPLE", Some(("simple", &[])));
    assert_all_engines(&set, "/simple/", Some(("simple", &[])));
    assert_all_engines(&set, "/siple", None);
    assert_all_engines(&set, "/simple1", None);

    assert_all_engines(&set, "/Users/MiXeD", Some(("users/{name}", &[("name", "MiXeD")])));
}

#[test]
fn test_trailing_slash_everywhere() {
    let set = route_set(&[("{controller}/{action}", &[])]);
    assert_all_engines(
        &set,
        "/Home/Index/",
        Some(("{controller}/{action}", &[("action", "Index")])),
    );
}

#[test]
fn test_catch_all_parity() {
    let set = route_set(&[("files/{*path}", &[]), ("files/readme", &[])]);

    assert_all_engines(&set, "/files/readme", Some(("files/readme", &[])));
    assert_all_engines(
        &set,
        "/files/a/b/c",
        Some(("files/{*path}", &[("path", "a/b/c")])),
    );
    assert_all_engines(&set, "/files", Some(("files/{*path}", &[])));
}

#[test]
fn test_constraint_fallback_parity() {
    let mut set = RouteSet::new();
    set.add(
        "{id:int}",
        RouteValues::new(),
        Vec::new(),
        Endpoint::new("{id:int}", NamedHandler::new("int")),
    )
    .unwrap();
    set.add(
        "{name}",
        RouteValues::new(),
        Vec::new(),
        Endpoint::new("{name}", NamedHandler::new("any")),
    )
    .unwrap();

    for (name, engine) in engines(&set) {
        assert_eq!(
            engine.match_path("/42").unwrap().endpoint.display_name(),
            "int",
            "{name} missed the constrained route"
        );
        assert_eq!(
            engine.match_path("/abc").unwrap().endpoint.display_name(),
            "any",
            "{name} did not fall back past the failed constraint"
        );
    }
}

#[test]
fn test_constraint_failure_falls_back_to_catch_all_in_every_engine() {
    let mut set = RouteSet::new();
    set.add(
        "files/{name:int}",
        RouteValues::new(),
        Vec::new(),
        Endpoint::new("files/{name:int}", NamedHandler::new("numbered")),
    )
    .unwrap();
    set.add(
        "files/{*path}",
        RouteValues::new(),
        Vec::new(),
        Endpoint::new("files/{*path}", NamedHandler::new("catchall")),
    )
    .unwrap();

    for (name, engine) in engines(&set) {
        assert_eq!(
            engine.match_path("/files/42").unwrap().endpoint.display_name(),
            "numbered",
            "{name} missed the constrained route"
        );
        assert_eq!(
            engine.match_path("/files/abc").unwrap().endpoint.display_name(),
            "catchall",
            "{name} did not fall back to the catch-all"
        );
    }
}

#[test]
fn test_defaults_enrich_matched_values() {
    let set = route_set(&[("{controller}", &[("action", "Index")])]);

    for (name, engine) in engines(&set) {
        let m = engine.match_path("/Home").unwrap();
        assert_eq!(
            m.values.get("action"),
            Some(&RouteValue::Str("Index".into())),
            "{name} lost the default"
        );
    }
}

#[test]
fn test_link_with_query_and_list_values() {
    let set = route_set(&[("{controller}/{action}", &[])]);
    let generator =
        LinkGenerator::new(Arc::new(RouteEntryFinder::new(&set)), RouteOptions::default());

    let link = generator
        .try_get_link(
            &LinkContext::new("{controller}/{action}")
                .with_supplied(values(&[("name", "name with %special #characters")]))
                .with_ambient(values(&[("controller", "Home"), ("action", "Index")])),
        )
        .unwrap();
    assert_eq!(
        link,
        "/Home/Index?name=name%20with%20%25special%20%23characters"
    );

    let mut supplied = RouteValues::new();
    supplied.set(
        "items",
        RouteValue::List(vec!["10".into(), "20".into(), "30".into()]),
    );
    let link = generator
        .try_get_link(
            &LinkContext::new("{controller}/{action}")
                .with_supplied(supplied)
                .with_ambient(values(&[("controller", "Home"), ("action", "Index")])),
        )
        .unwrap();
    assert_eq!(link, "/Home/Index?items=10&items=20&items=30");
}

#[test]
fn test_generated_links_match_back() {
    let set = route_set(&[
        ("{controller}/{action}/{id?}", &[]),
        ("files/{*path}", &[]),
    ]);
    let generator =
        LinkGenerator::new(Arc::new(RouteEntryFinder::new(&set)), RouteOptions::default());

    let link = generator
        .try_get_link(
            &LinkContext::new("{controller}/{action}/{id?}").with_supplied(values(&[
                ("controller", "Store"),
                ("action", "Buy"),
            ])),
        )
        .unwrap();
    assert_all_engines(
        &set,
        &link,
        Some((
            "{controller}/{action}/{id?}",
            &[("controller", "Store"), ("action", "Buy")],
        )),
    );

    let link = generator
        .try_get_link(
            &LinkContext::new("files/{*path}").with_supplied(values(&[("path", "docs/guide.md")])),
        )
        .unwrap();
    assert_eq!(link, "/files/docs/guide.md");
    assert_all_engines(&set, &link, Some(("files/{*path}", &[("path", "docs/guide.md")])));
}

#[test]
fn test_order_overrides_precedence_in_every_engine() {
    let mut set = RouteSet::new();
    set.add(
        "{controller}",
        RouteValues::new(),
        Vec::new(),
        Endpoint::new("{controller}", NamedHandler::new("early")).with_order(-1),
    )
    .unwrap();
    set.add(
        "home",
        RouteValues::new(),
        Vec::new(),
        Endpoint::new("home", NamedHandler::new("literal")),
    )
    .unwrap();

    for (name, engine) in engines(&set) {
        assert_eq!(
            engine.match_path("/home").unwrap().endpoint.display_name(),
            "early",
            "{name} ignored the entry order"
        );
    }
}

#[test]
fn test_match_does_not_mutate_values_on_failure() {
    let set = route_set(&[("{a}/{b}/tail", &[])]);
    let entry = &set.entries()[0];

    let mut values_map = RouteValues::new();
    values_map.set("kept", "yes");
    assert!(!entry.matcher().try_match("/x/y/other", &mut values_map));
    assert_eq!(values_map.len(), 1);
    assert!(values_map.contains_key("kept"));
}

#[test]
fn test_overlapping_literals_and_parameters_parity() {
    let set = route_set(&[
        ("lit/{q}", &[]),
        ("{p}/mid/end", &[]),
        ("lit/mid/extra", &[]),
    ]);

    assert_all_engines(&set, "/lit/mid", Some(("lit/{q}", &[("q", "mid")])));
    assert_all_engines(&set, "/lit/mid/end", Some(("{p}/mid/end", &[("p", "lit")])));
    assert_all_engines(&set, "/lit/mid/extra", Some(("lit/mid/extra", &[])));
    assert_all_engines(&set, "/lit/x/end", None);
    assert_all_engines(&set, "/a/mid/end", Some(("{p}/mid/end", &[("p", "a")])));
}
