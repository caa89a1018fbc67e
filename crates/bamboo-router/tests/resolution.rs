//! Resolution behaviour of the route table as seen by the dispatcher.

use bamboo_router::{RouteError, Router, ROOT_SEGMENT, WILDCARD_PARAM};
use http::Method;
use proptest::prelude::*;

fn app_router() -> Router<&'static str> {
    let mut router = Router::new();
    router.insert("GET", "/", "home").unwrap();
    router.insert("GET", "/health", "health").unwrap();
    router.insert("GET", "/users", "list_users").unwrap();
    router.insert("GET", "/users/me", "current_user").unwrap();
    router.insert("GET", "/users/:id", "show_user").unwrap();
    router.insert("POST", "/users", "create_user").unwrap();
    router.insert("GET", "/files/**.png", "png_file").unwrap();
    router.insert("GET", "/static/*", "static_asset").unwrap();
    router
}

#[test]
fn literal_paths_resolve_with_no_params() {
    let router = app_router();
    for (path, expected) in [
        ("/health", "health"),
        ("/users", "list_users"),
        ("/users/me", "current_user"),
    ] {
        let hit = router.at(&Method::GET, path).unwrap();
        assert_eq!(*hit.value, expected);
        assert!(hit.params.is_empty(), "{path} captured params");
    }
}

#[test]
fn parameter_is_captured() {
    let router = app_router();
    let hit = router.resolve(&Method::GET, &["users", "42"]).unwrap();
    assert_eq!(*hit.value, "show_user");
    assert_eq!(hit.params.get("id"), Some("42"));
    assert_eq!(hit.params.len(), 1);
}

#[test]
fn catch_all_matches_by_extension() {
    let router = app_router();
    assert_eq!(
        *router.resolve(&Method::GET, &["files", "a.png"]).unwrap().value,
        "png_file"
    );
    assert_eq!(
        *router
            .resolve(&Method::GET, &["files", "assets", "a.png"])
            .unwrap()
            .value,
        "png_file"
    );
    assert!(router.resolve(&Method::GET, &["files", "a.jpg"]).is_none());
}

#[test]
fn catch_all_needs_a_dot_before_the_suffix() {
    let router = app_router();
    assert!(router.resolve(&Method::GET, &["files", "png"]).is_none());
    assert!(router.resolve(&Method::GET, &["files", "a.png.bak"]).is_none());
    assert_eq!(
        *router.resolve(&Method::GET, &["files", "a.tar.png"]).unwrap().value,
        "png_file"
    );

    let mut bare = Router::new();
    bare.insert("GET", "/raw/**", "raw").unwrap();
    assert_eq!(*bare.resolve(&Method::GET, &["raw", "png"]).unwrap().value, "raw");
}

#[test]
fn wildcard_captures_remaining_path() {
    let router = app_router();
    let hit = router.at(&Method::GET, "/static/js/app.js").unwrap();
    assert_eq!(*hit.value, "static_asset");
    assert_eq!(hit.params.get(WILDCARD_PARAM), Some("js/app.js"));
}

#[test]
fn root_uses_reserved_segment() {
    let router = app_router();
    assert_eq!(*router.resolve(&Method::GET, &[ROOT_SEGMENT]).unwrap().value, "home");
}

#[test]
fn unknown_path_and_method_miss() {
    let router = app_router();
    assert!(router.at(&Method::GET, "/nope").is_none());
    assert!(router.at(&Method::PUT, "/users").is_none());
}

#[test]
fn duplicate_registration_is_rejected_and_first_stays() {
    let mut router = app_router();
    let err = router.insert("GET", "/users/:id", "other").unwrap_err();
    assert!(matches!(err, RouteError::Conflict { .. }));
    assert_eq!(*router.at(&Method::GET, "/users/1").unwrap().value, "show_user");
}

fn literal_segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,8}"
}

proptest! {
    #[test]
    fn every_registered_literal_path_resolves_to_itself(
        paths in proptest::collection::hash_set(
            proptest::collection::vec(literal_segment(), 1..5),
            1..20,
        )
    ) {
        let mut router = Router::new();
        let mut registered = Vec::new();
        for segments in &paths {
            let path = format!("/{}", segments.join("/"));
            router.insert("GET", &path, path.clone()).unwrap();
            registered.push(path);
        }

        for path in &registered {
            let hit = router.at(&Method::GET, path).unwrap();
            prop_assert_eq!(hit.value, path);
            prop_assert!(hit.params.is_empty());
        }
    }

    #[test]
    fn parameter_captures_any_segment(value in "[A-Za-z0-9_.~-]{1,16}") {
        let mut router = Router::new();
        router.insert("GET", "/items/:id", ()).unwrap();
        let hit = router.resolve(&Method::GET, &["items", value.as_str()]).unwrap();
        prop_assert_eq!(hit.params.get("id"), Some(value.as_str()));
    }
}
