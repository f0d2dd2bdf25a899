use std::collections::BTreeSet;

use authoring_core::config::DependencyRulesConfig;
use authoring_core::contract::{
    ContentItem, MockContentStore, MockDependencyOracle, MockStateOracle,
};
use authoring_core::resolve::{DependencyClosureResolver, ResolveError};

fn resolver_with_patterns(patterns: &[&str]) -> DependencyClosureResolver {
    DependencyClosureResolver::new(DependencyRulesConfig {
        index_file: "index.xml".to_string(),
        content_specific_dependencies: patterns.iter().map(|p| p.to_string()).collect(),
    })
    .expect("Configured patterns should compile")
}

fn path_set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// A content store in which no ancestor qualifies as a mandatory parent.
fn store_without_new_parents() -> MockContentStore {
    let mut content = MockContentStore::new();
    content.expect_exists().returning(|_, _| Ok(false));
    content
}

#[tokio::test]
async fn test_resolve_terminates_on_dependency_cycle() {
    let resolver = resolver_with_patterns(&[]);
    let content = store_without_new_parents();

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, depth| path == "/site/website/a.xml" && *depth == 1)
        .times(1)
        .returning(|_, _, _| Ok(vec!["/site/components/b.xml".to_string()]));
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, depth| path == "/site/components/b.xml" && *depth == 1)
        .times(1)
        .returning(|_, _, _| Ok(vec!["/site/website/a.xml".to_string()]));

    let mut state = MockStateOracle::new();
    state.expect_is_new().returning(|_, _| Ok(true));

    let closure = resolver
        .resolve(
            "editorial",
            "/site/website/a.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("Resolution should terminate on a cyclic dependency graph");

    assert_eq!(
        closure,
        path_set(&["/site/components/b.xml"]),
        "The cycle partner is included once and the submission itself never is"
    );
}

#[tokio::test]
async fn test_resolve_collects_new_mandatory_parents() {
    let resolver = resolver_with_patterns(&[]);

    let mut content = MockContentStore::new();
    content.expect_exists().returning(|_, _| Ok(true));
    content
        .expect_get_item()
        .withf(|_, path| path == "/site/website/products")
        .returning(|_, path| {
            Ok(ContentItem {
                path: path.to_string(),
                is_new: true,
            })
        });
    content
        .expect_get_item()
        .withf(|_, path| path == "/site/website")
        .returning(|_, path| {
            Ok(ContentItem {
                path: path.to_string(),
                is_new: true,
            })
        });
    content
        .expect_get_item()
        .withf(|_, path| path == "/site")
        .returning(|_, path| {
            Ok(ContentItem {
                path: path.to_string(),
                is_new: false,
            })
        });

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .returning(|_, _, _| Ok(vec![]));

    let state = MockStateOracle::new();

    let closure = resolver
        .resolve(
            "editorial",
            "/site/website/products/index.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("Resolution should succeed");

    assert_eq!(
        closure,
        path_set(&["/site/website/products", "/site/website"]),
        "The chain of new ancestors is included, truncated at the first published one"
    );
}

#[tokio::test]
async fn test_resolve_stops_parent_walk_at_missing_ancestor() {
    let resolver = resolver_with_patterns(&[]);

    let mut content = MockContentStore::new();
    content.expect_exists().returning(|_, _| Ok(false));

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .returning(|_, _, _| Ok(vec![]));

    let state = MockStateOracle::new();

    let closure = resolver
        .resolve(
            "editorial",
            "/site/website/about.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("Resolution should succeed");

    assert!(
        closure.is_empty(),
        "No dependencies and no new ancestors yield an empty closure"
    );
}

#[tokio::test]
async fn test_resolve_excludes_updated_dependency_not_matching_patterns() {
    let resolver = resolver_with_patterns(&["/site/components/.*"]);
    let content = store_without_new_parents();

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/website/landing.xml")
        .times(1)
        .returning(|_, _, _| {
            Ok(vec![
                "/static-assets/css/style.css".to_string(),
                "/site/components/promo.xml".to_string(),
            ])
        });
    // The gated dependency must never be asked for its own dependencies.
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/static-assets/css/style.css")
        .times(0)
        .returning(|_, _, _| Ok(vec![]));
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/components/promo.xml")
        .times(1)
        .returning(|_, _, _| Ok(vec![]));

    let mut state = MockStateOracle::new();
    state.expect_is_new().returning(|_, _| Ok(false));
    state.expect_is_updated().returning(|_, _| Ok(true));

    let closure = resolver
        .resolve(
            "editorial",
            "/site/website/landing.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("Resolution should succeed");

    assert_eq!(
        closure,
        path_set(&["/site/components/promo.xml"]),
        "Only the pattern-matched updated dependency is pulled in"
    );
}

#[tokio::test]
async fn test_resolve_prunes_unchanged_dependency() {
    let resolver = resolver_with_patterns(&["/site/components/.*"]);
    let content = store_without_new_parents();

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/website/landing.xml")
        .times(1)
        .returning(|_, _, _| Ok(vec!["/site/components/footer.xml".to_string()]));
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/components/footer.xml")
        .times(0)
        .returning(|_, _, _| Ok(vec![]));

    let mut state = MockStateOracle::new();
    state.expect_is_new().returning(|_, _| Ok(false));
    state.expect_is_updated().returning(|_, _| Ok(false));

    let closure = resolver
        .resolve(
            "editorial",
            "/site/website/landing.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("Resolution should succeed");

    assert!(
        closure.is_empty(),
        "An unchanged dependency is excluded and never recursed into"
    );
}

#[tokio::test]
async fn test_resolve_with_empty_rule_set_drops_every_updated_dependency() {
    let resolver = resolver_with_patterns(&[]);
    let content = store_without_new_parents();

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/website/landing.xml")
        .times(1)
        .returning(|_, _, _| Ok(vec!["/site/components/promo.xml".to_string()]));

    let mut state = MockStateOracle::new();
    state.expect_is_new().returning(|_, _| Ok(false));
    state.expect_is_updated().returning(|_, _| Ok(true));

    let closure = resolver
        .resolve(
            "editorial",
            "/site/website/landing.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("Resolution should succeed");

    assert!(
        closure.is_empty(),
        "With no configured patterns, updated dependencies are never pulled in"
    );
}

#[tokio::test]
async fn test_resolve_twice_yields_identical_closure() {
    let resolver = resolver_with_patterns(&["/site/components/.*"]);
    let content = store_without_new_parents();

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/website/landing.xml")
        .returning(|_, _, _| Ok(vec!["/site/components/promo.xml".to_string()]));
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/components/promo.xml")
        .returning(|_, _, _| Ok(vec!["/site/components/banner.xml".to_string()]));
    dependencies
        .expect_direct_dependencies()
        .withf(|_, path, _| path == "/site/components/banner.xml")
        .returning(|_, _, _| Ok(vec![]));

    let mut state = MockStateOracle::new();
    state
        .expect_is_new()
        .withf(|_, path| path == "/site/components/promo.xml")
        .returning(|_, _| Ok(true));
    state
        .expect_is_new()
        .withf(|_, path| path == "/site/components/banner.xml")
        .returning(|_, _| Ok(false));
    state
        .expect_is_updated()
        .withf(|_, path| path == "/site/components/banner.xml")
        .returning(|_, _| Ok(true));

    let first = resolver
        .resolve(
            "editorial",
            "/site/website/landing.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("First resolution should succeed");
    let second = resolver
        .resolve(
            "editorial",
            "/site/website/landing.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect("Second resolution should succeed");

    assert_eq!(
        first, second,
        "Re-resolving with unchanged state yields the same set"
    );
    assert_eq!(
        first,
        path_set(&[
            "/site/components/promo.xml",
            "/site/components/banner.xml"
        ]),
        "Both the new dependency and its matched updated dependency are included"
    );
}

#[tokio::test]
async fn test_resolve_propagates_state_oracle_failure() {
    let resolver = resolver_with_patterns(&[]);
    let content = store_without_new_parents();

    let mut dependencies = MockDependencyOracle::new();
    dependencies
        .expect_direct_dependencies()
        .returning(|_, _, _| Ok(vec!["/site/components/b.xml".to_string()]));

    let mut state = MockStateOracle::new();
    state
        .expect_is_new()
        .returning(|_, _| Err("object state service unreachable".into()));

    let err = resolver
        .resolve(
            "editorial",
            "/site/website/a.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect_err("An unanswerable state query must fail the whole resolution");

    match err {
        ResolveError::CollaboratorUnavailable { site, path, .. } => {
            assert_eq!(site, "editorial");
            assert_eq!(
                path, "/site/components/b.xml",
                "The error should name the path whose query failed"
            );
        }
    }
}

#[tokio::test]
async fn test_resolve_propagates_content_store_failure_in_parent_walk() {
    let resolver = resolver_with_patterns(&[]);

    let mut content = MockContentStore::new();
    content
        .expect_exists()
        .returning(|_, _| Err("content store unreachable".into()));

    let dependencies = MockDependencyOracle::new();
    let state = MockStateOracle::new();

    let err = resolver
        .resolve(
            "editorial",
            "/site/website/products/index.xml",
            &content,
            &dependencies,
            &state,
        )
        .await
        .expect_err("An unanswerable existence query must fail the whole resolution");

    match err {
        ResolveError::CollaboratorUnavailable { path, .. } => {
            assert_eq!(
                path, "/site/website/products",
                "The error should name the ancestor whose query failed"
            );
        }
    }
}
