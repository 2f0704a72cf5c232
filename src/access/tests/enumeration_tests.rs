//! A caller cannot tell a missing item from a hidden or forbidden one

mod common;

use common::*;
use listgate_access::{
    AccessDenied, AccessError, AccessFilter, DeniedTarget, Operation, RequestContext, UniqueWhere,
    WhereInput,
};
use proptest::prelude::*;
use serde_json::json;

fn published_only() -> AccessFilter {
    AccessFilter::Where(WhereInput::from_json(json!({"status": "published"})).unwrap())
}

fn expect_identity_denial(err: AccessError, operation: Operation, unique: &UniqueWhere) {
    match err {
        AccessError::AccessDenied(denied) => {
            assert_eq!(
                denied,
                AccessDenied::item("Post", operation, DeniedTarget::Identity(unique.clone()))
            );
            assert!(denied.to_string().ends_with("It may not exist."));
        }
        other => panic!("expected access denied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hidden_and_missing_use_same_message_shape() {
    let pipeline = pipeline(seeded_store().await);
    let context = RequestContext::new();

    let hidden = UniqueWhere::new("id", "2");
    let missing = UniqueWhere::new("id", "404");

    let hidden_err = pipeline
        .authorize_update(
            &posts(),
            &context,
            &hidden,
            &published_only(),
            input(json!({"title": "x"})),
        )
        .await
        .unwrap_err();
    let missing_err = pipeline
        .authorize_update(
            &posts(),
            &context,
            &missing,
            &published_only(),
            input(json!({"title": "x"})),
        )
        .await
        .unwrap_err();

    assert_eq!(
        hidden_err.to_string().replace("\"2\"", "\"<id>\""),
        missing_err.to_string().replace("\"404\"", "\"<id>\"")
    );
}

proptest! {
    #[test]
    fn test_missing_and_filtered_items_are_indistinguishable(
        missing_id in "[a-z0-9]{3,12}",
        delete in any::<bool>()
    ) {
        tokio_test::block_on(async {
            let pipeline = pipeline(seeded_store().await);
            let context = RequestContext::new();
            let operation = if delete { Operation::Delete } else { Operation::Update };

            for id in [missing_id.as_str(), "2"] {
                let unique = UniqueWhere::new("id", id);
                let result = if delete {
                    pipeline
                        .authorize_delete(&posts(), &context, &unique, &published_only())
                        .await
                } else {
                    pipeline
                        .authorize_update(
                            &posts(),
                            &context,
                            &unique,
                            &published_only(),
                            input(json!({"status": "published"})),
                        )
                        .await
                };

                expect_identity_denial(result.unwrap_err(), operation, &unique);
            }
        });
    }

    #[test]
    fn test_item_rule_denial_matches_missing_item(missing_id in "[a-z0-9]{3,12}") {
        tokio_test::block_on(async {
            let entity = posts().with_item_rule(Operation::Update, editors_only());
            let pipeline = pipeline(seeded_store().await);
            let context = RequestContext::new();

            // "1" exists and is visible; the anonymous caller fails the item rule
            for id in [missing_id.as_str(), "1"] {
                let unique = UniqueWhere::new("id", id);
                let err = pipeline
                    .authorize_update(
                        &entity,
                        &context,
                        &unique,
                        &AccessFilter::Allow,
                        input(json!({"title": "x"})),
                    )
                    .await
                    .unwrap_err();

                expect_identity_denial(err, Operation::Update, &unique);
            }
        });
    }
}
