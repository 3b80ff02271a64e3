//! Property tests for cache key construction
//!
//! Property: for any operation and parameter bag, the key depends only on
//! the members present, never on the order they were inserted in.

use deskbridge_core::{CacheKeyBuilder, Params};
use proptest::prelude::*;
use serde_json::Value;

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 :_\"-]{0,12}".prop_map(Value::from),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z_]{1,6}", inner), 0..4)
                .prop_map(|members| Value::Object(members.into_iter().collect())),
        ]
    })
}

/// Distinct member names with arbitrary values
fn arb_members() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z_]{1,10}", arb_value(), 0..8)
        .prop_map(|members| members.into_iter().collect())
}

proptest! {
    #[test]
    fn key_ignores_member_order(
        (members, shuffled) in arb_members()
            .prop_flat_map(|members| (Just(members.clone()), Just(members).prop_shuffle())),
        operation in "[a-z_]{1,24}",
    ) {
        let keys = CacheKeyBuilder::new("prop");
        let original: Params = members.into_iter().collect();
        let reordered: Params = shuffled.into_iter().collect();

        prop_assert_eq!(keys.build(&operation, &original), keys.build(&operation, &reordered));
    }

    #[test]
    fn explicit_null_matches_absent(
        members in arb_members(),
        operation in "[a-z_]{1,24}",
    ) {
        let keys = CacheKeyBuilder::new("prop");
        let present: Params = members.into_iter().collect();
        let mut with_null = present.clone();
        with_null.insert("zz_unset_member".to_string(), Value::Null);

        prop_assert_eq!(keys.build(&operation, &present), keys.build(&operation, &with_null));
    }

    #[test]
    fn key_starts_with_operation_prefix(
        members in arb_members(),
        operation in "[a-z_]{1,24}",
    ) {
        let keys = CacheKeyBuilder::new("prop");
        let params: Params = members.into_iter().collect();

        let key = keys.build(&operation, &params);
        prop_assert!(key.starts_with(&keys.operation_prefix(&operation)));
    }
}
