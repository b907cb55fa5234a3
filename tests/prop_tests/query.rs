use bsonite::doc;
use bsonite::query::builders::{eq, gt, lte, ne, not};
use bsonite::query::{SortSpec, compare_docs, eval_filter};
use bsonite::value::Value;
use proptest::prelude::*;

fn number() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        (-1.0e6f64..1.0e6f64).prop_map(Value::Double),
    ]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_gt_is_the_complement_of_lte(a in number(), b in number()) {
        let d = doc! { "x": (a.clone()) };
        prop_assert_eq!(eval_filter(&d, &gt("x", b.clone())), !eval_filter(&d, &lte("x", b)));
    }

    #[test]
    fn prop_ne_is_not_eq(a in number(), b in number()) {
        let d = doc! { "x": (a.clone()) };
        prop_assert_eq!(eval_filter(&d, &ne("x", b.clone())), eval_filter(&d, &not(eq("x", b))));
        prop_assert!(eval_filter(&d, &eq("x", a)));
    }

    #[test]
    fn prop_sort_is_non_decreasing(v in proptest::collection::vec((any::<i64>(), any::<i32>()), 0..40)) {
        let mut docs: Vec<_> = v.iter().map(|(a, b)| doc! { "a": (*a), "b": (*b) }).collect();
        let spec = [SortSpec::asc("a"), SortSpec::desc("b")];
        docs.sort_by(|x, y| compare_docs(x, y, &spec));
        for w in docs.windows(2) {
            let (a0, a1) = (w[0].get_i64("a").unwrap(), w[1].get_i64("a").unwrap());
            let (b0, b1) = (w[0].get_i32("b").unwrap(), w[1].get_i32("b").unwrap());
            prop_assert!(a0 < a1 || (a0 == a1 && b0 >= b1));
        }
    }
}
