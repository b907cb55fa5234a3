/// Builds a [`Document`](crate::value::Document) from `"key": value` pairs.
///
/// Values may be nested `{ ... }` documents, `[ ... ]` arrays, `null`, or any single token
/// tree convertible with `Value::from`; wrap longer expressions in parentheses:
///
/// ```
/// use bsonite::doc;
/// let d = doc! { "name": "MongoDB", "count": 1, "info": { "x": 203, "y": (-102) }, "tags": ["a", null] };
/// assert_eq!(d.get_document("info").unwrap().get_i32("y").unwrap(), -102);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::value::Document::new()
    };
    ( $( $key:literal : $val:tt ),* $(,)? ) => {{
        let mut d = $crate::value::Document::new();
        $( d.insert($key, $crate::value!($val)); )*
        d
    }};
}

/// Builds a single [`Value`](crate::value::Value); see [`doc!`].
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::value::Value::Null
    };
    ([ $( $e:tt ),* $(,)? ]) => {
        $crate::value::Value::Array(vec![ $( $crate::value!($e) ),* ])
    };
    ({ $( $t:tt )* }) => {
        $crate::value::Value::Document($crate::doc! { $( $t )* })
    };
    ($e:expr) => {
        $crate::value::Value::from($e)
    };
}
