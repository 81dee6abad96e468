use serde_json::Value;

/// Deterministic cache key for a parsed request: the original `method`
/// string concatenated with a canonical rendering of each positional
/// param, in order.
///
/// `serde_json::to_string` is used for the per-param rendering. Since this
/// crate does not enable serde_json's `preserve_order` feature, `Value`
/// objects are backed by a `BTreeMap`, so object keys always serialize in
/// sorted order — the rendering of a given JSON value is therefore
/// independent of the order its fields happened to arrive on the wire.
/// Distinct JSON types serialize to distinct text (`2` vs `"2"`), and
/// concatenating per-param renderings in the request's own param order
/// makes the key order-sensitive (`[1, 2]` and `[2, 1]` render as `"12"`
/// and `"21"`). An empty `params` array contributes nothing, so the key
/// degrades to the method string alone.
pub fn fingerprint(method: &str, params: &[Value]) -> String {
    let mut key = String::with_capacity(method.len() + params.len() * 4);
    key.push_str(method);
    for param in params {
        // `to_string` on a `Value` cannot fail.
        key.push_str(&serde_json::to_string(param).unwrap_or_default());
    }
    key
}
