use std::fmt::Write as _;

/// Build the `-vf` filter that makes the engine emit exactly the frames in `indices`.
///
/// Produces `select='eq(n\,i0)+eq(n\,i1)+...'`. The comma inside `eq` is escaped for the
/// filtergraph parser. Indices are written as given: no sorting, deduplication or range check.
/// An empty slice yields `select=''`, which callers reject before getting here.
pub fn build_select_expression(indices: &[u64]) -> String {
    let mut expr = String::with_capacity(10 + indices.len() * 12);
    expr.push_str("select='");
    for (i, frame) in indices.iter().enumerate() {
        if i != 0 {
            expr.push('+');
        }
        let _ = write!(expr, "eq(n\\,{frame})");
    }
    expr.push('\'');
    expr
}

#[cfg(test)]
#[path = "../../tests/unit/decode/select.rs"]
mod tests;
