//! Header merge utilities.
//!
//! `reqwest::header::HeaderMap` is already case-insensitive and order-preserving,
//! and deleting a missing name from it is a no-op, which is exactly the contract
//! the core relies on (§4/§9 of SPEC_FULL.md). This module only adds the merge
//! helper the client context needs.

use reqwest::header::HeaderMap;

/// Merge `overrides` on top of `base`, returning a fresh `HeaderMap` seeded from
/// `base` and updated by `overrides`. Matches the teacher's `merge_headers`
/// (`siumai-core/src/execution/http/headers.rs`), generalized from `&HashMap` to
/// `&HeaderMap` so repeated merges are idempotent: merging identical headers
/// twice inserts the same values under the same names.
pub fn merge(base: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = base.clone();
    for (name, value) in overrides {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Client-context merge rule (§5.3): if either side is non-empty, return a fresh
/// set seeded from defaults and updated by the per-call headers; otherwise return
/// the per-call headers unchanged (identity when both are empty).
pub fn merge_or_identity(defaults: &HeaderMap, per_call: &HeaderMap) -> HeaderMap {
    if defaults.is_empty() && per_call.is_empty() {
        per_call.clone()
    } else {
        merge(defaults, per_call)
    }
}
