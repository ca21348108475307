//! Process-wide plan cache
//!
//! Plans are keyed by (schema fingerprint, type name). Two threads racing to
//! compile the same type both succeed; the last insert wins and both plans
//! are equivalent.

use dashmap::DashMap;
use harness_core::Schema;
use std::sync::{Arc, LazyLock};

use crate::compiler::compile;
use crate::error::Result;
use crate::plan::MessagePlan;

type Key = (String, String);

static PLANS: LazyLock<DashMap<Key, Arc<MessagePlan>>> = LazyLock::new(DashMap::new);

/// Cached plan for `type_name`, compiling it on first use
pub fn plan(schema: &Schema, type_name: &str) -> Result<Arc<MessagePlan>> {
    let key = (schema.fingerprint().to_string(), type_name.to_string());
    if let Some(plan) = PLANS.get(&key) {
        return Ok(Arc::clone(plan.value()));
    }

    // compile outside of the shard lock; nested lookups may hit the same shard
    let plan = Arc::new(compile(schema, type_name)?);
    PLANS.insert(key, Arc::clone(&plan));
    tracing::debug!(type_name, "Cached validator plan");
    Ok(plan)
}

/// Number of cached plans
pub fn len() -> usize {
    PLANS.len()
}
