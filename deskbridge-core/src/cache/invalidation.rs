//! Write-invalidation of cached reads
//!
//! Every mutating operation declares which cached reads it makes stale. The
//! declarations are resolved against the mutation's parameters into exact
//! keys or key patterns, then purged from the cache once the mutation has
//! succeeded.

use crate::cache::key::CacheKeyBuilder;
use crate::cache::store::ResponseCache;
use crate::cache::types::CacheKey;
use crate::error::Result;
use crate::payload::Params;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One family of cached reads a mutation makes stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationTarget {
    /// Every cached read of an operation, whatever its parameters
    Operation(&'static str),

    /// Cached reads of `operation` sharing the mutation's value for `param`
    ///
    /// Falls back to the whole operation when the mutation does not carry
    /// `param`.
    SharedParam {
        operation: &'static str,
        param: &'static str,
    },

    /// Like `SharedParam`, with the value taken from the mutation's `from`
    /// parameter, for reads that name the same object differently
    RenamedParam {
        operation: &'static str,
        param: &'static str,
        from: &'static str,
    },

    /// The exact read of `operation` keyed by the listed mutation parameters
    Exact {
        operation: &'static str,
        params: &'static [&'static str],
    },

    /// Raw regular expression applied to the full key, namespace included
    Pattern(&'static str),
}

/// Concrete purge instruction produced from a target
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    Key(CacheKey),
    Pattern(Regex),
}

impl InvalidationTarget {
    /// Resolve this target against a mutation's parameters
    pub fn resolve(&self, keys: &CacheKeyBuilder, mutation_params: &Params) -> Result<ResolvedTarget> {
        let resolved = match self {
            InvalidationTarget::Operation(operation) => {
                ResolvedTarget::Pattern(Regex::new(&keys.operation_pattern(operation))?)
            }
            InvalidationTarget::SharedParam { operation, param } => {
                shared_param(keys, operation, param, param, mutation_params)?
            }
            InvalidationTarget::RenamedParam {
                operation,
                param,
                from,
            } => shared_param(keys, operation, param, from, mutation_params)?,
            InvalidationTarget::Exact { operation, params } => {
                let subset: Params = params
                    .iter()
                    .filter_map(|name| {
                        mutation_params
                            .get(*name)
                            .map(|value| (name.to_string(), value.clone()))
                    })
                    .collect();
                ResolvedTarget::Key(keys.build(operation, &subset))
            }
            InvalidationTarget::Pattern(pattern) => ResolvedTarget::Pattern(Regex::new(pattern)?),
        };
        Ok(resolved)
    }
}

fn shared_param(
    keys: &CacheKeyBuilder,
    operation: &str,
    param: &str,
    from: &str,
    mutation_params: &Params,
) -> Result<ResolvedTarget> {
    let pattern = match mutation_params.get(from).filter(|v| !v.is_null()) {
        Some(value) => keys.shared_param_pattern(operation, param, value),
        None => {
            debug!("Mutation lacks {}; invalidating every {} read", from, operation);
            keys.operation_pattern(operation)
        }
    };
    Ok(ResolvedTarget::Pattern(Regex::new(&pattern)?))
}

/// Association from a mutating operation to the reads it invalidates
#[derive(Debug, Clone, Copy)]
pub struct InvalidationRule {
    pub operation: &'static str,
    pub targets: &'static [InvalidationTarget],
}

/// Applies invalidation rules to a cache after successful mutations
#[derive(Debug, Clone)]
pub struct Invalidator {
    cache: Arc<ResponseCache>,
}

impl Invalidator {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }

    /// Purge everything `targets` resolve to; returns the number of entries removed
    ///
    /// Targets that match nothing are not an error.
    pub async fn apply(
        &self,
        operation: &str,
        targets: &[InvalidationTarget],
        mutation_params: &Params,
    ) -> Result<usize> {
        let mut removed = 0;

        for target in targets {
            removed += match target.resolve(self.cache.keys(), mutation_params)? {
                ResolvedTarget::Key(key) => usize::from(self.cache.invalidate(&key).await),
                ResolvedTarget::Pattern(pattern) => self.cache.invalidate_pattern(&pattern).await,
            };
        }

        if removed > 0 {
            info!("{} invalidated {} cached entries", operation, removed);
        } else {
            debug!("{} invalidated nothing", operation);
        }
        Ok(removed)
    }

    /// Apply a declared rule
    pub async fn apply_rule(&self, rule: &InvalidationRule, mutation_params: &Params) -> Result<usize> {
        self.apply(rule.operation, rule.targets, mutation_params).await
    }

    /// Apply the catalog rule of a mutation that has just succeeded
    ///
    /// Reads invalidate nothing. Unknown operations invalidate nothing and
    /// are logged.
    pub async fn invalidate_after(&self, operation: &str, mutation_params: &Params) -> Result<usize> {
        match crate::catalog::lookup(operation) {
            Some(spec) => match spec.rule() {
                Some(rule) => self.apply_rule(&rule, mutation_params).await,
                None => Ok(0),
            },
            None => {
                warn!("No invalidation rule for unknown operation {}", operation);
                Ok(0)
            }
        }
    }
}
