//! Census tract identifier normalization.
//!
//! Income tables and boundary files do not always spell tract identifiers
//! the same way. Resolution is a two-step rule applied in one place:
//!
//! 1. Trim surrounding whitespace and look the identifier up as-is.
//! 2. If that fails and a fallback prefix is configured, prepend it and
//!    look up again. Some published income tables drop the leading `9` of
//!    tract names (`"802"` for `"9802"`), hence [`DEFAULT_FALLBACK_PREFIX`].
//!
//! Anything still unresolved is reported by the caller as unmatched.

use std::collections::BTreeMap;

use route_equity_geography_models::TractIndex;

/// Prefix retried when an identifier does not match as-is.
pub const DEFAULT_FALLBACK_PREFIX: &str = "9";

/// Separator between the parts of a composite tract identifier.
pub const COMPOSITE_SEPARATOR: &str = "|";

/// Trims an identifier and its composite parts.
#[must_use]
pub fn normalize_tract_id(raw: &str) -> String {
    raw.split(COMPOSITE_SEPARATOR)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(COMPOSITE_SEPARATOR)
}

/// How an identifier was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Exact(TractIndex),
    /// Matched only after prepending the fallback prefix.
    Prefixed(TractIndex),
}

impl Resolution {
    #[must_use]
    pub const fn index(self) -> TractIndex {
        match self {
            Self::Exact(index) | Self::Prefixed(index) => index,
        }
    }
}

/// Resolves raw identifiers against the tract boundary identifiers.
#[derive(Debug, Clone)]
pub struct TractIdResolver {
    ids: BTreeMap<String, TractIndex>,
    fallback_prefix: Option<String>,
}

impl TractIdResolver {
    #[must_use]
    pub fn new(ids: BTreeMap<String, TractIndex>, fallback_prefix: Option<String>) -> Self {
        let ids = ids
            .into_iter()
            .map(|(id, index)| (normalize_tract_id(&id), index))
            .collect();
        Self {
            ids,
            fallback_prefix: fallback_prefix.filter(|p| !p.is_empty()),
        }
    }

    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<Resolution> {
        let id = normalize_tract_id(raw);
        if let Some(index) = self.ids.get(&id) {
            return Some(Resolution::Exact(*index));
        }

        let prefix = self.fallback_prefix.as_deref()?;
        self.ids
            .get(&format!("{prefix}{id}"))
            .map(|index| Resolution::Prefixed(*index))
    }
}
