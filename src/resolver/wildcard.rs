//! Wildcard type requirements: `pkg.*` expands to every class directly under
//! the package.
//!
//! The pattern becomes a regex with the literal prefix escaped and the `*`
//! standing for a capital-leading identifier, so `android.view.*` matches
//! `android.view.View` but not `android.view.animation.Animation` (the
//! identifier class has no `.`). Matches preserve metabase declaration order.

use regex::Regex;
use tracing::trace;

use crate::{metabase::Metabase, Result};

/// `true` if `name` is a wildcard requirement.
#[must_use]
pub fn is_wildcard(name: &str) -> bool {
    name.ends_with(".*")
}

/// Expand a wildcard requirement against the metabase class table.
///
/// Returns the matching class names in declaration order; an empty result
/// means the package prefix matched nothing.
///
/// # Errors
/// Returns [`crate::Error::Error`] if `pattern` is not a wildcard.
pub fn expand(metabase: &Metabase, pattern: &str) -> Result<Vec<String>> {
    let Some(prefix) = pattern.strip_suffix('*') else {
        return Err(crate::Error::Error(format!(
            "not a wildcard requirement: {pattern}"
        )));
    };
    let expression = format!("^{}[A-Z]+[a-zA-Z0-9]+$", regex::escape(prefix));
    let matcher = Regex::new(&expression)
        .map_err(|error| crate::Error::Error(format!("bad wildcard {pattern}: {error}")))?;

    let matches: Vec<String> = metabase
        .classes
        .keys()
        .filter(|name| matcher.is_match(name))
        .cloned()
        .collect();
    trace!(pattern, count = matches.len(), "expanded wildcard");
    Ok(matches)
}
