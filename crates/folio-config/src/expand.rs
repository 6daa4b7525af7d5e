//! `${VAR}` references in configuration strings.
//!
//! `${VAR}` takes the value of `VAR` and fails if it is unset, while
//! `${VAR:-default}` falls back to `default`. Only the braced form is
//! recognized: `$HOME/site` stays as written.

use std::borrow::Cow;
use std::env::{self, VarError};

use crate::ConfigError;

/// Expand every `(value, field)` pair in place.
///
/// `field` is the dotted setting name reported when a reference cannot be
/// resolved. Values before the failing one are already expanded.
pub(crate) fn expand_all<'a>(
    fields: impl IntoIterator<Item = (&'a mut String, &'static str)>,
) -> Result<(), ConfigError> {
    for (value, field) in fields {
        if let Some(expanded) = expand(value, field)? {
            *value = expanded;
        }
    }
    Ok(())
}

/// Expanded form of `value`, `None` when it holds no references.
fn expand(value: &str, field: &str) -> Result<Option<String>, ConfigError> {
    if !value.contains("${") {
        return Ok(None);
    }
    match shellexpand::env_with_context(value, lookup) {
        Ok(Cow::Borrowed(_)) => Ok(None),
        Ok(Cow::Owned(expanded)) => Ok(Some(expanded)),
        Err(e) => Err(ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} {}", e.var_name, describe(&e.cause)),
        }),
    }
}

fn lookup(var: &str) -> Result<Option<String>, VarError> {
    env::var(var).map(Some)
}

fn describe(err: &VarError) -> &'static str {
    match err {
        VarError::NotPresent => "not set",
        VarError::NotUnicode(_) => "is not valid UTF-8",
    }
}
