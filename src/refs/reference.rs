//! Named references to commits.

use std::fmt;

use crate::error::{Error, Result};
use crate::objects::Oid;

/// A named pointer to a commit, such as a branch or remote-tracking branch.
///
/// The name is immutable and validated at construction; the target may be
/// reassigned. A reference can transiently have no target, but writing one
/// in that state is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    name: String,
    target: Option<Oid>,
}

impl Reference {
    /// Creates a reference with a target.
    ///
    /// # Errors
    ///
    /// Fails with `Error::InvalidRefName` if the name is not of the form
    /// `heads/<leaf>`, `remotes/<remote>/<leaf>`, or `tags/<leaf>`, where
    /// `<leaf>` consists of ASCII letters, digits, `_`, and `-`, and is not
    /// `HEAD`, and `<remote>` is any non-empty segment except `.` and `..`.
    pub fn new(name: impl Into<String>, target: Oid) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Reference {
            name,
            target: Some(target),
        })
    }

    /// Creates a reference with no target yet.
    pub fn unborn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Reference { name, target: None })
    }

    /// Returns the reference name, e.g. `heads/master`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target commit ID, if set.
    pub fn target(&self) -> Option<&Oid> {
        self.target.as_ref()
    }

    /// Reassigns the target.
    pub fn set_target(&mut self, target: Option<Oid>) {
        self.target = target;
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(oid) => write!(f, "{} -> {}", self.name, oid),
            None => write!(f, "{} -> (none)", self.name),
        }
    }
}

/// Validates a reference name against the accepted grammar.
///
/// Accepted shapes, with `<leaf>` drawn from `[A-Za-z0-9_-]+`:
/// - `heads/<leaf>`
/// - `remotes/<remote>/<leaf>` (remote non-empty, not `.` or `..`)
/// - `tags/<leaf>`
///
/// A leaf of `HEAD` is rejected everywhere; the per-repository `HEAD` file
/// is not a reference in this model.
pub fn check_name(name: &str) -> Result<()> {
    let invalid = || Error::InvalidRefName(name.to_string());

    let parts: Vec<&str> = name.split('/').collect();
    let leaf = match parts.as_slice() {
        ["heads", leaf] | ["tags", leaf] => leaf,
        ["remotes", remote, leaf] => {
            if remote.is_empty() || *remote == "." || *remote == ".." {
                return Err(invalid());
            }
            leaf
        }
        _ => return Err(invalid()),
    };

    if leaf.is_empty()
        || !leaf
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(invalid());
    }
    if *leaf == "HEAD" {
        return Err(invalid());
    }
    Ok(())
}
