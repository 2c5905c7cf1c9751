//! Cross-entry-point convergence.
//!
//! Entry points that coexist must emit to the same directory and proxy the
//! same prefixes to the same targets. Divergence is either an error or a
//! logged warning, depending on [`ConvergencePolicy`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::compose::composer::BuildConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergencePolicy {
    /// Divergence is an error.
    #[default]
    Strict,
    /// Divergence is logged and tolerated.
    Warn,
}

impl FromStr for ConvergencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ConvergencePolicy::Strict),
            "warn" => Ok(ConvergencePolicy::Warn),
            other => Err(format!("unknown convergence policy `{other}` (expected strict or warn)")),
        }
    }
}

/// One way two entry points disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    OutputDirectory { left: PathBuf, right: PathBuf },
    ProxyRules { only_left: Vec<String>, only_right: Vec<String>, differing: Vec<String> },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Divergence::OutputDirectory { left, right } => write!(
                f,
                "output directories differ (`{}` vs `{}`)",
                left.display(),
                right.display()
            ),
            Divergence::ProxyRules {
                only_left,
                only_right,
                differing,
            } => {
                write!(f, "proxy rules differ")?;
                if !only_left.is_empty() {
                    write!(f, "; only in left: {}", only_left.join(", "))?;
                }
                if !only_right.is_empty() {
                    write!(f, "; only in right: {}", only_right.join(", "))?;
                }
                if !differing.is_empty() {
                    write!(f, "; different targets: {}", differing.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entry points `{left}` and `{right}` diverge: {}", render(.divergences))]
pub struct ConvergenceError {
    pub left: String,
    pub right: String,
    pub divergences: Vec<Divergence>,
}

fn render(divergences: &[Divergence]) -> String {
    divergences
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Compare the shared parts of two composed configurations.
pub fn divergences(left: &BuildConfiguration, right: &BuildConfiguration) -> Vec<Divergence> {
    let mut found = Vec::new();

    if left.output().directory != right.output().directory {
        found.push(Divergence::OutputDirectory {
            left: left.output().directory.clone(),
            right: right.output().directory.clone(),
        });
    }

    if left.proxy() != right.proxy() {
        let mut only_left = Vec::new();
        let mut differing = Vec::new();
        for rule in left.proxy().iter() {
            match right.proxy().get(rule.prefix()) {
                None => only_left.push(rule.prefix().to_string()),
                Some(other) if other != rule => differing.push(rule.prefix().to_string()),
                Some(_) => {}
            }
        }
        let only_right = right
            .proxy()
            .iter()
            .filter(|rule| left.proxy().get(rule.prefix()).is_none())
            .map(|rule| rule.prefix().to_string())
            .collect();

        found.push(Divergence::ProxyRules {
            only_left,
            only_right,
            differing,
        });
    }

    found
}

/// Check that two labelled entry points converge.
///
/// Under [`ConvergencePolicy::Warn`] every divergence is logged and returned.
pub fn check_convergence(
    left: (&str, &BuildConfiguration),
    right: (&str, &BuildConfiguration),
    policy: ConvergencePolicy,
) -> Result<Vec<Divergence>, ConvergenceError> {
    let found = divergences(left.1, right.1);
    if found.is_empty() {
        tracing::debug!(left = left.0, right = right.0, "Entry points converge");
        return Ok(found);
    }

    match policy {
        ConvergencePolicy::Strict => Err(ConvergenceError {
            left: left.0.to_string(),
            right: right.0.to_string(),
            divergences: found,
        }),
        ConvergencePolicy::Warn => {
            for divergence in &found {
                tracing::warn!(left = left.0, right = right.0, %divergence, "Entry points diverge");
            }
            Ok(found)
        }
    }
}
