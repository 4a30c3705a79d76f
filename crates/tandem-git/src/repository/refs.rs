//! Branch name rules.

use tandem_core::{GitSyncError, Result};

fn is_forbidden(c: char) -> bool {
    c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\')
}

/// Validates a branch name against git's ref format rules.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        GitSyncError::invalid_parameter(format!("branch name '{}': {}", name, reason))
    };

    if name.is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid("cannot start or end with '/'"));
    }
    if name.starts_with('-') {
        return Err(invalid("cannot start with '-'"));
    }
    if name.contains("..") || name.contains("//") || name.contains("@{") {
        return Err(invalid("contains an invalid sequence"));
    }
    if name.ends_with(".lock") || name.ends_with('.') {
        return Err(invalid("has an invalid suffix"));
    }
    if name.split('/').any(|segment| segment.starts_with('.')) {
        return Err(invalid("components cannot start with '.'"));
    }
    if name.chars().any(is_forbidden) {
        return Err(invalid("contains invalid characters"));
    }

    Ok(())
}

/// Turns a user supplied name into a valid branch name.
///
/// Characters git rejects become `-`, runs of separators collapse and
/// leading/trailing separators are trimmed.
///
/// ```
/// use tandem_git::repository::sanitize_branch_name;
///
/// assert_eq!(sanitize_branch_name("feature: new login").unwrap(), "feature-new-login");
/// assert_eq!(sanitize_branch_name("fix/..//typo").unwrap(), "fix/typo");
/// assert!(sanitize_branch_name(" ~^ ").is_err());
/// ```
pub fn sanitize_branch_name(requested: &str) -> Result<String> {
    let replaced: String = requested
        .trim()
        .chars()
        .map(|c| if is_forbidden(c) { '-' } else { c })
        .collect();

    let segments: Vec<String> = replaced
        .split('/')
        .map(|segment| {
            let mut cleaned = String::with_capacity(segment.len());
            for c in segment.chars() {
                if c == '-' && cleaned.ends_with('-') {
                    continue;
                }
                cleaned.push(c);
            }
            let cleaned = cleaned.replace("..", "-").replace("@{", "-");
            cleaned
                .trim_matches(|c| c == '-' || c == '.')
                .trim_end_matches(".lock")
                .to_string()
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    let name = segments.join("/");
    validate_branch_name(&name).map_err(|_| {
        GitSyncError::invalid_parameter(format!("branch name '{}'", requested.trim()))
    })?;

    Ok(name)
}

/// Returns `base`, or `base-N` for the smallest `N` not taken.
pub fn disambiguate(base: &str, exists: impl Fn(&str) -> bool) -> String {
    if !exists(base) {
        return base.to_string();
    }

    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !exists(candidate))
        .unwrap_or_else(|| base.to_string())
}
