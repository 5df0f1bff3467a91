use anyhow::Result;

use super::Rule;

/// Validation is intentionally strict: a rule set is accepted in full or
/// rejected in full, before it can influence any authorization decision.
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
    if rules.is_empty() {
        anyhow::bail!("policy file contains no policies");
    }

    for (i, rule) in rules.iter().enumerate() {
        if rule.method.trim().is_empty() {
            anyhow::bail!("policy[{}]: method is required", i);
        }
        if rule.path.trim().is_empty() {
            anyhow::bail!("policy[{}]: path is required", i);
        }
        if !rule.path.starts_with('/') {
            anyhow::bail!("policy[{}]: path must start with '/'", i);
        }
        if rule.roles.is_empty() {
            anyhow::bail!("policy[{}]: roles must not be empty", i);
        }
        if rule.roles.iter().any(|r| r.trim().is_empty()) {
            anyhow::bail!("policy[{}]: role names must not be empty", i);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(method: &str, path: &str, roles: &[&str]) -> Rule {
        Rule {
            method: method.to_string(),
            path: path.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn valid_rules_accepted() {
        let rules = vec![
            rule("GET", "/api/public", &["user"]),
            rule("POST", "/api/admin", &["admin"]),
        ];
        assert!(validate_rules(&rules).is_ok());
    }

    #[test]
    fn empty_set_rejected() {
        assert!(validate_rules(&[]).is_err());
    }

    #[test]
    fn empty_method_rejected() {
        let err = validate_rules(&[rule("", "/api", &["user"])]).unwrap_err();
        assert!(err.to_string().contains("policy[0]"));
        assert!(err.to_string().contains("method"));
    }

    #[test]
    fn relative_path_rejected() {
        assert!(validate_rules(&[rule("GET", "api", &["user"])]).is_err());
    }

    #[test]
    fn empty_roles_rejected() {
        assert!(validate_rules(&[rule("GET", "/api", &[])]).is_err());
    }

    #[test]
    fn blank_role_name_rejected() {
        let err = validate_rules(&[
            rule("GET", "/api", &["user"]),
            rule("GET", "/other", &["admin", " "]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("policy[1]"));
    }
}
