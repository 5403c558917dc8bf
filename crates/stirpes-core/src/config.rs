use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use crate::event::LegalBasis;
use crate::fraction::Fraction;
use crate::graph::SiblingScope;
use crate::rules::{Rule, RuleSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub jurisdiction: JurisdictionConfig,
    #[serde(default)]
    pub output: Option<String>,
}

/// Overrides for the built-in [`RuleSet`]. Unset fields keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub spouse_share_with_descendants: Option<Fraction>,
    #[serde(default)]
    pub spouse_share_with_parents: Option<Fraction>,
    #[serde(default)]
    pub sibling_scope: Option<SiblingScope>,
    #[serde(default)]
    pub parents_preempt_siblings: Option<bool>,
    #[serde(default)]
    pub sibling_representation: Option<bool>,
    /// Per-rule citations, merged over the built-in ones.
    #[serde(default)]
    pub citations: BTreeMap<Rule, LegalBasis>,
}

impl JurisdictionConfig {
    /// Layer these overrides onto `base`.
    #[must_use]
    pub fn apply_to(&self, mut base: RuleSet) -> RuleSet {
        if let Some(name) = &self.name {
            base.name.clone_from(name);
        }
        if let Some(share) = self.spouse_share_with_descendants {
            base.spouse_share_with_descendants = share;
        }
        if let Some(share) = self.spouse_share_with_parents {
            base.spouse_share_with_parents = share;
        }
        if let Some(scope) = self.sibling_scope {
            base.sibling_scope = scope;
        }
        if let Some(preempt) = self.parents_preempt_siblings {
            base.parents_preempt_siblings = preempt;
        }
        if let Some(represent) = self.sibling_representation {
            base.sibling_representation = represent;
        }
        for (rule, basis) in &self.citations {
            base.citations.insert(*rule, basis.clone());
        }
        base
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    /// Project rules layered over the built-in defaults.
    pub rules: RuleSet,
    pub resolved_output: String,
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".stirpes/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("stirpes/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load project and user config and resolve the output mode.
///
/// `cli_format` is the value of an explicit `--json`/`--format` flag.
pub fn resolve_config(project_root: &Path, cli_format: Option<&str>) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let rules = project.jurisdiction.apply_to(RuleSet::default());
    rules
        .validate()
        .with_context(|| format!("Invalid [jurisdiction] in {}", project_root.display()))?;

    let env_format = env::var("FORMAT").ok();
    let user_output = user.output.clone().or_else(|| project.output.clone());
    let resolved_output = resolve_output(cli_format, user_output, env_format);

    Ok(EffectiveConfig {
        project,
        user,
        rules,
        resolved_output,
    })
}

fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        // canonical values
        "pretty" => Some("pretty"),
        "text" => Some("text"),
        "json" => Some("json"),
        // aliases
        "human" => Some("pretty"),
        "table" | "plain" => Some("text"),
        _ => None,
    }
}

fn resolve_output(
    cli_format: Option<&str>,
    config_output: Option<String>,
    env_format: Option<String>,
) -> String {
    if let Some(mode) = cli_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = config_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = TempDir::new().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg, ProjectConfig::default());
        let rules = cfg.jurisdiction.apply_to(RuleSet::default());
        assert_eq!(rules, RuleSet::default());
    }

    #[test]
    fn project_jurisdiction_overrides_defaults() {
        let root = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(root.path().join(".stirpes")).expect("mkdir");
        std::fs::write(
            root.path().join(".stirpes/config.toml"),
            r#"
output = "json"

[jurisdiction]
name = "Example State"
spouse_share_with_descendants = "1/3"
sibling_scope = "full_blood"
parents_preempt_siblings = false

[jurisdiction.citations.descendants_only]
statute = "Ex. Code § 1"
title = "Descendants"
"#,
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.output.as_deref(), Some("json"));

        let rules = cfg.jurisdiction.apply_to(RuleSet::default());
        assert_eq!(rules.name, "Example State");
        assert_eq!(rules.spouse_share_with_descendants, Fraction::new(1, 3).expect("valid"));
        assert_eq!(rules.spouse_share_with_parents, Fraction::new(1, 2).expect("valid"));
        assert_eq!(rules.sibling_scope, SiblingScope::FullBlood);
        assert!(!rules.parents_preempt_siblings);
        assert_eq!(
            rules.citation(Rule::DescendantsOnly).map(|b| b.statute.as_str()),
            Some("Ex. Code § 1")
        );
        // Built-in citations survive.
        assert!(rules.citation(Rule::SpouseAndDescendants).is_some());
    }

    #[test]
    fn malformed_project_config_reports_path() {
        let root = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(root.path().join(".stirpes")).expect("mkdir");
        std::fs::write(
            root.path().join(".stirpes/config.toml"),
            "[jurisdiction]\nspouse_share_with_parents = \"1/0\"\n",
        )
        .expect("write config");

        let err = load_project_config(root.path()).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn cli_format_overrides_env_and_config() {
        let output = resolve_output(
            Some("json"),
            Some("pretty".to_string()),
            Some("text".to_string()),
        );
        assert_eq!(output, "json");
    }

    #[test]
    fn aliases_are_normalized() {
        let pretty = resolve_output(None, Some("table".to_string()), Some("human".to_string()));
        assert_eq!(pretty, "pretty");

        let text = resolve_output(None, Some("human".to_string()), Some("plain".to_string()));
        assert_eq!(text, "text");
    }

    #[test]
    fn unknown_values_fall_through() {
        let output = resolve_output(Some("yaml"), Some("json".to_string()), Some("xml".to_string()));
        assert_eq!(output, "json");
    }
}
