//! Configuration for dependency resolution and the apply phase.

use objsync_model::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Policy for a dependency resolution.
///
/// Immutable once built; use the `with_*` builders to derive variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Walk owned children.
    pub include_owned: bool,
    /// Walk outgoing references.
    pub resolve_references: bool,
    /// Reserved for reverse-reference inclusion; not used by the resolver.
    pub include_referring: bool,
    /// Maximum ownership depth below the root (or below a reference target).
    pub max_owned_depth: u32,
    /// Maximum number of reference hops from the root.
    pub max_reference_depth: u32,
    /// When set, only owned children of these kinds are walked.
    pub owned_type_filter: Option<BTreeSet<Kind>>,
    /// When set, only references to these kinds are walked.
    pub reference_type_filter: Option<BTreeSet<Kind>>,
    /// Stop descending at records that already exist in the target.
    pub skip_existing: bool,
    /// Reserved.
    pub create_stub_parents: bool,
    /// Reserved.
    pub validate_all: bool,
    /// Advisory only: the visited-set guard applies regardless.
    pub allow_cycles: bool,
}

impl DependencyConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            include_owned: true,
            resolve_references: true,
            include_referring: false,
            max_owned_depth: 10,
            max_reference_depth: 3,
            owned_type_filter: None,
            reference_type_filter: None,
            skip_existing: true,
            create_stub_parents: false,
            validate_all: false,
            allow_cycles: false,
        }
    }

    /// Owned subtree only; references are not followed.
    pub fn owned_only() -> Self {
        Self::new().with_resolve_references(false)
    }

    /// The root alone.
    pub fn shallow() -> Self {
        Self::new()
            .with_include_owned(false)
            .with_resolve_references(false)
    }

    /// Sets whether owned children are walked.
    pub fn with_include_owned(mut self, include: bool) -> Self {
        self.include_owned = include;
        self
    }

    /// Sets whether references are followed.
    pub fn with_resolve_references(mut self, resolve: bool) -> Self {
        self.resolve_references = resolve;
        self
    }

    /// Sets the reserved referring-objects flag.
    pub fn with_include_referring(mut self, include: bool) -> Self {
        self.include_referring = include;
        self
    }

    /// Sets the maximum ownership depth.
    pub fn with_max_owned_depth(mut self, depth: u32) -> Self {
        self.max_owned_depth = depth;
        self
    }

    /// Sets the maximum reference depth.
    pub fn with_max_reference_depth(mut self, depth: u32) -> Self {
        self.max_reference_depth = depth;
        self
    }

    /// Restricts owned children to the given kinds.
    pub fn with_owned_types<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Kind>,
    {
        self.owned_type_filter = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts followed references to the given kinds.
    pub fn with_reference_types<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Kind>,
    {
        self.reference_type_filter = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether records already in the target are pruned.
    pub fn with_skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Sets the advisory cycle flag.
    pub fn with_allow_cycles(mut self, allow: bool) -> Self {
        self.allow_cycles = allow;
        self
    }

    /// Returns true if an owned child of this kind passes the filter.
    pub fn accepts_owned(&self, kind: &Kind) -> bool {
        self.owned_type_filter
            .as_ref()
            .map_or(true, |kinds| kinds.contains(kind))
    }

    /// Returns true if a referenced record of this kind passes the filter.
    pub fn accepts_reference(&self, kind: &Kind) -> bool {
        self.reference_type_filter
            .as_ref()
            .map_or(true, |kinds| kinds.contains(kind))
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What `delete_object` does when other records still refer to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletePolicy {
    /// Log the referring records and delete anyway.
    #[default]
    Advisory,
    /// Refuse to delete while referring records exist.
    Refuse,
}

/// Configuration for the apply phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Behavior of the referring-objects safety check.
    pub delete_policy: DeletePolicy,
    /// Copy properties onto records that already exist in the target.
    pub update_existing: bool,
    /// Plan changes without touching the target.
    pub dry_run: bool,
    /// When set, updates copy only these properties.
    pub fields: Option<Vec<String>>,
}

impl ApplyConfig {
    /// Creates the default apply configuration.
    pub fn new() -> Self {
        Self {
            delete_policy: DeletePolicy::Advisory,
            update_existing: true,
            dry_run: false,
            fields: None,
        }
    }

    /// Sets the delete policy.
    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Sets whether existing target records are updated.
    pub fn with_update_existing(mut self, update: bool) -> Self {
        self.update_existing = update;
        self
    }

    /// Sets dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Restricts updates to the named properties.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_config_defaults() {
        let config = DependencyConfig::default();
        assert!(config.include_owned);
        assert!(config.resolve_references);
        assert!(config.skip_existing);
        assert!(!config.allow_cycles);
        assert_eq!(config.max_owned_depth, 10);
        assert_eq!(config.max_reference_depth, 3);
        assert!(config.accepts_owned(&Kind::from("MoForm")));
    }

    #[test]
    fn dependency_config_builder() {
        let config = DependencyConfig::new()
            .with_max_owned_depth(2)
            .with_max_reference_depth(0)
            .with_owned_types(["LexSense"])
            .with_reference_types(["PartOfSpeech"])
            .with_skip_existing(false);

        assert_eq!(config.max_owned_depth, 2);
        assert_eq!(config.max_reference_depth, 0);
        assert!(!config.skip_existing);
        assert!(config.accepts_owned(&Kind::from("LexSense")));
        assert!(!config.accepts_owned(&Kind::from("MoForm")));
        assert!(config.accepts_reference(&Kind::from("PartOfSpeech")));
        assert!(!config.accepts_reference(&Kind::from("CmSemanticDomain")));
    }

    #[test]
    fn presets() {
        let owned = DependencyConfig::owned_only();
        assert!(owned.include_owned);
        assert!(!owned.resolve_references);

        let shallow = DependencyConfig::shallow();
        assert!(!shallow.include_owned);
        assert!(!shallow.resolve_references);
    }

    #[test]
    fn apply_config_builder() {
        let config = ApplyConfig::new()
            .with_delete_policy(DeletePolicy::Refuse)
            .with_dry_run(true)
            .with_update_existing(false)
            .with_fields(["Gloss"]);

        assert_eq!(config.delete_policy, DeletePolicy::Refuse);
        assert!(config.dry_run);
        assert!(!config.update_existing);
        assert_eq!(config.fields, Some(vec!["Gloss".to_string()]));
        assert_eq!(ApplyConfig::default().delete_policy, DeletePolicy::Advisory);
    }

    #[test]
    fn config_serializes() {
        let config = DependencyConfig::new().with_owned_types(["LexSense", "MoForm"]);
        let json = serde_json::to_string(&config).unwrap();
        let back: DependencyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
