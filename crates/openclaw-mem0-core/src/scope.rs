use serde_json::{Map, Value};
use tracing::warn;

/// Organization/project identifiers attached to tenant-scoped requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectScope {
    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
}

impl ProjectScope {
    #[must_use]
    pub fn ids(&self) -> Option<(&str, &str)> {
        Some((self.organization_id.as_deref()?, self.project_id.as_deref()?))
    }

    #[must_use]
    pub fn names(&self) -> Option<(&str, &str)> {
        Some((
            self.organization_name.as_deref()?,
            self.project_name.as_deref()?,
        ))
    }

    /// Logs a warning for every half-configured pair. Never fails.
    pub fn validate(&self) -> bool {
        let mut ok = true;
        if self.organization_name.is_some() != self.project_name.is_some() {
            warn!(
                "Both organizationName and projectName must be provided together when using either; names are deprecated in favor of organizationId/projectId"
            );
            ok = false;
        }
        if self.organization_id.is_some() != self.project_id.is_some() {
            warn!("Both organizationId and projectId must be provided together when using either");
            ok = false;
        }
        ok
    }

    /// Merges scoping into an outgoing payload or parameter map. Ids win over
    /// names: when both pairs are complete only the ids are sent.
    pub fn apply(&self, target: &mut Map<String, Value>) {
        self.validate();
        if let Some((org, project)) = self.names() {
            target.insert("org_name".to_string(), Value::from(org));
            target.insert("project_name".to_string(), Value::from(project));
        }
        if let Some((org, project)) = self.ids() {
            target.insert("org_id".to_string(), Value::from(org));
            target.insert("project_id".to_string(), Value::from(project));
            target.remove("org_name");
            target.remove("project_name");
        }
    }

    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        self.apply(&mut map);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectScope;
    use serde_json::{Map, Value, json};

    fn full_scope() -> ProjectScope {
        ProjectScope {
            organization_name: Some("acme".to_string()),
            project_name: Some("bots".to_string()),
            organization_id: Some("org-1".to_string()),
            project_id: Some("proj-1".to_string()),
        }
    }

    #[test]
    fn ids_take_precedence_over_names() {
        let map = full_scope().to_map();
        assert_eq!(
            Value::Object(map),
            json!({"org_id": "org-1", "project_id": "proj-1"})
        );
    }

    #[test]
    fn names_are_used_when_ids_are_missing() {
        let scope = ProjectScope {
            organization_id: None,
            project_id: None,
            ..full_scope()
        };
        assert_eq!(
            Value::Object(scope.to_map()),
            json!({"org_name": "acme", "project_name": "bots"})
        );
    }

    #[test]
    fn half_pairs_are_ignored_with_a_warning() {
        let scope = ProjectScope {
            organization_id: Some("org-1".to_string()),
            ..ProjectScope::default()
        };
        assert!(!scope.validate());
        let mut payload = Map::new();
        payload.insert("query".to_string(), json!("q"));
        scope.apply(&mut payload);
        assert_eq!(Value::Object(payload), json!({"query": "q"}));
    }

    #[test]
    fn ids_replace_caller_supplied_names() {
        let scope = ProjectScope {
            organization_name: None,
            project_name: None,
            ..full_scope()
        };
        let mut payload = Map::new();
        payload.insert("org_name".to_string(), json!("stale"));
        scope.apply(&mut payload);
        assert!(payload.get("org_name").is_none());
        assert_eq!(payload.get("org_id"), Some(&json!("org-1")));
    }
}
