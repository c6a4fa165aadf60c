//! Role projection and role header encoding

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::domain::model::SemanticModel;

/// Characters left unescaped in URI components
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Derives the roles a caller holds on a model. Never mutates the bindings.
#[derive(Debug, Clone, Default)]
pub struct AccessControlInjector;

impl AccessControlInjector {
    pub fn new() -> Self {
        Self
    }

    /// Names of the model's roles whose membership contains the user
    pub fn roles_for(&self, model: &SemanticModel, user_id: &str) -> Vec<String> {
        model
            .roles()
            .iter()
            .filter(|role| role.has_member(user_id))
            .map(|role| role.name.clone())
            .collect()
    }

    /// Roles for an optional caller; drafts and anonymous callers get none
    pub fn effective_roles(
        &self,
        model: &SemanticModel,
        user_id: Option<&str>,
        is_draft: bool,
    ) -> Vec<String> {
        match user_id {
            Some(user_id) if !is_draft => self.roles_for(model, user_id),
            _ => Vec::new(),
        }
    }

    /// Comma-joined, URI-component-encoded role names, or `None` for no roles
    pub fn role_header(&self, roles: &[String]) -> Option<String> {
        if roles.is_empty() {
            return None;
        }

        Some(
            roles
                .iter()
                .map(|role| utf8_percent_encode(role, URI_COMPONENT).to_string())
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DataSource, DataSourceType, ModelId, Protocol, RoleBinding};

    fn model() -> SemanticModel {
        SemanticModel::new(
            ModelId::new("sales").unwrap(),
            "Sales",
            DataSource::new("ds", "Warehouse", DataSourceType::new("pg", Protocol::Sql)),
        )
        .with_role(RoleBinding::new("Finance").with_user("u1").with_user("u2"))
        .with_role(RoleBinding::new("Sales Team").with_user("u1"))
        .with_role(RoleBinding::new("HR").with_user("u3"))
    }

    #[test]
    fn test_roles_for_member() {
        let injector = AccessControlInjector::new();
        assert_eq!(
            injector.roles_for(&model(), "u1"),
            vec!["Finance".to_string(), "Sales Team".to_string()]
        );
        assert_eq!(injector.roles_for(&model(), "u2"), vec!["Finance".to_string()]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let injector = AccessControlInjector::new();
        assert!(injector.roles_for(&model(), "nobody").is_empty());
        assert_eq!(injector.role_header(&[]), None);
    }

    #[test]
    fn test_drafts_and_anonymous_callers_have_no_roles() {
        let injector = AccessControlInjector::new();
        assert!(injector.effective_roles(&model(), Some("u1"), true).is_empty());
        assert!(injector.effective_roles(&model(), None, false).is_empty());
        assert_eq!(injector.effective_roles(&model(), Some("u3"), false), vec!["HR".to_string()]);
    }

    #[test]
    fn test_header_encodes_each_role() {
        let injector = AccessControlInjector::new();
        let roles = vec!["Finance".to_string(), "Sales Team".to_string(), "R&D (EU)".to_string()];
        assert_eq!(
            injector.role_header(&roles).unwrap(),
            "Finance,Sales%20Team,R%26D%20(EU)"
        );
    }

    #[test]
    fn test_bindings_are_untouched() {
        let model = model();
        let before = model.roles().to_vec();
        AccessControlInjector::new().roles_for(&model, "u1");
        assert_eq!(model.roles(), before.as_slice());
    }
}
