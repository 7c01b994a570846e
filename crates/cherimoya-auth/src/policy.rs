//! Authorizer response documents.

use serde::{Deserialize, Serialize};

/// Policy language version; fixed by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";
/// The single action an authorizer grants or denies.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";
/// Principal reported on every denial.
pub const UNAUTHORIZED_PRINCIPAL: &str = "Unauthorized";

/// Allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

/// Policy document envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

/// The document returned to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

impl AuthorizerResponse {
    /// Allow `principal_id` to invoke `resource`.
    pub fn allow(principal_id: impl Into<String>, resource: impl Into<String>) -> Self {
        build_policy(principal_id, Effect::Allow, resource)
    }

    /// Deny the `Unauthorized` principal on `resource`.
    pub fn deny_unauthorized(resource: impl Into<String>) -> Self {
        build_policy(UNAUTHORIZED_PRINCIPAL, Effect::Deny, resource)
    }

    /// The effect of the (only) statement.
    pub fn effect(&self) -> Effect {
        self.policy_document
            .statement
            .first()
            .map_or(Effect::Deny, |s| s.effect)
    }

    pub fn is_allowed(&self) -> bool {
        self.effect() == Effect::Allow
    }

    /// The resource of the (only) statement.
    pub fn resource(&self) -> &str {
        self.policy_document
            .statement
            .first()
            .map_or("", |s| s.resource.as_str())
    }
}

/// Build the fixed-shape document: one statement, one action, one resource.
pub fn build_policy(
    principal_id: impl Into<String>,
    effect: Effect,
    resource: impl Into<String>,
) -> AuthorizerResponse {
    AuthorizerResponse {
        principal_id: principal_id.into(),
        policy_document: PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                action: INVOKE_ACTION.to_string(),
                effect,
                resource: resource.into(),
            }],
        },
    }
}
