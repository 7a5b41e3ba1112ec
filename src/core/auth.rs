//! Authorization context and policies
//!
//! An [`AuthContext`] is built from a validated session token (or its
//! absence) and checked against an [`AuthPolicy`] before an operation runs.

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Authenticated user
    User { user_id: i64, roles: Vec<String> },

    /// No authentication (public access)
    Anonymous,
}

impl AuthContext {
    /// Get user_id if available
    pub fn user_id(&self) -> Option<i64> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            AuthContext::Anonymous => None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        match self {
            AuthContext::User { roles, .. } => roles.iter().any(|r| r == role),
            AuthContext::Anonymous => false,
        }
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<String>),

    /// Combination of policies (AND)
    And(Vec<AuthPolicy>),

    /// Combination of policies (OR)
    Or(Vec<AuthPolicy>),
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,

            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),

            AuthPolicy::HasRole(required_roles) => {
                required_roles.iter().any(|r| context.has_role(r))
            }

            AuthPolicy::And(policies) => policies.iter().all(|p| p.check(context)),

            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(context)),
        }
    }

    /// Parse a policy string such as `"public"` or `"role:admin"`
    pub fn parse_policy(s: &str) -> Self {
        match s {
            "public" => AuthPolicy::Public,
            "authenticated" => AuthPolicy::Authenticated,
            s => match s.strip_prefix("role:") {
                Some(role) => AuthPolicy::HasRole(vec![role.to_string()]),
                None => AuthPolicy::Authenticated, // Default
            },
        }
    }
}
