/// How the request was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    BearerToken,
}

/// The authenticated caller, attached to the request by an authenticator and
/// read by the authorization stage. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Identity {
    pub method: AuthMethod,
    /// Stable principal identifier: token `sub` or API key id.
    pub subject: String,
    pub roles: Vec<String>,
    /// Populated for bearer tokens only.
    pub issuer: Option<String>,
    /// Populated for bearer tokens only.
    pub audience: Option<String>,
}

impl Identity {
    pub fn api_key(subject: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            method: AuthMethod::ApiKey,
            subject: subject.into(),
            roles,
            issuer: None,
            audience: None,
        }
    }

    pub fn bearer(
        subject: impl Into<String>,
        roles: Vec<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            method: AuthMethod::BearerToken,
            subject: subject.into(),
            roles,
            issuer: Some(issuer.into()),
            audience: Some(audience.into()),
        }
    }
}
