use serde::{Deserialize, Serialize};

/// Claims carried by an identity-provider token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id at the identity provider)
    pub sub: String,
    /// Email claim, used for the organizational policy
    pub email: String,
    /// Expiration (unix timestamp)
    pub exp: i64,
}

/// Authenticated user extracted from the request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

impl CurrentUser {
    /// Organizational membership: the email must belong to the domain
    pub fn is_member_of(&self, domain: &str) -> bool {
        let suffix = if domain.starts_with('@') {
            domain.to_string()
        } else {
            format!("@{}", domain)
        };
        self.email.ends_with(&suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_member_of() {
        let user = CurrentUser {
            id: "u1".to_string(),
            email: "dev@example.com".to_string(),
        };
        assert!(user.is_member_of("example.com"));
        assert!(user.is_member_of("@example.com"));
        assert!(!user.is_member_of("other.com"));
    }

    #[test]
    fn test_is_member_of_rejects_bare_suffix() {
        let user = CurrentUser {
            id: "u1".to_string(),
            email: "devexample.com".to_string(),
        };
        assert!(!user.is_member_of("example.com"));
    }
}
