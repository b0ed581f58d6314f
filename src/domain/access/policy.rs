use crate::domain::oauth::Identity;

/// Allow-lists applied to the Azure AD identity.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub allowed_domains: Vec<String>,
    pub allowed_emails: Vec<String>,
}

impl AccessPolicy {
    pub fn new(allowed_domains: Vec<String>, allowed_emails: Vec<String>) -> Self {
        Self {
            allowed_domains,
            allowed_emails,
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed_domains.is_empty() && self.allowed_emails.is_empty()
    }

    pub fn permits(&self, identity: &Identity) -> bool {
        authorize(identity, &self.allowed_domains, &self.allowed_emails)
    }
}

/// Empty lists admit every signed-in identity. Otherwise the exact email
/// address must be listed, or its domain must be (in any case).
pub fn authorize(identity: &Identity, allowed_domains: &[String], allowed_emails: &[String]) -> bool {
    if allowed_domains.is_empty() && allowed_emails.is_empty() {
        return true;
    }

    let email = identity.email.trim();
    if allowed_emails
        .iter()
        .any(|allowed| allowed.trim() == email)
    {
        return true;
    }

    match identity.domain() {
        Some(domain) => allowed_domains
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(&domain)),
        None => false,
    }
}
