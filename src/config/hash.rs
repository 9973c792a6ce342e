//! Request fingerprinting.
//!
//! A deterministic SHA-256 over everything a deployment submits, shown in
//! deploy summaries so two runs can be compared at a glance.

use sha2::{Digest, Sha256};

use crate::stack::DeploymentRequest;

/// Hasher for computing request fingerprints.
#[derive(Debug, Default)]
pub struct RequestHasher;

impl RequestHasher {
    /// Creates a new request hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a deployment request.
    ///
    /// Parameter order is significant; tags and capabilities are already sorted.
    #[must_use]
    pub fn hash_request(&self, request: &DeploymentRequest) -> String {
        let mut hasher = Sha256::new();

        update_field(&mut hasher, request.stack_name.as_bytes());
        update_field(&mut hasher, self.hash_template(&request.template_body).as_bytes());

        for (key, value) in request.parameters.iter() {
            update_field(&mut hasher, key.as_bytes());
            update_field(&mut hasher, value.as_bytes());
        }

        for (key, value) in &request.tags {
            update_field(&mut hasher, key.as_bytes());
            update_field(&mut hasher, value.as_bytes());
        }

        for capability in &request.capabilities {
            update_field(&mut hasher, capability.as_bytes());
        }

        if let Some(role) = &request.role_arn {
            update_field(&mut hasher, role.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes the fingerprint of a template body.
    #[must_use]
    pub fn hash_template(&self, template_body: &str) -> String {
        hex::encode(Sha256::digest(template_body.as_bytes()))
    }

    /// Returns the first 8 characters of a hash.
    #[must_use]
    pub fn short_hash<'a>(&self, hash: &'a str) -> &'a str {
        hash.get(..8).unwrap_or(hash)
    }
}

/// Length-prefixes a field so adjacent fields cannot run together.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_request() -> DeploymentRequest {
        DeploymentRequest::new("demo", "Resources: {}")
            .with_parameter("InstanceType", "t3.micro")
            .with_tag("Project", "demo")
            .with_capability("CAPABILITY_IAM")
    }

    #[test]
    fn test_request_hash_deterministic() {
        let hasher = RequestHasher::new();
        let request = create_test_request();
        assert_eq!(hasher.hash_request(&request), hasher.hash_request(&request));
        assert_eq!(hasher.hash_request(&request).len(), 64);
    }

    #[test]
    fn test_parameter_change_changes_hash() {
        let hasher = RequestHasher::new();
        let a = create_test_request();
        let b = create_test_request().with_parameter("InstanceType", "t3.small");
        assert_ne!(hasher.hash_request(&a), hasher.hash_request(&b));
    }

    #[test]
    fn test_field_boundaries_matter() {
        let hasher = RequestHasher::new();
        let a = DeploymentRequest::new("demo", "x").with_parameter("ab", "c");
        let b = DeploymentRequest::new("demo", "x").with_parameter("a", "bc");
        assert_ne!(hasher.hash_request(&a), hasher.hash_request(&b));
    }

    #[test]
    fn test_short_hash() {
        let hasher = RequestHasher::new();
        assert_eq!(hasher.short_hash("abcdef1234567890"), "abcdef12");
        assert_eq!(hasher.short_hash("abc"), "abc");
    }
}
