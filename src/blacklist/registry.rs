//! Blacklist Registry
//!
//! Exact-match membership sets for blocked IPs and user agents.

use std::sync::Arc;

use crate::domain::visitor::{check_length, MAX_IP_LENGTH, MAX_USER_AGENT_LENGTH};
use crate::domain::DomainError;
use crate::error::HitCountResult;
use crate::store::HitBackend;

/// Registry of blacklisted IPs and user agents
#[derive(Clone)]
pub struct BlacklistRegistry {
    backend: Arc<dyn HitBackend>,
}

impl BlacklistRegistry {
    pub fn new(backend: Arc<dyn HitBackend>) -> Self {
        Self { backend }
    }

    pub async fn is_ip_blacklisted(&self, ip: &str) -> HitCountResult<bool> {
        Ok(self.backend.is_ip_blacklisted(ip).await?)
    }

    pub async fn is_user_agent_blacklisted(&self, user_agent: &str) -> HitCountResult<bool> {
        Ok(self.backend.is_user_agent_blacklisted(user_agent).await?)
    }

    /// Block an IP. Returns false if it was already blocked.
    pub async fn add_ip(&self, ip: &str) -> HitCountResult<bool> {
        validate_entry("ip", ip, MAX_IP_LENGTH)?;
        let added = self.backend.add_blacklisted_ip(ip).await?;
        if added {
            tracing::info!(ip = %ip, "IP blacklisted");
        }
        Ok(added)
    }

    /// Unblock an IP. Returns false if it was not blocked.
    pub async fn remove_ip(&self, ip: &str) -> HitCountResult<bool> {
        Ok(self.backend.remove_blacklisted_ip(ip).await?)
    }

    /// Block a user agent. Returns false if it was already blocked.
    pub async fn add_user_agent(&self, user_agent: &str) -> HitCountResult<bool> {
        validate_entry("user_agent", user_agent, MAX_USER_AGENT_LENGTH)?;
        let added = self.backend.add_blacklisted_user_agent(user_agent).await?;
        if added {
            tracing::info!(user_agent = %user_agent, "User agent blacklisted");
        }
        Ok(added)
    }

    /// Unblock a user agent. Returns false if it was not blocked.
    pub async fn remove_user_agent(&self, user_agent: &str) -> HitCountResult<bool> {
        Ok(self.backend.remove_blacklisted_user_agent(user_agent).await?)
    }

    pub async fn list_ips(&self) -> HitCountResult<Vec<String>> {
        Ok(self.backend.blacklisted_ips().await?)
    }

    pub async fn list_user_agents(&self) -> HitCountResult<Vec<String>> {
        Ok(self.backend.blacklisted_user_agents().await?)
    }
}

fn validate_entry(field: &str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::Validation(format!(
            "blacklisted {} cannot be empty",
            field
        )));
    }
    check_length(field, value, max)
}
