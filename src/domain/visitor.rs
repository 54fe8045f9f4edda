//! Visitor identity
//!
//! Request metadata identifying who produced a view, and the rule deciding
//! when two views come from the same visitor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::DomainError;

pub const MAX_IP_LENGTH: usize = 40;
pub const MAX_SESSION_LENGTH: usize = 40;
pub const MAX_USER_AGENT_LENGTH: usize = 255;

/// Identity of the visitor behind a view.
///
/// Deserialization goes through [`Visitor::new`], so decoded user agents are
/// truncated the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VisitorFields")]
pub struct Visitor {
    pub ip: String,
    pub session: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct VisitorFields {
    ip: String,
    session: String,
    user_agent: String,
    #[serde(default)]
    user_id: Option<Uuid>,
}

impl From<VisitorFields> for Visitor {
    fn from(fields: VisitorFields) -> Self {
        let mut visitor = Visitor::new(fields.ip, fields.session, fields.user_agent);
        visitor.user_id = fields.user_id;
        visitor
    }
}

impl Visitor {
    /// Create an anonymous visitor.
    ///
    /// The user agent is cut to its column width; clients routinely send
    /// longer strings and those views should still count.
    pub fn new(ip: impl Into<String>, session: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            session: session.into(),
            user_agent: truncate_chars(user_agent.into(), MAX_USER_AGENT_LENGTH),
            user_id: None,
        }
    }

    /// Attach the authenticated user
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Check the identifiers are present and fit their columns.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.ip.is_empty() {
            return Err(DomainError::Validation("visitor ip is required".to_string()));
        }
        if self.session.is_empty() {
            return Err(DomainError::Validation("visitor session is required".to_string()));
        }
        check_length("ip", &self.ip, MAX_IP_LENGTH)?;
        check_length("session", &self.session, MAX_SESSION_LENGTH)?;
        check_length("user_agent", &self.user_agent, MAX_USER_AGENT_LENGTH)?;
        Ok(())
    }
}

pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<(), DomainError> {
    let length = value.chars().count();
    if length > max {
        return Err(DomainError::Validation(format!(
            "{} is {} characters long (max {})",
            field, length, max
        )));
    }
    Ok(())
}

fn truncate_chars(mut value: String, max: usize) -> String {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
    value
}

/// Rule deciding whether an earlier hit belongs to the same visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorMatch {
    /// Same session token
    #[default]
    Session,
    /// Same IP address
    Ip,
    /// Same IP address and same user agent
    IpUserAgent,
    /// Same authenticated user when logged in, same session otherwise
    UserOrSession,
}

impl VisitorMatch {
    /// Whether a hit recorded for `previous` counts as the same visitor as `current`.
    pub fn matches(&self, previous: &Visitor, current: &Visitor) -> bool {
        match self {
            VisitorMatch::Session => previous.session == current.session,
            VisitorMatch::Ip => previous.ip == current.ip,
            VisitorMatch::IpUserAgent => {
                previous.ip == current.ip && previous.user_agent == current.user_agent
            }
            VisitorMatch::UserOrSession => match current.user_id {
                Some(user_id) => previous.user_id == Some(user_id),
                None => previous.session == current.session,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorMatch::Session => "session",
            VisitorMatch::Ip => "ip",
            VisitorMatch::IpUserAgent => "ip_user_agent",
            VisitorMatch::UserOrSession => "user_or_session",
        }
    }
}

impl fmt::Display for VisitorMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitorMatch {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(VisitorMatch::Session),
            "ip" => Ok(VisitorMatch::Ip),
            "ip_user_agent" => Ok(VisitorMatch::IpUserAgent),
            "user_or_session" => Ok(VisitorMatch::UserOrSession),
            other => Err(DomainError::InvalidArgument(format!(
                "unknown visitor match rule: {}",
                other
            ))),
        }
    }
}
