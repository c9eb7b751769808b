//! Deserialized shapes of the GitHub resources the miner consumes

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryDto {
    pub id: u64,
    pub name: CompactString,
    pub full_name: CompactString,
    pub description: Option<CompactString>,
    pub default_branch: Option<CompactString>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
    /// Repository size in KB
    #[serde(default)]
    pub size: u64,
    pub html_url: CompactString,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDto {
    pub id: u64,
    pub login: CompactString,
    pub name: Option<CompactString>,
    pub company: Option<CompactString>,
    pub location: Option<CompactString>,
    pub email: Option<CompactString>,
    pub public_repos: Option<u32>,
    pub followers: Option<u32>,
    pub following: Option<u32>,
    /// Only present on the contributors endpoint
    pub contributions: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueDto {
    pub id: u64,
    pub number: u64,
    pub title: CompactString,
    pub state: IssueState,
    pub body: Option<CompactString>,
    pub user: Option<UserDto>,
    #[serde(default)]
    pub comments: u32,
    pub html_url: CompactString,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentDto {
    pub id: u64,
    pub body: CompactString,
    pub user: Option<UserDto>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueEventDto {
    pub id: u64,
    pub event: CompactString,
    pub actor: Option<UserDto>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Issue state filter and response field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    /// Query-parameter form expected by the issues endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
