use super::PublishError;
use std::fmt;
use url::Url;

/// `owner/name` of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Accepts `https://host/owner/name[.git]` and `git@host:owner/name.git`
    pub fn parse(url: &str) -> Result<Self, PublishError> {
        let invalid = || PublishError::InvalidUrl(url.to_string());
        let trimmed = url.trim();

        let path = if let Some(rest) = trimmed.strip_prefix("git@") {
            rest.split_once(':').map(|(_, path)| path.to_string()).ok_or_else(invalid)?
        } else {
            let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
            if parsed.host_str().is_none() {
                return Err(invalid());
            }
            parsed.path().to_string()
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let name = segments.next().ok_or_else(invalid)?.trim_end_matches(".git");
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Name of the fork under the shared organization
    pub fn fork_name(&self) -> String {
        format!("{}-{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
