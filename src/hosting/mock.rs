use super::{
    FileWrite, HostingApi, HostingError, PullRequestInfo, PullRequestSpec, RepositoryInfo,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// In-memory code host used by tests and dry runs
///
/// Repositories are seeded with [`MockHosting::add_repository`]. Forks copy
/// the source's branches. Pull requests against a base branch that does not
/// exist fail with a 422 the way GitHub does.
#[derive(Default)]
pub struct MockHosting {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    repos: HashMap<String, MockRepo>,
    pulls: Vec<(String, PullRequestSpec)>,
    fork_calls: usize,
    failing_forks: Vec<String>,
    fork_account: Option<String>,
}

#[derive(Clone)]
struct MockRepo {
    info: RepositoryInfo,
    branches: BTreeMap<String, String>,
    files: BTreeMap<(String, String), String>,
}

impl MockHosting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a repository with the given branches
    pub fn add_repository(&self, full_name: &str, branches: &[&str]) {
        let default_branch = branches.first().copied().unwrap_or("main").to_string();
        let repo = MockRepo {
            info: RepositoryInfo {
                full_name: full_name.to_string(),
                html_url: format!("https://github.com/{}", full_name),
                default_branch,
            },
            branches: branches
                .iter()
                .map(|b| (b.to_string(), format!("sha-{}-{}", full_name, b)))
                .collect(),
            files: BTreeMap::new(),
        };
        self.lock().repos.insert(full_name.to_string(), repo);
    }

    /// Makes a fork of `full_name` fail with a 403
    pub fn fail_forks_of(&self, full_name: &str) {
        self.lock().failing_forks.push(full_name.to_string());
    }

    /// Forks land in `account` whatever organization is requested, like a
    /// token without organization access
    pub fn fork_into(&self, account: &str) {
        self.lock().fork_account = Some(account.to_string());
    }

    pub fn fork_calls(&self) -> usize {
        self.lock().fork_calls
    }

    pub fn has_branch(&self, full_name: &str, branch: &str) -> bool {
        self.lock()
            .repos
            .get(full_name)
            .map(|r| r.branches.contains_key(branch))
            .unwrap_or(false)
    }

    /// Content of a file written to the given branch
    pub fn file(&self, full_name: &str, branch: &str, path: &str) -> Option<String> {
        self.lock()
            .repos
            .get(full_name)
            .and_then(|r| r.files.get(&(branch.to_string(), path.to_string())).cloned())
    }

    /// Pull requests opened so far, with the repository they target
    pub fn pull_requests(&self) -> Vec<(String, PullRequestSpec)> {
        self.lock().pulls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(what: &str) -> HostingError {
    HostingError::Status {
        status: 404,
        message: format!("{} Not Found", what),
    }
}

#[async_trait]
impl HostingApi for MockHosting {
    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryInfo>, HostingError> {
        Ok(self.lock().repos.get(full_name).map(|r| r.info.clone()))
    }

    async fn create_fork(
        &self,
        owner: &str,
        repo: &str,
        organization: &str,
        fork_name: &str,
    ) -> Result<RepositoryInfo, HostingError> {
        let source_name = format!("{}/{}", owner, repo);
        let mut state = self.lock();
        state.fork_calls += 1;

        if state.failing_forks.contains(&source_name) {
            return Err(HostingError::Status {
                status: 403,
                message: "Resource not accessible by integration".to_string(),
            });
        }

        let source = state
            .repos
            .get(&source_name)
            .cloned()
            .ok_or_else(|| not_found(&source_name))?;

        let owner = state.fork_account.as_deref().unwrap_or(organization);
        let fork_full = format!("{}/{}", owner, fork_name);
        let fork = MockRepo {
            info: RepositoryInfo {
                full_name: fork_full.clone(),
                html_url: format!("https://github.com/{}", fork_full),
                default_branch: source.info.default_branch.clone(),
            },
            branches: source.branches.clone(),
            files: BTreeMap::new(),
        };
        let info = fork.info.clone();
        state.repos.insert(fork_full, fork);
        Ok(info)
    }

    async fn get_branch_sha(&self, full_name: &str, branch: &str) -> Result<String, HostingError> {
        self.lock()
            .repos
            .get(full_name)
            .and_then(|r| r.branches.get(branch).cloned())
            .ok_or_else(|| not_found(&format!("{}@{}", full_name, branch)))
    }

    async fn create_branch(
        &self,
        full_name: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), HostingError> {
        let mut state = self.lock();
        let repo = state
            .repos
            .get_mut(full_name)
            .ok_or_else(|| not_found(full_name))?;
        if repo.branches.contains_key(branch) {
            return Err(HostingError::Status {
                status: 422,
                message: "Reference already exists".to_string(),
            });
        }
        repo.branches.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn get_file_sha(
        &self,
        full_name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>, HostingError> {
        let state = self.lock();
        let repo = state.repos.get(full_name).ok_or_else(|| not_found(full_name))?;
        Ok(repo
            .files
            .get(&(branch.to_string(), path.to_string()))
            .map(|content| format!("blob-{}", content.len())))
    }

    async fn put_file(&self, full_name: &str, file: FileWrite) -> Result<(), HostingError> {
        let mut state = self.lock();
        let repo = state
            .repos
            .get_mut(full_name)
            .ok_or_else(|| not_found(full_name))?;
        if !repo.branches.contains_key(&file.branch) {
            return Err(not_found(&file.branch));
        }
        let key = (file.branch.clone(), file.path.clone());
        if repo.files.contains_key(&key) && file.sha.is_none() {
            return Err(HostingError::Status {
                status: 422,
                message: "\"sha\" wasn't supplied".to_string(),
            });
        }
        repo.files.insert(key, file.content);
        Ok(())
    }

    async fn create_pull_request(
        &self,
        full_name: &str,
        spec: PullRequestSpec,
    ) -> Result<PullRequestInfo, HostingError> {
        let mut state = self.lock();
        let repo = state.repos.get(full_name).ok_or_else(|| not_found(full_name))?;
        if !repo.branches.contains_key(&spec.base) {
            return Err(HostingError::Status {
                status: 422,
                message: "Validation Failed: base".to_string(),
            });
        }
        let html_url = repo.info.html_url.clone();
        state.pulls.push((full_name.to_string(), spec));
        let number = state.pulls.len() as u64;
        Ok(PullRequestInfo {
            html_url: format!("{}/pull/{}", html_url, number),
            number,
        })
    }
}
