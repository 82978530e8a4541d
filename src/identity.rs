//! Worker identity and build metadata appended to every echo response.

use std::fmt::Write as _;

const UNKNOWN: &str = "unknown";

/// Who answered the request, and which build it was.
///
/// Resolved once at startup and never changed afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    pub hostname: String,
    pub version: String,
    pub git_commit: String,
    pub git_repo: String,
    pub build_date: String,
}

impl Identity {
    /// Reads the hostname from the environment and the build metadata from
    /// the compile-time `GIT_COMMIT`, `GIT_REPO` and `BUILD_DATE` variables.
    pub fn from_env() -> Self {
        Self {
            hostname: resolve_hostname(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            git_commit: option_env!("GIT_COMMIT").unwrap_or(UNKNOWN).to_owned(),
            git_repo: option_env!("GIT_REPO").unwrap_or(UNKNOWN).to_owned(),
            build_date: option_env!("BUILD_DATE").unwrap_or(UNKNOWN).to_owned(),
        }
    }

    /// The trailing lines of an echo response, each `\n` terminated.
    pub fn trailer(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Worker hostname: {}", self.hostname);
        let _ = writeln!(out, "Version: {}", self.version);
        let _ = writeln!(out, "git Commit: {}", self.git_commit);
        let _ = writeln!(out, "git Repo: {}", self.git_repo);
        let _ = writeln!(out, "Build date: {}", self.build_date);
        out
    }
}

/// `HOSTNAME`, then `/etc/hostname`, then `"unknown"`.
fn resolve_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Identity {
        Identity {
            hostname: "worker-7".into(),
            version: "1.2.3".into(),
            git_commit: "abc123".into(),
            git_repo: "github.com/acme/echoprobe".into(),
            build_date: "2024-05-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn trailer_lists_every_field_in_order() {
        assert_eq!(
            sample().trailer(),
            "Worker hostname: worker-7\n\
             Version: 1.2.3\n\
             git Commit: abc123\n\
             git Repo: github.com/acme/echoprobe\n\
             Build date: 2024-05-01T00:00:00Z\n"
        );
    }

    #[test]
    fn from_env_always_has_a_version_and_hostname() {
        let id = Identity::from_env();
        assert_eq!(id.version, env!("CARGO_PKG_VERSION"));
        assert!(!id.hostname.is_empty());
        assert!(!id.git_commit.is_empty());
    }
}
