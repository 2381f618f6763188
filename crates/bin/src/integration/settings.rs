//! Store location and credentials from flags and environment.

use clap::Args;
use steelwatch_data::InstrumentSource;
use steelwatch_output::store::github::{DEFAULT_API_BASE, DEFAULT_COMMIT_MESSAGE};
use steelwatch_output::{DEFAULT_SNAPSHOT_PATH, PublishError, PublisherConfig, StoreConfig};
use thiserror::Error;

/// Host serving raw repository files.
const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

/// Configuration problems detected before any network call.
#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    /// No repository given.
    #[error("No snapshot repository configured (use --repo or STEELWATCH_REPO)")]
    MissingRepo,

    /// No credential given.
    #[error("No GitHub token configured (set TARIFF_GITHUB_TOKEN)")]
    MissingToken,

    /// The store rejected the config.
    #[error(transparent)]
    Store(#[from] PublishError),
}

/// Where the snapshot lives.
#[derive(Debug, Clone, Args)]
pub(crate) struct StoreArgs {
    /// Repository holding the snapshot, as owner/name
    #[arg(long, env = "STEELWATCH_REPO", global = true)]
    pub(crate) repo: Option<String>,

    /// Snapshot path inside the repository
    #[arg(long, env = "STEELWATCH_PATH", default_value = DEFAULT_SNAPSHOT_PATH, global = true)]
    pub(crate) path: String,

    /// Branch holding the snapshot
    #[arg(long, env = "STEELWATCH_BRANCH", default_value = "main", global = true)]
    pub(crate) branch: String,

    /// Token with write access to the repository
    #[arg(long, env = "TARIFF_GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub(crate) token: Option<String>,

    /// GitHub API root
    #[arg(long, env = "STEELWATCH_API_BASE", default_value = DEFAULT_API_BASE, global = true, hide = true)]
    pub(crate) api_base: String,

    /// Commit message for snapshot updates
    #[arg(long, default_value = DEFAULT_COMMIT_MESSAGE, global = true)]
    pub(crate) message: String,
}

impl StoreArgs {
    fn repo(&self) -> Result<&str, SettingsError> {
        self.repo
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(SettingsError::MissingRepo)
    }

    /// Validated store config.
    pub(crate) fn store_config(&self) -> Result<StoreConfig, SettingsError> {
        let repo = self.repo()?;
        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SettingsError::MissingToken)?;

        let config = StoreConfig {
            repo: repo.to_string(),
            branch: self.branch.clone(),
            token: token.to_string(),
            api_base: self.api_base.clone(),
            commit_message: self.message.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Publisher config for the snapshot path.
    pub(crate) fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            path: self.path.trim_start_matches('/').to_string(),
        }
    }

    /// Raw URL of the published snapshot.
    pub(crate) fn published_source(&self) -> Result<InstrumentSource, SettingsError> {
        Ok(InstrumentSource::Url(format!(
            "{}/{}/{}/{}",
            RAW_CONTENT_BASE,
            self.repo()?,
            self.branch,
            self.path.trim_start_matches('/')
        )))
    }

    /// `explicit` if given, else the published snapshot.
    pub(crate) fn source_or_published(
        &self,
        explicit: Option<InstrumentSource>,
    ) -> Result<InstrumentSource, SettingsError> {
        explicit.map_or_else(|| self.published_source(), Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args() -> StoreArgs {
        StoreArgs {
            repo: Some("octo/dashboards".to_string()),
            path: DEFAULT_SNAPSHOT_PATH.to_string(),
            branch: "main".to_string(),
            token: Some("ghp_token".to_string()),
            api_base: DEFAULT_API_BASE.to_string(),
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    #[test]
    fn test_store_config() {
        let config = args().store_config().unwrap();
        assert_eq!(config.repo, "octo/dashboards");
        assert_eq!(config.branch, "main");
        assert_eq!(config.token, "ghp_token");
        assert_eq!(config.commit_message, DEFAULT_COMMIT_MESSAGE);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn test_missing_token(#[case] token: Option<&str>) {
        let mut args = args();
        args.token = token.map(String::from);
        assert!(matches!(args.store_config(), Err(SettingsError::MissingToken)));
    }

    #[test]
    fn test_missing_repo() {
        let mut args = args();
        args.repo = None;
        assert!(matches!(args.store_config(), Err(SettingsError::MissingRepo)));
        assert!(matches!(args.published_source(), Err(SettingsError::MissingRepo)));
    }

    #[test]
    fn test_malformed_repo() {
        let mut args = args();
        args.repo = Some("dashboards".to_string());
        assert!(matches!(
            args.store_config(),
            Err(SettingsError::Store(PublishError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_published_source() {
        let mut args = args();
        args.path = "/data/steel.csv".to_string();
        args.branch = "gh-pages".to_string();
        assert_eq!(
            args.published_source().unwrap(),
            InstrumentSource::Url(
                "https://raw.githubusercontent.com/octo/dashboards/gh-pages/data/steel.csv"
                    .to_string()
            )
        );
        assert_eq!(args.publisher_config().path, "data/steel.csv");
    }

    #[test]
    fn test_explicit_source_wins() {
        let mut args = args();
        args.repo = None;
        let explicit = InstrumentSource::Path("tickers.csv".into());
        assert_eq!(
            args.source_or_published(Some(explicit.clone())).unwrap(),
            explicit
        );
    }
}
