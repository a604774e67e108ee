use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use std::path::PathBuf;

/// Region used when neither the caller nor the environment names one
pub const FALLBACK_REGION: &str = "us-east-1";

/// Environment variables consulted for the default region, in order
pub const REGION_ENV_VARS: [&str; 2] = ["AWS_DEFAULT_REGION", "AWS_REGION"];

const ENDPOINT_ENV_VAR: &str = "BUCKETZIP_ENDPOINT_URL";
const PATH_STYLE_ENV_VAR: &str = "BUCKETZIP_FORCE_PATH_STYLE";

/// Configuration for creating a transfer client
#[derive(Debug, Clone, Default)]
pub struct TransferConfig {
    /// Explicit region; falls back to the environment, then [`FALLBACK_REGION`]
    pub region: Option<String>,
    /// Optional custom endpoint URL (LocalStack, MinIO, ...)
    pub endpoint_url: Option<String>,
    /// Whether to use path-style addressing (required for some S3-compatible services)
    pub force_path_style: bool,
    /// Directory for temporary archives; the OS temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl TransferConfig {
    /// Build a configuration from `BUCKETZIP_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let force_path_style = lookup(PATH_STYLE_ENV_VAR)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        TransferConfig {
            region: None,
            endpoint_url: non_empty(lookup(ENDPOINT_ENV_VAR)),
            force_path_style,
            temp_dir: None,
        }
    }

    /// Set an explicit region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// The region this configuration resolves to in the current environment
    pub fn resolve_region(&self) -> String {
        resolve_region_with(self.region.as_deref(), |name| std::env::var(name).ok())
    }
}

/// Resolve a region: explicit value, then [`REGION_ENV_VARS`], then
/// [`FALLBACK_REGION`]. Empty values count as unset.
pub fn resolve_region_with(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    non_empty(explicit.map(String::from))
        .or_else(|| {
            REGION_ENV_VARS
                .iter()
                .find_map(|name| non_empty(lookup(name)))
        })
        .unwrap_or_else(|| FALLBACK_REGION.to_string())
}

/// Build an S3 client bound to the resolved region.
/// Returns (client, region)
pub async fn create_s3_client(config: &TransferConfig) -> (Client, String) {
    let region = config.resolve_region();

    let base_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.clone()))
        .load()
        .await;

    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&base_config);

    if let Some(endpoint) = &config.endpoint_url {
        s3_config_builder = s3_config_builder.endpoint_url(endpoint);
    }

    if config.force_path_style {
        s3_config_builder = s3_config_builder.force_path_style(true);
    }

    (Client::from_conf(s3_config_builder.build()), region)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_explicit_region_wins() {
        let lookup = env(&[("AWS_DEFAULT_REGION", "eu-west-1")]);
        assert_eq!(resolve_region_with(Some("ap-south-1"), lookup), "ap-south-1");
    }

    #[test]
    fn test_default_region_env_before_region_env() {
        let lookup = env(&[("AWS_DEFAULT_REGION", "eu-west-1"), ("AWS_REGION", "us-west-2")]);
        assert_eq!(resolve_region_with(None, lookup), "eu-west-1");

        let lookup = env(&[("AWS_REGION", "us-west-2")]);
        assert_eq!(resolve_region_with(None, lookup), "us-west-2");
    }

    #[test]
    fn test_fallback_region() {
        assert_eq!(resolve_region_with(None, env(&[])), FALLBACK_REGION);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let lookup = env(&[("AWS_DEFAULT_REGION", "  "), ("AWS_REGION", "eu-central-1")]);
        assert_eq!(resolve_region_with(Some(""), lookup), "eu-central-1");
    }

    #[test]
    fn test_config_from_lookup() {
        let config = TransferConfig::from_lookup(env(&[
            ("BUCKETZIP_ENDPOINT_URL", "http://localhost:4566"),
            ("BUCKETZIP_FORCE_PATH_STYLE", "true"),
        ]));
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(config.force_path_style);
        assert_eq!(config.region, None);

        let config = TransferConfig::from_lookup(env(&[]));
        assert_eq!(config.endpoint_url, None);
        assert!(!config.force_path_style);
    }
}
