use std::fs;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::BrowseError;
use crate::metadata::MergePolicy;
use crate::uri::parse_server_uri;

pub const CONFIG_FILE_NAME: &str = "omero-browse.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub thumbnail_workers: Option<usize>,
    #[serde(default)]
    pub thumbnail_size: Option<u32>,
    #[serde(default)]
    pub key_value_policy: Option<MergePolicy>,
    #[serde(default)]
    pub tag_policy: Option<MergePolicy>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server: Option<String>,
    pub username: Option<String>,
    pub thumbnail_workers: usize,
    pub thumbnail_size: u32,
    pub key_value_policy: MergePolicy,
    pub tag_policy: MergePolicy,
    pub request_timeout_secs: u64,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            server: None,
            username: None,
            thumbnail_workers: 4,
            thumbnail_size: 256,
            key_value_policy: MergePolicy::KeepKeys,
            tag_policy: MergePolicy::KeepKeys,
            request_timeout_secs: 30,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BrowseError> {
        let config_path = match path {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::default_paths()
                .into_iter()
                .find(|candidate| candidate.as_std_path().exists()),
        };
        let Some(config_path) = config_path else {
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| BrowseError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BrowseError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BrowseError> {
        let defaults = ResolvedConfig::default();
        let server = config
            .server
            .as_deref()
            .map(parse_server_uri)
            .transpose()?;

        Ok(ResolvedConfig {
            server,
            username: config.username.filter(|name| !name.trim().is_empty()),
            thumbnail_workers: config
                .thumbnail_workers
                .unwrap_or(defaults.thumbnail_workers)
                .max(1),
            thumbnail_size: config.thumbnail_size.unwrap_or(defaults.thumbnail_size),
            key_value_policy: config.key_value_policy.unwrap_or(defaults.key_value_policy),
            tag_policy: config.tag_policy.unwrap_or(defaults.tag_policy),
            request_timeout_secs: config
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
        })
    }

    fn default_paths() -> Vec<Utf8PathBuf> {
        let mut paths = vec![Utf8PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(user_config) = ProjectDirs::from("org", "openmicroscopy", "omero-browse")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.config_dir().join("config.json")).ok())
        {
            paths.push(user_config);
        }
        paths
    }
}
