//! Pod metadata retrieval
//!
//! Metadata comes from two documents served by a per-pod sidecar (or read
//! from a local directory when no base URL is given):
//! - `container-metadata.json` - containers with declared ports, and
//!   container statuses with IDs
//! - `pod-metadata.properties` - namespace, pod name and pod IP
//!
//! Both retrievals are best-effort and independent. A failure is logged and
//! only leaves that document's fields absent.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::FetchError;
use super::types::{ContainerDetails, PodMetadata};
use crate::core::constants::{
    CONTAINER_METADATA_FILE, POD_PROPERTIES_FILE, PROP_POD_IP, PROP_POD_NAME, PROP_POD_NAMESPACE,
};
use crate::utils::properties::parse_properties;

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch metadata below `base_url`, or from local files when `None`.
    ///
    /// Never fails: unavailable parts are simply absent from the result.
    async fn fetch(&self, base_url: Option<&str>, verbose: bool) -> PodMetadata;

    fn name(&self) -> &'static str;
}

/// Fetcher backed by the pod metadata sidecar over HTTP
#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    local_dir: PathBuf,
}

impl HttpMetadataFetcher {
    pub fn new(timeout: Duration, local_dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            local_dir: local_dir.into(),
        })
    }

    async fn load(&self, base_url: Option<&str>, document: &str) -> Result<String, FetchError> {
        match base_url {
            Some(base) => {
                let url = format!("{}/{}", base.trim_end_matches('/'), document);
                let resp = self.client.get(&url).send().await?;
                if !resp.status().is_success() {
                    return Err(FetchError::Status {
                        url,
                        status: resp.status().as_u16(),
                    });
                }
                Ok(resp.text().await?)
            }
            None => {
                let path = self.local_dir.join(document);
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: path.display().to_string(),
                        source,
                    })
            }
        }
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, base_url: Option<&str>, verbose: bool) -> PodMetadata {
        let source = base_url.unwrap_or("<local>");
        tracing::debug!(source, verbose, "Fetching pod metadata");

        let containers = async {
            if verbose {
                Some(self.load(base_url, CONTAINER_METADATA_FILE).await)
            } else {
                None
            }
        };
        let properties = self.load(base_url, POD_PROPERTIES_FILE);
        let (containers, properties) = tokio::join!(containers, properties);

        let mut metadata = PodMetadata::default();

        match properties {
            Ok(text) => {
                let mut props = parse_properties(&text);
                metadata.namespace = props.remove(PROP_POD_NAMESPACE);
                metadata.name = props.remove(PROP_POD_NAME);
                metadata.ip = props.remove(PROP_POD_IP);
            }
            Err(e) => {
                tracing::warn!(source, error = %e, "Failed to load pod properties");
            }
        }

        if let Some(result) = containers {
            let details = result
                .and_then(|text| parse_container_details(&text))
                .unwrap_or_else(|e| {
                    tracing::warn!(source, error = %e, "Failed to load container metadata");
                    ContainerDetails::default()
                });
            metadata.containers = Some(details);
        }

        tracing::debug!(source, ?metadata, "Fetched pod metadata");
        metadata
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerDocument {
    #[serde(default)]
    containers: Option<Vec<ContainerSpec>>,
    #[serde(default)]
    container_statuses: Option<Vec<ContainerStatus>>,
}

#[derive(Deserialize)]
struct ContainerSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ports: Option<Vec<ContainerPort>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerPort {
    #[serde(default)]
    container_port: Option<u32>,
}

#[derive(Deserialize)]
struct ContainerStatus {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "containerID")]
    container_id: Option<String>,
}

/// Build the container maps from a `container-metadata.json` document.
///
/// Entries missing a name, port or ID are skipped.
pub fn parse_container_details(text: &str) -> Result<ContainerDetails, FetchError> {
    let doc: ContainerDocument = serde_json::from_str(text)?;

    let mut port_to_name = BTreeMap::new();
    for container in doc.containers.unwrap_or_default() {
        let Some(name) = container.name else {
            continue;
        };
        for port in container.ports.unwrap_or_default() {
            if let Some(p) = port.container_port {
                port_to_name.insert(p, name.clone());
            }
        }
    }

    let name_to_id = doc
        .container_statuses
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| Some((s.name?, s.container_id?)))
        .collect();

    Ok(ContainerDetails {
        name_to_id,
        port_to_name,
    })
}
