//! Pod key and metadata records

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::PodKeyError;

/// Identity of the workload that emitted a span: `node:pod:ip`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodKey {
    raw: String,
    node_name: String,
    pod_name: String,
    pod_ip: String,
}

impl PodKey {
    pub fn parse(raw: &str) -> Result<Self, PodKeyError> {
        let segments: Vec<&str> = raw.split(':').collect();
        if segments.len() != 3 {
            return Err(PodKeyError::SegmentCount {
                key: raw.to_string(),
                found: segments.len(),
            });
        }
        if let Some(index) = segments.iter().position(|s| s.is_empty()) {
            return Err(PodKeyError::EmptySegment {
                key: raw.to_string(),
                index,
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            node_name: segments[0].to_string(),
            pod_name: segments[1].to_string(),
            pod_ip: segments[2].to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn pod_name(&self) -> &str {
        &self.pod_name
    }

    pub fn pod_ip(&self) -> &str {
        &self.pod_ip
    }
}

impl FromStr for PodKey {
    type Err = PodKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Container maps, only collected in verbose mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    /// Container name to container ID
    pub name_to_id: BTreeMap<String, String>,
    /// Declared container port to container name
    pub port_to_name: BTreeMap<u32, String>,
}

impl ContainerDetails {
    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty() && self.port_to_name.is_empty()
    }
}

/// Environment metadata of a pod
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodMetadata {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub ip: Option<String>,
    pub containers: Option<ContainerDetails>,
}

impl PodMetadata {
    /// True when neither sub-fetch produced anything.
    pub fn is_empty(&self) -> bool {
        self.namespace.is_none()
            && self.name.is_none()
            && self.ip.is_none()
            && self.containers.as_ref().is_none_or(ContainerDetails::is_empty)
    }
}

/// Metadata as handed to decorators, stamped with its origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPod {
    pub pod_key: String,
    pub enhancer_version: &'static str,
    pub metadata: PodMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_key() {
        let key = PodKey::parse("nodeA:pod1:10.0.0.5").unwrap();
        assert_eq!(key.node_name(), "nodeA");
        assert_eq!(key.pod_name(), "pod1");
        assert_eq!(key.pod_ip(), "10.0.0.5");
        assert_eq!(key.to_string(), "nodeA:pod1:10.0.0.5");
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert_eq!(
            PodKey::parse("badkey"),
            Err(PodKeyError::SegmentCount {
                key: "badkey".to_string(),
                found: 1
            })
        );
        assert!(PodKey::parse("a:b").is_err());
        assert!(PodKey::parse("a:b:c:d").is_err());
        // IPv6 pod addresses do not fit the colon-delimited form
        assert!(PodKey::parse("node:pod:fe80::1").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert_eq!(
            "node::10.0.0.5".parse::<PodKey>(),
            Err(PodKeyError::EmptySegment {
                key: "node::10.0.0.5".to_string(),
                index: 1
            })
        );
    }

    #[test]
    fn test_metadata_is_empty() {
        assert!(PodMetadata::default().is_empty());

        let verbose_but_empty = PodMetadata {
            containers: Some(ContainerDetails::default()),
            ..Default::default()
        };
        assert!(verbose_but_empty.is_empty());

        let named = PodMetadata {
            name: Some("pod1".to_string()),
            ..Default::default()
        };
        assert!(!named.is_empty());
    }
}
