use crate::definition::parsing::{extract_single_string_value, GetNodes};
use crate::engine::build_system::Definitions;
use async_trait::async_trait;
use kdl::{KdlDocument, KdlNode};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

pub const VCS_DATA_FILE: &str = "vcs_data";

/// Source control facts about the tree being built. Every field is optional; missing ones are
/// simply not defined for the build.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VcsData {
    pub kind: Option<String>,
    pub revision: Option<String>,
    pub branch: Option<String>,
    pub url: Option<String>,
}

impl VcsData {
    pub fn apply(&self, definitions: &mut Definitions) {
        let fields = [
            ("VCS_TYPE", &self.kind),
            ("VCS_REVISION", &self.revision),
            ("VCS_BRANCH", &self.branch),
            ("VCS_URL", &self.url),
        ];

        for (key, value) in fields {
            if let Some(value) = value {
                definitions.set(key, value.as_str());
            }
        }
    }

    pub fn parse(source: &str) -> anyhow::Result<VcsData> {
        let document: KdlDocument = source.parse()?;
        let mut data = VcsData::default();

        for node in document.nodes() {
            let slot = match node.name().value() {
                "type" => &mut data.kind,
                "revision" => &mut data.revision,
                "branch" => &mut data.branch,
                "url" => &mut data.url,
                other => anyhow::bail!("unknown vcs_data entry `{}`", other),
            };

            *slot = Some(single_string(node)?);
        }

        Ok(data)
    }

    pub fn to_kdl(&self) -> String {
        let mut document = KdlDocument::new();
        let fields = [
            ("type", &self.kind),
            ("revision", &self.revision),
            ("branch", &self.branch),
            ("url", &self.url),
        ];

        for (key, value) in fields {
            if let Some(value) = value {
                let mut node = KdlNode::new(key);
                node.push(value.as_str());
                document.nodes_mut().push(node);
            }
        }

        KdlDocument::fmt(&mut document);
        document.to_string()
    }

    pub async fn write(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::write(path, self.to_kdl()).await?;
        Ok(())
    }
}

fn single_string(node: &KdlNode) -> anyhow::Result<String> {
    if !node.nodes().is_empty() {
        anyhow::bail!("vcs_data entry `{}` can not have children", node.name().value());
    }

    extract_single_string_value(
        node,
        "vcs_data value missing",
        "vcs_data value should be a string",
        "only 1 string expected per vcs_data entry",
        "vcs_data expected a value, property found instead",
    )
    .map_err(Into::into)
}

#[async_trait]
pub trait VcsInfoProvider: Send + Sync + Debug {
    async fn metadata(&self) -> anyhow::Result<VcsData>;

    /// Injects the metadata into a build system's definitions ahead of configure.
    async fn setup(&self, definitions: &mut Definitions) -> anyhow::Result<()> {
        self.metadata().await?.apply(definitions);
        Ok(())
    }
}

#[async_trait]
impl VcsInfoProvider for VcsData {
    async fn metadata(&self) -> anyhow::Result<VcsData> {
        Ok(self.clone())
    }
}

/// Prefers an exported `vcs_data` snapshot next to the recipe and falls back to asking git.
#[derive(Debug)]
pub struct GitVcsInfo {
    root: PathBuf,
}

impl GitVcsInfo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        GitVcsInfo { root: root.into() }
    }

    async fn git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!value.is_empty()).then_some(value)
            }
            Ok(output) => {
                debug!(?args, status = %output.status, "git query failed");
                None
            }
            Err(e) => {
                debug!(?args, error = %e, "git not available");
                None
            }
        }
    }

    async fn query_git(&self) -> VcsData {
        let (revision, branch, url) = futures::join!(
            self.git(&["rev-parse", "HEAD"]),
            self.git(&["rev-parse", "--abbrev-ref", "HEAD"]),
            self.git(&["config", "--get", "remote.origin.url"]),
        );

        if revision.is_none() {
            warn!(root = %self.root.display(), "no vcs information found");
            return VcsData::default();
        }

        VcsData {
            kind: Some("git".to_string()),
            revision,
            branch,
            url,
        }
    }
}

#[async_trait]
impl VcsInfoProvider for GitVcsInfo {
    async fn metadata(&self) -> anyhow::Result<VcsData> {
        let snapshot = self.root.join(VCS_DATA_FILE);

        if tokio::fs::try_exists(&snapshot).await? {
            debug!(path = %snapshot.display(), "reading vcs snapshot");
            let source = tokio::fs::read_to_string(&snapshot).await?;
            return VcsData::parse(&source);
        }

        Ok(self.query_git().await)
    }
}
