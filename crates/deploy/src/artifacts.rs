//! Compiled contract artifacts, looked up by contract name.
//!
//! Supports the Hardhat layout (`artifacts/contracts/<Name>.sol/<Name>.json` with a
//! sibling `<Name>.dbg.json` pointing to the build info) and the Foundry layout
//! (`out/<Name>.sol/<Name>.json` with `bytecode.object`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use crate::{ConstructorArg, DeployError, encode_constructor_args};

/// Directory skipped while searching for artifacts.
const BUILD_INFO_DIR: &str = "build-info";

/// Compiler input and version needed to verify a contract on an explorer.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildInfo {
    /// Full compiler version, e.g. `0.8.20+commit.a1b79de6`.
    pub solc_long_version: String,
    /// Standard-JSON compiler input.
    pub input: Value,
}

/// A compiled contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    /// Source file the contract is defined in, e.g. `contracts/ZeyphrAdmin.sol`.
    pub source_name: Option<String>,
    pub bytecode: Bytes,
    pub build_info: Option<BuildInfo>,
}

impl Artifact {
    /// Build an artifact from raw parts.
    pub fn new(name: impl Into<String>, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            source_name: None,
            bytecode,
            build_info: None,
        }
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn init_code(&self, args: &[ConstructorArg]) -> Bytes {
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encode_constructor_args(args));
        code.into()
    }

    /// Fully qualified name used by explorers: `<sourceName>:<Name>`.
    pub fn qualified_name(&self) -> String {
        match &self.source_name {
            Some(source) => format!("{}:{}", source, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    #[serde(default)]
    source_name: Option<String>,
    bytecode: RawBytecode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl RawBytecode {
    fn as_hex(&self) -> &str {
        match self {
            Self::Hex(hex) | Self::Object { object: hex } => hex,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuildInfo {
    solc_long_version: String,
    input: Value,
}

/// Source of artifacts: a directory on disk plus optional preloaded artifacts.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    root: Option<PathBuf>,
    preloaded: BTreeMap<String, Artifact>,
}

impl ArtifactStore {
    /// A store reading artifacts below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            preloaded: BTreeMap::new(),
        }
    }

    /// A store holding only the given artifacts.
    pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        Self {
            root: None,
            preloaded: artifacts
                .into_iter()
                .map(|artifact| (artifact.name.clone(), artifact))
                .collect(),
        }
    }

    /// Load an artifact by contract name.
    pub fn load(&self, name: &str) -> Result<Artifact, DeployError> {
        if let Some(artifact) = self.preloaded.get(name) {
            return Ok(artifact.clone());
        }

        let root = self.root.as_ref().ok_or_else(|| DeployError::ArtifactNotFound {
            artifact: name.to_string(),
            reason: "no artifacts directory configured".to_string(),
        })?;

        let path = find_artifact_file(root, name).ok_or_else(|| DeployError::ArtifactNotFound {
            artifact: name.to_string(),
            reason: format!("no {}.json below {}", name, root.display()),
        })?;

        let artifact = read_artifact(&path, name).map_err(|e| DeployError::InvalidArtifact {
            artifact: name.to_string(),
            reason: format!("{:#}", e),
        })?;

        tracing::debug!(
            artifact = %name,
            path = %path.display(),
            bytecode_len = artifact.bytecode.len(),
            has_build_info = artifact.build_info.is_some(),
            "Loaded artifact"
        );

        Ok(artifact)
    }
}

/// Find `<name>.json` either directly under `root` or in a `<name>.sol` directory below it.
fn find_artifact_file(root: &Path, name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.json", name);
    let flat = root.join(&file_name);
    if flat.is_file() {
        return Some(flat);
    }

    let source_dir = format!("{}.sol", name);
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut entries: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        entries.sort();

        for path in entries {
            if !path.is_dir() {
                continue;
            }
            if path.file_name().is_some_and(|n| n == BUILD_INFO_DIR) {
                continue;
            }
            if path.file_name().is_some_and(|n| n == source_dir.as_str()) {
                let candidate = path.join(&file_name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            pending.push(path);
        }
    }

    None
}

fn read_artifact(path: &Path, name: &str) -> anyhow::Result<Artifact> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact at {}", path.display()))?;
    let raw: RawArtifact = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse artifact at {}", path.display()))?;

    let bytecode = decode_bytecode(raw.bytecode.as_hex())?;
    let build_info = read_build_info(path, name)?;

    Ok(Artifact {
        name: name.to_string(),
        source_name: raw.source_name,
        bytecode,
        build_info,
    })
}

fn decode_bytecode(hex_code: &str) -> anyhow::Result<Bytes> {
    let hex_code = hex_code.trim().trim_start_matches("0x");
    if hex_code.is_empty() {
        anyhow::bail!("Bytecode is empty (abstract contract or interface?)");
    }
    if hex_code.contains("__") {
        anyhow::bail!("Bytecode has unlinked library placeholders");
    }
    let bytes = hex::decode(hex_code).context("Bytecode is not valid hex")?;
    Ok(bytes.into())
}

/// Read the Hardhat build info referenced by `<name>.dbg.json`, if there is one.
fn read_build_info(artifact_path: &Path, name: &str) -> anyhow::Result<Option<BuildInfo>> {
    let Some(dir) = artifact_path.parent() else {
        return Ok(None);
    };
    let dbg_path = dir.join(format!("{}.dbg.json", name));
    if !dbg_path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&dbg_path)
        .with_context(|| format!("Failed to read {}", dbg_path.display()))?;
    let dbg: DebugFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", dbg_path.display()))?;

    let build_info_path = dir.join(&dbg.build_info);
    let content = std::fs::read_to_string(&build_info_path)
        .with_context(|| format!("Failed to read build info {}", build_info_path.display()))?;
    let raw: RawBuildInfo = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse build info {}", build_info_path.display()))?;

    Ok(Some(BuildInfo {
        solc_long_version: raw.solc_long_version,
        input: raw.input,
    }))
}
