use crate::CorpusIndex;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk encoding of the index snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Bincode,
    /// Same layout as the legacy `cache.json` snapshot.
    Json,
}

impl SnapshotFormat {
    fn file_name(self) -> &'static str {
        match self {
            SnapshotFormat::Bincode => "index.bin",
            SnapshotFormat::Json => "index.json",
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bincode" | "bin" => Ok(SnapshotFormat::Bincode),
            "json" => Ok(SnapshotFormat::Json),
            other => bail!("unknown snapshot format {other:?} (expected bincode or json)"),
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SnapshotFormat::Bincode => "bincode",
            SnapshotFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub avg_doc_len: f64,
    pub format: SnapshotFormat,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn snapshot(&self, format: SnapshotFormat) -> PathBuf { self.root.join(format.file_name()) }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// The snapshot present on disk, bincode preferred when both exist.
    pub fn existing_snapshot(&self) -> Option<(SnapshotFormat, PathBuf)> {
        [SnapshotFormat::Bincode, SnapshotFormat::Json]
            .into_iter()
            .map(|f| (f, self.snapshot(f)))
            .find(|(_, p)| p.is_file())
    }
}

/// Write `bytes` next to `path` and rename into place so readers never see a partial snapshot.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = path.with_file_name(format!("{name}.tmp"));
    {
        let mut f = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

pub fn encode_index(index: &CorpusIndex, format: SnapshotFormat) -> Result<Vec<u8>> {
    Ok(match format {
        SnapshotFormat::Bincode => bincode::serialize(index)?,
        SnapshotFormat::Json => serde_json::to_vec(index)?,
    })
}

pub fn decode_index(bytes: &[u8], format: SnapshotFormat) -> Result<CorpusIndex> {
    Ok(match format {
        SnapshotFormat::Bincode => bincode::deserialize(bytes)?,
        SnapshotFormat::Json => serde_json::from_slice(bytes)?,
    })
}

pub fn save_index(paths: &IndexPaths, index: &CorpusIndex, format: SnapshotFormat) -> Result<()> {
    create_dir_all(&paths.root)?;
    let path = paths.snapshot(format);
    let bytes = encode_index(index, format)?;
    write_atomic(&path, &bytes)?;

    let meta = MetaFile {
        num_docs: index.num_docs,
        num_terms: index.num_terms(),
        avg_doc_len: index.avg_doc_len,
        format,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), %format, "saved index snapshot");
    Ok(())
}

pub fn load_index(paths: &IndexPaths, format: SnapshotFormat) -> Result<CorpusIndex> {
    let path = paths.snapshot(format);
    let mut f = File::open(&path).with_context(|| format!("opening snapshot {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index = decode_index(&buf, format).with_context(|| format!("decoding snapshot {}", path.display()))?;
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Load the snapshot under `paths` if one exists, otherwise run `build` and
/// save its result in `format`. An existing snapshot is not checked against
/// the corpus it was built from.
pub fn load_or_build<F>(paths: &IndexPaths, format: SnapshotFormat, build: F) -> Result<CorpusIndex>
where
    F: FnOnce() -> Result<CorpusIndex>,
{
    if let Some((found, path)) = paths.existing_snapshot() {
        tracing::info!(path = %path.display(), format = %found, "loading index snapshot");
        if let Ok(meta) = load_meta(paths) {
            if meta.version != SNAPSHOT_VERSION {
                bail!("snapshot {} has version {}, expected {}", path.display(), meta.version, SNAPSHOT_VERSION);
            }
            tracing::debug!(created_at = %meta.created_at, num_docs = meta.num_docs, "snapshot meta");
        }
        return load_index(paths, found);
    }

    tracing::info!(root = %paths.root.display(), "no index snapshot found, indexing corpus");
    let index = build()?;
    save_index(paths, &index, format)?;
    Ok(index)
}
