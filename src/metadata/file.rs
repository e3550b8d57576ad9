use super::{ClaimMetadata, MetadataError, MetadataStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Metadata index built once from a line-delimited JSON source.
///
/// Construction fails fast on the first bad line. Later lines win on duplicate uids. The index
/// is never mutated afterwards, so shared `&self` lookups need no locking.
#[derive(Debug, Default, Clone)]
pub struct FileMetadataStore {
    index: HashMap<String, ClaimMetadata>,
}

impl FileMetadataStore {
    /// Load the index from a `.jsonl` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let store = Self::from_reader(BufReader::new(file))?;
        tracing::info!(path = %path.display(), records = store.len(), "metadata index loaded");
        Ok(store)
    }

    /// Load the index from any line-oriented reader. Whitespace-only lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, MetadataError> {
        let mut index = HashMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let record: ClaimMetadata = serde_json::from_str(&line)
                .map_err(|source| MetadataError::Malformed { line: line_no, source })?;
            if record.uid.is_empty() {
                return Err(MetadataError::MissingUid { line: line_no });
            }
            index.insert(record.uid.clone(), record);
        }
        Ok(Self { index })
    }

    /// Build an index from records already in memory; later duplicates win.
    pub fn from_records(records: impl IntoIterator<Item = ClaimMetadata>) -> Self {
        Self { index: records.into_iter().map(|r| (r.uid.clone(), r)).collect() }
    }

    /// Single-record lookup.
    pub fn lookup(&self, uid: &str) -> Option<&ClaimMetadata> {
        self.index.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn get(&self, uids: &[String]) -> Result<Vec<ClaimMetadata>, MetadataError> {
        Ok(uids.iter().filter_map(|uid| self.index.get(uid).cloned()).collect())
    }
}
