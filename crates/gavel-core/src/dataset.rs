use std::collections::HashMap;
use std::path::Path;

use crate::model::Example;
use crate::store::{self, StoreError};

/// Dataset examples keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    examples: HashMap<String, Example>,
}

impl DatasetIndex {
    /// Load a dataset JSONL file. Any malformed line fails the load; rows
    /// without an identifier are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let mut index = Self::default();
        let mut unidentified = 0usize;
        for row in store::read(path)? {
            match Example::from_record(&row?) {
                Some(example) => index.insert(example),
                None => unidentified += 1,
            }
        }
        if unidentified > 0 {
            tracing::warn!(
                "dataset {}: skipped {} rows without an identifier",
                path.display(),
                unidentified
            );
        }
        tracing::debug!("dataset {}: {} examples", path.display(), index.len());
        Ok(index)
    }

    pub fn from_examples(examples: impl IntoIterator<Item = Example>) -> Self {
        let mut index = Self::default();
        for example in examples {
            index.insert(example);
        }
        index
    }

    fn insert(&mut self, example: Example) {
        if let Some(prev) = self.examples.insert(example.id.clone(), example) {
            tracing::warn!("dataset: duplicate identifier '{}', keeping the later row", prev.id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Example> {
        self.examples.get(id)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn indexes_by_any_id_spelling_and_skips_unidentified() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"id\":\"a\",\"prompt\":\"P\",\"rubric\":\"R\",\"category\":\"C\"}\n",
                "{\"exampleId\":\"b\",\"prompt\":\"Q\"}\n",
                "{\"prompt\":\"orphan\"}\n",
            ),
        )
        .unwrap();
        let idx = DatasetIndex::load(&path).unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get("a").unwrap().category, "C");
        assert_eq!(idx.get("b").unwrap().prompt, "Q");
    }

    #[test]
    fn later_duplicate_wins() {
        let idx = DatasetIndex::from_examples(vec![
            Example {
                id: "x".into(),
                prompt: "first".into(),
                ..Default::default()
            },
            Example {
                id: "x".into(),
                prompt: "second".into(),
                ..Default::default()
            },
        ]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("x").unwrap().prompt, "second");
    }

    #[test]
    fn malformed_dataset_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n{oops\n").unwrap();
        assert!(matches!(
            DatasetIndex::load(&path),
            Err(StoreError::Parse { line: 2, .. })
        ));
    }
}
