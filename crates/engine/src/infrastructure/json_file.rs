//! JSON world exports: a top-level array of documents.

use std::path::Path;

use dhsheet_domain::Document;
use serde_json::Value;

use crate::infrastructure::ports::RepoError;

/// Read every document of a world export.
pub async fn load_documents(path: &Path) -> Result<Vec<Document>, RepoError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RepoError::storage("load_documents", format!("{}: {}", path.display(), e)))?;
    parse_documents(&raw)
}

/// Write documents back as a pretty-printed array.
pub async fn save_documents(path: &Path, documents: &[Document]) -> Result<(), RepoError> {
    let array = Value::Array(documents.iter().map(Document::to_json).collect());
    let raw = serde_json::to_string_pretty(&array).map_err(RepoError::serialization)?;
    tokio::fs::write(path, raw)
        .await
        .map_err(|e| RepoError::storage("save_documents", format!("{}: {}", path.display(), e)))
}

pub fn parse_documents(raw: &str) -> Result<Vec<Document>, RepoError> {
    let value: Value = serde_json::from_str(raw).map_err(RepoError::serialization)?;
    let Value::Array(entries) = value else {
        return Err(RepoError::serialization(
            "world export must be a JSON array of documents",
        ));
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            Document::from_json(entry)
                .map_err(|e| RepoError::serialization(format!("document #{}: {}", index, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_of_documents() {
        let raw = r#"[
            { "_id": "a1", "kind": "actor", "type": "adversary", "system": { "difficulty": 12 } },
            { "_id": "i1", "kind": "item", "type": "weapon" }
        ]"#;
        let documents = parse_documents(raw).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].get_i64("system.difficulty"), Some(12));
    }

    #[test]
    fn rejects_non_array_exports() {
        let err = parse_documents(r#"{ "_id": "a1" }"#).unwrap_err();
        assert!(matches!(err, RepoError::Serialization(_)));
    }

    #[test]
    fn reports_index_of_bad_document() {
        let err = parse_documents(r#"[{ "_id": "a1", "kind": "actor", "type": "x" }, { "kind": 3 }]"#)
            .unwrap_err();
        assert!(err.to_string().contains("#1"));
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let documents = parse_documents(r#"[{ "_id": "i1", "kind": "item", "type": "armor", "name": "Mail" }]"#)
            .unwrap();

        save_documents(&path, &documents).await.unwrap();
        let loaded = load_documents(&path).await.unwrap();

        assert_eq!(loaded, documents);
    }
}
