//! Encrypted versioned storage for Documents and their Versions.
//!
//! The adapter is the only writer of document rows and exclusively
//! controls encryption: plaintext goes in, ciphertext hits SQLite,
//! plaintext comes back out. Documents are immutable after upload;
//! every derived artifact is an append-only [`StoredVersion`].

pub mod crypto;

pub use crypto::ContentCipher;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::config::{FileType, Lang, StorageConfig};
use crate::error::{Error, Result};
use crate::util::utc_timestamp;

/// Reference to a persisted Document.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    pub id: String,
}

/// Reference to a persisted Version.
#[derive(Debug, Clone)]
pub struct VersionHandle {
    pub id: String,
    pub document_id: String,
}

impl VersionHandle {
    /// Path under the download surface resolving to this version's bytes.
    pub fn download_path(&self) -> String {
        format!("/documents/download/{}", self.id)
    }
}

/// A Document row, content already decrypted.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub owner_id: String,
    pub original_filename: String,
    pub original_language: Lang,
    pub file_type: FileType,
    pub content: Vec<u8>,
    pub created_at: String,
}

/// A Version row, content already decrypted.
///
/// `file_type` is joined in from the owning document so the download
/// surface can derive a content type without a second query.
#[derive(Debug, Clone)]
pub struct StoredVersion {
    pub id: String,
    pub document_id: String,
    pub target_language: Option<Lang>,
    pub annotations: Option<serde_json::Value>,
    pub file_type: FileType,
    pub content: Vec<u8>,
    pub created_at: String,
}

/// SQLite-backed storage adapter with content encryption at rest.
pub struct StorageAdapter {
    pool: SqlitePool,
    cipher: ContentCipher,
}

impl StorageAdapter {
    /// Connect to the configured database and run schema setup.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .connect(&config.database_url)
            .await
            .map_err(|e| Error::Storage(format!("failed to connect: {e}")))?;

        let adapter = Self {
            pool,
            cipher: ContentCipher::new(config.encryption_passphrase.clone()),
        };
        adapter.migrate().await?;
        info!(url = %config.database_url, "storage ready");
        Ok(adapter)
    }

    /// In-memory database for tests and the CLI's throwaway mode.
    pub async fn in_memory(passphrase: &str) -> Result<Self> {
        // A pooled :memory: database must stay on one connection, or every
        // connection would see its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Storage(format!("failed to open in-memory db: {e}")))?;

        let adapter = Self {
            pool,
            cipher: ContentCipher::new(passphrase),
        };
        adapter.migrate().await?;
        Ok(adapter)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                original_filename TEXT NOT NULL,
                original_language TEXT NOT NULL,
                file_type TEXT NOT NULL,
                content BLOB NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS document_versions (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id),
                content BLOB NOT NULL,
                target_language TEXT,
                annotations TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_versions_document \
             ON document_versions (document_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    /// Create the parent Document record. Called exactly once per upload;
    /// the row is never mutated afterwards.
    pub async fn save_document(
        &self,
        owner_id: &str,
        filename: &str,
        content: &[u8],
        file_type: FileType,
        original_language: &Lang,
    ) -> Result<DocumentHandle> {
        let id = uuid::Uuid::now_v7().to_string();
        let encrypted = self.cipher.encrypt(content)?;

        sqlx::query(
            r#"
            INSERT INTO documents
                (id, owner_id, original_filename, original_language, file_type, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(filename)
        .bind(original_language.as_str())
        .bind(file_type.as_str())
        .bind(&encrypted)
        .bind(utc_timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(document_id = %id, owner = owner_id, "document saved");
        Ok(DocumentHandle { id })
    }

    /// Append a Version under an existing Document.
    pub async fn save_version(
        &self,
        document_id: &str,
        content: &[u8],
        target_language: Option<&Lang>,
        annotations: Option<&serde_json::Value>,
    ) -> Result<VersionHandle> {
        let id = uuid::Uuid::now_v7().to_string();
        let encrypted = self.cipher.encrypt(content)?;
        let annotations_json = annotations
            .map(|a| serde_json::to_string(a))
            .transpose()
            .map_err(|e| Error::Storage(format!("unserializable annotations: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO document_versions
                (id, document_id, content, target_language, annotations, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(document_id)
        .bind(&encrypted)
        .bind(target_language.map(Lang::as_str))
        .bind(annotations_json)
        .bind(utc_timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(version_id = %id, document_id, "version saved");
        Ok(VersionHandle {
            id,
            document_id: document_id.to_string(),
        })
    }

    /// Fetch a Document, enforcing ownership. `Ok(None)` covers both
    /// "absent" and "not yours": callers cannot distinguish the two.
    pub async fn get_document(
        &self,
        document_id: &str,
        owner_id: &str,
    ) -> Result<Option<StoredDocument>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, original_filename, original_language, file_type, content, created_at
            FROM documents
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(document_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|row| self.document_from_row(&row)).transpose()
    }

    /// Latest Version of a Document: greatest creation timestamp, version
    /// id (time-ordered uuid v7) as tie-breaker.
    pub async fn get_latest_version(&self, document_id: &str) -> Result<Option<StoredVersion>> {
        let row = sqlx::query(
            r#"
            SELECT v.id, v.document_id, v.content, v.target_language, v.annotations,
                   v.created_at, d.file_type
            FROM document_versions v
            JOIN documents d ON d.id = v.document_id
            WHERE v.document_id = ?
            ORDER BY v.created_at DESC, v.id DESC
            LIMIT 1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|row| self.version_from_row(&row)).transpose()
    }

    pub async fn get_version_by_id(&self, version_id: &str) -> Result<Option<StoredVersion>> {
        let row = sqlx::query(
            r#"
            SELECT v.id, v.document_id, v.content, v.target_language, v.annotations,
                   v.created_at, d.file_type
            FROM document_versions v
            JOIN documents d ON d.id = v.document_id
            WHERE v.id = ?
            "#,
        )
        .bind(version_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|row| self.version_from_row(&row)).transpose()
    }

    /// Ciphertext of a version as stored, without decryption.
    ///
    /// Integrity-check surface: lets callers verify that stored content is
    /// encrypted and that prior versions never change.
    pub async fn raw_version_content(&self, version_id: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT content FROM document_versions WHERE id = ?")
            .bind(version_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row.map(|row| row.get::<Vec<u8>, _>("content")))
    }

    /// Number of documents owned by `owner_id`.
    pub async fn document_count(&self, owner_id: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)
    }

    /// Number of versions recorded for a document.
    pub async fn version_count(&self, document_id: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM document_versions WHERE document_id = ?")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)
    }

    fn document_from_row(&self, row: &sqlx::sqlite::SqliteRow) -> Result<StoredDocument> {
        let file_type_str: String = row.get("file_type");
        Ok(StoredDocument {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            original_filename: row.get("original_filename"),
            original_language: Lang::new(row.get::<String, _>("original_language")),
            file_type: parse_file_type(&file_type_str)?,
            content: self.cipher.decrypt(&row.get::<Vec<u8>, _>("content"))?,
            created_at: row.get("created_at"),
        })
    }

    fn version_from_row(&self, row: &sqlx::sqlite::SqliteRow) -> Result<StoredVersion> {
        let file_type_str: String = row.get("file_type");
        let annotations = row
            .get::<Option<String>, _>("annotations")
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| Error::Storage(format!("corrupt annotations column: {e}")))?;

        Ok(StoredVersion {
            id: row.get("id"),
            document_id: row.get("document_id"),
            target_language: row
                .get::<Option<String>, _>("target_language")
                .map(Lang::new),
            annotations,
            file_type: parse_file_type(&file_type_str)?,
            content: self.cipher.decrypt(&row.get::<Vec<u8>, _>("content"))?,
            created_at: row.get("created_at"),
        })
    }
}

fn parse_file_type(s: &str) -> Result<FileType> {
    FileType::from_extension(s)
        .ok_or_else(|| Error::Storage(format!("corrupt file_type column: {s:?}")))
}

fn storage_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn adapter() -> StorageAdapter {
        StorageAdapter::in_memory("test-passphrase").await.unwrap()
    }

    #[tokio::test]
    async fn version_round_trips_byte_identical() {
        let storage = adapter().await;
        let doc = storage
            .save_document("user-1", "report.pdf", b"original", FileType::Pdf, &Lang::auto())
            .await
            .unwrap();

        let plaintext = b"rebuilt artifact bytes".to_vec();
        let version = storage
            .save_version(&doc.id, &plaintext, Some(&Lang::new("fr")), None)
            .await
            .unwrap();

        let fetched = storage
            .get_version_by_id(&version.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.content, plaintext);
        assert_eq!(fetched.target_language, Some(Lang::new("fr")));
        assert_eq!(fetched.file_type, FileType::Pdf);
    }

    #[tokio::test]
    async fn stored_content_is_encrypted_at_rest() {
        let storage = adapter().await;
        let doc = storage
            .save_document("user-1", "a.pdf", b"doc", FileType::Pdf, &Lang::auto())
            .await
            .unwrap();
        let plaintext = b"visible only in memory".to_vec();
        let version = storage
            .save_version(&doc.id, &plaintext, None, None)
            .await
            .unwrap();

        let raw = storage
            .raw_version_content(&version.id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(raw, plaintext);
    }

    #[tokio::test]
    async fn ownership_is_enforced_on_lookup() {
        let storage = adapter().await;
        let doc = storage
            .save_document("alice", "a.pdf", b"doc", FileType::Pdf, &Lang::auto())
            .await
            .unwrap();

        assert!(storage
            .get_document(&doc.id, "alice")
            .await
            .unwrap()
            .is_some());
        assert!(storage
            .get_document(&doc.id, "mallory")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn latest_version_is_the_newest_row() {
        let storage = adapter().await;
        let doc = storage
            .save_document("user-1", "a.pdf", b"doc", FileType::Pdf, &Lang::auto())
            .await
            .unwrap();

        storage
            .save_version(&doc.id, b"first", None, None)
            .await
            .unwrap();
        let second = storage
            .save_version(&doc.id, b"second", None, None)
            .await
            .unwrap();

        let latest = storage.get_latest_version(&doc.id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.content, b"second");
        assert_eq!(storage.version_count(&doc.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn annotations_survive_the_round_trip() {
        let storage = adapter().await;
        let doc = storage
            .save_document("user-1", "a.pdf", b"doc", FileType::Pdf, &Lang::auto())
            .await
            .unwrap();

        let annotations = serde_json::json!({"replacements": [{"page": 0, "target": "x"}]});
        let version = storage
            .save_version(&doc.id, b"edited", None, Some(&annotations))
            .await
            .unwrap();

        let fetched = storage
            .get_version_by_id(&version.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.annotations, Some(annotations));
    }

    #[tokio::test]
    async fn unknown_version_id_is_none() {
        let storage = adapter().await;
        assert!(storage
            .get_version_by_id("no-such-id")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn file_backed_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("doctrans.db").display()
        );
        let config = StorageConfig {
            database_url: url,
            encryption_passphrase: "file-test".to_string(),
        };

        let doc_id = {
            let storage = StorageAdapter::connect(&config).await.unwrap();
            let doc = storage
                .save_document("user-1", "a.pdf", b"doc", FileType::Pdf, &Lang::auto())
                .await
                .unwrap();
            storage
                .save_version(&doc.id, b"artifact", None, None)
                .await
                .unwrap();
            doc.id
        };

        let storage = StorageAdapter::connect(&config).await.unwrap();
        let latest = storage.get_latest_version(&doc_id).await.unwrap().unwrap();
        assert_eq!(latest.content, b"artifact");
    }

    #[test]
    fn download_path_embeds_the_version_id() {
        let handle = VersionHandle {
            id: "v-123".to_string(),
            document_id: "d-1".to_string(),
        };
        assert_eq!(handle.download_path(), "/documents/download/v-123");
    }
}
