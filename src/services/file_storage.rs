use crate::models::errors::AppError;
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::fs as async_fs;
use uuid::Uuid;

/// Scratch-file store for uploaded originals and processed results.
///
/// Files are UUID-named and ephemeral: the upload handler deletes them as
/// part of the request lifecycle, and a periodic sweep catches anything a
/// crashed or interrupted request left behind.
#[derive(Debug, Clone)]
pub struct FileStorageService {
    temp_dir: PathBuf,
    max_file_age: Duration,
}

impl FileStorageService {
    pub fn new(temp_dir: impl Into<PathBuf>, max_file_age: Duration) -> Result<Self, AppError> {
        let temp_dir = temp_dir.into();

        if !temp_dir.exists() {
            fs::create_dir_all(&temp_dir).map_err(|e| {
                AppError::storage_failed(format!("Failed to create temp directory: {}", e))
            })?;
        }

        Ok(Self { temp_dir, max_file_age })
    }

    /// Store a scratch file with UUID-based naming, returning its id.
    pub async fn store_temp_file(&self, data: &[u8], extension: &str) -> Result<String, AppError> {
        let file_id = Uuid::new_v4().to_string();
        let filename = format!("{}.{}", file_id, extension.trim_start_matches('.'));
        let file_path = self.temp_dir.join(&filename);

        async_fs::write(&file_path, data)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to write temp file: {}", e)))?;

        tracing::debug!("Stored temporary file: {}", filename);
        Ok(file_id)
    }

    pub fn get_temp_file_path(&self, file_id: &str, extension: &str) -> PathBuf {
        let filename = format!("{}.{}", file_id, extension.trim_start_matches('.'));
        self.temp_dir.join(filename)
    }

    pub async fn read_temp_file(&self, file_id: &str, extension: &str) -> Result<Vec<u8>, AppError> {
        let file_path = self.get_temp_file_path(file_id, extension);

        if !file_path.exists() {
            return Err(AppError::storage_failed("Temporary file not found"));
        }

        async_fs::read(&file_path)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to read temp file: {}", e)))
    }

    /// Delete a specific scratch file. Missing files are not an error; the
    /// sweep may have beaten us to it.
    pub async fn delete_temp_file(&self, file_id: &str, extension: &str) -> Result<(), AppError> {
        let file_path = self.get_temp_file_path(file_id, extension);

        if file_path.exists() {
            async_fs::remove_file(&file_path).await.map_err(|e| {
                AppError::storage_failed(format!("Failed to delete temp file: {}", e))
            })?;

            tracing::debug!("Deleted temporary file: {}", file_path.display());
        }

        Ok(())
    }

    /// Sweep the temp directory, removing files older than the max age.
    pub async fn cleanup_temp_files(&self) -> Result<usize, AppError> {
        let mut cleaned_count = 0;
        let cutoff_time = SystemTime::now() - self.max_file_age;

        let mut entries = async_fs::read_dir(&self.temp_dir).await.map_err(|e| {
            AppError::storage_failed(format!("Failed to read temp directory: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::storage_failed(format!("Failed to read directory entry: {}", e))
        })? {
            let path = entry.path();

            if path.is_file() {
                let metadata = entry.metadata().await.map_err(|e| {
                    AppError::storage_failed(format!("Failed to read file metadata: {}", e))
                })?;

                if let Ok(modified) = metadata.modified() {
                    if modified < cutoff_time {
                        if let Err(e) = async_fs::remove_file(&path).await {
                            tracing::warn!(
                                "Failed to delete stale temp file {}: {}",
                                path.display(),
                                e
                            );
                        } else {
                            cleaned_count += 1;
                            tracing::debug!("Swept stale temp file: {}", path.display());
                        }
                    }
                }
            }
        }

        if cleaned_count > 0 {
            tracing::info!("Swept {} stale temporary files", cleaned_count);
        }

        Ok(cleaned_count)
    }

    pub async fn get_file_size(&self, file_id: &str, extension: &str) -> Result<u64, AppError> {
        let file_path = self.get_temp_file_path(file_id, extension);

        let metadata = async_fs::metadata(&file_path)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to get file metadata: {}", e)))?;

        Ok(metadata.len())
    }

    pub fn temp_file_exists(&self, file_id: &str, extension: &str) -> bool {
        self.get_temp_file_path(file_id, extension).exists()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service_with_age(dir: &TempDir, age: Duration) -> FileStorageService {
        FileStorageService::new(dir.path(), age).unwrap()
    }

    #[tokio::test]
    async fn store_read_delete_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = service_with_age(&dir, Duration::from_secs(3600));

        let file_id = storage.store_temp_file(b"payload", "png").await.unwrap();
        assert!(storage.temp_file_exists(&file_id, "png"));
        assert_eq!(storage.get_file_size(&file_id, "png").await.unwrap(), 7);

        let data = storage.read_temp_file(&file_id, "png").await.unwrap();
        assert_eq!(data, b"payload");

        storage.delete_temp_file(&file_id, "png").await.unwrap();
        assert!(!storage.temp_file_exists(&file_id, "png"));
    }

    #[tokio::test]
    async fn deleting_a_missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = service_with_age(&dir, Duration::from_secs(3600));

        storage.delete_temp_file("no-such-id", "png").await.unwrap();
    }

    #[tokio::test]
    async fn reading_a_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let storage = service_with_age(&dir, Duration::from_secs(3600));

        let result = storage.read_temp_file("no-such-id", "png").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sweep_removes_files_past_max_age() {
        let dir = TempDir::new().unwrap();
        let storage = service_with_age(&dir, Duration::from_millis(1));

        let file_id = storage.store_temp_file(b"stale", "jpg").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let cleaned = storage.cleanup_temp_files().await.unwrap();
        assert_eq!(cleaned, 1);
        assert!(!storage.temp_file_exists(&file_id, "jpg"));
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_files() {
        let dir = TempDir::new().unwrap();
        let storage = service_with_age(&dir, Duration::from_secs(3600));

        let file_id = storage.store_temp_file(b"fresh", "png").await.unwrap();

        let cleaned = storage.cleanup_temp_files().await.unwrap();
        assert_eq!(cleaned, 0);
        assert!(storage.temp_file_exists(&file_id, "png"));
    }
}
