use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::Path;

/// 本機檔案存取：讀取上傳檔案、寫入下載的報告
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        Ok(full_path.to_string_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());

        let written = tokio_test::block_on(storage.write_file("reports/a.html", b"<html></html>"))
            .unwrap();
        assert!(written.ends_with("a.html"));

        let data = tokio_test::block_on(storage.read_file("reports/a.html")).unwrap();
        assert_eq!(data, b"<html></html>");
    }

    #[test]
    fn test_absolute_paths_are_not_rebased() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("input.csv");
        std::fs::write(&file, "a,b\n1,2\n").unwrap();

        let storage = LocalStorage::new(".".to_string());
        let data = tokio_test::block_on(storage.read_file(&file.to_string_lossy())).unwrap();
        assert_eq!(data, b"a,b\n1,2\n");
    }
}
