use crate::domain::model::Record;
use crate::domain::ports::SheetStore;
use crate::utils::error::{BotError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

/// 每張工作表對應目錄下的一個 CSV 檔
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    base_path: PathBuf,
}

impl CsvWorkbook {
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        if !base_path.is_dir() {
            return Err(BotError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Workbook directory not found: {}", base_path.display()),
            )));
        }
        Ok(Self { base_path })
    }

    fn sheet_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", escape_sheet_name(name)))
    }

    async fn existing_sheet_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.sheet_path(name);
        if tokio::fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(BotError::WorksheetNotFound {
                name: name.to_string(),
            })
        }
    }
}

/// 討論串標題可能含有路徑字元；以 `%XX` 跳脫 (含 `%` 本身)，不同名稱不會對到同一個檔案
fn escape_sheet_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {
                escaped.push_str(&format!("%{:02X}", c as u32))
            }
            c if c.is_control() => escaped.push_str(&format!("%{:02X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

fn encode_rows(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| BotError::IoError(e.into_error()))
}

fn records_from_rows<I>(mut rows: I) -> Vec<Record>
where
    I: Iterator<Item = Vec<String>>,
{
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    rows.map(|row| Record {
        data: header
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect(),
    })
    .collect()
}

impl SheetStore for CsvWorkbook {
    async fn has_worksheet(&self, name: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.sheet_path(name)).await?)
    }

    async fn create_worksheet(&self, name: &str) -> Result<()> {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.sheet_path(name))
            .await?;
        Ok(())
    }

    async fn append_rows(&self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        let path = self.existing_sheet_path(name).await?;
        let data = encode_rows(rows)?;

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<()> {
        let path = self.existing_sheet_path(name).await?;
        tokio::fs::write(path, b"").await?;
        Ok(())
    }

    async fn get_all_records(&self, name: &str) -> Result<Vec<Record>> {
        let path = self.existing_sheet_path(name).await?;
        let data = tokio::fs::read(path).await?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_slice());
        let rows = reader
            .records()
            .map(|row| row.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records_from_rows(rows.into_iter()))
    }
}

/// 記憶體內的工作簿，供管線測試使用
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Arc<Mutex<HashMap<String, Vec<Vec<String>>>>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    fn sheets(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Vec<String>>>> {
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_sheet(&self, name: &str, rows: Vec<Vec<String>>) {
        self.sheets().insert(name.to_string(), rows);
    }

    pub fn rows(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.sheets().get(name).cloned()
    }

}

impl SheetStore for MemoryWorkbook {
    async fn has_worksheet(&self, name: &str) -> Result<bool> {
        Ok(self.sheets().contains_key(name))
    }

    async fn create_worksheet(&self, name: &str) -> Result<()> {
        self.sheets().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn append_rows(&self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        let mut sheets = self.sheets();
        let sheet = sheets
            .get_mut(name)
            .ok_or_else(|| BotError::WorksheetNotFound {
                name: name.to_string(),
            })?;
        sheet.extend(rows.iter().cloned());
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<()> {
        let mut sheets = self.sheets();
        let sheet = sheets
            .get_mut(name)
            .ok_or_else(|| BotError::WorksheetNotFound {
                name: name.to_string(),
            })?;
        sheet.clear();
        Ok(())
    }

    async fn get_all_records(&self, name: &str) -> Result<Vec<Record>> {
        let rows = self.rows(name).ok_or_else(|| BotError::WorksheetNotFound {
            name: name.to_string(),
        })?;
        Ok(records_from_rows(rows.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_open_requires_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(CsvWorkbook::open(temp_dir.path()).is_ok());
        assert!(CsvWorkbook::open(temp_dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_csv_workbook_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::open(temp_dir.path()).unwrap();

        assert!(!workbook.has_worksheet("Members").await.unwrap());
        workbook.create_worksheet("Members").await.unwrap();
        assert!(workbook.has_worksheet("Members").await.unwrap());

        workbook
            .append_rows("Members", &[row(&["Guild Members", "Role"])])
            .await
            .unwrap();
        workbook
            .append_rows(
                "Members",
                &[row(&["Alice", "Tank"]), row(&["Bob, Jr.", "Healer"])],
            )
            .await
            .unwrap();

        let records = workbook.get_all_records("Members").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Guild Members"), Some("Alice"));
        assert_eq!(records[1].get("Guild Members"), Some("Bob, Jr."));
        assert_eq!(records[1].get("Role"), Some("Healer"));

        workbook.clear("Members").await.unwrap();
        assert!(workbook.get_all_records("Members").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_worksheet_errors() {
        let temp_dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::open(temp_dir.path()).unwrap();

        let err = workbook.get_all_records("RawItems").await.unwrap_err();
        assert!(matches!(err, BotError::WorksheetNotFound { .. }));
        assert!(workbook.append_rows("RawItems", &[]).await.is_err());
        assert!(workbook.clear("RawItems").await.is_err());
    }

    #[tokio::test]
    async fn test_sheet_names_with_path_characters() {
        let temp_dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::open(temp_dir.path()).unwrap();

        workbook.create_worksheet("ZvZ 01/05_Raw").await.unwrap();
        assert!(workbook.has_worksheet("ZvZ 01/05_Raw").await.unwrap());
        assert!(temp_dir.path().join("ZvZ 01%2F05_Raw.csv").exists());
    }

    #[tokio::test]
    async fn test_escaped_sheet_names_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::open(temp_dir.path()).unwrap();

        workbook.create_worksheet("A/B_Raw").await.unwrap();
        assert!(!workbook.has_worksheet("A_B_Raw").await.unwrap());
        assert!(!workbook.has_worksheet("A%2FB_Raw").await.unwrap());

        workbook.create_worksheet("A_B_Raw").await.unwrap();
        workbook.create_worksheet("A%2FB_Raw").await.unwrap();
        assert!(temp_dir.path().join("A%2FB_Raw.csv").exists());
        assert!(temp_dir.path().join("A_B_Raw.csv").exists());
        assert!(temp_dir.path().join("A%252FB_Raw.csv").exists());
    }

    #[test]
    fn test_escape_sheet_name() {
        assert_eq!(escape_sheet_name("ZvZ 01-05"), "ZvZ 01-05");
        assert_eq!(escape_sheet_name("a:b?c"), "a%3Ab%3Fc");
        assert_eq!(escape_sheet_name("100%"), "100%25");
        assert_eq!(escape_sheet_name("tab\there"), "tab%09here");
    }

    #[tokio::test]
    async fn test_short_rows_fill_missing_fields() {
        let workbook = MemoryWorkbook::new();
        workbook.insert_sheet(
            "RawItems",
            vec![
                row(&["Unique Item Name", "Base Item Name"]),
                row(&["T4_BAG"]),
            ],
        );

        let records = workbook.get_all_records("RawItems").await.unwrap();
        assert_eq!(records[0].get("Base Item Name"), Some(""));
    }
}
