use crate::domain::model::{LossCounters, OutputRow, SlotName};
use crate::domain::ports::SheetStore;
use crate::utils::error::Result;

pub const STATISTICS_HEADER: [&str; 2] = ["Item Name", "Count"];

pub fn raw_sheet_name(label: &str) -> String {
    format!("{}_Raw", label)
}

pub fn statistics_sheet_name(label: &str) -> String {
    format!("{}_Statistics", label)
}

pub fn raw_header() -> Vec<String> {
    ["Timestamp", "Name"]
        .into_iter()
        .chain(SlotName::ALL.iter().map(|slot| slot.column_label()))
        .map(str::to_string)
        .collect()
}

fn statistics_header() -> Vec<String> {
    STATISTICS_HEADER.iter().map(|s| s.to_string()).collect()
}

/// 工作表不存在時建立並寫入標題列，回傳是否新建
pub async fn ensure_sheet<S: SheetStore>(store: &S, name: &str, header: Vec<String>) -> Result<bool> {
    if store.has_worksheet(name).await? {
        return Ok(false);
    }

    tracing::info!("📄 Creating worksheet '{}'", name);
    store.create_worksheet(name).await?;
    store.append_rows(name, &[header]).await?;
    Ok(true)
}

/// Raw 表只會累加，不會清除
pub async fn append_raw_rows<S: SheetStore>(
    store: &S,
    label: &str,
    rows: &[OutputRow],
) -> Result<usize> {
    let sheet = raw_sheet_name(label);
    ensure_sheet(store, &sheet, raw_header()).await?;

    if rows.is_empty() {
        return Ok(0);
    }

    let cells: Vec<Vec<String>> = rows.iter().map(OutputRow::to_cells).collect();
    store.append_rows(&sheet, &cells).await?;
    tracing::info!("📝 {} rows added to '{}' sheet", cells.len(), sheet);
    Ok(cells.len())
}

/// 統計表每次都整張重寫，只反映本次執行的區間
pub async fn rewrite_statistics<S: SheetStore>(
    store: &S,
    label: &str,
    counters: &LossCounters,
) -> Result<usize> {
    let sheet = statistics_sheet_name(label);
    ensure_sheet(store, &sheet, statistics_header()).await?;

    store.clear(&sheet).await?;
    store.append_rows(&sheet, &[statistics_header()]).await?;

    let rows: Vec<Vec<String>> = counters
        .sorted()
        .into_iter()
        .map(|(name, count)| vec![name, count.to_string()])
        .collect();
    if !rows.is_empty() {
        store.append_rows(&sheet, &rows).await?;
    }

    tracing::info!("📊 Statistics updated: {} distinct items in '{}'", rows.len(), sheet);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::workbook::MemoryWorkbook;

    #[test]
    fn test_sheet_names_and_header() {
        assert_eq!(raw_sheet_name("ZvZ 01/05"), "ZvZ 01/05_Raw");
        assert_eq!(statistics_sheet_name("ZvZ"), "ZvZ_Statistics");
        assert_eq!(
            raw_header(),
            vec![
                "Timestamp",
                "Name",
                "Main Hand",
                "Off Hand",
                "Head",
                "Armor",
                "Shoes",
                "Cape",
                "Mount"
            ]
        );
    }

    #[tokio::test]
    async fn test_append_raw_rows_creates_sheet_once() {
        let store = MemoryWorkbook::new();
        let row = OutputRow {
            timestamp: "2024-01-01T02:00:00Z".to_string(),
            member_name: "Alice".to_string(),
            items: std::array::from_fn(|_| "None".to_string()),
        };

        assert_eq!(append_raw_rows(&store, "op", &[row.clone()]).await.unwrap(), 1);
        assert_eq!(append_raw_rows(&store, "op", &[row]).await.unwrap(), 1);
        assert_eq!(append_raw_rows(&store, "op", &[]).await.unwrap(), 0);

        let rows = store.rows("op_Raw").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], raw_header());
        assert_eq!(rows[1][1], "Alice");
    }

    #[tokio::test]
    async fn test_rewrite_statistics_drops_previous_rows() {
        let store = MemoryWorkbook::new();
        store.insert_sheet(
            "op_Statistics",
            vec![
                statistics_header(),
                vec!["stale".to_string(), "9".to_string()],
            ],
        );

        let mut counters = LossCounters::new();
        counters.record("b - 銅");
        counters.record("a - 銀");
        counters.record("b - 銅");

        rewrite_statistics(&store, "op", &counters).await.unwrap();
        assert_eq!(
            store.rows("op_Statistics").unwrap(),
            vec![
                statistics_header(),
                vec!["a - 銀".to_string(), "1".to_string()],
                vec!["b - 銅".to_string(), "2".to_string()],
            ]
        );

        rewrite_statistics(&store, "op", &LossCounters::new())
            .await
            .unwrap();
        assert_eq!(store.rows("op_Statistics").unwrap(), vec![statistics_header()]);
    }
}
