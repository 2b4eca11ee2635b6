// 對外部系統的實作：遊戲統計 API、Discord REST、試算表儲存
pub mod albion;
pub mod discord;
pub mod workbook;

pub use albion::AlbionClient;
pub use discord::DiscordClient;
pub use workbook::{CsvWorkbook, MemoryWorkbook};
