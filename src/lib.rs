pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use self::adapters::{AlbionClient, CsvWorkbook, DiscordClient, MemoryWorkbook};
pub use self::config::{BotConfig, RegearSettings};
pub use self::core::{etl::RegearEngine, pipeline::RegearPipeline};
pub use self::domain::model::{RegearJob, RunReport, TimeWindow};
pub use self::utils::error::{BotError, Result};
