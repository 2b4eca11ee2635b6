pub mod etl;
pub mod normalize;
pub mod pipeline;
pub mod sink;
pub mod window;

pub use crate::domain::model::{RegearJob, RunReport, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, SheetStore, StatsApi};
pub use crate::utils::error::Result;
