use crate::core::Pipeline;
use crate::domain::model::{RegearJob, RunReport};
use crate::utils::error::Result;
use std::time::Instant;

pub struct RegearEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> RegearEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self, job: &RegearJob) -> Result<RunReport> {
        let started = Instant::now();
        tracing::info!(
            "🚀 Starting regear run '{}' for {} .. {}",
            job.label,
            job.window.start,
            job.window.end
        );

        // Extract
        let extracted = self.pipeline.extract(job).await?;
        tracing::info!(
            "Extracted deaths for {} members ({} skipped)",
            extracted.deaths.len(),
            extracted.members_skipped
        );

        // Transform
        let transformed = self.pipeline.transform(job, extracted).await?;
        tracing::info!("Transformed {} deaths", transformed.rows.len());

        // Load
        let report = self.pipeline.load(job, transformed).await?;
        tracing::info!(
            "✅ Regear run '{}' finished in {:?}: {} rows, {} distinct items",
            job.label,
            started.elapsed(),
            report.rows_appended,
            report.statistics.len()
        );

        Ok(report)
    }
}
