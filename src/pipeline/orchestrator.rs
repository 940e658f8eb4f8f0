use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::Serialize;

use crate::auth::Principal;
use crate::db::{InsertReport, ReportMetadata, ReportingPeriod, ReportingStore};
use crate::deck::DeckEngine;
use crate::telemetry::metrics::{REPORT_GENERATED, REPORT_GENERATION_DURATION};

use super::builder::{BuildError, PresentationBuilder};
use super::layout::SlideLayout;
use super::status_color::StatusColorMap;

/// Caller-facing generation failures. Messages never carry internal detail.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("only administrators may generate reports")]
    PermissionDenied,

    #[error("reporting period {0} does not exist")]
    InvalidPeriod(i32),

    #[error("report generation is currently unavailable")]
    DependencyUnavailable,

    #[error("the report file could not be written")]
    Filesystem,

    #[error("the report was generated but could not be recorded")]
    Persistence { pptx_path: String },

    #[error("report generation failed")]
    Unknown,
}

impl ReportError {
    pub fn outcome(&self) -> &'static str {
        match self {
            ReportError::PermissionDenied => "permission_denied",
            ReportError::InvalidPeriod(_) => "invalid_period",
            ReportError::DependencyUnavailable => "dependency_unavailable",
            ReportError::Filesystem => "filesystem_failure",
            ReportError::Persistence { .. } => "persistence_failure",
            ReportError::Unknown => "unknown_error",
        }
    }
}

impl From<BuildError> for ReportError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::DependencyUnavailable(_) => ReportError::DependencyUnavailable,
            BuildError::PeriodNotFound(id) => ReportError::InvalidPeriod(id),
            BuildError::Filesystem { .. } => ReportError::Filesystem,
            BuildError::Database(_) | BuildError::Render(_) => ReportError::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub report_id: i64,
    pub pptx_path: String,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub reports_dir: PathBuf,
    pub layout: SlideLayout,
    pub colors: StatusColorMap,
    pub creator: String,
}

#[derive(Clone)]
pub struct ReportOrchestrator {
    pub store: Arc<dyn ReportingStore>,
    pub engine: DeckEngine,
    pub settings: Arc<GenerationSettings>,
}

/// Path of the deck relative to the reports directory. Microsecond timestamp
/// plus a random suffix keeps concurrent runs for one period apart.
pub fn report_relative_path(period: &ReportingPeriod, generated_at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "pptx/report_q{}_{}_{}_{}.pptx",
        period.quarter,
        period.year,
        generated_at.format("%Y%m%d%H%M%S%6f"),
        &suffix[..8]
    )
}

impl ReportOrchestrator {
    #[tracing::instrument(
        name = "pipeline report",
        skip(self, principal),
        fields(
            user.id = principal.user_id,
            report.id,
            report.path,
            report.outcome,
            report.duration_ms,
        )
    )]
    pub async fn generate_report(
        &self,
        principal: &Principal,
        period_id: i32,
    ) -> Result<GeneratedReport, ReportError> {
        let start = std::time::Instant::now();
        let span = tracing::Span::current();

        let result = self.run(principal, period_id).await;

        let outcome = match &result {
            Ok(report) => {
                span.record("report.id", report.report_id);
                span.record("report.path", report.pptx_path.as_str());
                "success"
            }
            Err(e) => e.outcome(),
        };
        let duration = start.elapsed();

        REPORT_GENERATED.add(1, &[KeyValue::new("outcome", outcome)]);
        REPORT_GENERATION_DURATION.record(duration.as_secs_f64(), &[KeyValue::new("outcome", outcome)]);
        span.record("report.outcome", outcome);
        span.record("report.duration_ms", duration.as_millis() as u64);

        result
    }

    async fn run(&self, principal: &Principal, period_id: i32) -> Result<GeneratedReport, ReportError> {
        if !principal.is_admin() {
            tracing::info!(
                user_id = principal.user_id,
                role = principal.role.as_str(),
                "Report generation refused for non-admin caller"
            );
            return Err(ReportError::PermissionDenied);
        }

        if period_id <= 0 {
            tracing::warn!(period_id, "Rejected non-positive reporting period id");
            return Err(ReportError::InvalidPeriod(period_id));
        }

        let period = self
            .store
            .find_period(period_id)
            .await
            .map_err(|e| {
                tracing::error!(period_id, error = %e, "Failed to look up reporting period");
                ReportError::Unknown
            })?
            .ok_or_else(|| {
                tracing::warn!(period_id, "Reporting period not found");
                ReportError::InvalidPeriod(period_id)
            })?;

        let generated_at = Utc::now();
        let relative_path = report_relative_path(&period, generated_at);
        let absolute_path = self.settings.reports_dir.join(&relative_path);

        let builder = PresentationBuilder {
            store: self.store.as_ref(),
            engine: &self.engine,
            layout: &self.settings.layout,
            colors: &self.settings.colors,
            creator: &self.settings.creator,
            generated_at,
        };

        let summary = builder.build(period.id, &absolute_path).await.map_err(|e| {
            tracing::error!(
                period_id,
                path = %absolute_path.display(),
                error = %e,
                "Presentation build failed"
            );
            ReportError::from(e)
        })?;

        let label = period.label();
        let report_name = format!("{label} Sector Performance Report");
        let description = format!("Automatically generated report for {label}");

        let persisted = self
            .persist(&InsertReport {
                period_id: period.id,
                report_name: &report_name,
                description: &description,
                pptx_path: &relative_path,
                generated_by: principal.user_id,
                generated_at,
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    period_id,
                    pptx_path = %relative_path,
                    error = %e,
                    "Report file written but metadata insert failed"
                );
                ReportError::Persistence {
                    pptx_path: relative_path.clone(),
                }
            })?;

        tracing::info!(
            report_id = persisted.report_id,
            period_id,
            pptx_path = %relative_path,
            slides = summary.slides,
            sectors_failed = summary.sectors_failed,
            bytes = summary.bytes,
            "Report generated"
        );

        Ok(GeneratedReport {
            report_id: persisted.report_id,
            pptx_path: relative_path,
        })
    }

    async fn persist(&self, params: &InsertReport<'_>) -> Result<ReportMetadata, sqlx::Error> {
        self.store.ensure_reports_table().await?;
        self.store.insert_report(params).await
    }
}
