use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tokio::io::AsyncWriteExt;

use crate::db::ReportingStore;
use crate::deck::{Align, Anchor, DeckEngine, DocumentProperties, Presentation, Slide, TextBox};
use crate::telemetry::metrics::{REPORT_SECTOR_FAILURES, REPORT_SLIDES};

use super::compose::SectorSlideComposer;
use super::layout::{Frame, SlideLayout};
use super::status_color::StatusColorMap;

pub const NO_SECTORS_MESSAGE: &str = "No sectors found for this reporting period.";
pub const ALL_SECTORS_FAILED_MESSAGE: &str =
    "Sector slides could not be generated for this reporting period.";

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("presentation backend unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("reporting period {0} not found")]
    PeriodNotFound(i32),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("render failed: {0}")]
    Render(String),

    #[error("filesystem error at {path}: {reason}")]
    Filesystem { path: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub path: PathBuf,
    pub slides: usize,
    pub sectors_composed: usize,
    pub sectors_failed: usize,
    pub bytes: u64,
}

pub struct PresentationBuilder<'a> {
    pub store: &'a dyn ReportingStore,
    pub engine: &'a DeckEngine,
    pub layout: &'a SlideLayout,
    pub colors: &'a StatusColorMap,
    pub creator: &'a str,
    pub generated_at: DateTime<Utc>,
}

impl PresentationBuilder<'_> {
    #[tracing::instrument(
        name = "pipeline_stage build",
        skip(self),
        fields(
            pipeline.stage = "build",
            deck.backend,
            deck.slides,
            deck.sectors_failed,
        )
    )]
    pub async fn build(&self, period_id: i32, filepath: &Path) -> Result<BuildSummary, BuildError> {
        let span = tracing::Span::current();

        let backend = self.engine.resolve().map_err(|e| {
            tracing::error!(
                period_id,
                path = %filepath.display(),
                error = %e,
                "Presentation backend could not be resolved, aborting before write"
            );
            BuildError::DependencyUnavailable(e.to_string())
        })?;
        span.record("deck.backend", backend.name());

        let period = self
            .store
            .find_period(period_id)
            .await?
            .ok_or(BuildError::PeriodNotFound(period_id))?;

        let mut deck = Presentation::new(
            DocumentProperties {
                creator: self.creator.to_string(),
                title: format!("Sector Performance Report - {}", period.label()),
                subject: format!("Quarterly program performance for {}", period.label()),
                created: self.generated_at,
            },
            self.layout.slide_width,
            self.layout.slide_height,
        );

        let sectors = self.store.list_sectors().await?;

        let composer = SectorSlideComposer {
            store: self.store,
            layout: self.layout,
            colors: self.colors,
            generated_at: self.generated_at,
        };

        let mut sectors_composed = 0;
        let mut sectors_failed = 0;
        for sector in &sectors {
            match composer.compose(&mut deck, sector.id, period.id).await {
                Ok(_) => sectors_composed += 1,
                Err(e) => {
                    sectors_failed += 1;
                    REPORT_SECTOR_FAILURES.add(1, &[KeyValue::new("sector.id", i64::from(sector.id))]);
                    tracing::error!(
                        sector_id = sector.id,
                        sector_name = %sector.name,
                        period_id,
                        error = %e,
                        "Failed to compose sector slide, continuing with remaining sectors"
                    );
                }
            }
        }

        if deck.slide_count() == 0 {
            let message = if sectors.is_empty() {
                tracing::info!(period_id, "No sectors found, writing informational slide");
                NO_SECTORS_MESSAGE
            } else {
                tracing::warn!(period_id, sectors_failed, "Every sector failed, writing informational slide");
                ALL_SECTORS_FAILED_MESSAGE
            };
            deck.add_slide(self.notice_slide(&period.label(), message));
        }

        let bytes = backend
            .render(&deck)
            .map_err(|e| {
                tracing::error!(period_id, backend = backend.name(), error = %e, "Render failed");
                BuildError::Render(e.to_string())
            })?;

        ensure_writable_dir(filepath).await?;
        let written = write_new_file(filepath, &bytes).await?;

        span.record("deck.slides", deck.slide_count());
        span.record("deck.sectors_failed", sectors_failed);
        REPORT_SLIDES.record(deck.slide_count() as f64, &[]);

        tracing::info!(
            period_id,
            path = %filepath.display(),
            slides = deck.slide_count(),
            bytes = written,
            "Presentation written"
        );

        Ok(BuildSummary {
            path: filepath.to_path_buf(),
            slides: deck.slide_count(),
            sectors_composed,
            sectors_failed,
            bytes: written,
        })
    }

    fn notice_slide(&self, quarter_label: &str, message: &str) -> Slide {
        let layout = self.layout;
        let mut slide = Slide::default();
        slide.add_text_box(
            TextBox::new(layout.title).anchor(Anchor::Middle).run(
                "Sector Performance Report",
                24,
                true,
                "000000",
            ),
        );
        slide.add_text_box(
            TextBox::new(layout.quarter_badge)
                .fill("FFD966")
                .align(Align::Center)
                .anchor(Anchor::Middle)
                .run(quarter_label, 18, true, "000000"),
        );
        slide.add_text_box(
            TextBox::new(Frame::new(
                layout.table.x,
                layout.slide_height / 2 - 30,
                layout.table_width(),
                60,
            ))
            .align(Align::Center)
            .anchor(Anchor::Middle)
            .run(message, 20, false, "404040"),
        );
        slide
    }
}

fn fs_error(path: &Path, reason: impl std::fmt::Display) -> BuildError {
    BuildError::Filesystem {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates the parent directory if needed and makes it owner-writable when
/// it is not.
async fn ensure_writable_dir(filepath: &Path) -> Result<(), BuildError> {
    let Some(dir) = filepath.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };

    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            tracing::error!(dir = %dir.display(), error = %e, "Failed to create report directory");
            fs_error(dir, e)
        })?;
        tracing::info!(dir = %dir.display(), "Created report directory");
    }

    let metadata = tokio::fs::metadata(dir).await.map_err(|e| fs_error(dir, e))?;
    if !metadata.is_dir() {
        return Err(fs_error(dir, "not a directory"));
    }

    let mut permissions = metadata.permissions();
    if !owner_can_write(&permissions) {
        tracing::warn!(dir = %dir.display(), "Report directory not writable, adjusting permissions");
        grant_owner_write(&mut permissions);
        tokio::fs::set_permissions(dir, permissions)
            .await
            .map_err(|e| {
                tracing::error!(dir = %dir.display(), error = %e, "Could not make report directory writable");
                fs_error(dir, e)
            })?;
    }

    Ok(())
}

#[cfg(unix)]
fn owner_can_write(permissions: &std::fs::Permissions) -> bool {
    use std::os::unix::fs::PermissionsExt;
    permissions.mode() & 0o200 != 0
}

#[cfg(not(unix))]
fn owner_can_write(permissions: &std::fs::Permissions) -> bool {
    !permissions.readonly()
}

#[cfg(unix)]
fn grant_owner_write(permissions: &mut std::fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o700);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn grant_owner_write(permissions: &mut std::fs::Permissions) {
    permissions.set_readonly(false);
}

/// Writes with create-new semantics and confirms a non-empty file landed.
async fn write_new_file(filepath: &Path, bytes: &[u8]) -> Result<u64, BuildError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(filepath)
        .await
        .map_err(|e| {
            tracing::error!(path = %filepath.display(), error = %e, "Failed to create report file");
            fs_error(filepath, e)
        })?;
    file.write_all(bytes).await.map_err(|e| fs_error(filepath, e))?;
    file.sync_all().await.map_err(|e| fs_error(filepath, e))?;
    drop(file);

    let size = tokio::fs::metadata(filepath)
        .await
        .map_err(|e| fs_error(filepath, e))?
        .len();
    if size == 0 {
        return Err(fs_error(filepath, "file is empty after write"));
    }
    Ok(size)
}
