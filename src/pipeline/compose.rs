use chrono::{DateTime, Utc};

use crate::db::{LeadershipEntry, ProgramRecord, ReportingStore};
use crate::deck::{Align, Anchor, Presentation, Slide, TextBox};
use crate::telemetry::metrics::REPORT_PROGRAMS;

use super::content::{ParsedProgramContent, parse_program_content};
use super::layout::{Column, SlideLayout};
use super::status_color::{RatingColor, StatusColorMap};

pub const LEADERSHIP_LIMIT: i64 = 3;
pub const NO_PROGRAMS_MESSAGE: &str = "No finalized submissions for this period.";

const TEXT_DARK: &str = "000000";
const TEXT_MUTED: &str = "404040";
const HEADER_FILL: &str = "D9D9D9";
const CELL_BORDER: &str = "808080";
const BADGE_FILL: &str = "FFD966";
const DRAFT_RED: &str = "FF0000";

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("sector {0} not found")]
    SectorNotFound(i32),

    #[error("reporting period {0} not found")]
    PeriodNotFound(i32),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One program row, ready for layout.
#[derive(Debug, Clone)]
pub struct ProgramRow {
    pub name: String,
    pub agency_name: String,
    pub color: RatingColor,
    pub content: ParsedProgramContent,
}

impl ProgramRow {
    pub fn from_record(record: &ProgramRecord, colors: &StatusColorMap) -> Self {
        Self {
            name: record.name.clone(),
            agency_name: record.agency_name.clone(),
            color: colors.color_for(&record.status),
            content: parse_program_content(record.content_blob.as_deref()),
        }
    }
}

pub struct SectorSlideComposer<'a> {
    pub store: &'a dyn ReportingStore,
    pub layout: &'a SlideLayout,
    pub colors: &'a StatusColorMap,
    pub generated_at: DateTime<Utc>,
}

impl SectorSlideComposer<'_> {
    /// Appends exactly one slide for the sector and returns its index.
    #[tracing::instrument(
        name = "pipeline_stage compose_sector",
        skip(self, deck),
        fields(pipeline.stage = "compose", sector.name, sector.programs)
    )]
    pub async fn compose(
        &self,
        deck: &mut Presentation,
        sector_id: i32,
        period_id: i32,
    ) -> Result<usize, ComposeError> {
        let sector = self
            .store
            .find_sector(sector_id)
            .await?
            .ok_or(ComposeError::SectorNotFound(sector_id))?;
        let period = self
            .store
            .find_period(period_id)
            .await?
            .ok_or(ComposeError::PeriodNotFound(period_id))?;

        let leaders = self
            .store
            .sector_leadership(sector_id, LEADERSHIP_LIMIT)
            .await?;
        let programs = self.store.finalized_programs(sector_id, period_id).await?;

        let rows: Vec<ProgramRow> = programs
            .iter()
            .map(|record| ProgramRow::from_record(record, self.colors))
            .collect();

        let span = tracing::Span::current();
        span.record("sector.name", sector.name.as_str());
        span.record("sector.programs", rows.len());
        REPORT_PROGRAMS.record(rows.len() as f64, &[]);

        let capacity = self.layout.rows_above_legend();
        if rows.len() > capacity {
            tracing::warn!(
                sector_id,
                programs = rows.len(),
                capacity,
                "Program rows extend past the legend area"
            );
        }

        let slide = self.layout_slide(&sector.name, &leaders, &period.label(), &rows);
        Ok(deck.add_slide(slide))
    }

    pub fn layout_slide(
        &self,
        sector_name: &str,
        leaders: &[LeadershipEntry],
        quarter_label: &str,
        rows: &[ProgramRow],
    ) -> Slide {
        let layout = self.layout;
        let mut slide = Slide::default();

        slide.add_text_box(
            TextBox::new(layout.title)
                .anchor(Anchor::Middle)
                .run(sector_name, 24, true, TEXT_DARK),
        );

        if let Some(text) = leadership_text(leaders) {
            slide.add_text_box(
                TextBox::new(layout.leadership)
                    .align(Align::Center)
                    .anchor(Anchor::Middle)
                    .run(text, 11, false, TEXT_MUTED),
            );
        }

        slide.add_text_box(
            TextBox::new(layout.quarter_badge)
                .fill(BADGE_FILL)
                .align(Align::Center)
                .anchor(Anchor::Middle)
                .run(quarter_label, 18, true, TEXT_DARK),
        );

        for column in Column::ALL {
            slide.add_text_box(
                TextBox::new(layout.header_cell(column))
                    .fill(HEADER_FILL)
                    .border(CELL_BORDER)
                    .align(Align::Center)
                    .anchor(Anchor::Middle)
                    .run(column.header(), 12, true, TEXT_DARK),
            );
        }

        if rows.is_empty() {
            slide.add_text_box(
                TextBox::new(layout.full_row(0))
                    .border(CELL_BORDER)
                    .align(Align::Center)
                    .anchor(Anchor::Middle)
                    .run(NO_PROGRAMS_MESSAGE, 11, false, TEXT_MUTED),
            );
        }

        for (i, row) in rows.iter().enumerate() {
            slide.add_text_box(
                TextBox::new(layout.cell(i, Column::Program))
                    .border(CELL_BORDER)
                    .run(row.name.as_str(), 11, true, TEXT_DARK)
                    .line_break()
                    .run(row.agency_name.as_str(), 9, false, TEXT_MUTED),
            );
            slide.add_text_box(bullets(
                TextBox::new(layout.cell(i, Column::Target)).border(CELL_BORDER),
                &row.content.targets,
            ));
            slide.add_text_box(TextBox::new(layout.cell(i, Column::Rating)).border(CELL_BORDER));
            slide.add_rect(layout.rating_swatch(i), row.color.rgb());
            slide.add_text_box(bullets(
                TextBox::new(layout.cell(i, Column::Status)).border(CELL_BORDER),
                &row.content.status_items,
            ));
        }

        for slot in layout.legend_slots() {
            slide.add_rect(slot.swatch, slot.color.rgb());
            slide.add_text_box(
                TextBox::new(slot.label)
                    .anchor(Anchor::Middle)
                    .run(slot.color.legend_label(), 10, false, TEXT_DARK),
            );
        }

        slide.add_text_box(
            TextBox::new(layout.timestamp).align(Align::Right).run(
                format!(
                    "DRAFT - generated {} UTC",
                    self.generated_at.format("%Y-%m-%d %H:%M")
                ),
                10,
                true,
                DRAFT_RED,
            ),
        );

        slide
    }
}

/// `Name (Position)` entries joined with ` | `, or `None` without leaders.
pub fn leadership_text(leaders: &[LeadershipEntry]) -> Option<String> {
    if leaders.is_empty() {
        return None;
    }
    Some(
        leaders
            .iter()
            .map(|l| format!("{} ({})", l.full_name, l.position))
            .collect::<Vec<_>>()
            .join(" | "),
    )
}

fn bullets(mut text_box: TextBox, items: &[String]) -> TextBox {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            text_box = text_box.line_break();
        }
        text_box = text_box.run(format!("\u{2022} {item}"), 9, false, TEXT_DARK);
    }
    text_box
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryStore, program};
    use crate::deck::DocumentProperties;
    use crate::pipeline::content::{NO_STATUS_PLACEHOLDER, NO_TARGETS_PLACEHOLDER};
    use chrono::TimeZone;

    fn deck() -> Presentation {
        Presentation::new(
            DocumentProperties {
                creator: "tests".into(),
                title: "t".into(),
                subject: "s".into(),
                created: Utc::now(),
            },
            1280,
            720,
        )
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 9, 30, 0).unwrap()
    }

    fn store_with_two_programs() -> MemoryStore {
        let mut store = MemoryStore::with_period(1, 2025);
        store.add_sector(10, "Infrastructure");
        store.add_program(
            10,
            1,
            program(
                1,
                "Program A",
                "on-track",
                Some(r#"{"target": "Pave 20 km", "achievement": "12 km paved"}"#),
            ),
        );
        store.add_program(
            10,
            1,
            program(2, "Program B", "severe-delay", Some(r#"{"target": "Broken"#)),
        );
        store
    }

    #[tokio::test]
    async fn test_malformed_program_does_not_disturb_sibling_row() {
        let store = store_with_two_programs();
        let layout = SlideLayout::default();
        let colors = StatusColorMap::default();
        let composer = SectorSlideComposer {
            store: &store,
            layout: &layout,
            colors: &colors,
            generated_at: fixed_time(),
        };

        let mut deck = deck();
        let index = composer.compose(&mut deck, 10, 1).await.unwrap();
        assert_eq!(index, 0);
        assert_eq!(deck.slide_count(), 1);

        let texts = deck.slides()[0].texts();
        assert!(texts.contains(&"Program A\nDepartment of Testing".to_string()));
        assert!(texts.contains(&"Program B\nDepartment of Testing".to_string()));
        assert!(texts.contains(&"\u{2022} Pave 20 km".to_string()));
        assert!(texts.contains(&"\u{2022} 12 km paved".to_string()));
        assert!(texts.contains(&format!("\u{2022} {NO_TARGETS_PLACEHOLDER}")));
        assert!(texts.contains(&format!("\u{2022} {NO_STATUS_PLACEHOLDER}")));

        let swatches: Vec<_> = deck.slides()[0]
            .rects()
            .filter(|r| r.frame == layout.rating_swatch(0) || r.frame == layout.rating_swatch(1))
            .map(|r| r.fill.as_str())
            .collect();
        assert_eq!(
            swatches,
            vec![RatingColor::Green.rgb(), RatingColor::Red.rgb()]
        );
    }

    #[tokio::test]
    async fn test_header_badge_legend_and_timestamp() {
        let mut store = store_with_two_programs();
        store.leadership.insert(
            10,
            vec![
                LeadershipEntry {
                    full_name: "Ana Cruz".into(),
                    position: "A-Director".into(),
                },
                LeadershipEntry {
                    full_name: "Ben Ortiz".into(),
                    position: "C-Secretary".into(),
                },
                LeadershipEntry {
                    full_name: "Cai Lim".into(),
                    position: "B-Undersecretary".into(),
                },
                LeadershipEntry {
                    full_name: "Dee Park".into(),
                    position: "0-Staff".into(),
                },
            ],
        );
        let layout = SlideLayout::default();
        let colors = StatusColorMap::default();
        let composer = SectorSlideComposer {
            store: &store,
            layout: &layout,
            colors: &colors,
            generated_at: fixed_time(),
        };

        let mut deck = deck();
        composer.compose(&mut deck, 10, 1).await.unwrap();
        let texts = deck.slides()[0].texts();

        assert_eq!(texts[0], "Infrastructure");
        assert_eq!(
            texts[1],
            "Ben Ortiz (C-Secretary) | Cai Lim (B-Undersecretary) | Ana Cruz (A-Director)"
        );
        assert_eq!(texts[2], "Q1 2025");
        assert_eq!(&texts[3..7], &["Program", "Target", "Rating", "Status"]);
        assert!(texts.contains(&"Severe delays".to_string()));
        assert_eq!(
            texts.last().unwrap(),
            "DRAFT - generated 2025-04-02 09:30 UTC"
        );
    }

    #[tokio::test]
    async fn test_empty_sector_gets_notice_row() {
        let mut store = MemoryStore::with_period(2, 2025);
        store.add_sector(5, "Health");
        let layout = SlideLayout::default();
        let colors = StatusColorMap::default();
        let composer = SectorSlideComposer {
            store: &store,
            layout: &layout,
            colors: &colors,
            generated_at: fixed_time(),
        };

        let mut deck = deck();
        composer.compose(&mut deck, 5, 1).await.unwrap();
        let slide = &deck.slides()[0];
        assert!(slide.texts().contains(&NO_PROGRAMS_MESSAGE.to_string()));
        // Legend swatches only.
        assert_eq!(slide.rects().count(), 3);
    }

    #[tokio::test]
    async fn test_missing_sector_or_period_is_an_error() {
        let store = store_with_two_programs();
        let layout = SlideLayout::default();
        let colors = StatusColorMap::default();
        let composer = SectorSlideComposer {
            store: &store,
            layout: &layout,
            colors: &colors,
            generated_at: fixed_time(),
        };

        let mut deck = deck();
        assert!(matches!(
            composer.compose(&mut deck, 99, 1).await,
            Err(ComposeError::SectorNotFound(99))
        ));
        assert!(matches!(
            composer.compose(&mut deck, 10, 42).await,
            Err(ComposeError::PeriodNotFound(42))
        ));
        assert_eq!(deck.slide_count(), 0);
    }

    #[tokio::test]
    async fn test_rows_past_legend_are_kept() {
        let mut store = MemoryStore::with_period(1, 2025);
        store.add_sector(3, "Water");
        for i in 0..9 {
            store.add_program(3, 1, program(i, &format!("Program {i}"), "completed", None));
        }
        let layout = SlideLayout::default();
        let colors = StatusColorMap::default();
        let composer = SectorSlideComposer {
            store: &store,
            layout: &layout,
            colors: &colors,
            generated_at: fixed_time(),
        };

        let mut deck = deck();
        composer.compose(&mut deck, 3, 1).await.unwrap();
        let slide = &deck.slides()[0];

        let program_cells = slide
            .texts()
            .iter()
            .filter(|t| t.starts_with("Program ") && t.ends_with("Department of Testing"))
            .count();
        assert_eq!(program_cells, 9);
        assert!(
            slide
                .rects()
                .any(|r| r.frame == layout.rating_swatch(8) && r.frame.y > layout.legend.y)
        );
    }

    #[test]
    fn test_leadership_text_empty() {
        assert_eq!(leadership_text(&[]), None);
    }
}
