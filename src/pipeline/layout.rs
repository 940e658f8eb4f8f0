//! Fixed slide geometry, in pixels at 96 DPI.
//!
//! Rows have a constant height regardless of content; long bullet lists are
//! expected to be short enough already when they reach the layout.

use serde::{Deserialize, Serialize};

use super::status_color::RatingColor;

pub const EMU_PER_PX: i64 = 9525;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Program,
    Target,
    Rating,
    Status,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::Program, Column::Target, Column::Rating, Column::Status];

    pub fn header(self) -> &'static str {
        match self {
            Column::Program => "Program",
            Column::Target => "Target",
            Column::Rating => "Rating",
            Column::Status => "Status",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableGeometry {
    pub x: u32,
    pub y: u32,
    pub header_height: u32,
    pub row_height: u32,
    /// Program, Target, Rating, Status.
    pub column_widths: [u32; 4],
    pub swatch_width: u32,
    pub swatch_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendGeometry {
    pub x: u32,
    pub y: u32,
    pub box_size: u32,
    pub text_height: u32,
    pub margin: u32,
    /// Average glyph advance used to estimate label width.
    pub char_width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideLayout {
    pub slide_width: u32,
    pub slide_height: u32,
    pub title: Frame,
    pub leadership: Frame,
    pub quarter_badge: Frame,
    pub table: TableGeometry,
    pub legend: LegendGeometry,
    pub timestamp: Frame,
}

impl Default for SlideLayout {
    fn default() -> Self {
        Self {
            slide_width: 1280,
            slide_height: 720,
            title: Frame::new(30, 20, 420, 44),
            leadership: Frame::new(460, 24, 600, 36),
            quarter_badge: Frame::new(1090, 20, 160, 44),
            table: TableGeometry {
                x: 30,
                y: 84,
                header_height: 32,
                row_height: 72,
                column_widths: [260, 400, 120, 440],
                swatch_width: 60,
                swatch_height: 28,
            },
            legend: LegendGeometry {
                x: 30,
                y: 652,
                box_size: 16,
                text_height: 20,
                margin: 28,
                char_width: 6,
            },
            timestamp: Frame::new(890, 684, 360, 24),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendSlot {
    pub color: RatingColor,
    pub swatch: Frame,
    pub label: Frame,
}

impl SlideLayout {
    pub fn column_offsets(&self) -> [u32; 4] {
        let mut offsets = [0; 4];
        let mut x = self.table.x;
        for (offset, width) in offsets.iter_mut().zip(self.table.column_widths) {
            *offset = x;
            x += width;
        }
        offsets
    }

    pub fn table_width(&self) -> u32 {
        self.table.column_widths.iter().sum()
    }

    pub fn header_cell(&self, column: Column) -> Frame {
        Frame::new(
            self.column_offsets()[column.index()],
            self.table.y,
            self.table.column_widths[column.index()],
            self.table.header_height,
        )
    }

    /// Rows are fixed height and never shrink; rows at or past this count
    /// overlap the legend and eventually run off the slide.
    pub fn rows_above_legend(&self) -> usize {
        let table_body = self.table.y + self.table.header_height;
        (self.legend.y.saturating_sub(table_body) / self.table.row_height.max(1)) as usize
    }

    pub fn row_top(&self, row: usize) -> u32 {
        self.table.y + self.table.header_height + row as u32 * self.table.row_height
    }

    pub fn cell(&self, row: usize, column: Column) -> Frame {
        Frame::new(
            self.column_offsets()[column.index()],
            self.row_top(row),
            self.table.column_widths[column.index()],
            self.table.row_height,
        )
    }

    /// Row spanning all four columns, used for the empty-sector notice.
    pub fn full_row(&self, row: usize) -> Frame {
        Frame::new(
            self.table.x,
            self.row_top(row),
            self.table_width(),
            self.table.row_height,
        )
    }

    /// Solid rating rectangle centered inside the Rating cell.
    pub fn rating_swatch(&self, row: usize) -> Frame {
        let cell = self.cell(row, Column::Rating);
        Frame::new(
            cell.x + cell.width.saturating_sub(self.table.swatch_width) / 2,
            cell.y + cell.height.saturating_sub(self.table.swatch_height) / 2,
            self.table.swatch_width,
            self.table.swatch_height,
        )
    }

    pub fn estimate_text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.legend.char_width
    }

    /// Legend entries left to right; each advances by box + label + margin.
    pub fn legend_slots(&self) -> Vec<LegendSlot> {
        let legend = &self.legend;
        let box_y = legend.y + legend.text_height.saturating_sub(legend.box_size) / 2;
        let mut x = legend.x;

        RatingColor::ALL
            .into_iter()
            .map(|color| {
                let text_width = self.estimate_text_width(color.legend_label());
                let slot = LegendSlot {
                    color,
                    swatch: Frame::new(x, box_y, legend.box_size, legend.box_size),
                    label: Frame::new(x + legend.box_size, legend.y, text_width, legend.text_height),
                };
                x += legend.box_size + text_width + legend.margin;
                slot
            })
            .collect()
    }

    /// Flat `component -> frame` table for a slide with `rows` program rows.
    pub fn components(&self, rows: usize) -> Vec<(String, Frame)> {
        let mut out = vec![
            ("title".to_string(), self.title),
            ("leadership".to_string(), self.leadership),
            ("quarter_badge".to_string(), self.quarter_badge),
        ];
        for column in Column::ALL {
            out.push((
                format!("header.{}", column.header().to_lowercase()),
                self.header_cell(column),
            ));
        }
        for row in 0..rows {
            for column in Column::ALL {
                out.push((
                    format!("row{row}.{}", column.header().to_lowercase()),
                    self.cell(row, column),
                ));
            }
            out.push((format!("row{row}.swatch"), self.rating_swatch(row)));
        }
        for (i, slot) in self.legend_slots().into_iter().enumerate() {
            out.push((format!("legend{i}.box"), slot.swatch));
            out.push((format!("legend{i}.label"), slot.label));
        }
        out.push(("timestamp".to_string(), self.timestamp));
        out
    }
}

pub fn px_to_emu(px: u32) -> i64 {
    i64::from(px) * EMU_PER_PX
}
