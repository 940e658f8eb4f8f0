//! In-memory presentation model and the backends that serialize it.

pub mod engine;
pub mod pptx;

use chrono::{DateTime, Utc};

use crate::pipeline::layout::Frame;

pub use engine::{DeckBackend, DeckEngine, DeckError};
pub use pptx::PptxBackend;

#[derive(Debug, Clone)]
pub struct DocumentProperties {
    pub creator: String,
    pub title: String,
    pub subject: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Presentation {
    pub properties: DocumentProperties,
    pub width_px: u32,
    pub height_px: u32,
    slides: Vec<Slide>,
}

impl Presentation {
    pub fn new(properties: DocumentProperties, width_px: u32, height_px: u32) -> Self {
        Self {
            properties,
            width_px,
            height_px,
            slides: Vec::new(),
        }
    }

    /// Appends a slide and returns its index.
    pub fn add_slide(&mut self, slide: Slide) -> usize {
        self.slides.push(slide);
        self.slides.len() - 1
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Slide {
    pub shapes: Vec<Shape>,
}

impl Slide {
    pub fn add_text_box(&mut self, text_box: TextBox) {
        self.shapes.push(Shape::Text(text_box));
    }

    pub fn add_rect(&mut self, frame: Frame, fill: &str) {
        self.shapes.push(Shape::Rect(Rect {
            frame,
            fill: fill.to_string(),
        }));
    }

    /// Plain text of every text box, line breaks rendered as `\n`.
    pub fn texts(&self) -> Vec<String> {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Text(tb) => Some(tb.plain_text()),
                Shape::Rect(_) => None,
            })
            .collect()
    }

    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.shapes.iter().filter_map(|shape| match shape {
            Shape::Rect(rect) => Some(rect),
            Shape::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Shape {
    Text(TextBox),
    Rect(Rect),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub frame: Frame,
    pub fill: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Top,
    Middle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub size_pt: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Run(Run),
    Break,
}

#[derive(Debug, Clone)]
pub struct TextBox {
    pub frame: Frame,
    pub fill: Option<String>,
    pub border: Option<String>,
    pub align: Align,
    pub anchor: Anchor,
    pub content: Vec<Inline>,
}

impl TextBox {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            fill: None,
            border: None,
            align: Align::Left,
            anchor: Anchor::Top,
            content: Vec::new(),
        }
    }

    pub fn fill(mut self, rgb: &str) -> Self {
        self.fill = Some(rgb.to_string());
        self
    }

    pub fn border(mut self, rgb: &str) -> Self {
        self.border = Some(rgb.to_string());
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn run(mut self, text: impl Into<String>, size_pt: u32, bold: bool, color: &str) -> Self {
        self.content.push(Inline::Run(Run {
            text: text.into(),
            bold,
            size_pt,
            color: color.to_string(),
        }));
        self
    }

    pub fn line_break(mut self) -> Self {
        self.content.push(Inline::Break);
        self
    }

    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|inline| match inline {
                Inline::Run(run) => run.text.as_str(),
                Inline::Break => "\n",
            })
            .collect()
    }
}
