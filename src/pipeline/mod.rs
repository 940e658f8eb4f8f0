pub mod builder;
pub mod compose;
pub mod content;
pub mod layout;
pub mod orchestrator;
pub mod status_color;

pub use builder::{BuildError, BuildSummary, PresentationBuilder};
pub use compose::SectorSlideComposer;
pub use content::{ParsedProgramContent, parse_program_content};
pub use layout::SlideLayout;
pub use orchestrator::{
    GeneratedReport, GenerationSettings, ReportError, ReportOrchestrator,
};
pub use status_color::{RatingColor, StatusColorMap};
