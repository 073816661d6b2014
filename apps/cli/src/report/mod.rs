//! Report rendering - turns an [`AssessmentResult`] into output text

mod json;
mod style;
mod text;

use json::JsonRenderer;
use text::TextRenderer;

use anyhow::Result;
use nodecheck::AssessmentResult;

pub trait Renderer {
    fn render(&self, result: &AssessmentResult) -> Result<String>;
}

/// Pick the renderer once at startup
pub fn select(json: bool, no_color: bool) -> Box<dyn Renderer> {
    if json {
        Box::new(JsonRenderer)
    } else {
        Box::new(TextRenderer::new(style::detect(no_color)))
    }
}
