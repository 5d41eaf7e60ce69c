pub mod graph;
pub mod json;
pub mod text;

/// Timestamp rendering options shared by the text renderers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOpts {
    pub gmt: bool,
    pub multi_day: bool,
}
