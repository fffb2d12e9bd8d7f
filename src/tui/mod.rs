mod dashboard_view;
mod highlight;
mod input;
mod issues_view;
mod renderer;
mod stream_view;
mod tabs;
mod theme;

pub use highlight::{HighlightSpan, SpanKind, spans, styled_line, truncate};
pub use input::handle_key;
pub use renderer::Renderer;
pub use tabs::{View, ViewTabs};
