mod output;
mod viewport;

pub use output::{
    StreamBuffer, StreamLine, TIMESTAMP_WIDTH, line_number_width, plain_text,
};
pub use viewport::{DEFAULT_FOLLOW_TOLERANCE, Viewport};
