mod searcher;

pub use searcher::{Match, SearchState, jump_to_match};
