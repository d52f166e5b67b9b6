pub mod body;
pub mod compose;
pub mod encoding;
pub mod html;
pub mod search;
pub mod sequence;
pub mod structure;
