pub mod display;
pub mod text_board;
pub mod view_models;

pub use text_board::TextBoard;
