pub mod board;
pub mod search_item;
