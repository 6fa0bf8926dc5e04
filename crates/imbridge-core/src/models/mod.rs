pub mod read_cursor;
pub mod read_state;

pub use read_cursor::*;
pub use read_state::*;
