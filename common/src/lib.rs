mod elapsed;

pub use elapsed::format_duration;
pub use elapsed::format_elapsed;
