mod analyze;
mod health;
mod thumbnails;

pub use analyze::handle_analyze;
pub use health::health_check;
pub use thumbnails::get_thumbnail;
