pub mod category;
pub mod poster;
