pub mod names;
pub mod room_token;
