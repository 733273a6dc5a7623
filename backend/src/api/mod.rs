pub mod admin;
pub mod server;
pub mod token;
pub mod users;
