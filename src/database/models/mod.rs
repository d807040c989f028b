pub mod dictionary;
pub mod history;
pub mod user;
