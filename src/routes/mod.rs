pub mod health;
pub mod linguistic;
pub mod web;
