mod fragment;
mod handler;

pub use handler::{AnalyzeForm, analyze, index};
