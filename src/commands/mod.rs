pub mod completions;
pub mod config;
pub mod extensions;
pub mod observe;
pub mod simulate;
