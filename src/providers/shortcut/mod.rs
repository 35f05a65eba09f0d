mod client;
mod search;

pub use client::ShortcutClient;
