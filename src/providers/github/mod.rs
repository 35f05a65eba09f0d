mod client;
mod pulls;

pub use client::GitHubClient;
