use async_trait::async_trait;
use log::{info, warn};

use super::client::ShortcutClient;
use crate::error::{DoraError, Result};
use crate::models::Story;
use crate::providers::StorySource;
use crate::window::TimeWindow;

/// Search expression for stories completed inside `window`, optionally
/// restricted to one story type.
pub fn build_query(window: &TimeWindow, story_type: Option<&str>) -> String {
    let mut query = window.completed_range_query();
    if let Some(story_type) = story_type.map(str::trim).filter(|t| !t.is_empty()) {
        query.push_str(" type:");
        query.push_str(story_type);
    }
    query
}

impl ShortcutClient {
    pub async fn search_stories(
        &self,
        window: &TimeWindow,
        story_type: Option<&str>,
    ) -> Result<Vec<Story>> {
        let query = build_query(window, story_type);
        info!("Searching stories: {query}");

        let mut response = self.fetch_first_page(&query).await?;
        let mut stories = Vec::with_capacity(response.total.min(1_000));
        let mut pages = 1;

        loop {
            let next = response.next_cursor().map(str::to_string);
            stories.extend(response.data.into_iter().map(Story::from));

            let Some(next) = next else {
                break;
            };

            if pages >= self.max_pages {
                warn!("Story search still has pages after {pages}, aborting");
                return Err(DoraError::PageLimitExceeded {
                    source_name: "Shortcut story search".to_string(),
                    pages: self.max_pages,
                });
            }

            response = self.fetch_next_page(&next).await?;
            pages += 1;
        }

        info!("Fetched {} stories in {pages} page(s)", stories.len());
        Ok(stories)
    }
}

#[async_trait]
impl StorySource for ShortcutClient {
    async fn search(&self, window: &TimeWindow, story_type: Option<&str>) -> Result<Vec<Story>> {
        self.search_stories(window, story_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;
    use crate::providers::HttpOptions;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use serde_json::json;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 7, 20, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 8, 18, 23, 59, 59).unwrap(),
        )
        .unwrap()
    }

    fn story(id: u32, story_type: &str, cycle_time: u64) -> serde_json::Value {
        json!({
            "name": format!("Story {id}"),
            "app_url": format!("https://app.shortcut.com/acme/story/{id}"),
            "story_type": story_type,
            "completed_at": "2024-08-14T12:00:00Z",
            "cycle_time": cycle_time
        })
    }

    fn client(server: &mockito::ServerGuard, max_pages: u32) -> ShortcutClient {
        ShortcutClient::new(
            &server.url(),
            Token::from("sc-token"),
            &HttpOptions {
                max_pages,
                ..HttpOptions::default()
            },
        )
        .unwrap()
    }

    fn first_page_query(query: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), query.into()),
            Matcher::UrlEncoded("detail".into(), "slim".into()),
        ])
    }

    #[test]
    fn test_build_query_without_type() {
        assert_eq!(build_query(&window(), None), "completed:2024-07-20..2024-08-18");
        assert_eq!(build_query(&window(), Some("")), "completed:2024-07-20..2024-08-18");
    }

    #[test]
    fn test_build_query_with_type() {
        assert_eq!(
            build_query(&window(), Some("bug")),
            "completed:2024-07-20..2024-08-18 type:bug"
        );
    }

    #[tokio::test]
    async fn test_follows_every_cursor() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/v3/search/stories")
            .match_query(first_page_query("completed:2024-07-20..2024-08-18 type:bug"))
            .match_header("shortcut-token", "sc-token")
            .with_body(
                json!({
                    "next": "/api/v3/search/stories?page_token=p2",
                    "data": [story(1, "bug", 3600), story(2, "bug", 7200)],
                    "total": 3
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v3/search/stories")
            .match_query(Matcher::UrlEncoded("page_token".into(), "p2".into()))
            .match_header("shortcut-token", "sc-token")
            .with_body(
                json!({"next": "", "data": [story(3, "bug", 10800)], "total": 3}).to_string(),
            )
            .create_async()
            .await;

        let stories = client(&server, 10)
            .search_stories(&window(), Some("bug"))
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let names: Vec<_> = stories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Story 1", "Story 2", "Story 3"]);
    }

    #[tokio::test]
    async fn test_repeated_searches_return_same_records() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/search/stories")
            .match_query(first_page_query("completed:2024-07-20..2024-08-18"))
            .with_body(
                json!({
                    "next": "/api/v3/search/stories?page_token=p2",
                    "data": [story(1, "feature", 60)],
                    "total": 2
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/search/stories")
            .match_query(Matcher::UrlEncoded("page_token".into(), "p2".into()))
            .with_body(json!({"next": null, "data": [story(2, "chore", 120)]}).to_string())
            .expect(2)
            .create_async()
            .await;

        let client = client(&server, 10);
        let first_run = client.search_stories(&window(), None).await.unwrap();
        let second_run = client.search_stories(&window(), None).await.unwrap();

        assert_eq!(first_run.len(), 2);
        assert_eq!(first_run, second_run);
    }

    #[tokio::test]
    async fn test_error_status_surfaces_body_and_drops_pages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/search/stories")
            .match_query(first_page_query("completed:2024-07-20..2024-08-18"))
            .with_body(
                json!({
                    "next": "/api/v3/search/stories?page_token=p2",
                    "data": [story(1, "feature", 60)]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/search/stories")
            .match_query(Matcher::UrlEncoded("page_token".into(), "p2".into()))
            .with_status(401)
            .with_body(r#"{"message":"Unauthorized"}"#)
            .create_async()
            .await;

        let err = client(&server, 10)
            .search_stories(&window(), None)
            .await
            .unwrap_err();

        match err {
            DoraError::Upstream { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, r#"{"message":"Unauthorized"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cursor_to_other_host_is_not_followed() {
        let mut server = mockito::Server::new_async().await;
        let mut other = mockito::Server::new_async().await;
        let foreign = other
            .mock("GET", "/steal")
            .with_body(json!({"next": "", "data": []}).to_string())
            .expect(0)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/search/stories")
            .match_query(first_page_query("completed:2024-07-20..2024-08-18"))
            .with_body(
                json!({"next": format!("{}/steal", other.url()), "data": [story(1, "bug", 60)]})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server, 10)
            .search_stories(&window(), None)
            .await
            .unwrap_err();

        foreign.assert_async().await;
        assert!(matches!(err, DoraError::InvalidCursor { .. }));
    }

    #[tokio::test]
    async fn test_self_referencing_cursor_hits_page_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/search/stories")
            .match_query(first_page_query("completed:2024-07-20..2024-08-18"))
            .with_body(
                json!({"next": "/api/v3/search/stories?page_token=loop", "data": []}).to_string(),
            )
            .create_async()
            .await;
        let looping = server
            .mock("GET", "/api/v3/search/stories")
            .match_query(Matcher::UrlEncoded("page_token".into(), "loop".into()))
            .with_body(
                json!({"next": "/api/v3/search/stories?page_token=loop", "data": []}).to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let err = client(&server, 3)
            .search_stories(&window(), None)
            .await
            .unwrap_err();

        looping.assert_async().await;
        assert!(matches!(err, DoraError::PageLimitExceeded { pages: 3, .. }));
    }
}
