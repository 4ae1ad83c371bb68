//! Integration tests that call the real story backend.
//!
//! These tests require STORY_USER_ID to be set (via .env file or environment).
//! Run with: `cargo test -p storybot --test api_integration -- --ignored`

use storybot::Storybot;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

fn user_id() -> Option<String> {
    std::env::var("STORY_USER_ID").ok().filter(|v| !v.trim().is_empty())
}

#[tokio::test]
#[ignore] // Run with: cargo test -p storybot --test api_integration -- --ignored
async fn test_fetch_graph_decodes() {
    setup();
    let Some(user_id) = user_id() else {
        eprintln!("Skipping test: STORY_USER_ID not set");
        return;
    };

    let client = Storybot::from_env().expect("Failed to create client");
    let payload = client
        .fetch_graph(&user_id)
        .await
        .expect("fetch should succeed");

    println!(
        "questions={} answers={} final_variants={}",
        payload.questions.len(),
        payload.answers.len(),
        payload.final_variants.len()
    );

    for answer in &payload.answers {
        assert!(
            payload.questions.iter().any(|q| q.id == answer.question_id),
            "answer {} belongs to a missing question",
            answer.id
        );
    }
}

#[tokio::test]
#[ignore]
async fn test_media_resolves_against_host() {
    setup();
    let Some(user_id) = user_id() else {
        eprintln!("Skipping test: STORY_USER_ID not set");
        return;
    };

    let client = Storybot::from_env().expect("Failed to create client");
    let payload = client.fetch_graph(&user_id).await.expect("fetch should succeed");

    let pictures = payload
        .questions
        .iter()
        .filter_map(|q| client.resolve_media(q.picture.as_deref()));
    for url in pictures {
        assert!(url.starts_with("http"), "unresolved media path {url}");
    }
}
