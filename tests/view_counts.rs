//! View counters under concurrency and caching.

mod support;

use std::sync::atomic::Ordering;

use support::{BackendOptions, build_backend};

#[tokio::test]
async fn fifty_concurrent_reads_persist_fifty_views() {
    let backend = build_backend(BackendOptions::default());
    let post = backend.repo.seed_post("busy-post");

    let mut handles = Vec::new();
    for _ in 0..50 {
        let blog = backend.blog.clone();
        let slug = post.slug.clone();
        handles.push(tokio::spawn(async move {
            blog.detail(&slug).await.unwrap().unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(backend.repo.post_view_count(post.id), 50);
}

#[tokio::test]
async fn cache_hits_still_count_views() {
    let backend = build_backend(BackendOptions::default());
    let post = backend.repo.seed_post("cached-post");

    backend.blog.detail(&post.slug).await.unwrap().unwrap();
    backend.blog.detail(&post.slug).await.unwrap().unwrap();
    backend.blog.detail(&post.slug).await.unwrap().unwrap();

    // one store lookup, three recorded views
    assert_eq!(backend.repo.post_find_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.repo.post_view_count(post.id), 3);
}

#[tokio::test]
async fn project_detail_counts_views_too() {
    let backend = build_backend(BackendOptions::default());
    let project = backend.repo.seed_project("alpha");

    backend.catalog.detail(project.id).await.unwrap().unwrap();
    backend.catalog.detail(project.id).await.unwrap().unwrap();

    assert_eq!(backend.repo.project_view_count(project.id), 2);
}

#[tokio::test]
async fn missing_entities_do_not_count_views() {
    let backend = build_backend(BackendOptions::default());

    let found = backend.blog.detail("no-such-post").await.unwrap();
    assert!(found.is_none());

    // nothing to count against
    assert!(backend.repo.posts.lock().unwrap().is_empty());
}
