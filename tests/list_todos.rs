pub mod common;

// NOTE: Other test binaries may insert rows concurrently, so assertions
// only pin down the todos created here.

#[tokio::test]
async fn filters_by_completed() {
    let client = common::Client::new();

    let done = client.add_todo("List: done", true).await.unwrap();
    let pending = client.add_todo("List: pending", false).await.unwrap();

    let completed = client.get_todos(Some(true)).await.unwrap();
    assert!(completed.iter().all(|todo| todo.completed));
    assert!(completed.iter().any(|todo| todo.id == done.id));
    assert!(completed.iter().all(|todo| todo.id != pending.id));

    let pending_only = client.get_todos(Some(false)).await.unwrap();
    assert!(pending_only.iter().all(|todo| !todo.completed));
    assert!(pending_only.iter().any(|todo| todo.id == pending.id));
    assert!(pending_only.iter().all(|todo| todo.id != done.id));
}

#[tokio::test]
async fn lists_everything_without_filter() {
    let client = common::Client::new();

    let done = client.add_todo("List: all done", true).await.unwrap();
    let pending = client.add_todo("List: all pending", false).await.unwrap();

    let todos = client.get_todos(None).await.unwrap();
    assert!(todos.iter().any(|todo| todo.id == done.id));
    assert!(todos.iter().any(|todo| todo.id == pending.id));
}
