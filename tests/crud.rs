mod common;

use common::{error_code, exec, schema_for, task_model};
use dryer::{CollisionPolicy, FieldConfig, ModelDefinitionConfig};
use serde_json::json;

const CREATE_TASK: &str = r#"mutation($input: CreateTaskInput!) {
    createTask(input: $input) { id title done createdAt updatedAt }
}"#;

#[tokio::test]
async fn create_then_get_returns_defaults() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    let created = exec(&schema, CREATE_TASK, json!({ "input": { "title": "x" } })).await;
    assert!(created.get("errors").is_none(), "{created}");
    let task = &created["data"]["createTask"];
    assert_eq!(task["title"], "x");
    assert_eq!(task["done"], false);
    assert_eq!(task["createdAt"], task["updatedAt"]);
    let id = task["id"].as_str().unwrap();

    let fetched = exec(
        &schema,
        "query($id: ID!) { getTask(id: $id) { id title done } }",
        json!({ "id": id }),
    )
    .await;
    assert_eq!(
        fetched["data"]["getTask"],
        json!({ "id": id, "title": "x", "done": false })
    );
}

#[tokio::test]
async fn missing_required_field_is_a_validation_error() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    let res = exec(
        &schema,
        "mutation { createTask(input: { done: true }) { id } }",
        json!({}),
    )
    .await;
    assert!(res["errors"].is_array());
}

#[tokio::test]
async fn get_unknown_id_is_not_found() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    let res = exec(&schema, r#"{ getTask(id: "nope") { id } }"#, json!({})).await;
    assert_eq!(error_code(&res), Some("NOT_FOUND"));
}

#[tokio::test]
async fn update_merges_and_rejects_null_required() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    let created = exec(&schema, CREATE_TASK, json!({ "input": { "title": "x" } })).await;
    let id = created["data"]["createTask"]["id"].as_str().unwrap().to_string();

    let updated = exec(
        &schema,
        "mutation($id: ID!) { updateTask(id: $id, input: { done: true }) { title done } }",
        json!({ "id": id }),
    )
    .await;
    assert_eq!(updated["data"]["updateTask"], json!({ "title": "x", "done": true }));

    let nulled = exec(
        &schema,
        "mutation($id: ID!) { updateTask(id: $id, input: { title: null }) { title } }",
        json!({ "id": id }),
    )
    .await;
    assert_eq!(error_code(&nulled), Some("VALIDATION_ERROR"));

    let missing = exec(
        &schema,
        r#"mutation { updateTask(id: "nope", input: { done: true }) { id } }"#,
        json!({}),
    )
    .await;
    assert_eq!(error_code(&missing), Some("NOT_FOUND"));
}

#[tokio::test]
async fn delete_twice_then_not_found() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    let created = exec(&schema, CREATE_TASK, json!({ "input": { "title": "x" } })).await;
    let id = created["data"]["createTask"]["id"].as_str().unwrap().to_string();
    let delete = "mutation($id: ID!) { deleteTask(id: $id) }";

    let first = exec(&schema, delete, json!({ "id": id })).await;
    assert_eq!(first["data"]["deleteTask"], true);
    let second = exec(&schema, delete, json!({ "id": id })).await;
    assert_eq!(error_code(&second), Some("NOT_FOUND"));
}

#[tokio::test]
async fn list_on_empty_collection_is_empty() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    let res = exec(&schema, "{ listTask { id } }", json!({})).await;
    assert_eq!(res["data"]["listTask"], json!([]));
}

#[tokio::test]
async fn list_filters_and_pages_in_creation_order() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    for (title, done) in [("a", false), ("b", true), ("c", false), ("d", false)] {
        let res = exec(
            &schema,
            CREATE_TASK,
            json!({ "input": { "title": title, "done": done } }),
        )
        .await;
        assert!(res.get("errors").is_none(), "{res}");
    }

    let open = exec(&schema, "{ listTask(filter: { done: false }) { title } }", json!({})).await;
    assert_eq!(
        open["data"]["listTask"],
        json!([{ "title": "a" }, { "title": "c" }, { "title": "d" }])
    );

    let page = exec(
        &schema,
        "{ listTask(pagination: { limit: 2, offset: 1 }) { title } }",
        json!({}),
    )
    .await;
    assert_eq!(page["data"]["listTask"], json!([{ "title": "b" }, { "title": "c" }]));

    let negative = exec(
        &schema,
        "{ listTask(pagination: { offset: -1 }) { title } }",
        json!({}),
    )
    .await;
    assert_eq!(error_code(&negative), Some("VALIDATION_ERROR"));
}

#[tokio::test]
async fn numbers_dates_and_arrays_round_trip() {
    let event = ModelDefinitionConfig::new("Event")
        .field("name", FieldConfig::new("string").required())
        .field("seats", FieldConfig::new("number"))
        .field("startsAt", FieldConfig::new("date"))
        .field("tags", FieldConfig::new("array").with_items("string"));
    let schema = schema_for(vec![event], CollisionPolicy::Reject).await;
    let res = exec(
        &schema,
        r#"mutation($input: CreateEventInput!) {
            createEvent(input: $input) { name seats startsAt tags }
        }"#,
        json!({ "input": {
            "name": "launch",
            "seats": 40,
            "startsAt": "2024-05-01T10:00:00+02:00",
            "tags": ["a", "b"]
        } }),
    )
    .await;
    assert!(res.get("errors").is_none(), "{res}");
    let event = &res["data"]["createEvent"];
    assert_eq!(event["seats"], 40.0);
    assert_eq!(event["startsAt"], "2024-05-01T08:00:00.000Z");
    assert_eq!(event["tags"], json!(["a", "b"]));
}

#[tokio::test]
async fn integer_id_literal_is_accepted() {
    let schema = schema_for(vec![task_model()], CollisionPolicy::Reject).await;
    let res = exec(&schema, "{ getTask(id: 5) { id } }", json!({})).await;
    assert_eq!(error_code(&res), Some("NOT_FOUND"));
    assert_eq!(res["errors"][0]["message"], "not found: Task '5'");
}
