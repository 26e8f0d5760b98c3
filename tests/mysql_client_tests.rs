use dbload::{
    db::adapter::DbAdapter,
    models::container::{DataCategory, DataContainer},
    DbClient, DeleteOption, LoadInput, LoadType, LoaderConfig, MySqlClient, SchemaDefinition,
    SchemaLoader, WarningAction,
};
use std::env;
use tempfile::tempdir;

const SCHEMA_JSON: &str = r#"{
    "database_name": "dbload_test",
    "tables": [{
        "table_id": "ENTRY",
        "table_name": "entry",
        "attributes": [
            {"attribute_id": "ENTRY_ID", "attribute_name": "entry_id", "sql_type": "VARCHAR", "width": 15, "nullable": false, "primary_key": true, "order": 1},
            {"attribute_id": "TITLE", "attribute_name": "title", "sql_type": "VARCHAR", "width": 10, "order": 2},
            {"attribute_id": "RESOLUTION", "attribute_name": "resolution", "sql_type": "FLOAT", "order": 3},
            {"attribute_id": "MASS", "attribute_name": "mass", "sql_type": "DECIMAL", "width": 10, "precision": 2, "order": 4}
        ],
        "indices": [{"name": "i1", "index_type": "search", "attributes": ["TITLE"]}],
        "attribute_map": [
            {"attribute_id": "ENTRY_ID", "function": "datablockid()"},
            {"attribute_id": "TITLE", "category": "struct", "attribute": "title"},
            {"attribute_id": "RESOLUTION", "category": "struct", "attribute": "resolution"},
            {"attribute_id": "MASS", "category": "struct", "attribute": "mass"}
        ],
        "delete_attribute": "ENTRY_ID"
    }]
}"#;

async fn connect() -> Option<MySqlClient> {
    dotenv::dotenv().ok();
    let database_url = env::var("DATABASE_URL").ok()?;
    Some(MySqlClient::connect(&database_url).await.unwrap())
}

fn schema(database_name: &str) -> SchemaDefinition {
    SchemaDefinition::from_json_str(&SCHEMA_JSON.replace("dbload_test", database_name)).unwrap()
}

fn containers() -> Vec<DataContainer> {
    ["D_1", "D_2"]
        .iter()
        .map(|name| {
            DataContainer::new(name).with_category(
                DataCategory::new("struct", &["title", "resolution", "mass"])
                    .with_row(&["a long title", "?", "1234.5"]),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_create_schema_and_batch_insert() {
    let Some(client) = connect().await else {
        return;
    };
    let schema = schema("dbload_test_load");
    let adapter = DbAdapter::new(&schema, &client, WarningAction::Default);
    assert!(adapter.create_schema(true).await.unwrap());

    let tables = client.query("SHOW TABLES FROM dbload_test_load").await.unwrap();
    assert_eq!(tables, vec![vec![Some("entry".to_string())]]);

    let dir = tempdir().unwrap();
    let loader = SchemaLoader::new(&schema, LoaderConfig::default().with_work_path(dir.path()));
    let report = loader
        .load(&client, LoadInput::Containers(&containers()), LoadType::BatchInsert, DeleteOption::Selected)
        .await
        .unwrap();
    assert!(report.success());
    assert_eq!(report.overflow.get("ENTRY", "TITLE"), Some(12));

    let records = adapter.select_where("ENTRY", &[("ENTRY_ID", "D_2")]).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["TITLE"], Some("a long tit".to_string()));
    assert_eq!(records[0]["RESOLUTION"], None);
    assert_eq!(records[0]["MASS"], Some("1234.50".to_string()));

    // Reloading the same containers replaces their rows.
    let report = loader
        .load(&client, LoadInput::Containers(&containers()), LoadType::BatchInsert, DeleteOption::Selected)
        .await
        .unwrap();
    assert!(report.success());
    let records = adapter.select_where("ENTRY", &[]).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_update_and_delete_by_condition() {
    let Some(client) = connect().await else {
        return;
    };
    let schema = schema("dbload_test_crud");
    let adapter = DbAdapter::new(&schema, &client, WarningAction::Default);
    assert!(adapter.create_schema(true).await.unwrap());

    assert!(adapter
        .insert("ENTRY", &[("ENTRY_ID", "D_9"), ("TITLE", "x")])
        .await
        .unwrap());
    assert!(adapter
        .update("ENTRY", &[("TITLE", "y")], &[("ENTRY_ID", "D_9")])
        .await
        .unwrap());
    let records = adapter.select_where("ENTRY", &[("ENTRY_ID", "D_9")]).await.unwrap();
    assert_eq!(records[0]["TITLE"], Some("y".to_string()));

    assert!(adapter.delete("ENTRY", &[("ENTRY_ID", "D_9")]).await.unwrap());
    assert!(adapter
        .select_where("ENTRY", &[("ENTRY_ID", "D_9")])
        .await
        .unwrap()
        .is_empty());
}
