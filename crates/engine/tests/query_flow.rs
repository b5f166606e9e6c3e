use anyhow::Result;
use jsontools_engine::{EngineError, JsonTools, PathSegment};
use jsontools_store::StoreError;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn query_and_nodes_over_single_document() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("doc.json");
    std::fs::write(&path, r#"{"a":[1,2,3],"b":{"a":[4]}}"#)?;
    let tools = JsonTools::default();

    assert_eq!(
        tools.query(&path, "$.a[*]", None).await?,
        vec![json!(1), json!(2), json!(3)]
    );
    assert_eq!(tools.query(&path, "$..a[*]", Some(2)).await?.len(), 2);

    let found = tools.nodes(&path, "$.b.a[0]", None).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].path,
        vec![
            PathSegment::Key("$".into()),
            PathSegment::Key("b".into()),
            PathSegment::Key("a".into()),
            PathSegment::Index(0),
        ]
    );
    assert_eq!(found[0].value, json!(4));
    Ok(())
}

#[tokio::test]
async fn line_delimited_file_is_queried_as_array_of_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.ndjson");
    std::fs::write(&path, "{\"id\":1,\"ok\":true}\n\n{\"id\":2,\"ok\":false}\n")?;

    let ids = JsonTools::default()
        .query(&path, "$[?@.ok == true].id", None)
        .await?;
    assert_eq!(ids, vec![json!(1)]);
    Ok(())
}

#[tokio::test]
async fn malformed_line_is_reported_with_its_number() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("broken.ndjson");
    std::fs::write(&path, "{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n{\"a\":\n")?;

    let err = JsonTools::default()
        .query(&path, "$[*]", None)
        .await
        .unwrap_err();
    match &err {
        EngineError::Store(StoreError::MalformedContent { line, .. }) => assert_eq!(*line, 4),
        other => panic!("unexpected error: {other:?}"),
    }
    let envelope = err.to_envelope();
    assert_eq!(envelope.code, "malformed_content");
    assert!(envelope.details.is_some());
    Ok(())
}

#[tokio::test]
async fn invalid_expression_is_rejected_before_matching() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("doc.json");
    std::fs::write(&path, "{}")?;

    let err = JsonTools::default()
        .nodes(&path, "$.[", None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_path");
    Ok(())
}
