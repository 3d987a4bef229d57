#![cfg(feature = "sqlite")]

use futures_util::TryStreamExt;
use sql_bridge::prelude::*;

#[derive(Debug, PartialEq)]
struct User {
    id: i64,
    name: String,
}

impl FromRow<SqliteExtension> for User {
    fn from_row(row: Row<SqliteExtension>) -> Result<Self, SqlBridgeError> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

async fn seeded() -> Result<SqliteConnection, SqlBridgeError> {
    let mut conn = SqliteConnection::new(":memory:");
    conn.connect().await?;
    conn.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, avatar BLOB)",
        &[],
    )
    .await?;
    for (id, name) in [(1, "ada"), (2, "grace"), (3, "edsger")] {
        conn.execute(
            "INSERT INTO users (id, name) VALUES (?1, ?2)",
            &[Param::Int(id), Param::from(name)],
        )
        .await?;
    }
    Ok(conn)
}

#[tokio::test]
async fn calls_before_connect_fail_fast() {
    let mut conn = SqliteConnection::new(":memory:");
    assert!(!conn.is_connected());

    let err = conn.execute("SELECT 1", &[]).await.unwrap_err();
    assert!(err.is_not_connected());
    assert_eq!(
        err.to_string(),
        "sqlite connection is not established, call connect() first"
    );
    let err = conn
        .query::<Row<SqliteExtension>>("SELECT 1", &[])
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert!(conn.client().is_err());
    assert!(
        conn.begin_transaction(SqliteBeginOptions::default())
            .await
            .unwrap_err()
            .is_not_connected()
    );
}

#[tokio::test]
async fn connect_twice_is_rejected_and_close_is_idempotent() -> Result<(), SqlBridgeError> {
    let mut conn = SqliteConnection::new("sqlite://:memory:");
    assert_eq!(conn.connection_url(), "sqlite://:memory:");
    conn.connect().await?;
    assert!(conn.is_connected());
    assert!(matches!(
        conn.connect().await,
        Err(SqlBridgeError::AlreadyConnected { engine: "sqlite" })
    ));

    conn.close().await?;
    conn.close().await?;
    assert!(!conn.is_connected());
    assert!(conn.execute("SELECT 1", &[]).await.unwrap_err().is_not_connected());

    // A closed connection can be opened again.
    conn.connect().await?;
    assert_eq!(conn.execute("CREATE TABLE t (x INTEGER)", &[]).await?, Some(0));
    Ok(())
}

#[tokio::test]
async fn execute_reports_affected_rows() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let affected = conn
        .execute(
            "UPDATE users SET score = ?1 WHERE id >= ?2",
            &[Param::Float(9.5), Param::Int(2)],
        )
        .await?;
    assert_eq!(affected, Some(2));
    Ok(())
}

#[tokio::test]
async fn execute_runs_statements_that_return_rows() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let affected = conn
        .execute(
            "INSERT INTO users (id, name) VALUES (?1, ?2), (?3, ?4) RETURNING id",
            &[
                Param::Int(10),
                Param::from("ken"),
                Param::Int(11),
                Param::from("dennis"),
            ],
        )
        .await?;
    assert_eq!(affected, Some(2));

    let rows: Vec<ArrayRow<SqliteExtension>> = conn
        .query_array("SELECT name FROM users WHERE id >= 10 ORDER BY id", &[])
        .await?;
    assert_eq!(
        rows,
        vec![vec![Param::from("ken")], vec![Param::from("dennis")]]
    );

    assert_eq!(conn.execute("SELECT id FROM users", &[]).await?, Some(0));
    Ok(())
}

#[tokio::test]
async fn execute_runs_every_statement_of_a_script() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let affected = conn
        .execute(
            "CREATE TABLE a (x INTEGER); CREATE TABLE b (y INTEGER);
             INSERT INTO a VALUES (1), (2); INSERT INTO b VALUES (3);",
            &[],
        )
        .await?;
    assert_eq!(affected, Some(3));

    let counts: Option<ArrayRow<SqliteExtension>> = conn
        .query_one_array("SELECT (SELECT COUNT(*) FROM a), (SELECT COUNT(*) FROM b)", &[])
        .await?;
    assert_eq!(counts, Some(vec![Param::Int(2), Param::Int(1)]));

    // DDL reports nothing even after earlier writes on the same connection.
    assert_eq!(conn.execute("CREATE TABLE c (z INTEGER)", &[]).await?, Some(0));

    let failed = conn
        .execute("INSERT INTO a VALUES (4); INSERT INTO missing VALUES (5);", &[])
        .await;
    assert!(matches!(failed, Err(SqlBridgeError::SqliteError(_))));
    Ok(())
}

#[tokio::test]
async fn query_maps_rows_in_order() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let users: Vec<User> = conn.query("SELECT id, name FROM users ORDER BY id", &[]).await?;
    assert_eq!(
        users,
        vec![
            User { id: 1, name: "ada".into() },
            User { id: 2, name: "grace".into() },
            User { id: 3, name: "edsger".into() },
        ]
    );

    let none: Vec<User> = conn
        .query("SELECT id, name FROM users WHERE id > ?1", &[Param::Int(10)])
        .await?;
    assert!(none.is_empty());
    Ok(())
}

#[tokio::test]
async fn query_one_returns_first_row_or_none() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let first: Option<User> = conn
        .query_one("SELECT id, name FROM users ORDER BY id DESC", &[])
        .await?;
    assert_eq!(first, Some(User { id: 3, name: "edsger".into() }));

    let missing: Option<User> = conn
        .query_one("SELECT id, name FROM users WHERE name = ?1", &[Param::from("linus")])
        .await?;
    assert_eq!(missing, None);
    Ok(())
}

#[tokio::test]
async fn query_many_streams_the_same_rows_as_query() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let sql = "SELECT id, name FROM users ORDER BY id";
    let bulk: Vec<Row<SqliteExtension>> = conn.query(sql, &[]).await?;
    let streamed: Vec<Row<SqliteExtension>> = conn
        .query_many::<Row<SqliteExtension>>(sql, &[])
        .await?
        .try_collect()
        .await?;
    assert_eq!(bulk, streamed);
    assert_eq!(streamed[1].get("name"), Some(&Param::from("grace")));

    let empty: Vec<Row<SqliteExtension>> = conn
        .query_many::<Row<SqliteExtension>>("SELECT id FROM users WHERE id < 0", &[])
        .await?
        .try_collect()
        .await?;
    assert!(empty.is_empty());
    Ok(())
}

#[tokio::test]
async fn query_many_surfaces_errors_through_the_stream() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let result: Result<Vec<Row<SqliteExtension>>, _> = conn
        .query_many::<Row<SqliteExtension>>("SELECT * FROM no_such_table", &[])
        .await?
        .try_collect()
        .await;
    assert!(matches!(result, Err(SqlBridgeError::SqliteError(_))));
    Ok(())
}

#[tokio::test]
async fn array_queries_keep_projection_order() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    let rows: Vec<ArrayRow<SqliteExtension>> = conn
        .query_array("SELECT name, id FROM users ORDER BY id LIMIT 2", &[])
        .await?;
    assert_eq!(
        rows,
        vec![
            vec![Param::from("ada"), Param::Int(1)],
            vec![Param::from("grace"), Param::Int(2)],
        ]
    );

    let one: Option<ArrayRow<SqliteExtension>> = conn
        .query_one_array("SELECT score, avatar FROM users WHERE id = 1", &[])
        .await?;
    assert_eq!(one, Some(vec![Param::Null, Param::Null]));
    Ok(())
}

#[tokio::test]
async fn query_many_array_is_unsupported() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    assert!(!Sqlite::CAPABILITIES.supports(Operation::QueryManyArray));
    let err = match conn
        .query_many_array::<ArrayRow<SqliteExtension>>("SELECT id FROM users", &[])
        .await
    {
        Ok(_) => panic!("query_many_array should be unsupported"),
        Err(err) => err,
    };
    assert!(err.is_unsupported());
    assert_eq!(err.to_string(), "query_many_array is not supported by sqlite");
    Ok(())
}

#[tokio::test]
async fn blobs_and_booleans_round_trip() -> Result<(), SqlBridgeError> {
    let mut conn = seeded().await?;
    conn.execute(
        "INSERT INTO users (id, name, score, avatar) VALUES (?1, ?2, ?3, ?4)",
        &[
            Param::Int(4),
            Param::from("barbara"),
            Param::Bool(true),
            Param::Extension(SqliteExtension::Blob(vec![0, 1, 2])),
        ],
    )
    .await?;
    let row: Option<Row<SqliteExtension>> = conn
        .query_one("SELECT score, avatar FROM users WHERE id = 4", &[])
        .await?;
    let row = row.expect("inserted row");
    // REAL affinity stores the bound integer as a float.
    assert_eq!(row.get("score"), Some(&Param::Float(1.0)));
    assert_eq!(
        row.get("avatar"),
        Some(&Param::Extension(SqliteExtension::Blob(vec![0, 1, 2])))
    );
    Ok(())
}

#[tokio::test]
async fn init_statements_run_after_open() -> Result<(), SqlBridgeError> {
    let options = SqliteConnectionOptions::new().init_statement("CREATE TABLE boot (x INTEGER);");
    let mut conn = SqliteConnection::with_options(":memory:", options);
    conn.connect().await?;
    let rows: Vec<Row<SqliteExtension>> = conn.query("SELECT x FROM boot", &[]).await?;
    assert!(rows.is_empty());
    Ok(())
}
