#![cfg(feature = "mysql")]
//! Server tests read `SQL_BRIDGE_MYSQL_URL` and are skipped when it is unset.

use futures_util::TryStreamExt;
use sql_bridge::prelude::*;

fn server_url() -> Option<String> {
    let url = std::env::var("SQL_BRIDGE_MYSQL_URL").ok();
    if url.is_none() {
        eprintln!("SQL_BRIDGE_MYSQL_URL not set; skipping");
    }
    url
}

async fn connected(url: String) -> Result<MySqlConnection, SqlBridgeError> {
    let options = MySqlConnectionOptions::new()
        .init_statement("SET SESSION sql_mode = 'STRICT_ALL_TABLES'");
    let mut conn = MySqlConnection::with_options(url, options);
    conn.connect().await?;
    conn.execute(
        "CREATE TEMPORARY TABLE orders (id INT PRIMARY KEY, item VARCHAR(64), \
         qty BIGINT UNSIGNED, token VARBINARY(16)) ENGINE=InnoDB",
        &[],
    )
    .await?;
    Ok(conn)
}

async fn order_ids(conn: &mut MySqlConnection) -> Result<Vec<i64>, SqlBridgeError> {
    let rows: Vec<Row<MySqlExtension>> =
        conn.query("SELECT id FROM orders ORDER BY id", &[]).await?;
    rows.iter().map(|row| row.try_get("id")).collect()
}

#[tokio::test]
async fn calls_before_connect_fail_fast() {
    let mut conn = MySqlConnection::new("mysql://root@localhost/bridge");
    assert!(!conn.is_connected());
    assert!(matches!(conn.client(), Err(err) if err.is_not_connected()));
    assert!(conn.execute("SELECT 1", &[]).await.unwrap_err().is_not_connected());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn array_queries_are_unsupported() {
    let mut conn = MySqlConnection::new("mysql://root@localhost/bridge");
    assert!(MySql::CAPABILITIES.supports(Operation::QueryMany));
    let err = conn
        .query_array::<ArrayRow<MySqlExtension>>("SELECT 1", &[])
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
    assert_eq!(err.to_string(), "query_array is not supported by mysql");
}

#[tokio::test]
async fn malformed_url_is_a_config_error() {
    let mut conn = MySqlConnection::new("postgres://localhost/bridge");
    assert!(matches!(conn.connect().await, Err(SqlBridgeError::ConfigError(_))));
}

#[tokio::test]
async fn rows_map_mysql_values() -> Result<(), SqlBridgeError> {
    let Some(url) = server_url() else {
        return Ok(());
    };
    let mut conn = connected(url).await?;
    let affected = conn
        .execute(
            "INSERT INTO orders VALUES (?, ?, ?, ?), (?, ?, ?, ?)",
            &[
                Param::Int(1),
                Param::from("widget"),
                Param::Extension(MySqlExtension::UInt(u64::MAX)),
                Param::Extension(MySqlExtension::Bytes(vec![1, 2, 3])),
                Param::Int(2),
                Param::Null,
                Param::Int(7),
                Param::Null,
            ],
        )
        .await?;
    assert_eq!(affected, Some(2));

    let first: Option<Row<MySqlExtension>> =
        conn.query_one("SELECT * FROM orders WHERE id = ?", &[Param::Int(1)]).await?;
    let first = first.expect("inserted row");
    assert_eq!(first.get("item"), Some(&Param::from("widget")));
    assert_eq!(
        first.get("qty"),
        Some(&Param::Extension(MySqlExtension::UInt(u64::MAX)))
    );
    assert_eq!(
        first.get("token"),
        Some(&Param::Extension(MySqlExtension::Bytes(vec![1, 2, 3])))
    );

    let streamed: Vec<Row<MySqlExtension>> = conn
        .query_many::<Row<MySqlExtension>>("SELECT id, item, qty FROM orders ORDER BY id", &[])
        .await?
        .try_collect()
        .await?;
    assert_eq!(streamed.len(), 2);
    assert_eq!(streamed[1].get("item"), Some(&Param::Null));
    assert_eq!(streamed[1].try_get::<i64>("qty")?, 7);
    Ok(())
}

#[tokio::test]
async fn transactions_commit_and_roll_back() -> Result<(), SqlBridgeError> {
    let Some(url) = server_url() else {
        return Ok(());
    };
    let mut conn = connected(url).await?;

    conn.transaction(|tx| {
        Box::pin(async move {
            tx.execute("INSERT INTO orders (id) VALUES (1)", &[]).await?;
            Ok::<_, SqlBridgeError>(())
        })
    })
    .await?;

    let failed: Result<(), SqlBridgeError> = conn
        .transaction(|tx| {
            Box::pin(async move {
                tx.execute("INSERT INTO orders (id) VALUES (2)", &[]).await?;
                tx.execute("INSERT INTO orders (id) VALUES (1)", &[]).await?;
                Ok(())
            })
        })
        .await;
    assert!(matches!(failed, Err(SqlBridgeError::MySqlError(_))));

    {
        let mut tx = conn
            .begin_transaction(MySqlBeginOptions::new().access_mode(MySqlAccessMode::ReadWrite))
            .await?;
        tx.execute("INSERT INTO orders (id) VALUES (3)", &[]).await?;
        tx.create_savepoint("before_four").await?;
        tx.execute("INSERT INTO orders (id) VALUES (4)", &[]).await?;
        tx.rollback_transaction(MySqlRollbackOptions::to_savepoint("before_four"))
            .await?;
        tx.commit_transaction(MySqlCommitOptions::default()).await?;
        assert!(tx.execute("SELECT 1", &[]).await.unwrap_err().is_transaction_closed());
    }

    {
        let mut tx = conn.begin_transaction(MySqlBeginOptions::default()).await?;
        tx.execute("INSERT INTO orders (id) VALUES (5)", &[]).await?;
    }
    // The dropped transaction is rolled back before this query runs.
    assert_eq!(order_ids(&mut conn).await?, vec![1, 3]);

    conn.close().await?;
    assert!(!conn.is_connected());
    Ok(())
}
