#![cfg(feature = "sqlite")]

use sql_bridge::prelude::*;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Db(#[from] SqlBridgeError),
    #[error("business rule violated: {0}")]
    Rule(String),
}

async fn setup() -> Result<SqliteConnection, SqlBridgeError> {
    let mut conn = SqliteConnection::new(":memory:");
    conn.connect().await?;
    conn.execute("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER)", &[])
        .await?;
    Ok(conn)
}

async fn ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, SqlBridgeError> {
    let rows: Vec<ArrayRow<SqliteExtension>> =
        conn.query_array("SELECT id FROM ledger ORDER BY id", &[]).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.first().and_then(Param::as_int))
        .collect())
}

#[tokio::test]
async fn managed_transaction_commits_on_ok() -> Result<(), AppError> {
    let mut conn = setup().await?;
    let inserted = conn
        .transaction(|tx| {
            Box::pin(async move {
                tx.execute("INSERT INTO ledger VALUES (1, 10)", &[]).await?;
                tx.execute("INSERT INTO ledger VALUES (2, 20)", &[]).await?;
                Ok::<_, AppError>(2)
            })
        })
        .await?;
    assert_eq!(inserted, 2);
    assert_eq!(ids(&mut conn).await?, vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn managed_transaction_rolls_back_and_keeps_the_body_error() -> Result<(), SqlBridgeError> {
    let mut conn = setup().await?;
    let result: Result<(), AppError> = conn
        .transaction(|tx| {
            Box::pin(async move {
                tx.execute("INSERT INTO ledger VALUES (1, 10)", &[]).await?;
                Err(AppError::Rule("overdraft".into()))
            })
        })
        .await;
    match result {
        Err(AppError::Rule(reason)) => assert_eq!(reason, "overdraft"),
        other => panic!("expected the body error, got {other:?}"),
    }
    assert!(ids(&mut conn).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn managed_transaction_respects_an_explicit_finish() -> Result<(), SqlBridgeError> {
    let mut conn = setup().await?;
    conn.transaction(|tx| {
        Box::pin(async move {
            tx.execute("INSERT INTO ledger VALUES (7, 70)", &[]).await?;
            tx.commit_transaction(()).await?;
            assert_eq!(tx.state(), TransactionState::Committed);
            Ok::<_, SqlBridgeError>(())
        })
    })
    .await?;
    assert_eq!(ids(&mut conn).await?, vec![7]);
    Ok(())
}

#[tokio::test]
async fn failed_rollback_is_reported_with_its_cause() -> Result<(), SqlBridgeError> {
    let mut conn = setup().await?;
    let result: Result<(), AppError> = conn
        .transaction(|tx| {
            Box::pin(async move {
                // Ends the native transaction behind the adapter's back.
                tx.execute("ROLLBACK", &[]).await?;
                Err(AppError::Rule("abort".into()))
            })
        })
        .await;
    let Err(AppError::Db(SqlBridgeError::RollbackFailed { source, cause })) = result else {
        panic!("expected RollbackFailed");
    };
    assert!(matches!(*source, SqlBridgeError::SqliteError(_)));
    assert!(matches!(
        cause.downcast_ref::<AppError>(),
        Some(AppError::Rule(reason)) if reason == "abort"
    ));
    Ok(())
}

#[tokio::test]
async fn savepoint_rollback_keeps_the_transaction_open() -> Result<(), SqlBridgeError> {
    let mut conn = setup().await?;
    {
        let mut tx = conn
            .begin_transaction(SqliteBeginOptions::behavior(
                SqliteTransactionBehavior::Immediate,
            ))
            .await?;
        tx.execute("INSERT INTO ledger VALUES (1, 10)", &[]).await?;
        tx.create_savepoint("before second").await?;
        tx.execute("INSERT INTO ledger VALUES (2, 20)", &[]).await?;
        tx.rollback_transaction(SqliteRollbackOptions::to_savepoint("before second"))
            .await?;
        assert_eq!(tx.state(), TransactionState::Open);
        tx.release_savepoint("before second").await?;
        tx.commit_transaction(()).await?;
    }
    assert_eq!(ids(&mut conn).await?, vec![1]);
    Ok(())
}

#[tokio::test]
async fn finished_transaction_rejects_further_use() -> Result<(), SqlBridgeError> {
    let mut conn = setup().await?;
    let mut tx = conn.begin_transaction(SqliteBeginOptions::default()).await?;
    tx.rollback_transaction(SqliteRollbackOptions::default()).await?;
    assert_eq!(tx.state(), TransactionState::RolledBack);

    let err = tx.execute("SELECT 1", &[]).await.unwrap_err();
    assert!(err.is_transaction_closed());
    assert_eq!(err.to_string(), "sqlite transaction is already rolled back");
    assert!(tx.commit_transaction(()).await.unwrap_err().is_transaction_closed());
    assert!(
        tx.rollback_transaction(SqliteRollbackOptions::default())
            .await
            .unwrap_err()
            .is_transaction_closed()
    );
    assert!(tx.create_savepoint("late").await.unwrap_err().is_precondition());
    Ok(())
}

#[tokio::test]
async fn dropping_an_open_transaction_rolls_back() -> Result<(), SqlBridgeError> {
    let mut conn = setup().await?;
    for _ in 0..50 {
        {
            let mut tx = conn.begin_transaction(SqliteBeginOptions::default()).await?;
            tx.execute("INSERT INTO ledger VALUES (1, 10)", &[]).await?;
        }
        // No wait: the next statement queues behind the rollback.
        assert!(ids(&mut conn).await?.is_empty());
    }

    // The connection is usable for a new transaction afterwards.
    let mut tx = conn.begin_transaction(SqliteBeginOptions::default()).await?;
    tx.execute("INSERT INTO ledger VALUES (2, 20)", &[]).await?;
    tx.commit_transaction(()).await?;
    drop(tx);
    assert_eq!(ids(&mut conn).await?, vec![2]);
    Ok(())
}
