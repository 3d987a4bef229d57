#![cfg(feature = "sqlite")]
//! Code written against the contract traits alone, run on every adapter available offline.

use futures_util::TryStreamExt;
use sql_bridge::prelude::*;

/// Any standalone connection can run this.
async fn record_visit<C: Connection>(conn: &mut C) -> Result<i64, SqlBridgeError> {
    conn.execute("CREATE TABLE IF NOT EXISTS visits (n INTEGER)", &[])
        .await?;
    let mut tx = conn.begin_transaction(Default::default()).await?;
    tx.execute("INSERT INTO visits VALUES (1)", &[]).await?;
    tx.commit_transaction(Default::default()).await?;
    assert_eq!(tx.state(), TransactionState::Committed);
    drop(tx);

    let rows: Vec<EngineRow<C::Engine>> = conn
        .query("SELECT COUNT(*) AS n FROM visits", &[])
        .await?;
    rows.first().map_or(Ok(0), |row| row.try_get("n"))
}

/// Any pool can run this.
async fn pooled_visits<P: ConnectionPool>(pool: &mut P) -> Result<i64, SqlBridgeError> {
    if !pool.is_connected() {
        pool.connect().await?;
    }
    pool.execute("CREATE TABLE IF NOT EXISTS visits (n INTEGER)", &[])
        .await?;

    let mut conn = pool.acquire().await?;
    conn.execute("INSERT INTO visits VALUES (1)", &[]).await?;
    conn.release().await?;
    assert!(conn.is_released());

    let streamed: Vec<EngineRow<P::Engine>> = pool
        .query_many::<EngineRow<P::Engine>>("SELECT n FROM visits", &[])
        .await?
        .try_collect()
        .await?;
    Ok(i64::try_from(streamed.len()).unwrap_or(i64::MAX))
}

/// Whether calling `operation` got past the capability gate. Errors other than
/// `Unsupported` (such as `NotConnected`) still count as supported.
async fn reaches_engine<Q: Queriable>(q: &mut Q, operation: Operation) -> bool {
    let sql = "SELECT 1";
    let outcome: Result<(), SqlBridgeError> = match operation {
        Operation::QueryMany => q
            .query_many::<EngineRow<Q::Engine>>(sql, &[])
            .await
            .map(drop),
        Operation::QueryArray => q
            .query_array::<EngineArrayRow<Q::Engine>>(sql, &[])
            .await
            .map(drop),
        Operation::QueryOneArray => q
            .query_one_array::<EngineArrayRow<Q::Engine>>(sql, &[])
            .await
            .map(drop),
        Operation::QueryManyArray => q
            .query_many_array::<EngineArrayRow<Q::Engine>>(sql, &[])
            .await
            .map(drop),
    };
    !matches!(outcome, Err(ref err) if err.is_unsupported())
}

async fn assert_capabilities<Q: Queriable>(q: &mut Q, label: &str) {
    let declared = <Q::Engine as Engine>::CAPABILITIES;
    for operation in Operation::ALL {
        assert_eq!(
            reaches_engine(q, operation).await,
            declared.supports(operation),
            "{label}: {}",
            operation.as_str()
        );
    }
}

#[tokio::test]
async fn generic_connection_code_runs_on_sqlite() -> Result<(), SqlBridgeError> {
    let mut conn = SqliteConnection::new(":memory:");
    conn.connect().await?;
    assert_eq!(record_visit(&mut conn).await?, 1);
    assert_eq!(record_visit(&mut conn).await?, 2);
    Ok(())
}

#[tokio::test]
async fn generic_pool_code_runs_on_sqlite() -> Result<(), SqlBridgeError> {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("visits.db").display());
    let mut pool = SqlitePool::new(url, PoolOptions::new(2, SqliteConnectionOptions::default()));
    assert_eq!(pooled_visits(&mut pool).await?, 1);
    assert_eq!(pooled_visits(&mut pool).await?, 2);
    pool.close().await?;
    Ok(())
}

#[tokio::test]
async fn declared_capabilities_match_behaviour() -> Result<(), SqlBridgeError> {
    let mut conn = SqliteConnection::new(":memory:");
    conn.connect().await?;
    assert_capabilities(&mut conn, "sqlite connection").await;
    {
        let mut tx = conn.begin_transaction(SqliteBeginOptions::default()).await?;
        assert_capabilities(&mut tx, "sqlite transaction").await;
        tx.rollback_transaction(SqliteRollbackOptions::default()).await?;
    }

    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("caps.db").display());
    let mut pool = SqlitePool::new(url, PoolOptions::new(1, SqliteConnectionOptions::default()));
    pool.connect().await?;
    assert_capabilities(&mut pool, "sqlite pool").await;
    let mut pooled = pool.acquire().await?;
    assert_capabilities(&mut pooled, "sqlite pool connection").await;
    drop(pooled);

    // Without a server, supported calls stop at NotConnected rather than Unsupported.
    #[cfg(feature = "postgres")]
    {
        let mut pg = PostgresConnection::new("postgres://localhost/bridge");
        assert_capabilities(&mut pg, "postgres connection").await;
        let mut pg_pool = PostgresPool::new("postgres://localhost/bridge", PoolOptions::default());
        assert_capabilities(&mut pg_pool, "postgres pool").await;
    }
    #[cfg(feature = "mysql")]
    {
        let mut my = MySqlConnection::new("mysql://root@localhost/bridge");
        assert_capabilities(&mut my, "mysql connection").await;
    }
    Ok(())
}
