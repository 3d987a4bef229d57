/// Implement `Queriable` for a `SQLite` adapter that exposes
/// `fn shared(&self) -> Result<SharedSqliteConnection, SqlBridgeError>`.
macro_rules! impl_sqlite_queriable {
    ($adapter:ident $(<$lt:lifetime>)?) => {
        #[async_trait::async_trait]
        impl$(<$lt>)? $crate::traits::Queriable for $adapter$(<$lt>)? {
            type Engine = $crate::sqlite::Sqlite;

            async fn execute(
                &mut self,
                sql: &str,
                params: &[$crate::sqlite::SqliteParam],
            ) -> Result<Option<u64>, $crate::error::SqlBridgeError> {
                $crate::sqlite::query::execute(self.shared()?, sql, params).await
            }

            async fn query<T>(
                &mut self,
                sql: &str,
                params: &[$crate::sqlite::SqliteParam],
            ) -> Result<Vec<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::sqlite::SqliteExtension> + Send,
            {
                $crate::sqlite::query::fetch_rows(self.shared()?, sql, params, None)
                    .await?
                    .into_iter()
                    .map(T::from_row)
                    .collect()
            }

            async fn query_one<T>(
                &mut self,
                sql: &str,
                params: &[$crate::sqlite::SqliteParam],
            ) -> Result<Option<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::sqlite::SqliteExtension> + Send,
            {
                $crate::sqlite::query::fetch_rows(self.shared()?, sql, params, Some(1))
                    .await?
                    .into_iter()
                    .next()
                    .map(T::from_row)
                    .transpose()
            }

            async fn query_many<'a, T>(
                &'a mut self,
                sql: &'a str,
                params: &'a [$crate::sqlite::SqliteParam],
            ) -> Result<$crate::stream::RowStream<'a, T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::sqlite::SqliteExtension> + Send + 'a,
            {
                let rows = $crate::sqlite::query::stream_rows(self.shared()?, sql, params);
                Ok($crate::sqlite::query::convert_stream(rows, T::from_row))
            }

            async fn query_array<T>(
                &mut self,
                sql: &str,
                params: &[$crate::sqlite::SqliteParam],
            ) -> Result<Vec<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromArrayRow<$crate::sqlite::SqliteExtension> + Send,
            {
                $crate::sqlite::query::fetch_array_rows(self.shared()?, sql, params, None)
                    .await?
                    .into_iter()
                    .map(T::from_array_row)
                    .collect()
            }

            async fn query_one_array<T>(
                &mut self,
                sql: &str,
                params: &[$crate::sqlite::SqliteParam],
            ) -> Result<Option<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromArrayRow<$crate::sqlite::SqliteExtension> + Send,
            {
                $crate::sqlite::query::fetch_array_rows(self.shared()?, sql, params, Some(1))
                    .await?
                    .into_iter()
                    .next()
                    .map(T::from_array_row)
                    .transpose()
            }
        }
    };
}

pub(crate) use impl_sqlite_queriable;
