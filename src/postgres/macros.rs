/// Implement `Queriable` for a PostgreSQL adapter whose `fn native(&self)` returns a borrowed
/// `tokio_postgres::GenericClient`.
macro_rules! impl_postgres_queriable {
    ($adapter:ident $(<$lt:lifetime>)?) => {
        #[async_trait::async_trait]
        impl$(<$lt>)? $crate::traits::Queriable for $adapter$(<$lt>)? {
            type Engine = $crate::postgres::Postgres;

            async fn execute(
                &mut self,
                sql: &str,
                params: &[$crate::postgres::PostgresParam],
            ) -> Result<Option<u64>, $crate::error::SqlBridgeError> {
                $crate::postgres::query::execute(self.native()?, sql, params).await
            }

            async fn query<T>(
                &mut self,
                sql: &str,
                params: &[$crate::postgres::PostgresParam],
            ) -> Result<Vec<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::postgres::PostgresExtension> + Send,
            {
                $crate::postgres::query::fetch_rows(self.native()?, sql, params)
                    .await?
                    .into_iter()
                    .map(T::from_row)
                    .collect()
            }

            async fn query_one<T>(
                &mut self,
                sql: &str,
                params: &[$crate::postgres::PostgresParam],
            ) -> Result<Option<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::postgres::PostgresExtension> + Send,
            {
                $crate::postgres::query::fetch_one(self.native()?, sql, params)
                    .await?
                    .map(T::from_row)
                    .transpose()
            }

            async fn query_many<'a, T>(
                &'a mut self,
                sql: &'a str,
                params: &'a [$crate::postgres::PostgresParam],
            ) -> Result<$crate::stream::RowStream<'a, T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::postgres::PostgresExtension> + Send + 'a,
            {
                let rows = $crate::postgres::query::stream_raw(self.native()?, sql, params).await?;
                Ok($crate::postgres::query::object_stream(rows, T::from_row))
            }

            async fn query_array<T>(
                &mut self,
                sql: &str,
                params: &[$crate::postgres::PostgresParam],
            ) -> Result<Vec<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromArrayRow<$crate::postgres::PostgresExtension> + Send,
            {
                $crate::postgres::query::fetch_array_rows(self.native()?, sql, params)
                    .await?
                    .into_iter()
                    .map(T::from_array_row)
                    .collect()
            }

            async fn query_one_array<T>(
                &mut self,
                sql: &str,
                params: &[$crate::postgres::PostgresParam],
            ) -> Result<Option<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromArrayRow<$crate::postgres::PostgresExtension> + Send,
            {
                $crate::postgres::query::fetch_one_array(self.native()?, sql, params)
                    .await?
                    .map(T::from_array_row)
                    .transpose()
            }

            async fn query_many_array<'a, T>(
                &'a mut self,
                sql: &'a str,
                params: &'a [$crate::postgres::PostgresParam],
            ) -> Result<$crate::stream::RowStream<'a, T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromArrayRow<$crate::postgres::PostgresExtension> + Send + 'a,
            {
                let rows = $crate::postgres::query::stream_raw(self.native()?, sql, params).await?;
                Ok($crate::postgres::query::array_stream(rows, T::from_array_row))
            }
        }
    };
}

pub(crate) use impl_postgres_queriable;
