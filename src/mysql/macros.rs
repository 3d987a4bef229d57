/// Implement `Queriable` for a MySQL adapter. The closure-like second argument evaluates to
/// the adapter's `&mut mysql_async::Conn`, propagating errors with `?`.
///
/// The array family keeps the trait's `Unsupported` defaults.
macro_rules! impl_mysql_queriable {
    ($adapter:ident $(<$lt:lifetime>)?, |$this:ident| $conn:expr) => {
        #[async_trait::async_trait]
        impl$(<$lt>)? $crate::traits::Queriable for $adapter$(<$lt>)? {
            type Engine = $crate::mysql::MySql;

            async fn execute(
                &mut self,
                sql: &str,
                params: &[$crate::mysql::MySqlParam],
            ) -> Result<Option<u64>, $crate::error::SqlBridgeError> {
                $crate::mysql::query::execute({ let $this = self; $conn }, sql, params).await
            }

            async fn query<T>(
                &mut self,
                sql: &str,
                params: &[$crate::mysql::MySqlParam],
            ) -> Result<Vec<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::mysql::MySqlExtension> + Send,
            {
                $crate::mysql::query::fetch_rows({ let $this = self; $conn }, sql, params)
                    .await?
                    .into_iter()
                    .map(T::from_row)
                    .collect()
            }

            async fn query_one<T>(
                &mut self,
                sql: &str,
                params: &[$crate::mysql::MySqlParam],
            ) -> Result<Option<T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::mysql::MySqlExtension> + Send,
            {
                $crate::mysql::query::fetch_one({ let $this = self; $conn }, sql, params)
                    .await?
                    .map(T::from_row)
                    .transpose()
            }

            async fn query_many<'a, T>(
                &'a mut self,
                sql: &'a str,
                params: &'a [$crate::mysql::MySqlParam],
            ) -> Result<$crate::stream::RowStream<'a, T>, $crate::error::SqlBridgeError>
            where
                T: $crate::results::FromRow<$crate::mysql::MySqlExtension> + Send + 'a,
            {
                use futures_util::StreamExt;

                let rows = $crate::mysql::query::stream_rows({ let $this = self; $conn }, sql, params).await?;
                Ok(rows
                    .map(|item| item.and_then(T::from_row))
                    .boxed())
            }
        }
    };
}

pub(crate) use impl_mysql_queriable;
