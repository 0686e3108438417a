//! Join barrier for fanned-out reads

use crate::error::ServiceResult;
use futures::future::join_all;
use std::future::Future;

/// Await every future, keeping results in input order.
///
/// Siblings are never cancelled when one fails; once all have settled the
/// first error in input order is returned.
pub async fn join_all_first_error<I, F, T>(futures: I) -> ServiceResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = ServiceResult<T>>,
{
    let results = join_all(futures).await;

    let mut values = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(values),
    }
}
