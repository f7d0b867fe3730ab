//! Invoke seam and the query client that caches its results.

use std::future::Future;

use serde_json::Value;

use crate::cache::QueryCache;
use crate::error::InvokeError;
use crate::key::{QueryDomain, QueryKey};

/// Generic request/response RPC primitive: `invoke(command, args) -> result`.
pub trait Invoke {
    fn invoke(
        &self,
        command: &str,
        args: Option<Value>,
    ) -> impl Future<Output = Result<Value, InvokeError>> + Send;
}

impl<T: Invoke + Sync + ?Sized> Invoke for &T {
    fn invoke(
        &self,
        command: &str,
        args: Option<Value>,
    ) -> impl Future<Output = Result<Value, InvokeError>> + Send {
        (**self).invoke(command, args)
    }
}

/// Reads go through the cache; mutations go straight to the invoker.
pub struct QueryClient<I> {
    invoker: I,
    cache: QueryCache,
}

impl<I: Invoke> QueryClient<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            cache: QueryCache::new(),
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }

    /// Cached value for the key, fetching it on a miss.
    pub async fn query(
        &mut self,
        domain: QueryDomain,
        command: &str,
        args: Option<Value>,
    ) -> Result<Value, InvokeError> {
        let key = QueryKey::new(domain, command, args.as_ref());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }
        self.refetch(domain, command, args).await
    }

    /// Fetch and store the value regardless of what is cached.
    pub async fn refetch(
        &mut self,
        domain: QueryDomain,
        command: &str,
        args: Option<Value>,
    ) -> Result<Value, InvokeError> {
        let key = QueryKey::new(domain, command, args.as_ref());
        let ticket = self.cache.begin_fetch(&key);
        let data = self.invoker.invoke(command, args).await?;
        self.cache.complete_fetch(key, ticket, data.clone());
        Ok(data)
    }

    /// Run a mutation command. The cache is left for the caller to patch.
    pub async fn mutate(&self, command: &str, args: Option<Value>) -> Result<Value, InvokeError> {
        self.invoker.invoke(command, args).await
    }
}
