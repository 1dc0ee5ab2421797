pub mod client;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tonic::{async_trait, Request, Response, Status};

use crate::btree::BTree;
use crate::lookup::lookup_server::{Lookup, LookupServer};
use crate::lookup::{InsertRequest, InsertResponse, SearchRequest, SearchResponse};

pub type SharedTree = Arc<RwLock<BTree<i64>>>;

pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const INVALID_KEY_MESSAGE: &str = "Invalid key provided. Must be an integer.";

/// Rejects every call until the index has finished its initial load.
#[derive(Debug, Default, Clone)]
pub struct Readiness {
    ready: Arc<AtomicBool>,
}

impl Readiness {
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl Interceptor for Readiness {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        if self.is_ready() {
            Ok(request)
        } else {
            Err(Status::unavailable("index is still loading"))
        }
    }
}

/// The request-reply backend: answers key lookups against a shared tree.
/// Reads share the lock; inserts take it exclusively.
#[derive(Debug, Clone)]
pub struct IndexService {
    tree: SharedTree,
}

impl IndexService {
    pub fn new(tree: SharedTree) -> Self {
        IndexService { tree }
    }
}

fn correlation_id<T>(request: &Request<T>) -> String {
    request
        .metadata()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn poisoned<E>(_: E) -> Status {
    Status::internal("index lock poisoned")
}

#[async_trait]
impl Lookup for IndexService {
    async fn search(
        &self,
        request: Request<SearchRequest>,
    ) -> Result<Response<SearchResponse>, Status> {
        let correlation = correlation_id(&request);
        let raw = request.into_inner().key;

        let key = match raw.trim().parse::<i64>() {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!(%correlation, key = %raw, "invalid key in search request");
                return Ok(Response::new(SearchResponse {
                    found: false,
                    error: Some(INVALID_KEY_MESSAGE.to_string()),
                }));
            }
        };

        let found = self.tree.read().map_err(poisoned)?.search(&key);
        tracing::info!(%correlation, key, found, "search");

        Ok(Response::new(SearchResponse { found, error: None }))
    }

    async fn insert(
        &self,
        request: Request<InsertRequest>,
    ) -> Result<Response<InsertResponse>, Status> {
        let correlation = correlation_id(&request);
        let key = request.get_ref().key;

        let size = {
            let mut tree = self.tree.write().map_err(poisoned)?;
            tree.insert(key);
            tree.len() as u64
        };
        tracing::info!(%correlation, key, size, "insert");

        Ok(Response::new(InsertResponse {
            confirmation: true,
            size,
        }))
    }
}

/// Owns the shared tree and the readiness gate, and builds the tonic router.
#[derive(Debug, Clone)]
pub struct IndexServer {
    tree: SharedTree,
    readiness: Readiness,
}

impl IndexServer {
    pub fn new(tree: BTree<i64>) -> Self {
        IndexServer {
            tree: Arc::new(RwLock::new(tree)),
            readiness: Readiness::default(),
        }
    }

    pub fn tree(&self) -> SharedTree {
        Arc::clone(&self.tree)
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    pub fn lookup_service(&self) -> InterceptedService<LookupServer<IndexService>, Readiness> {
        LookupServer::with_interceptor(IndexService::new(self.tree()), self.readiness())
    }

    /// Lookup service plus gRPC reflection, ready to `serve`.
    pub fn into_router(self) -> Result<Router, tonic_reflection::server::Error> {
        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(crate::lookup::FILE_DESCRIPTOR_SET)
            .build_v1()?;

        Ok(Server::builder()
            .add_service(reflection)
            .add_service(self.lookup_service()))
    }

    /// Bulk-loads `keys` and then opens the readiness gate.
    ///
    /// Loading stops at the first key that fails to parse; the keys before it
    /// stay in the index and the server is marked ready regardless.
    pub fn seed<I, S>(&self, keys: I) -> Result<usize, Status>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let loaded = {
            let mut tree = self.tree.write().map_err(poisoned)?;
            let before = tree.len();
            let result = tree.try_extend(keys.into_iter().map(|line| {
                let line = line.as_ref().trim();
                line.parse::<i64>().map_err(|_| line.to_string())
            }));
            match result {
                Ok(loaded) => loaded,
                Err(bad) => {
                    let loaded = tree.len() - before;
                    tracing::error!(line = %bad, loaded, "seed load stopped at unparsable key");
                    loaded
                }
            }
        };

        self.readiness.mark_ready();
        tracing::info!(loaded, "index ready");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SAMPLE_KEYS;

    fn sample_service() -> IndexService {
        let tree: BTree<i64> = SAMPLE_KEYS.into_iter().collect();
        IndexService::new(Arc::new(RwLock::new(tree)))
    }

    fn search_request(key: &str) -> Request<SearchRequest> {
        Request::new(SearchRequest {
            key: key.to_string(),
        })
    }

    #[tokio::test]
    async fn test_search_finds_seeded_key() {
        let service = sample_service();

        let response = service.search(search_request("17")).await.unwrap();

        assert!(response.get_ref().found);
        assert_eq!(response.get_ref().error, None);
    }

    #[tokio::test]
    async fn test_search_missing_key() {
        let service = sample_service();

        let response = service.search(search_request(" 99 ")).await.unwrap();

        assert!(!response.get_ref().found);
        assert_eq!(response.get_ref().error, None);
    }

    #[tokio::test]
    async fn test_search_invalid_key_reports_error_in_reply() {
        let service = sample_service();

        let response = service.search(search_request("seventeen")).await.unwrap();

        assert!(!response.get_ref().found);
        assert_eq!(response.get_ref().error.as_deref(), Some(INVALID_KEY_MESSAGE));
    }

    #[tokio::test]
    async fn test_insert_then_search() {
        let service = sample_service();

        let response = service
            .insert(Request::new(InsertRequest { key: 99 }))
            .await
            .unwrap();
        assert!(response.get_ref().confirmation);
        assert_eq!(response.get_ref().size, SAMPLE_KEYS.len() as u64 + 1);

        let found = service.search(search_request("99")).await.unwrap();
        assert!(found.get_ref().found);
    }

    #[tokio::test]
    async fn test_duplicate_insert_grows_size_twice() {
        let service = sample_service();

        service.insert(Request::new(InsertRequest { key: 17 })).await.unwrap();
        let response = service
            .insert(Request::new(InsertRequest { key: 17 }))
            .await
            .unwrap();

        assert_eq!(response.get_ref().size, SAMPLE_KEYS.len() as u64 + 2);
    }

    #[test]
    fn test_readiness_gate() {
        let mut readiness = Readiness::default();

        let err = readiness.call(Request::new(())).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unavailable);

        readiness.mark_ready();
        assert!(readiness.call(Request::new(())).is_ok());
    }

    #[test]
    fn test_seed_stops_at_bad_line_and_marks_ready() {
        let server = IndexServer::new(BTree::new());

        let loaded = server.seed(["1", "2", "x", "4"]).unwrap();

        assert_eq!(loaded, 2);
        assert!(server.readiness().is_ready());
        let tree = server.tree();
        let tree = tree.read().unwrap();
        assert!(tree.search(&2));
        assert!(!tree.search(&4));
    }

    #[test]
    fn test_seed_loads_everything() {
        let server = IndexServer::new(BTree::with_degree(3).unwrap());

        let loaded = server.seed(SAMPLE_KEYS.map(|k| k.to_string())).unwrap();

        assert_eq!(loaded, SAMPLE_KEYS.len());
        assert!(server.tree().read().unwrap().search(&17));
    }
}
