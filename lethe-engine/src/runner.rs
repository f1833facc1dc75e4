//! Request orchestration: wave scheduling, bounded concurrency, retries.

use crate::connector::{Connector, ConnectorError, ConnectorSet};
use crate::state::ExecutionState;
use crate::{EngineError, EngineResult};
use lethe_graph::{DatasetGraph, SeedOrigin, Traversal, TraversalNode};
use lethe_masking::{MaskingContext, SecretCache, cache_masking_secrets};
use lethe_policy::Policy;
use lethe_query::{CandidateValues, QueryConfig, Row, values_at};
use lethe_schema::{Collection, CollectionAddress};
use lethe_types::{ActionType, AffectedField, Identity, PrivacyRequest, PrivacyRequestId};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on concurrently executing collections.
    pub pool_size: usize,
    /// Total tries per collection before it is marked failed.
    pub retry_attempts: u32,
    /// Delay before the first retry, in milliseconds; doubles on each
    /// further retry.
    pub retry_backoff_ms: u64,
    /// Collections whose terminal failure aborts the whole request
    /// instead of halting only their descendants.
    pub blocking_collections: BTreeSet<CollectionAddress>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            retry_attempts: 3,
            retry_backoff_ms: 100,
            blocking_collections: BTreeSet::new(),
        }
    }
}

/// Executes privacy requests against registered connectors.
///
/// Dispatch is wave-by-wave over the traversal plan: a collection lands
/// one wave after the latest of its parents and *after* dependencies,
/// every handle in a wave is drained before the next wave starts, and a
/// semaphore caps how many collections execute at once. A collection
/// therefore never starts before each of its dependencies has finished,
/// and never observes a partial dependency result.
pub struct RequestRunner {
    config: EngineConfig,
    connectors: ConnectorSet,
    secrets: Arc<dyn SecretCache>,
    state: Arc<ExecutionState>,
    limiter: Arc<Semaphore>,
}

impl RequestRunner {
    /// Creates a runner over the given connectors and secret cache.
    #[must_use]
    pub fn new(config: EngineConfig, connectors: ConnectorSet, secrets: Arc<dyn SecretCache>) -> Self {
        let limiter = Arc::new(Semaphore::new(config.pool_size.max(1)));
        Self {
            config,
            connectors,
            secrets,
            state: Arc::new(ExecutionState::new()),
            limiter,
        }
    }

    /// The dispatch ledger and audit trail for every request this runner
    /// has executed.
    #[must_use]
    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Runs the access path: traverses from the request's identities,
    /// reads each reachable collection, and returns the retrieved rows
    /// keyed by `dataset:collection`.
    ///
    /// A collection that fails all retries is marked failed and its
    /// descendants are skipped; sibling subtrees keep running. The call
    /// itself fails only for setup problems (unsatisfiable ordering, a
    /// missing connector) or a failed blocking collection.
    pub async fn run_access_request(
        &self,
        request: &PrivacyRequest,
        policy: &Policy,
        graph: &DatasetGraph,
    ) -> EngineResult<BTreeMap<String, Vec<Row>>> {
        let traversal = Traversal::new(graph, &request.identity)?;
        info!(
            request = %request.id,
            policy = %policy.key,
            collections = traversal.order().len(),
            "access request planned"
        );
        self.record_unreachable(request.id, &traversal, ActionType::Access);
        self.check_connectors(&traversal)?;

        let mut collected: HashMap<CollectionAddress, Vec<Row>> = HashMap::new();
        let mut failed: HashSet<CollectionAddress> = HashSet::new();

        for wave in waves(&traversal) {
            let mut handles: Vec<(CollectionAddress, JoinHandle<Result<Vec<Row>, ConnectorError>>)> =
                Vec::new();
            for address in wave {
                let Some(node) = traversal.node(&address) else {
                    continue;
                };
                if node.parents().iter().any(|parent| failed.contains(parent)) {
                    failed.insert(address.clone());
                    self.state.record_skipped(
                        request.id,
                        &address,
                        ActionType::Access,
                        "an upstream collection failed; no query issued",
                    );
                    continue;
                }

                let input = node_input(node, &request.identity, &collected);
                if input.values().all(Vec::is_empty) {
                    debug!(collection = %address, "no input values; nothing to read");
                    collected.insert(address.clone(), Vec::new());
                    self.state.record_skipped(
                        request.id,
                        &address,
                        ActionType::Access,
                        "no input values; no query issued",
                    );
                    continue;
                }
                if !self.state.begin(request.id, &address, ActionType::Access) {
                    continue;
                }

                let Some(graph_node) = graph.node(&address) else {
                    continue;
                };
                let connector = self
                    .connectors
                    .get(&address.dataset)
                    .ok_or_else(|| EngineError::MissingConnector(address.dataset.clone()))?;
                let handle = self.spawn_access(
                    connector,
                    node.clone(),
                    graph_node.collection.clone(),
                    input,
                    request.id,
                );
                handles.push((address, handle));
            }

            for (address, handle) in handles {
                let outcome = handle
                    .await
                    .map_err(|error| EngineError::Worker(error.to_string()))?;
                match outcome {
                    Ok(rows) => {
                        self.state.record_complete(
                            request.id,
                            &address,
                            ActionType::Access,
                            Vec::new(),
                            format!("{} rows retrieved", rows.len()),
                        );
                        collected.insert(address, rows);
                    }
                    Err(error) => {
                        warn!(collection = %address, %error, "collection failed after retries");
                        self.state.record_error(
                            request.id,
                            &address,
                            ActionType::Access,
                            error.to_string(),
                        );
                        if self.config.blocking_collections.contains(&address) {
                            return Err(EngineError::BlockingCollectionFailed {
                                collection: address,
                                message: error.to_string(),
                            });
                        }
                        failed.insert(address);
                    }
                }
            }
        }

        Ok(collected
            .into_iter()
            .map(|(address, rows)| (address.to_string(), rows))
            .collect())
    }

    /// Runs the erasure path over a previous access result: primes the
    /// masking secrets, then masks each collection's retrieved rows.
    /// Returns affected row counts keyed by `dataset:collection`;
    /// collections that failed all retries are absent from the map and
    /// recorded in the audit trail.
    pub async fn run_erasure_request(
        &self,
        request: &PrivacyRequest,
        policy: &Policy,
        graph: &DatasetGraph,
        access_results: &BTreeMap<String, Vec<Row>>,
    ) -> EngineResult<BTreeMap<String, usize>> {
        let traversal = Traversal::new(graph, &request.identity)?;
        let primed = cache_masking_secrets(self.secrets.as_ref(), policy, &request.id)?;
        info!(
            request = %request.id,
            policy = %policy.key,
            primed,
            "erasure request planned"
        );
        self.record_unreachable(request.id, &traversal, ActionType::Erasure);
        self.check_connectors(&traversal)?;

        // Masking updates feed nothing downstream, so every collection
        // dispatches in one batch bounded by the worker pool.
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut handles: Vec<(CollectionAddress, JoinHandle<Result<usize, ConnectorError>>)> =
            Vec::new();
        for node in traversal.nodes_in_order() {
            let address = node.address().clone();
            let rows = access_results
                .get(&address.to_string())
                .cloned()
                .unwrap_or_default();
            if rows.is_empty() {
                counts.insert(address.to_string(), 0);
                self.state.record_skipped(
                    request.id,
                    &address,
                    ActionType::Erasure,
                    "no rows to mask",
                );
                continue;
            }
            if !self.state.begin(request.id, &address, ActionType::Erasure) {
                continue;
            }
            let Some(graph_node) = graph.node(&address) else {
                continue;
            };
            let connector = self
                .connectors
                .get(&address.dataset)
                .ok_or_else(|| EngineError::MissingConnector(address.dataset.clone()))?;
            let handle = self.spawn_erasure(
                connector,
                node.clone(),
                graph_node.collection.clone(),
                policy.clone(),
                rows,
                request.id,
            );
            handles.push((address, handle));
        }

        for (address, handle) in handles {
            let outcome = handle
                .await
                .map_err(|error| EngineError::Worker(error.to_string()))?;
            match outcome {
                Ok(affected) => {
                    let fields = graph
                        .node(&address)
                        .zip(traversal.node(&address))
                        .map(|(graph_node, node)| {
                            affected_fields(&address, &graph_node.collection, node, policy)
                        })
                        .unwrap_or_default();
                    self.state.record_complete(
                        request.id,
                        &address,
                        ActionType::Erasure,
                        fields,
                        format!("{affected} rows masked"),
                    );
                    counts.insert(address.to_string(), affected);
                }
                Err(error) => {
                    warn!(collection = %address, %error, "masking failed after retries");
                    self.state.record_error(
                        request.id,
                        &address,
                        ActionType::Erasure,
                        error.to_string(),
                    );
                    if self.config.blocking_collections.contains(&address) {
                        return Err(EngineError::BlockingCollectionFailed {
                            collection: address,
                            message: error.to_string(),
                        });
                    }
                }
            }
        }

        Ok(counts)
    }

    fn spawn_access(
        &self,
        connector: Arc<dyn Connector>,
        node: TraversalNode,
        collection: Collection,
        input: CandidateValues,
        request_id: PrivacyRequestId,
    ) -> JoinHandle<Result<Vec<Row>, ConnectorError>> {
        let limiter = self.limiter.clone();
        let state = self.state.clone();
        let attempts = self.config.retry_attempts.max(1);
        let backoff_ms = self.config.retry_backoff_ms;
        tokio::spawn(async move {
            let _permit = limiter
                .acquire_owned()
                .await
                .map_err(|_| ConnectorError::Unavailable("worker pool closed".into()))?;
            let mut attempt = 1;
            loop {
                match connector.retrieve_data(&node, &collection, &input).await {
                    Ok(rows) => return Ok(rows),
                    Err(error) if attempt < attempts => {
                        warn!(collection = %node.address(), %error, attempt, "read failed; retrying");
                        state.record_retrying(
                            request_id,
                            node.address(),
                            ActionType::Access,
                            error.to_string(),
                        );
                        tokio::time::sleep(backoff(backoff_ms, attempt)).await;
                        attempt += 1;
                    }
                    Err(error) => return Err(error),
                }
            }
        })
    }

    fn spawn_erasure(
        &self,
        connector: Arc<dyn Connector>,
        node: TraversalNode,
        collection: Collection,
        policy: Policy,
        rows: Vec<Row>,
        request_id: PrivacyRequestId,
    ) -> JoinHandle<Result<usize, ConnectorError>> {
        let limiter = self.limiter.clone();
        let state = self.state.clone();
        let secrets = self.secrets.clone();
        let attempts = self.config.retry_attempts.max(1);
        let backoff_ms = self.config.retry_backoff_ms;
        tokio::spawn(async move {
            let _permit = limiter
                .acquire_owned()
                .await
                .map_err(|_| ConnectorError::Unavailable("worker pool closed".into()))?;
            // Retries reuse the secrets primed for this request, so a
            // masked value is identical on every attempt.
            let ctx = MaskingContext::new(Some(&request_id), secrets.as_ref());
            let mut attempt = 1;
            loop {
                match connector
                    .mask_data(&node, &collection, &policy, &ctx, &rows)
                    .await
                {
                    Ok(affected) => return Ok(affected),
                    Err(error) if attempt < attempts => {
                        warn!(collection = %node.address(), %error, attempt, "mask failed; retrying");
                        state.record_retrying(
                            request_id,
                            node.address(),
                            ActionType::Erasure,
                            error.to_string(),
                        );
                        tokio::time::sleep(backoff(backoff_ms, attempt)).await;
                        attempt += 1;
                    }
                    Err(error) => return Err(error),
                }
            }
        })
    }

    fn record_unreachable(
        &self,
        request_id: PrivacyRequestId,
        traversal: &Traversal,
        action_type: ActionType,
    ) {
        for address in traversal.unreachable() {
            self.state.record_skipped(
                request_id,
                address,
                action_type,
                "unreachable from the seed identities",
            );
        }
    }

    fn check_connectors(&self, traversal: &Traversal) -> EngineResult<()> {
        for node in traversal.nodes_in_order() {
            if self.connectors.get(&node.address().dataset).is_none() {
                return Err(EngineError::MissingConnector(node.address().dataset.clone()));
            }
        }
        Ok(())
    }
}

fn backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1 << (attempt - 1)))
}

/// Groups the planned order into dispatch waves. A collection lands one
/// wave below the deepest of its parents and planned *after*
/// dependencies, so no wave contains both a collection and one of its
/// ancestors.
fn waves(traversal: &Traversal) -> Vec<Vec<CollectionAddress>> {
    let mut depth_of: HashMap<CollectionAddress, usize> = HashMap::new();
    let mut waves: Vec<Vec<CollectionAddress>> = Vec::new();
    for node in traversal.nodes_in_order() {
        let depth = node
            .parents()
            .iter()
            .chain(node.after().iter())
            .filter_map(|dependency| depth_of.get(dependency))
            .map(|depth| depth + 1)
            .max()
            .unwrap_or(0);
        depth_of.insert(node.address().clone(), depth);
        if waves.len() <= depth {
            waves.resize_with(depth + 1, Vec::new);
        }
        waves[depth].push(node.address().clone());
    }
    waves
}

/// Builds the candidate values feeding one collection: identity seeds
/// directly from the request, reference seeds from every parent row.
/// Multiple origins for one field path accumulate into one list with
/// duplicates collapsed.
fn node_input(
    node: &TraversalNode,
    identity: &Identity,
    collected: &HashMap<CollectionAddress, Vec<Row>>,
) -> CandidateValues {
    let mut input = CandidateValues::new();
    for (path, origins) in node.seeds() {
        let values = input.entry(path.to_string()).or_default();
        for origin in origins {
            match origin {
                SeedOrigin::Identity(key) => {
                    if let Some(value) = identity.get(key) {
                        push_unique(values, value.clone());
                    }
                }
                SeedOrigin::Reference(source) => {
                    if let Some(rows) = collected.get(source.collection_address()) {
                        for row in rows {
                            for value in values_at(row, &source.field_path) {
                                push_unique(values, value);
                            }
                        }
                    }
                }
            }
        }
    }
    input
}

fn push_unique(values: &mut Vec<Value>, value: Value) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// The fields a policy's erasure rules target at one collection, for
/// the audit trail.
fn affected_fields(
    address: &CollectionAddress,
    collection: &Collection,
    node: &TraversalNode,
    policy: &Policy,
) -> Vec<AffectedField> {
    let config = QueryConfig::new(node, collection);
    let mut seen = BTreeSet::new();
    let mut fields = Vec::new();
    for (_, paths) in config.rule_target_paths(policy, ActionType::Erasure) {
        for path in paths {
            if seen.insert(path.clone()) {
                let data_categories = collection
                    .field(&path)
                    .map(|field| field.data_categories.clone())
                    .unwrap_or_default();
                fields.push(AffectedField {
                    path: format!("{address}:{path}"),
                    field_name: path.to_string(),
                    data_categories,
                });
            }
        }
    }
    fields
}
