//! Concurrent, order-preserving dependency resolution.
//!
//! Every coordinate dependency is expanded in its own task; siblings run
//! concurrently and are put back into declaration order before they are
//! attached to their parent. Versions requested for one module meet in a
//! shared table where the conflict strategy picks the winner. Once the
//! traversal is over, the tree is flattened into an arena, every node gets
//! the winning version of its module, and artifacts are fetched once per
//! winning coordinate. A node whose version lost is evicted and keeps no
//! dependencies.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use trellis_core::conflict::ConflictStrategy;
use trellis_core::coordinate::Coordinate;
use trellis_core::dependency::{
    ComputedDependency, CoordinateDependency, Dependency, Exclusion, Transitivity,
};
use trellis_core::dependency_set::DependencySet;
use trellis_core::module_id::ModuleId;
use trellis_core::qualified::{self, QualifiedDependencySet};
use trellis_core::settings::ResolutionParameters;
use trellis_core::version::Version;
use trellis_core::version_provider::VersionProvider;
use trellis_util::errors::{TrellisError, TrellisResult};

use crate::bom::{with_resolved_boms, BomExpansion};
use crate::cache::ResolutionCache;
use crate::error::ResolutionError;
use crate::repository::{Descriptor, RepoSet, RepositoryError};
use crate::result::ResolveResult;
use crate::tree::{NodeId, NodeKind, ResolvedDependencyNode, ResolvedTree};

/// Resolves dependency sets against an ordered set of repositories.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    repos: RepoSet,
    parameters: ResolutionParameters,
    cache: ResolutionCache,
}

impl DependencyResolver {
    pub fn of(repos: RepoSet) -> Self {
        Self {
            repos,
            parameters: ResolutionParameters::default(),
            cache: ResolutionCache::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: ResolutionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Share `cache` with other resolvers or later runs.
    pub fn with_cache(mut self, cache: ResolutionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn parameters(&self) -> &ResolutionParameters {
        &self.parameters
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn repositories(&self) -> &RepoSet {
        &self.repos
    }

    pub async fn resolve(&self, set: &DependencySet) -> TrellisResult<ResolveResult> {
        self.resolve_qualified(&QualifiedDependencySet::from_set(set))
            .await
    }

    /// Resolve with the resolver's own parameters and cache.
    ///
    /// Recorded errors only fail the call when `fail-on-error` is set.
    pub async fn resolve_qualified(
        &self,
        set: &QualifiedDependencySet,
    ) -> TrellisResult<ResolveResult> {
        let result = self
            .resolve_with(set, &self.parameters, &self.cache, &CancellationToken::new())
            .await;
        if self.parameters.fail_on_error {
            result.assert_no_error()?;
        }
        Ok(result)
    }

    /// Resolve `set` and return its files, failing on any resolution error.
    pub async fn resolve_files(&self, set: &DependencySet) -> TrellisResult<Vec<PathBuf>> {
        let result = self.resolve(set).await?;
        result.assert_no_error()?;
        Ok(result.files)
    }

    /// Versions of `module` known to any repository, lowest first.
    pub async fn search_versions(&self, module: &ModuleId) -> TrellisResult<Vec<Version>> {
        if let Some(found) = self.cache.versions(module) {
            return Ok(found.as_ref().clone());
        }
        let found = self
            .repos
            .list_versions(module, self.parameters.fetch_timeout())
            .await
            .map_err(|e| TrellisError::Repository {
                message: e.to_string(),
            })?;
        self.cache.put_versions(module.clone(), Arc::new(found.clone()));
        Ok(found)
    }

    /// Resolve `set` with explicit parameters, cache and cancellation.
    ///
    /// Never fails: when `cancel` fires or the overall timeout elapses, no
    /// new fetch is started and the subtrees left incomplete carry a
    /// cancellation error in the returned partial result.
    pub async fn resolve_with(
        &self,
        set: &QualifiedDependencySet,
        parameters: &ResolutionParameters,
        cache: &ResolutionCache,
        cancel: &CancellationToken,
    ) -> ResolveResult {
        let cancel = cancel.child_token();
        let timer = parameters.timeout().map(|after| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                tracing::warn!("Resolution did not finish within {after:?}, cancelling");
                token.cancel();
            })
        });

        let result = self.run(set, parameters, cache, cancel).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        result
    }

    async fn run(
        &self,
        set: &QualifiedDependencySet,
        parameters: &ResolutionParameters,
        cache: &ResolutionCache,
        cancel: CancellationToken,
    ) -> ResolveResult {
        let BomExpansion {
            set,
            errors: bom_errors,
        } = with_resolved_boms(set, &self.repos, cache, parameters.fetch_timeout(), &cancel)
            .await;

        let ctx = Arc::new(Context {
            repos: self.repos.clone(),
            cache: cache.clone(),
            cancel,
            permits: Semaphore::new(parameters.max_concurrent_fetches.max(1)),
            fetch_timeout: parameters.fetch_timeout(),
            strategy: parameters.conflict_strategy,
            include_optional: parameters.include_optional,
            pins: set.version_provider().clone(),
            global_exclusions: set.global_exclusions().to_vec(),
            claims: DashMap::new(),
            conflicts: DashMap::new(),
        });

        let mut branches = resolve_entries(&ctx, &set, parameters.default_transitivity).await;
        let winners = settle_winners(&ctx, &mut branches);

        let mut tree = ResolvedTree::new();
        let root = tree.root();
        for (branch, qualifier) in branches {
            match branch {
                Branch::Module(module) => attach(&mut tree, root, module, qualifier.as_deref()),
                Branch::Files {
                    label,
                    files,
                    error,
                } => {
                    let mut node = ResolvedDependencyNode::new(NodeKind::Files { label });
                    node.files = files;
                    node.error = error;
                    node.qualifiers.extend(qualifier);
                    tree.add(root, node);
                }
            }
        }

        for id in tree.pre_order() {
            let node = tree.node_mut(id);
            node.resolved_version = node.module_id().and_then(|m| winners.get(m)).cloned();
        }

        fetch_artifacts(&ctx, &mut tree).await;
        finish(tree, winners, bom_errors, ctx.sorted_conflicts())
    }
}

/// Resolution state shared by every branch of one run.
struct Context {
    repos: RepoSet,
    cache: ResolutionCache,
    cancel: CancellationToken,
    /// Bounds concurrent repository calls; held only around a call.
    permits: Semaphore,
    fetch_timeout: Duration,
    strategy: ConflictStrategy,
    include_optional: bool,
    pins: VersionProvider,
    global_exclusions: Vec<Exclusion>,
    claims: DashMap<ModuleId, Claim>,
    conflicts: DashMap<ModuleId, Vec<Version>>,
}

/// Version currently retained for a module and where it was first requested.
#[derive(Debug, Clone)]
struct Claim {
    version: Version,
    /// Child indices from the root; lexical order is tree pre-order.
    path: Vec<u32>,
}

enum FetchError {
    Cancelled,
    Repository(RepositoryError),
}

impl FetchError {
    fn for_coordinate(self, coordinate: &Coordinate) -> ResolutionError {
        match self {
            FetchError::Cancelled => ResolutionError::cancelled(coordinate),
            FetchError::Repository(e) => ResolutionError::unresolved(coordinate, e.to_string()),
        }
    }
}

impl Context {
    /// Run a repository call under a permit, giving up once cancelled.
    async fn fetch<T>(
        &self,
        call: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, FetchError> {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = self.permits.acquire() => permit.ok(),
        };
        let Some(_permit) = permit else {
            return Err(FetchError::Cancelled);
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            result = call => result.map_err(FetchError::Repository),
        }
    }

    async fn descriptor(&self, main: &Coordinate) -> Result<Option<Arc<Descriptor>>, FetchError> {
        if let Some(found) = self.cache.descriptor(main) {
            return Ok(found);
        }
        let lookup = self
            .fetch(self.repos.lookup_descriptor(main, self.fetch_timeout))
            .await?;
        let definitive = lookup.is_definitive();
        let found = lookup.found.map(Arc::new);
        if definitive {
            self.cache.put_descriptor(main.clone(), found.clone());
        }
        Ok(found)
    }

    async fn versions(&self, module: &ModuleId) -> Result<Arc<Vec<Version>>, FetchError> {
        if let Some(found) = self.cache.versions(module) {
            return Ok(found);
        }
        let found = Arc::new(
            self.fetch(self.repos.list_versions(module, self.fetch_timeout))
                .await?,
        );
        self.cache.put_versions(module.clone(), found.clone());
        Ok(found)
    }

    async fn artifact(&self, coordinate: &Coordinate) -> Result<Option<PathBuf>, FetchError> {
        if let Some(found) = self.cache.artifact(coordinate) {
            return Ok(found);
        }
        let lookup = self
            .fetch(self.repos.lookup_artifact(coordinate, self.fetch_timeout))
            .await?;
        if lookup.is_definitive() {
            self.cache.put_artifact(coordinate.clone(), lookup.found.clone());
        }
        Ok(lookup.found)
    }

    /// Pinned, then concrete version to request for `coordinate`.
    async fn concrete_version(&self, coordinate: &Coordinate) -> Result<Version, ResolutionError> {
        let requested = match self.pins.version_of(coordinate.module_id()) {
            Some(pinned) => pinned.clone(),
            None => coordinate.version().clone(),
        };
        if requested.is_unspecified() {
            return Err(ResolutionError::unresolved(
                coordinate,
                "no version declared or provided",
            ));
        }
        if !requested.is_dynamic() {
            return Ok(requested);
        }
        let known = self
            .versions(coordinate.module_id())
            .await
            .map_err(|e| e.for_coordinate(coordinate))?;
        known
            .iter()
            .rev()
            .find(|v| requested.matches_dynamic(v))
            .cloned()
            .ok_or_else(|| {
                ResolutionError::unresolved(coordinate, format!("no version matches {requested}"))
            })
    }

    /// Offer `version` of `module`, requested at `path`, to the version table.
    ///
    /// Two claims are ordered by path and the strategy picks between the
    /// earlier and the later one, so the outcome does not depend on which
    /// branch finishes first.
    fn claim(&self, module: &ModuleId, version: &Version, path: &[u32]) {
        match self.claims.entry(module.clone()) {
            Entry::Vacant(e) => {
                e.insert(Claim {
                    version: version.clone(),
                    path: path.to_vec(),
                });
            }
            Entry::Occupied(mut e) => {
                let take_candidate = {
                    let retained = e.get();
                    let candidate_first = path < retained.path.as_slice();
                    let (earlier, later) = if candidate_first {
                        (version, &retained.version)
                    } else {
                        (&retained.version, version)
                    };
                    match self.strategy.select(earlier, later) {
                        Some(winner) => (&winner == earlier) == candidate_first,
                        None => {
                            self.record_conflict(module, [&retained.version, version]);
                            candidate_first
                        }
                    }
                };
                if take_candidate {
                    e.insert(Claim {
                        version: version.clone(),
                        path: path.to_vec(),
                    });
                }
            }
        }
    }

    fn record_conflict<'v>(&self, module: &ModuleId, versions: impl IntoIterator<Item = &'v Version>) {
        let mut known = self.conflicts.entry(module.clone()).or_default();
        for v in versions {
            if !known.contains(v) {
                known.push(v.clone());
            }
        }
    }

    fn winners(&self) -> BTreeMap<ModuleId, Version> {
        self.claims
            .iter()
            .map(|e| (e.key().clone(), e.value().version.clone()))
            .collect()
    }

    fn sorted_conflicts(&self) -> Vec<ResolutionError> {
        let sorted: BTreeMap<ModuleId, Vec<Version>> = self
            .conflicts
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        sorted
            .into_iter()
            .map(|(module, mut versions)| {
                versions.sort_by(|a, b| a.compare(b).then_with(|| a.value().cmp(b.value())));
                ResolutionError::Conflict { module, versions }
            })
            .collect()
    }

    /// Children of a descriptor that survive scope, optional and exclusion filters.
    fn children_of(
        &self,
        descriptor: &Descriptor,
        transitivity: Transitivity,
        exclusions: &[Exclusion],
    ) -> Vec<Request> {
        let mut children = Vec::new();
        for dep in &descriptor.dependencies {
            let module = dep.coordinate.module_id();
            if dep.optional && !self.include_optional {
                continue;
            }
            if !transitivity.accepts_scope(&dep.scope) {
                continue;
            }
            if exclusions
                .iter()
                .chain(&self.global_exclusions)
                .any(|e| e.excludes(module))
            {
                tracing::trace!("{module} is excluded");
                continue;
            }
            let mut coordinate = dep.coordinate.clone();
            if coordinate.version().is_unspecified() {
                if let Some(managed) = descriptor.managed_version(module) {
                    coordinate = coordinate.with_version(managed.clone());
                }
            }
            let transitivity = if coordinate.is_transitive_by_default() {
                transitivity
            } else {
                Transitivity::None
            };
            children.push(Request {
                coordinate,
                transitivity,
                exclusions: Arc::new(
                    exclusions
                        .iter()
                        .chain(&dep.exclusions)
                        .cloned()
                        .collect(),
                ),
                path: Vec::new(),
                ancestors: Arc::new(Vec::new()),
            });
        }
        children
    }
}

/// One coordinate to expand.
struct Request {
    coordinate: Coordinate,
    transitivity: Transitivity,
    /// Local exclusions in force for this subtree.
    exclusions: Arc<Vec<Exclusion>>,
    path: Vec<u32>,
    ancestors: Arc<Vec<ModuleId>>,
}

#[derive(Debug, Clone)]
struct ModuleBranch {
    coordinate: Coordinate,
    declared: Version,
    transitivity: Transitivity,
    error: Option<ResolutionError>,
    cycle: bool,
    /// The concrete version took part in conflict resolution.
    claimed: bool,
    evicted: bool,
    children: Vec<ModuleBranch>,
}

impl ModuleBranch {
    fn leaf(request: &Request) -> Self {
        Self {
            coordinate: request.coordinate.clone(),
            declared: request.coordinate.version().clone(),
            transitivity: request.transitivity,
            error: None,
            cycle: false,
            claimed: false,
            evicted: false,
            children: Vec::new(),
        }
    }

    fn failed(request: &Request, error: ResolutionError) -> Self {
        Self {
            error: Some(error),
            ..Self::leaf(request)
        }
    }

    fn size(&self) -> usize {
        1 + self.children.iter().map(ModuleBranch::size).sum::<usize>()
    }
}

enum Branch {
    Module(ModuleBranch),
    Files {
        label: String,
        files: Vec<PathBuf>,
        error: Option<ResolutionError>,
    },
}

fn expand(ctx: Arc<Context>, request: Request) -> BoxFuture<'static, ModuleBranch> {
    async move {
        let mut branch = ModuleBranch::leaf(&request);
        let module = request.coordinate.module_id().clone();

        let version = match ctx.concrete_version(&request.coordinate).await {
            Ok(v) => v,
            Err(e) => {
                branch.error = Some(e);
                return branch;
            }
        };
        branch.coordinate = request.coordinate.with_version(version.clone());
        ctx.claim(&module, &version, &request.path);
        branch.claimed = true;

        if request.ancestors.contains(&module) {
            tracing::debug!("{module} depends on itself, not expanding it again");
            branch.cycle = true;
            return branch;
        }
        if request.transitivity == Transitivity::None {
            return branch;
        }

        let main = module.to_coordinate(version);
        let descriptor = match ctx.descriptor(&main).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                branch.error = Some(ResolutionError::unresolved(
                    &branch.coordinate,
                    format!("not found in {}", ctx.repos.names().join(", ")),
                ));
                return branch;
            }
            Err(e) => {
                branch.error = Some(e.for_coordinate(&branch.coordinate));
                return branch;
            }
        };

        let mut children = ctx.children_of(&descriptor, request.transitivity, &request.exclusions);
        if children.is_empty() {
            return branch;
        }
        let mut lineage = request.ancestors.as_ref().clone();
        lineage.push(module);
        let lineage = Arc::new(lineage);
        for (i, child) in children.iter_mut().enumerate() {
            child.path = request.path.clone();
            child.path.push(i as u32);
            child.ancestors = lineage.clone();
        }
        branch.children = expand_all(&ctx, children).await;
        branch
    }
    .boxed()
}

/// Expand sibling requests concurrently, keeping their order.
async fn expand_all(ctx: &Arc<Context>, requests: Vec<Request>) -> Vec<ModuleBranch> {
    let fallback: Vec<ModuleBranch> = requests
        .iter()
        .map(|r| ModuleBranch::failed(r, ResolutionError::cancelled(&r.coordinate)))
        .collect();
    let mut slots: Vec<Option<ModuleBranch>> = vec![None; requests.len()];

    let mut join_set = JoinSet::new();
    for (i, request) in requests.into_iter().enumerate() {
        join_set.spawn(expand(ctx.clone(), request).map(move |branch| (i, branch)));
    }
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((i, branch)) => slots[i] = Some(branch),
            Err(e) => tracing::error!("Resolution task failed: {e}"),
        }
    }

    slots
        .into_iter()
        .zip(fallback)
        .map(|(slot, fallback)| slot.unwrap_or(fallback))
        .collect()
}

/// Top-level entries in declaration order, with their qualifier.
async fn resolve_entries(
    ctx: &Arc<Context>,
    set: &QualifiedDependencySet,
    default_transitivity: Transitivity,
) -> Vec<(Branch, Option<String>)> {
    let mut requests = Vec::new();
    let mut slots: Vec<Option<Branch>> = Vec::with_capacity(set.len());
    let mut computed: JoinSet<(usize, Branch)> = JoinSet::new();

    for (i, entry) in set.entries().iter().enumerate() {
        match &entry.dependency {
            Dependency::Coordinate(dep) => {
                requests.push((
                    i,
                    Request {
                        coordinate: dep.coordinate.clone(),
                        transitivity: root_transitivity(dep, entry.qualifier(), default_transitivity),
                        exclusions: Arc::new(dep.exclusions.clone()),
                        path: vec![i as u32],
                        ancestors: Arc::new(Vec::new()),
                    },
                ));
                slots.push(None);
            }
            Dependency::Files(files) => slots.push(Some(Branch::Files {
                label: entry.dependency.to_string(),
                files: files.paths.clone(),
                error: None,
            })),
            Dependency::Computed(dep) => {
                let dep = dep.clone();
                let label = entry.dependency.to_string();
                if ctx.cancel.is_cancelled() {
                    slots.push(Some(Branch::Files {
                        label,
                        files: Vec::new(),
                        error: Some(ResolutionError::Cancelled {
                            coordinate: dep.description.clone(),
                        }),
                    }));
                    continue;
                }
                computed.spawn(async move { (i, produce(dep, label).await) });
                slots.push(None);
            }
        }
    }

    let (indices, requests): (Vec<usize>, Vec<Request>) = requests.into_iter().unzip();
    let expanded = expand_all(ctx, requests).await;
    for (i, branch) in indices.into_iter().zip(expanded) {
        slots[i] = Some(Branch::Module(branch));
    }
    while let Some(joined) = computed.join_next().await {
        match joined {
            Ok((i, branch)) => slots[i] = Some(branch),
            Err(e) => tracing::error!("Computed dependency task failed: {e}"),
        }
    }

    set.entries()
        .iter()
        .zip(slots)
        .map(|(entry, slot)| {
            let branch = slot.unwrap_or_else(|| Branch::Files {
                label: entry.dependency.to_string(),
                files: Vec::new(),
                error: Some(ResolutionError::ComputedDependency {
                    description: entry.dependency.to_string(),
                    message: "producer task failed".to_string(),
                }),
            });
            (branch, entry.qualifier().map(str::to_string))
        })
        .collect()
}

async fn produce(dep: ComputedDependency, label: String) -> Branch {
    let description = dep.description.clone();
    let produced =
        tokio::task::spawn_blocking(move || dep.ensure_files().map(<[PathBuf]>::to_vec)).await;
    let (files, error) = match produced {
        Ok(Ok(files)) => (files, None),
        Ok(Err(e)) => (Vec::new(), Some(e.to_string())),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };
    Branch::Files {
        label,
        files,
        error: error.map(|message| ResolutionError::ComputedDependency {
            description,
            message,
        }),
    }
}

/// How far a top-level entry is expanded.
fn root_transitivity(
    dep: &CoordinateDependency,
    qualifier: Option<&str>,
    default: Transitivity,
) -> Transitivity {
    if let Some(explicit) = dep.transitivity {
        return explicit;
    }
    if !dep.coordinate.is_transitive_by_default() {
        return Transitivity::None;
    }
    match qualifier {
        Some(qualified::COMPILE) | Some(qualified::PROVIDED) => Transitivity::Compile,
        Some(qualified::RUNTIME) | Some(qualified::TEST) => Transitivity::Runtime,
        _ => default,
    }
}

fn attach(tree: &mut ResolvedTree, parent: NodeId, branch: ModuleBranch, qualifier: Option<&str>) {
    let mut node = ResolvedDependencyNode::new(NodeKind::Module {
        coordinate: branch.coordinate,
    });
    node.declared_version = Some(branch.declared);
    node.transitivity = branch.transitivity;
    node.error = branch.error;
    node.cycle = branch.cycle;
    node.evicted = branch.evicted;
    node.qualifiers.extend(qualifier.map(str::to_string));
    let id = tree.add(parent, node);
    for child in branch.children {
        attach(tree, id, child, qualifier);
    }
}

/// Winners once the versions requested only under losing nodes are dropped.
///
/// A node whose version lost does not contribute its dependencies, which can
/// change other winners, so the selection is repeated until it is stable.
/// Losing nodes are then evicted and their subtrees removed.
fn settle_winners(
    ctx: &Context,
    branches: &mut [(Branch, Option<String>)],
) -> BTreeMap<ModuleId, Version> {
    let mut winners = ctx.winners();
    let rounds: usize = module_branches(branches).map(ModuleBranch::size).sum();
    for _ in 0..rounds {
        let mut live = BTreeMap::new();
        for branch in module_branches(branches) {
            select_live(ctx.strategy, branch, &winners, &mut live);
        }
        if live == winners {
            break;
        }
        winners = live;
    }

    let mut evicted = 0;
    for (branch, _) in branches.iter_mut() {
        if let Branch::Module(module) = branch {
            evicted += evict_losers(module, &winners);
        }
    }
    if evicted > 0 {
        tracing::debug!("{evicted} nodes evicted by conflict resolution");
    }
    winners
}

fn module_branches(branches: &[(Branch, Option<String>)]) -> impl Iterator<Item = &ModuleBranch> {
    branches.iter().filter_map(|(branch, _)| match branch {
        Branch::Module(module) => Some(module),
        Branch::Files { .. } => None,
    })
}

/// Offer, in pre-order, the versions requested by nodes whose ancestors all
/// hold a winning version of `winners`.
fn select_live(
    strategy: ConflictStrategy,
    branch: &ModuleBranch,
    winners: &BTreeMap<ModuleId, Version>,
    live: &mut BTreeMap<ModuleId, Version>,
) {
    if !branch.claimed {
        return;
    }
    let module = branch.coordinate.module_id();
    let version = branch.coordinate.version();
    match live.get_mut(module) {
        Some(retained) => {
            if let Some(winner) = strategy.select(retained, version) {
                *retained = winner;
            }
        }
        None => {
            live.insert(module.clone(), version.clone());
        }
    }
    if winners.get(module) != Some(version) {
        return;
    }
    for child in &branch.children {
        select_live(strategy, child, winners, live);
    }
}

fn evict_losers(branch: &mut ModuleBranch, winners: &BTreeMap<ModuleId, Version>) -> usize {
    let module = branch.coordinate.module_id();
    if branch.claimed && winners.get(module) != Some(branch.coordinate.version()) {
        branch.evicted = true;
        branch.children.clear();
        return 1;
    }
    branch
        .children
        .iter_mut()
        .map(|child| evict_losers(child, winners))
        .sum()
}

/// Fetch the artifact of every winning coordinate once and attach it to its nodes.
async fn fetch_artifacts(ctx: &Arc<Context>, tree: &mut ResolvedTree) {
    let mut wanted: Vec<Coordinate> = Vec::new();
    for id in tree.pre_order() {
        let node = tree.node(id);
        if node.error.is_some() || node.evicted {
            continue;
        }
        if let Some(coordinate) = node.resolved_coordinate() {
            if !wanted.contains(&coordinate) {
                wanted.push(coordinate);
            }
        }
    }

    let mut join_set = JoinSet::new();
    for coordinate in wanted {
        let ctx = ctx.clone();
        join_set.spawn(async move {
            let found = ctx.artifact(&coordinate).await;
            (coordinate, found)
        });
    }
    let mut fetched: HashMap<Coordinate, Result<PathBuf, ResolutionError>> = HashMap::new();
    while let Some(joined) = join_set.join_next().await {
        let Ok((coordinate, found)) = joined else {
            tracing::error!("Artifact download task failed");
            continue;
        };
        let outcome = match found {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(ResolutionError::unresolved(
                &coordinate,
                "artifact not found in any repository",
            )),
            Err(e) => Err(e.for_coordinate(&coordinate)),
        };
        fetched.insert(coordinate, outcome);
    }

    for id in tree.pre_order() {
        let node = tree.node_mut(id);
        if node.error.is_some() || node.evicted {
            continue;
        }
        let Some(coordinate) = node.resolved_coordinate() else {
            continue;
        };
        match fetched.get(&coordinate) {
            Some(Ok(path)) => node.files = vec![path.clone()],
            Some(Err(e)) => node.error = Some(e.clone()),
            None => node.error = Some(ResolutionError::cancelled(&coordinate)),
        }
    }
}

fn finish(
    tree: ResolvedTree,
    winners: BTreeMap<ModuleId, Version>,
    bom_errors: Vec<ResolutionError>,
    conflicts: Vec<ResolutionError>,
) -> ResolveResult {
    let mut files = Vec::new();
    let mut seen_files = HashSet::new();
    let mut errors: Vec<ResolutionError> = Vec::new();
    let mut resolved_modules = HashSet::new();

    for id in tree.pre_order() {
        let node = tree.node(id);
        if node.evicted {
            continue;
        }
        for file in &node.files {
            if seen_files.insert(file.clone()) {
                files.push(file.clone());
            }
        }
        match &node.error {
            Some(e) => errors.push(e.clone()),
            None => {
                if let Some(module) = node.module_id() {
                    resolved_modules.insert(module.clone());
                }
            }
        }
    }

    let mut all_errors: Vec<ResolutionError> = Vec::new();
    for e in bom_errors.into_iter().chain(errors).chain(conflicts) {
        if !all_errors.contains(&e) {
            all_errors.push(e);
        }
    }

    let resolved_versions: BTreeMap<ModuleId, Version> = winners
        .into_iter()
        .filter(|(module, _)| resolved_modules.contains(module))
        .collect();

    tracing::info!(
        "{} modules resolved to {} files",
        resolved_versions.len(),
        files.len()
    );
    if !all_errors.is_empty() {
        tracing::warn!("Resolution finished with {} errors", all_errors.len());
    }

    ResolveResult {
        tree,
        resolved_versions,
        files,
        errors: all_errors,
    }
}
