// src/walk/queue.rs
// =============================================================================
// The tree walker: turns a repository root URL into a complete TreeNode.
//
// How it works:
// 1. Start with the root directory in a work queue
// 2. Fetch and parse its listing page
// 3. Queue every child: directories get their own listing task, leaves get
//    a digest task (three sidecar fetches)
// 4. Repeat until the queue is empty
// 5. Assemble the tree from the collected listings and digests
//
// There is no fixed depth. Two guards stop runaway listings instead:
// - A visited set of normalised directory URLs (a page linking back to
//   itself or an ancestor is recorded as a cycle)
// - An optional maximum depth from the configuration
//
// Concurrency:
// - At most `max_in_flight` tasks run at once (default 1, fully sequential)
// - All tasks share one PageSource, so its pacing gate covers all of them
// - Only this loop touches the collected results; tasks just return data
//
// Failures below the root are stored as TreeNode::Failed and the walk goes
// on. A root that cannot be listed, or cancellation, ends the walk with an
// error and everything collected so far is dropped.
// =============================================================================

use crate::catalog::Repository;
use crate::client::PageSource;
use crate::config::WalkerConfig;
use crate::error::{Result, WalkError};
use crate::listing::{is_directory, Listing, PATH_SEPARATOR};
use crate::walk::digest::{self, DigestSet};
use crate::walk::tree::{Directory, FailureReason, Leaf, NodeFailure, Tree, TreeNode};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Level under which repository roots are stored in the Tree.
pub const ROOT_LEVEL: u32 = 1;

// One unit of work in the queue
#[derive(Debug, Clone)]
enum Task {
    Listing { url: String, depth: usize },
    Digests { url: String },
}

// What a finished task hands back to the loop
enum Outcome {
    Listing {
        url: String,
        depth: usize,
        result: Result<Listing>,
    },
    Digests {
        url: String,
        digests: DigestSet,
    },
}

// Everything collected while walking one repository
#[derive(Default)]
struct WalkState {
    listings: HashMap<String, std::result::Result<Listing, FailureReason>>,
    digests: HashMap<String, DigestSet>,
    // Child directories that were deliberately not fetched
    skipped: HashMap<String, FailureReason>,
}

pub struct TreeWalker<'a> {
    source: &'a dyn PageSource,
    config: &'a WalkerConfig,
    cancel: CancellationToken,
}

impl<'a> TreeWalker<'a> {
    pub fn new(source: &'a dyn PageSource, config: &'a WalkerConfig, cancel: CancellationToken) -> Self {
        Self {
            source,
            config,
            cancel,
        }
    }

    // Walks one repository
    //
    // Parameters:
    //   root_url: listing URL of the repository root
    //
    // Returns: the Directory node of the root
    //
    // Errors:
    //   The root listing's fetch or parse error
    //   WalkError::Cancelled when the token fires mid-walk
    pub async fn walk(&self, root_url: &str) -> Result<TreeNode> {
        if self.cancel.is_cancelled() {
            return Err(WalkError::Cancelled);
        }

        let max_in_flight = self.config.max_in_flight.max(1);
        let mut state = WalkState::default();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut in_flight: FuturesUnordered<BoxFuture<'a, Outcome>> = FuturesUnordered::new();

        visited.insert(normalize(root_url));
        queue.push_back(Task::Listing {
            url: root_url.to_string(),
            depth: 0,
        });

        loop {
            while in_flight.len() < max_in_flight {
                match queue.pop_front() {
                    Some(task) => in_flight.push(self.run(task)),
                    None => break,
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(WalkError::Cancelled),
                outcome = in_flight.next() => match outcome {
                    Some(outcome) => outcome,
                    None => break,
                },
            };

            match outcome {
                Outcome::Listing { url, depth, result } => match result {
                    Ok(listing) => {
                        debug!(%url, depth, children = listing.edges.len(), "Listed directory");
                        self.schedule_children(&url, depth, &listing, &mut visited, &mut queue, &mut state);
                        state.listings.insert(url, Ok(listing));
                    }
                    Err(e) if url == root_url => return Err(e),
                    Err(e) => {
                        warn!(%url, error = %e, "Directory could not be walked");
                        state.listings.insert(url, Err(failure_reason(&e)));
                    }
                },
                Outcome::Digests { url, digests } => {
                    state.digests.insert(url, digests);
                }
            }
        }

        Ok(assemble(root_url, &mut state))
    }

    // Starts one task; the future borrows only the shared page source
    fn run(&self, task: Task) -> BoxFuture<'a, Outcome> {
        let source = self.source;
        Box::pin(async move {
            match task {
                Task::Listing { url, depth } => {
                    let result = match source.fetch(&url, &[]).await {
                        Ok(page) => Listing::from_page(&page.body),
                        Err(e) => Err(e),
                    };
                    Outcome::Listing { url, depth, result }
                }
                Task::Digests { url } => {
                    let digests = digest::collect(source, &url).await;
                    Outcome::Digests { url, digests }
                }
            }
        })
    }

    fn schedule_children(
        &self,
        parent_url: &str,
        depth: usize,
        listing: &Listing,
        visited: &mut HashSet<String>,
        queue: &mut VecDeque<Task>,
        state: &mut WalkState,
    ) {
        for name in &listing.edges {
            let child_url = join(parent_url, name);

            if !is_directory(name) {
                queue.push_back(Task::Digests { url: child_url });
                continue;
            }

            let child_depth = depth + 1;
            if let Some(max_depth) = self.config.max_depth {
                if child_depth > max_depth {
                    warn!(url = %child_url, max_depth, "Not descending past maximum depth");
                    state.skipped.insert(child_url, FailureReason::DepthLimit(max_depth));
                    continue;
                }
            }

            if !visited.insert(normalize(&child_url)) {
                warn!(url = %child_url, "Directory already visited, skipping cycle");
                state.skipped.insert(child_url, FailureReason::Cycle);
                continue;
            }

            queue.push_back(Task::Listing {
                url: child_url,
                depth: child_depth,
            });
        }
    }
}

// Walks a single repository root with a fresh walker
pub async fn walk(
    source: &dyn PageSource,
    config: &WalkerConfig,
    root_url: &str,
    cancel: CancellationToken,
) -> Result<TreeNode> {
    TreeWalker::new(source, config, cancel).walk(root_url).await
}

// Walks every repository of the catalog into one Tree
//
// Repositories without a URL stay in the catalog but are skipped here;
// there is nothing to list for them. A repository whose root cannot be
// listed aborts the whole run.
pub async fn walk_catalog(
    source: &dyn PageSource,
    config: &WalkerConfig,
    repositories: &BTreeMap<String, Repository>,
    cancel: CancellationToken,
) -> Result<Tree> {
    let walker = TreeWalker::new(source, config, cancel);
    let mut tree = Tree::default();

    for (key, repository) in repositories {
        let Some(url) = repository.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            warn!(%key, "Repository has no URL, skipping");
            continue;
        };

        info!(%key, %url, "Walking repository");
        let node = walker.walk(url).await?;
        let stats = node.stats();
        info!(
            %key,
            directories = stats.directories,
            leaves = stats.leaves,
            failed = stats.failed,
            "Repository walked"
        );
        tree.insert(ROOT_LEVEL, url, node);
    }

    Ok(tree)
}

// Builds the finished node for `url` from the collected state
fn assemble(url: &str, state: &mut WalkState) -> TreeNode {
    if let Some(reason) = state.skipped.remove(url) {
        return failed(url, reason);
    }

    let listing = match state.listings.remove(url) {
        Some(Ok(listing)) => listing,
        Some(Err(reason)) => return failed(url, reason),
        None => return failed(url, FailureReason::Fetch("never fetched".to_string())),
    };

    let mut children = BTreeMap::new();
    for name in &listing.edges {
        let child_url = join(url, name);
        let child = if is_directory(name) {
            assemble(&child_url, state)
        } else {
            TreeNode::Leaf(Leaf {
                // Edges from different pages may share a URL; each leaf gets a copy
                digests: state.digests.get(&child_url).cloned().unwrap_or_default(),
                metadata: listing.metadata(name).cloned(),
                url: child_url,
            })
        };
        children.insert(name.clone(), child);
    }

    TreeNode::Directory(Directory {
        url: url.to_string(),
        edges: listing.edges,
        children,
    })
}

fn failed(url: &str, reason: FailureReason) -> TreeNode {
    TreeNode::Failed(NodeFailure {
        url: url.to_string(),
        reason,
    })
}

fn failure_reason(error: &WalkError) -> FailureReason {
    match error {
        WalkError::MalformedListing { .. } => FailureReason::Listing(error.to_string()),
        _ => FailureReason::Fetch(error.to_string()),
    }
}

// Child URL under a parent, with exactly one separator between them
//
// Example:
//   join("https://example.com/api/data", "b/")   -> ".../data/b/"
//   join("https://example.com/api/data/b/", "x") -> ".../data/b/x"
fn join(parent: &str, name: &str) -> String {
    format!("{}{}{}", parent.trim_end_matches(PATH_SEPARATOR), PATH_SEPARATOR, name)
}

// Key for the visited set: dot segments resolved, no trailing separator
fn normalize(url: &str) -> String {
    let resolved = match Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    };
    resolved.trim_end_matches(PATH_SEPARATOR).to_string()
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a queue instead of a recursive async fn?
//    - A recursive async fn needs boxing at every level
//    - The queue makes depth a plain number we can compare against a limit
//    - It also lets several tasks run at once without any extra locking
//
// 2. What is FuturesUnordered?
//    - A set of futures polled together
//    - .next() yields whichever finishes first
//    - Its length is the number of requests currently in flight
//
// 3. What is BoxFuture<'a, T>?
//    - Pin<Box<dyn Future<Output = T> + Send + 'a>>
//    - Different async blocks have different types; boxing gives them one
//    - 'a ties each future to the borrowed PageSource, so no Arc is needed
//
// 4. What does `biased;` do in tokio::select!?
//    - Branches are checked top to bottom instead of randomly
//    - Cancellation is seen before any further result is processed
//
// 5. Why build the tree at the end?
//    - Tasks finish in any order when running concurrently
//    - Collecting results by URL first, then assembling, gives the same tree
//      for any concurrency setting
// -----------------------------------------------------------------------------
