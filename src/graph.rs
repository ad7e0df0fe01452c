//! In-memory commit graph: parent and child relationships between commits.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::Result;
use crate::objects::{Commit, Oid};
use crate::repository::Repository;

/// A graph of commits tracking parent and child edges.
///
/// The graph holds two maps over the same key space. An ID keys the
/// parents map exactly when its commit has been added (explored); an ID may
/// key the children map earlier, the moment some explored commit names it
/// as a parent. For every explored `c` and `p` in `parents(c)`, `c` is in
/// `children(p)`.
///
/// Nodes hold only IDs; commit bodies stay with the repository.
#[derive(Debug, Default)]
pub struct CommitGraph {
    parents: HashMap<Oid, HashSet<Oid>>,
    children: HashMap<Oid, HashSet<Oid>>,
}

impl CommitGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        CommitGraph::default()
    }

    /// Adds a commit's edges to the graph.
    ///
    /// Idempotent per commit ID: adding a commit that is already explored
    /// changes nothing.
    pub fn add_commit(&mut self, commit: &Commit) -> Result<()> {
        let id = commit.id()?;
        self.insert(id, commit);
        Ok(())
    }

    fn insert(&mut self, id: Oid, commit: &Commit) {
        if self.parents.contains_key(&id) {
            return;
        }
        self.parents
            .insert(id, commit.parents().iter().copied().collect());
        self.children.entry(id).or_default();
        for parent in commit.parents() {
            self.children.entry(*parent).or_default().insert(id);
        }
    }

    /// Reads the given commits and their entire ancestries from the
    /// repository and adds them all.
    ///
    /// The walk is breadth-first over parent edges and never reads the
    /// same ID twice. Fails with `Error::ObjectNotFound` if any reachable
    /// commit is missing from the repository.
    pub fn add_history<R: Repository + ?Sized>(&mut self, repo: &R, starts: &[Oid]) -> Result<()> {
        let mut queue: VecDeque<Oid> = starts.iter().copied().collect();
        let mut visited: HashSet<Oid> = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let commit = repo.read_commit(&id)?;
            queue.extend(commit.parents().iter().copied());
            self.insert(id, &commit);
        }
        Ok(())
    }

    /// Returns the parents of an explored commit, or `None` if the ID has
    /// not been added.
    pub fn parents(&self, id: &Oid) -> Option<&HashSet<Oid>> {
        self.parents.get(id)
    }

    /// Returns the currently known children of a commit, or `None` if the
    /// ID is not in the graph at all.
    pub fn children(&self, id: &Oid) -> Option<&HashSet<Oid>> {
        self.children.get(id)
    }

    /// Iterates over the explored commit IDs.
    pub fn parents_keys(&self) -> impl Iterator<Item = &Oid> {
        self.parents.keys()
    }

    /// Iterates over every ID known to the graph, explored or not.
    pub fn children_keys(&self) -> impl Iterator<Item = &Oid> {
        self.children.keys()
    }

    /// Returns the explored commits that have no parents.
    ///
    /// Grows (or stays the same) as commits are added.
    pub fn roots(&self) -> HashSet<Oid> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Returns the commits that no known commit names as a parent.
    ///
    /// Can both grow and shrink as commits are added; it is non-empty
    /// whenever the graph is non-empty.
    pub fn leaves(&self) -> HashSet<Oid> {
        self.children
            .iter()
            .filter(|(_, children)| children.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Returns the IDs known only as parents: named by some explored
    /// commit but not yet read in themselves.
    ///
    /// Each time an unexplored commit is added, it leaves this set; the
    /// set is empty exactly when every reachable ancestor is explored.
    pub fn unexplored(&self) -> HashSet<Oid> {
        self.children
            .keys()
            .filter(|id| !self.parents.contains_key(*id))
            .copied()
            .collect()
    }
}
