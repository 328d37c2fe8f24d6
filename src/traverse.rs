//! Traversal engine for binary link structures.
//!
//! Depth-first orders are driven by a step table: every order is a fixed
//! sequence of three steps (walk left subtree, visit self, walk right
//! subtree), so the six depth-first orders share one recursive walker.
//! Breadth-first uses a transient [`WorkQueue`].

use crate::error::TraverseError;
use crate::queue::WorkQueue;

/// What a visitor asks the walk to do next.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Visit {
    /// Keep walking.
    Continue,
    /// Stop early; the walk reports success with the count visited so far.
    Stop,
    /// Stop early; the walk reports failure.
    Fail,
}

/// Visit orders supported by [`AvlTree::traverse`](crate::AvlTree::traverse).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum TraversalOrder {
    InOrder = 0,
    PreOrder = 1,
    PostOrder = 2,
    InOrderReverse = 3,
    PreOrderReverse = 4,
    PostOrderReverse = 5,
    BreadthFirst = 6,
}

impl TraversalOrder {
    pub const ALL: [TraversalOrder; 7] = [
        TraversalOrder::InOrder,
        TraversalOrder::PreOrder,
        TraversalOrder::PostOrder,
        TraversalOrder::InOrderReverse,
        TraversalOrder::PreOrderReverse,
        TraversalOrder::PostOrderReverse,
        TraversalOrder::BreadthFirst,
    ];

    fn steps(self) -> Option<&'static [Step; 3]> {
        STEPS.get(self as usize)
    }
}

impl TryFrom<u8> for TraversalOrder {
    type Error = TraverseError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(TraverseError::UnknownOrder(raw))
    }
}

#[derive(Copy, Clone, Debug)]
enum Step {
    Left,
    Body,
    Right,
}

// Indexed by `TraversalOrder as usize`; breadth-first has no row.
// The reverse orders emit the exact reverse of their forward sequence.
static STEPS: [[Step; 3]; 6] = [
    [Step::Left, Step::Body, Step::Right],
    [Step::Body, Step::Left, Step::Right],
    [Step::Left, Step::Right, Step::Body],
    [Step::Right, Step::Body, Step::Left],
    [Step::Right, Step::Left, Step::Body],
    [Step::Body, Step::Right, Step::Left],
];

/// Read-only view of a binary link structure.
pub(crate) trait BinaryLinks {
    type Id: Copy;
    type Item;

    fn root(&self) -> Option<Self::Id>;
    /// `[left, right]`.
    fn children(&self, id: Self::Id) -> [Option<Self::Id>; 2];
    fn item(&self, id: Self::Id) -> &Self::Item;
}

/// Walks `links` in `order`, returning the number of nodes handed to
/// `visit` (including the one that asked to stop).
pub(crate) fn traverse<L, F>(
    links: &L,
    order: TraversalOrder,
    mut visit: F,
) -> Result<usize, TraverseError>
where
    L: BinaryLinks,
    F: FnMut(L::Id, &L::Item, usize) -> Visit,
{
    let mut idx = 0;
    let flow = match order.steps() {
        Some(steps) => walk(links, links.root(), steps, &mut idx, &mut visit),
        None => breadth_first(links, &mut idx, &mut visit)?,
    };
    match flow {
        Visit::Fail => Err(TraverseError::VisitorFailed { visited: idx }),
        Visit::Continue | Visit::Stop => Ok(idx),
    }
}

fn walk<L, F>(
    links: &L,
    at: Option<L::Id>,
    steps: &[Step; 3],
    idx: &mut usize,
    visit: &mut F,
) -> Visit
where
    L: BinaryLinks,
    F: FnMut(L::Id, &L::Item, usize) -> Visit,
{
    let Some(id) = at else {
        return Visit::Continue;
    };
    let [left, right] = links.children(id);
    for step in steps {
        let flow = match step {
            Step::Left => walk(links, left, steps, idx, visit),
            Step::Right => walk(links, right, steps, idx, visit),
            Step::Body => {
                let flow = visit(id, links.item(id), *idx);
                *idx += 1;
                flow
            }
        };
        if flow != Visit::Continue {
            return flow;
        }
    }
    Visit::Continue
}

fn breadth_first<L, F>(links: &L, idx: &mut usize, visit: &mut F) -> Result<Visit, TraverseError>
where
    L: BinaryLinks,
    F: FnMut(L::Id, &L::Item, usize) -> Visit,
{
    let mut queue = WorkQueue::new();
    if let Some(root) = links.root() {
        queue.push_back(root).map_err(queue_failed)?;
    }
    while let Some(id) = queue.pop_front() {
        for child in links.children(id).into_iter().flatten() {
            queue.push_back(child).map_err(queue_failed)?;
        }
        let flow = visit(id, links.item(id), *idx);
        *idx += 1;
        if flow != Visit::Continue {
            return Ok(flow);
        }
    }
    Ok(Visit::Continue)
}

fn queue_failed(err: std::collections::TryReserveError) -> TraverseError {
    #[cfg(feature = "tracing")]
    tracing::trace!(error = %err, "breadth-first queue could not grow");
    TraverseError::Alloc(err)
}
