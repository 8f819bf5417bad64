//! On-the-fly quad-tree refinement traversal

use super::TileId;

/// Top-down refinement from `root`: where `refine` holds, the node is an
/// inner node — `expand` is invoked (recording it as a side effect and
/// returning its four children) and each child is visited in turn.
/// Nodes where `refine` fails are leaves and are returned.
///
/// Output order is deterministic given the child order of `expand`.
pub fn traverse<R, E>(root: TileId, refine: R, mut expand: E) -> Vec<TileId>
where
    R: Fn(TileId) -> bool,
    E: FnMut(TileId) -> [TileId; 4],
{
    let mut leaves = Vec::new();
    visit(root, &refine, &mut expand, &mut leaves);
    leaves
}

fn visit<R, E>(node: TileId, refine: &R, expand: &mut E, leaves: &mut Vec<TileId>)
where
    R: Fn(TileId) -> bool,
    E: FnMut(TileId) -> [TileId; 4],
{
    if refine(node) {
        for child in expand(node) {
            visit(child, refine, expand, leaves);
        }
    } else {
        leaves.push(node);
    }
}
