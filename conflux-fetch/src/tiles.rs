//! Recursive bisection of a query region into bounded tiles.

use conflux_core::BoundingBox;

/// Tiles are never split below this side length, whatever the limit.
pub const MIN_TILE_SIDE_M: f64 = 1.0;

/// Bisect `region` until no tile's longer side exceeds `max_side_m`.
///
/// Each split halves the longer side. The order is deterministic: both
/// halves of a split appear in place of their parent, first half first.
/// A tile whose halves would fall below [`MIN_TILE_SIDE_M`] is kept whole,
/// so a zero or negative limit still terminates.
///
/// # Examples
///
/// ```
/// use conflux_core::BoundingBox;
/// use conflux_fetch::plan_tiles;
///
/// # fn main() -> Result<(), conflux_core::BoundingBoxError> {
/// let region = BoundingBox::new(0.0, 0.0, 0.02, 0.01)?;
/// let tiles = plan_tiles(&region, 1_200.0);
/// assert_eq!(tiles.len(), 2);
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn plan_tiles(region: &BoundingBox, max_side_m: f64) -> Vec<BoundingBox> {
    let mut tiles = Vec::new();
    bisect(*region, max_side_m, &mut tiles);
    tiles
}

fn bisect(region: BoundingBox, max_side_m: f64, tiles: &mut Vec<BoundingBox>) {
    let longest = region.longest_side_m();
    if longest <= max_side_m || longest / 2.0 < MIN_TILE_SIDE_M {
        tiles.push(region);
        return;
    }
    let (first, second) = region.split();
    bisect(first, max_side_m, tiles);
    bisect(second, max_side_m, tiles);
}
