/// A rectangular color image the core can sample from.
///
/// Implementations report their pixel dimensions and hand out individual
/// RGBA pixels. `rgba` returns `None` when the backing data does not cover
/// the requested coordinate, so malformed metadata never turns into an
/// out-of-bounds read.
pub trait Frame: Sync {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn rgba(&self, x: usize, y: usize) -> Option<[u8; 4]>;
}
