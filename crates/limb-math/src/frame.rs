//! Coordinate frame identifiers.

/// A coordinate frame tag.
///
/// Frames are dense small integers allocated by the mechanism that owns
/// them; the root body's frame (the world frame) is id 0. Spatial
/// quantities carry these tags and compositions check them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameId(u32);

impl FrameId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Check two frame tags for equality.
///
/// Active under debug assertions (including test builds); release builds
/// pay nothing for the hot-path checks. Entry points that accept frames
/// from the caller validate with `Result` regardless of build profile.
#[macro_export]
macro_rules! frame_check {
    ($a:expr, $b:expr) => {
        debug_assert!($a == $b, "frame mismatch: {:?} vs {:?}", $a, $b)
    };
}
