//! Container version thresholds.
//!
//! Subfile layouts changed across container revisions. Every gate in this
//! crate compares with `>=` against one of these constants; the version is
//! carried by the I/O context and fixed for a whole decode or encode
//! session.

/// First version storing scene animations and the signatured skeletal
/// animation header.
pub const V2_4_0: u32 = 0x0204_0000;

/// First version storing the model user pointer field.
pub const V3_3_0: u32 = 0x0303_0000;

/// First version with 32-bit frame and curve counts in skeletal animations
/// and dictionary-based texture references in pattern animations.
pub const V3_4_0: u32 = 0x0304_0000;
