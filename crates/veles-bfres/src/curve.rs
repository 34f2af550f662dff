//! Animation curves and playback flags.

use crate::context::{ReadContext, WriteContext};
use crate::Result;

/// 16-bit playback flag word shared by fog and texture pattern animations.
///
/// Bit 0 marks baked curve data, bit 2 marks a looping animation. The
/// remaining bits are preserved verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayFlags(u16);

impl PlayFlags {
    /// The stored curve data has been baked.
    pub const BAKED_CURVE: u16 = 1 << 0;

    /// The animation repeats from the start after the last frame.
    pub const LOOPING: u16 = 1 << 2;

    /// Construct from a raw flag word.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// The raw flag word.
    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_baked(self) -> bool {
        self.0 & Self::BAKED_CURVE != 0
    }

    pub fn set_baked(&mut self, baked: bool) {
        if baked {
            self.0 |= Self::BAKED_CURVE;
        } else {
            self.0 &= !Self::BAKED_CURVE;
        }
    }

    pub const fn is_looping(self) -> bool {
        self.0 & Self::LOOPING != 0
    }

    pub fn set_looping(&mut self, looping: bool) {
        if looping {
            self.0 |= Self::LOOPING;
        } else {
            self.0 &= !Self::LOOPING;
        }
    }
}

/// A keyframe curve animating a single property.
///
/// `frames` and `keys` are parallel arrays; their shared length is the key
/// count on the wire. Curve math (interpolation, quantization) is not
/// interpreted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimCurve {
    pub flags: u16,
    pub start_frame: f32,
    pub end_frame: f32,
    pub scale: f32,
    pub offset: f32,
    pub frames: Vec<f32>,
    pub keys: Vec<f32>,
}

impl AnimCurve {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let flags = ctx.read_u16()?;
        let key_count = ctx.read_u16()? as usize;
        let start_frame = ctx.read_f32()?;
        let end_frame = ctx.read_f32()?;
        let scale = ctx.read_f32()?;
        let offset = ctx.read_f32()?;
        let frames = ctx.load_list(key_count, |ctx| ctx.read_f32())?;
        let keys = ctx.load_list(key_count, |ctx| ctx.read_f32())?;
        Ok(Self {
            flags,
            start_frame,
            end_frame,
            scale,
            offset,
            frames,
            keys,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_u16(self.flags)?;
        ctx.write_u16(self.frames.len() as u16)?;
        ctx.write_f32(self.start_frame)?;
        ctx.write_f32(self.end_frame)?;
        ctx.write_f32(self.scale)?;
        ctx.write_f32(self.offset)?;
        ctx.save_list(&self.frames, |ctx, frame| ctx.write_f32(*frame))?;
        ctx.save_list(&self.keys, |ctx, key| ctx.write_f32(*key))?;
        Ok(())
    }
}
