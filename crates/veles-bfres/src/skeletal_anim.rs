//! Skeletal animation subfiles.
//!
//! FSKA subfiles store per-bone keyframe tracks bound to a skeleton. The
//! header packs three orthogonal flag groups into one 32-bit word and comes
//! in three wire variants selected by the container version; encode emits
//! whichever variant the context's version selects, so every supported
//! variant round-trips.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::context::{share, ReadContext, Shared, WriteContext};
use crate::curve::AnimCurve;
use crate::dict::NameDict;
use crate::model::Skeleton;
use crate::user_data::UserData;
use crate::version::{V2_4_0, V3_4_0};
use crate::Result;

/// Settings group: looping and baked playback bits.
pub const FLAGS_MASK_SETTINGS: u32 = 0x0000_000F;
/// Scale mode group.
pub const FLAGS_MASK_SCALE: u32 = 0x0000_0300;
/// Rotate mode group.
pub const FLAGS_MASK_ROTATE: u32 = 0x0000_7000;

/// The data format scaling values are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScaleMode {
    None,
    Standard,
    Maya,
    Softimage,
}

/// The data format rotation values are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RotateMode {
    Quaternion,
    EulerXyz,
}

/// Rest values a bone track starts from.
#[derive(Debug, Clone, Copy, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct BoneAnimData {
    pub scale: [f32; 3],
    pub rotate: [f32; 4],
    pub translate: [f32; 3],
}

impl Default for BoneAnimData {
    fn default() -> Self {
        Self {
            scale: [1.0, 1.0, 1.0],
            rotate: [0.0, 0.0, 0.0, 1.0],
            translate: [0.0, 0.0, 0.0],
        }
    }
}

/// The animation track of a single bone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneAnim {
    pub flags: u32,
    pub name: String,
    pub begin_curve: u8,
    pub begin_base_translate: u8,
    pub curves: Vec<AnimCurve>,
    pub base_data: BoneAnimData,
}

impl BoneAnim {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let flags = ctx.read_u32()?;
        let name = ctx.load_string()?;
        let num_curve = ctx.read_u8()? as usize;
        let begin_curve = ctx.read_u8()?;
        let begin_base_translate = ctx.read_u8()?;
        ctx.skip(1);
        let curves = ctx.load_list(num_curve, AnimCurve::read)?;
        let base_data = ctx.load_custom(|ctx| ctx.read_struct())?.unwrap_or_default();
        Ok(Self {
            flags,
            name,
            begin_curve,
            begin_base_translate,
            curves,
            base_data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_u32(self.flags)?;
        ctx.save_string(&self.name)?;
        ctx.write_u8(self.curves.len() as u8)?;
        ctx.write_u8(self.begin_curve)?;
        ctx.write_u8(self.begin_base_translate)?;
        ctx.write_u8(0)?;
        ctx.save_list(&self.curves, |ctx, curve: &AnimCurve| curve.write(ctx))?;
        let base_data = self.base_data;
        ctx.save_custom(move |ctx| ctx.write_struct(&base_data))?;
        Ok(())
    }
}

/// An FSKA subfile animating the bones of a [`Skeleton`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletalAnim {
    pub name: String,
    pub path: String,
    /// Packed flag word holding the settings, scale mode and rotate mode
    /// groups. Use the accessors to manipulate one group at a time.
    pub flags: u32,
    pub frame_count: i32,
    pub baked_size: u32,
    pub bone_anims: Vec<BoneAnim>,
    pub bind_skeleton: Shared<Skeleton>,
    /// Per-track indices into the bound skeleton's bone dictionary;
    /// [`BIND_NONE`](Self::BIND_NONE) marks an unbound track. Always as
    /// long as `bone_anims`.
    pub bind_indices: Vec<u16>,
    pub user_data: NameDict<UserData>,
}

impl Default for SkeletalAnim {
    fn default() -> Self {
        let mut anim = Self {
            name: String::new(),
            path: String::new(),
            flags: 0,
            frame_count: 0,
            baked_size: 0,
            bone_anims: Vec::new(),
            bind_skeleton: share(Skeleton::default()),
            bind_indices: Vec::new(),
            user_data: NameDict::new(),
        };
        anim.set_scale_mode(ScaleMode::Maya);
        anim.set_rotate_mode(RotateMode::EulerXyz);
        anim
    }
}

impl SkeletalAnim {
    pub const SIGNATURE: &'static [u8; 4] = b"FSKA";

    /// Bind index sentinel: the track drives no bone.
    pub const BIND_NONE: u16 = u16::MAX;

    /// Settings bit: curve data has been baked.
    pub const SETTINGS_BAKED_CURVE: u32 = 1 << 0;
    /// Settings bit: the animation loops.
    pub const SETTINGS_LOOPING: u32 = 1 << 2;

    /// The settings group of the packed flag word.
    pub fn flags_settings(&self) -> u32 {
        self.flags & FLAGS_MASK_SETTINGS
    }

    /// Replace the settings group, leaving the other groups untouched.
    pub fn set_flags_settings(&mut self, settings: u32) {
        self.flags = self.flags & !FLAGS_MASK_SETTINGS | (settings & FLAGS_MASK_SETTINGS);
    }

    pub fn scale_mode(&self) -> ScaleMode {
        match (self.flags & FLAGS_MASK_SCALE) >> 8 {
            0 => ScaleMode::None,
            1 => ScaleMode::Standard,
            2 => ScaleMode::Maya,
            _ => ScaleMode::Softimage,
        }
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        let bits = match mode {
            ScaleMode::None => 0,
            ScaleMode::Standard => 1 << 8,
            ScaleMode::Maya => 2 << 8,
            ScaleMode::Softimage => 3 << 8,
        };
        self.flags = self.flags & !FLAGS_MASK_SCALE | bits;
    }

    pub fn rotate_mode(&self) -> RotateMode {
        if self.flags & (1 << 12) != 0 {
            RotateMode::EulerXyz
        } else {
            RotateMode::Quaternion
        }
    }

    pub fn set_rotate_mode(&mut self, mode: RotateMode) {
        let bits = match mode {
            RotateMode::Quaternion => 0,
            RotateMode::EulerXyz => 1 << 12,
        };
        self.flags = self.flags & !FLAGS_MASK_ROTATE | bits;
    }

    pub fn is_looping(&self) -> bool {
        self.flags_settings() & Self::SETTINGS_LOOPING != 0
    }

    pub fn set_looping(&mut self, looping: bool) {
        if looping {
            self.set_flags_settings(self.flags_settings() | Self::SETTINGS_LOOPING);
        } else {
            self.set_flags_settings(self.flags_settings() & !Self::SETTINGS_LOOPING);
        }
    }

    pub fn is_baked(&self) -> bool {
        self.flags_settings() & Self::SETTINGS_BAKED_CURVE != 0
    }

    pub fn set_baked(&mut self, baked: bool) {
        if baked {
            self.set_flags_settings(self.flags_settings() | Self::SETTINGS_BAKED_CURVE);
        } else {
            self.set_flags_settings(self.flags_settings() & !Self::SETTINGS_BAKED_CURVE);
        }
    }

    /// Total curve count across all bone tracks.
    pub fn curve_count(&self) -> usize {
        self.bone_anims.iter().map(|anim| anim.curves.len()).sum()
    }

    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let mut anim = Self::default();
        if ctx.version() >= V2_4_0 {
            ctx.check_signature(Self::SIGNATURE)?;
            anim.name = ctx.load_string()?;
            anim.path = ctx.load_string()?;
            anim.flags = ctx.read_u32()?;
            let num_bone_anim;
            if ctx.version() >= V3_4_0 {
                anim.frame_count = ctx.read_i32()?;
                num_bone_anim = ctx.read_u16()? as usize;
                let _num_user_data = ctx.read_u16()?;
                let _num_curve = ctx.read_i32()?;
                anim.baked_size = ctx.read_u32()?;
            } else {
                anim.frame_count = ctx.read_u16()? as i32;
                num_bone_anim = ctx.read_u16()? as usize;
                let _num_user_data = ctx.read_u16()?;
                let _num_curve = ctx.read_u16()?;
                anim.baked_size = ctx.read_u32()?;
                ctx.skip(4);
            }
            anim.bone_anims = ctx.load_list(num_bone_anim, BoneAnim::read)?;
            anim.bind_skeleton = ctx.load_reference(Skeleton::read)?;
            anim.bind_indices = ctx
                .load_custom(|ctx| ctx.read_u16s(num_bone_anim))?
                .unwrap_or_default();
            anim.user_data = ctx.load_dict(UserData::read)?;
        } else {
            anim.flags = ctx.read_u32()?;
            anim.frame_count = ctx.read_u16()? as i32;
            let num_bone_anim = ctx.read_u16()? as usize;
            let _num_user_data = ctx.read_u16()?;
            let _num_curve = ctx.read_u16()?;
            anim.name = ctx.load_string()?;
            anim.path = ctx.load_string()?;
            anim.bone_anims = ctx.load_list(num_bone_anim, BoneAnim::read)?;
            anim.bind_skeleton = ctx.load_reference(Skeleton::read)?;
            anim.bind_indices = ctx
                .load_custom(|ctx| ctx.read_u16s(num_bone_anim))?
                .unwrap_or_default();
            // No user data dictionary in this layout.
        }
        Ok(anim)
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        if ctx.version() >= V2_4_0 {
            ctx.write_signature(Self::SIGNATURE)?;
            ctx.save_string(&self.name)?;
            ctx.save_string(&self.path)?;
            ctx.write_u32(self.flags)?;
            if ctx.version() >= V3_4_0 {
                ctx.write_i32(self.frame_count)?;
                ctx.write_u16(self.bone_anims.len() as u16)?;
                ctx.write_u16(self.user_data.len() as u16)?;
                ctx.write_i32(self.curve_count() as i32)?;
                ctx.write_u32(self.baked_size)?;
            } else {
                ctx.write_u16(self.frame_count as u16)?;
                ctx.write_u16(self.bone_anims.len() as u16)?;
                ctx.write_u16(self.user_data.len() as u16)?;
                ctx.write_u16(self.curve_count() as u16)?;
                ctx.write_u32(self.baked_size)?;
                ctx.write_bytes(&[0; 4])?;
            }
            self.write_tracks(ctx)?;
            ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        } else {
            ctx.write_u32(self.flags)?;
            ctx.write_u16(self.frame_count as u16)?;
            ctx.write_u16(self.bone_anims.len() as u16)?;
            ctx.write_u16(self.user_data.len() as u16)?;
            ctx.write_u16(self.curve_count() as u16)?;
            ctx.save_string(&self.name)?;
            ctx.save_string(&self.path)?;
            self.write_tracks(ctx)?;
        }
        Ok(())
    }

    fn write_tracks(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_list(&self.bone_anims, |ctx, anim: &BoneAnim| anim.write(ctx))?;
        ctx.save_reference(&self.bind_skeleton, |ctx, skeleton| skeleton.write(ctx))?;
        if self.bind_indices.is_empty() {
            ctx.reserve_offset()?;
        } else {
            let indices = self.bind_indices.clone();
            ctx.save_custom(move |ctx| ctx.write_u16s(&indices))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::share;
    use crate::model::Bone;
    use crate::user_data::UserDataValue;
    use crate::version::V3_3_0;
    use std::rc::Rc;

    fn sample_anim() -> SkeletalAnim {
        let mut skeleton = Skeleton::default();
        skeleton
            .bones
            .insert(
                "root",
                Bone {
                    name: "root".into(),
                    ..Bone::default()
                },
            )
            .unwrap();

        let mut anim = SkeletalAnim {
            name: "walk".into(),
            path: "anims/walk.fska".into(),
            frame_count: 60,
            baked_size: 0,
            bind_skeleton: share(skeleton),
            ..SkeletalAnim::default()
        };
        anim.set_looping(true);

        anim.bone_anims.push(BoneAnim {
            flags: 0x11,
            name: "root".into(),
            begin_curve: 0,
            begin_base_translate: 3,
            curves: vec![AnimCurve {
                flags: 1,
                start_frame: 0.0,
                end_frame: 60.0,
                scale: 1.0,
                offset: 0.0,
                frames: vec![0.0, 30.0, 60.0],
                keys: vec![0.0, 1.0, 0.0],
            }],
            base_data: BoneAnimData::default(),
        });
        anim.bone_anims.push(BoneAnim {
            name: "spine".into(),
            ..BoneAnim::default()
        });
        anim.bind_indices = vec![0, SkeletalAnim::BIND_NONE];
        anim
    }

    fn roundtrip(anim: &SkeletalAnim, version: u32) -> SkeletalAnim {
        let mut ctx = WriteContext::new(version);
        anim.write(&mut ctx).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, version);
        SkeletalAnim::read(&mut ctx).unwrap()
    }

    #[test]
    fn test_flag_groups_stay_isolated() {
        let mut anim = SkeletalAnim::default();
        anim.set_scale_mode(ScaleMode::Softimage);
        anim.set_rotate_mode(RotateMode::Quaternion);
        let scale_before = anim.flags & FLAGS_MASK_SCALE;
        let rotate_before = anim.flags & FLAGS_MASK_ROTATE;

        anim.set_looping(true);
        anim.set_baked(true);
        anim.set_looping(false);

        assert_eq!(anim.flags_settings(), SkeletalAnim::SETTINGS_BAKED_CURVE);
        assert_eq!(anim.flags & FLAGS_MASK_SCALE, scale_before);
        assert_eq!(anim.flags & FLAGS_MASK_ROTATE, rotate_before);
        assert_eq!(anim.scale_mode(), ScaleMode::Softimage);
        assert_eq!(anim.rotate_mode(), RotateMode::Quaternion);
    }

    #[test]
    fn test_roundtrip_all_variants() {
        let modern = sample_anim();
        assert_eq!(roundtrip(&modern, V3_4_0), modern);
        assert_eq!(roundtrip(&modern, V3_3_0), modern);

        // The oldest layout stores neither user data nor baked size.
        let legacy = sample_anim();
        assert_eq!(roundtrip(&legacy, 0x0203_0000), legacy);
    }

    #[test]
    fn test_middle_variant_has_padding() {
        let anim = sample_anim();

        let mut ctx = WriteContext::new(V3_3_0);
        anim.write(&mut ctx).unwrap();
        let middle = ctx.finish().unwrap();

        let mut ctx = WriteContext::new(V3_4_0);
        anim.write(&mut ctx).unwrap();
        let modern = ctx.finish().unwrap();

        // Same header size: the modern variant widens two counts by two
        // bytes each, the middle variant pads by four instead.
        assert_eq!(middle.len(), modern.len());
        // Padding bytes follow the baked size field.
        let pad_start = 4 + 4 + 4 + 4 + 2 + 2 + 2 + 2 + 4;
        assert_eq!(&middle[pad_start..pad_start + 4], &[0; 4]);
    }

    #[test]
    fn test_bind_index_sentinel_roundtrips() {
        let anim = sample_anim();
        let decoded = roundtrip(&anim, V3_4_0);
        assert_eq!(decoded.bind_indices, vec![0, SkeletalAnim::BIND_NONE]);
    }

    #[test]
    fn test_curve_count_is_derived() {
        let mut anim = sample_anim();
        anim.bone_anims[1].curves.push(AnimCurve::default());
        anim.bone_anims[1].curves.push(AnimCurve::default());
        assert_eq!(anim.curve_count(), 3);

        let mut ctx = WriteContext::new(V3_4_0);
        anim.write(&mut ctx).unwrap();
        let bytes = ctx.finish().unwrap();

        // The 32-bit curve sum sits after signature, two string slots,
        // flags, frame count and the two 16-bit counts.
        let at = 4 + 4 + 4 + 4 + 4 + 2 + 2;
        let stored = i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        assert_eq!(stored, 3);
    }

    #[test]
    fn test_user_data_roundtrip_modern_only() {
        let mut anim = sample_anim();
        anim.user_data
            .insert(
                "author",
                UserData {
                    name: "author".into(),
                    value: UserDataValue::String(vec!["tools".into()]),
                },
            )
            .unwrap();

        assert_eq!(roundtrip(&anim, V3_4_0), anim);

        // The legacy layout has no user data dictionary at all; decoding
        // an anim encoded at a legacy version drops the entries.
        let decoded = roundtrip(&anim, 0x0203_0000);
        assert!(decoded.user_data.is_empty());
    }

    #[test]
    fn test_signature_rejected() {
        let anim = sample_anim();
        let mut ctx = WriteContext::new(V3_4_0);
        anim.write(&mut ctx).unwrap();
        let mut bytes = ctx.finish().unwrap();
        bytes[0..4].copy_from_slice(b"FMDL");

        let mut ctx = ReadContext::new(&bytes, V3_4_0);
        assert!(matches!(
            SkeletalAnim::read(&mut ctx),
            Err(crate::Error::Signature { .. })
        ));
    }

    #[test]
    fn test_shared_skeleton_identity() {
        let skeleton = share(Skeleton::default());
        let mut first = sample_anim();
        first.bind_skeleton = skeleton.clone();
        let mut second = sample_anim();
        second.name = "run".into();
        second.bind_skeleton = skeleton;

        let mut ctx = WriteContext::new(V3_4_0);
        first.write(&mut ctx).unwrap();
        second.write(&mut ctx).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, V3_4_0);
        let first = SkeletalAnim::read(&mut ctx).unwrap();
        let second = SkeletalAnim::read(&mut ctx).unwrap();
        assert!(Rc::ptr_eq(&first.bind_skeleton, &second.bind_skeleton));
    }
}
