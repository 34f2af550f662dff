//! Scene animation subfiles: camera, light and fog animations.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::context::{ReadContext, WriteContext};
use crate::curve::{AnimCurve, PlayFlags};
use crate::dict::NameDict;
use crate::user_data::UserData;
use crate::version::V2_4_0;
use crate::Result;

/// Initial fog parameters the curves animate from.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct FogAnimData {
    pub distance_attn: [f32; 2],
    pub color: [f32; 3],
}

/// An FFOG section animating distance fog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FogAnim {
    pub flags: PlayFlags,
    pub frame_count: i32,
    pub distance_attn_func_index: i8,
    pub baked_size: u32,
    pub name: String,
    pub distance_attn_func_name: String,
    pub curves: Vec<AnimCurve>,
    pub base_data: FogAnimData,
    pub user_data: NameDict<UserData>,
}

impl FogAnim {
    pub const SIGNATURE: &'static [u8; 4] = b"FFOG";

    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        ctx.check_signature(Self::SIGNATURE)?;
        let flags = PlayFlags::from_bits(ctx.read_u16()?);
        let frame_count = ctx.read_i32()?;
        let num_curve = ctx.read_u8()? as usize;
        let distance_attn_func_index = ctx.read_i8()?;
        let _num_user_data = ctx.read_u16()?;
        let baked_size = ctx.read_u32()?;
        let name = ctx.load_string()?;
        let distance_attn_func_name = ctx.load_string()?;
        let curves = ctx.load_list(num_curve, AnimCurve::read)?;
        let base_data = ctx.load_custom(|ctx| ctx.read_struct())?.unwrap_or_default();
        let user_data = ctx.load_dict(UserData::read)?;
        Ok(Self {
            flags,
            frame_count,
            distance_attn_func_index,
            baked_size,
            name,
            distance_attn_func_name,
            curves,
            base_data,
            user_data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_signature(Self::SIGNATURE)?;
        ctx.write_u16(self.flags.bits())?;
        ctx.write_i32(self.frame_count)?;
        ctx.write_u8(self.curves.len() as u8)?;
        ctx.write_i8(self.distance_attn_func_index)?;
        ctx.write_u16(self.user_data.len() as u16)?;
        ctx.write_u32(self.baked_size)?;
        ctx.save_string(&self.name)?;
        ctx.save_string(&self.distance_attn_func_name)?;
        ctx.save_list(&self.curves, |ctx, curve: &AnimCurve| curve.write(ctx))?;
        let base_data = self.base_data;
        ctx.save_custom(move |ctx| ctx.write_struct(&base_data))?;
        ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        Ok(())
    }
}

/// Initial camera parameters the curves animate from.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct CameraAnimData {
    pub clip_near: f32,
    pub clip_far: f32,
    pub aspect_ratio: f32,
    pub field_of_view: f32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub twist: f32,
}

/// An FCAM section animating a scene camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraAnim {
    pub flags: PlayFlags,
    pub frame_count: i32,
    pub baked_size: u32,
    pub name: String,
    pub curves: Vec<AnimCurve>,
    pub base_data: CameraAnimData,
    pub user_data: NameDict<UserData>,
}

impl CameraAnim {
    pub const SIGNATURE: &'static [u8; 4] = b"FCAM";

    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        ctx.check_signature(Self::SIGNATURE)?;
        let flags = PlayFlags::from_bits(ctx.read_u16()?);
        let frame_count = ctx.read_i32()?;
        let num_curve = ctx.read_u8()? as usize;
        ctx.skip(1);
        let _num_user_data = ctx.read_u16()?;
        let baked_size = ctx.read_u32()?;
        let name = ctx.load_string()?;
        let curves = ctx.load_list(num_curve, AnimCurve::read)?;
        let base_data = ctx.load_custom(|ctx| ctx.read_struct())?.unwrap_or_default();
        let user_data = ctx.load_dict(UserData::read)?;
        Ok(Self {
            flags,
            frame_count,
            baked_size,
            name,
            curves,
            base_data,
            user_data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_signature(Self::SIGNATURE)?;
        ctx.write_u16(self.flags.bits())?;
        ctx.write_i32(self.frame_count)?;
        ctx.write_u8(self.curves.len() as u8)?;
        ctx.write_u8(0)?;
        ctx.write_u16(self.user_data.len() as u16)?;
        ctx.write_u32(self.baked_size)?;
        ctx.save_string(&self.name)?;
        ctx.save_list(&self.curves, |ctx, curve: &AnimCurve| curve.write(ctx))?;
        let base_data = self.base_data;
        ctx.save_custom(move |ctx| ctx.write_struct(&base_data))?;
        ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        Ok(())
    }
}

/// Initial light parameters the curves animate from.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct LightAnimData {
    pub enable: i32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub color0: [f32; 3],
    pub color1: [f32; 3],
}

/// An FLIT section animating a scene light.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightAnim {
    pub flags: PlayFlags,
    pub frame_count: i32,
    pub light_type_index: i8,
    pub baked_size: u32,
    pub name: String,
    pub light_type_name: String,
    pub curves: Vec<AnimCurve>,
    pub base_data: LightAnimData,
    pub user_data: NameDict<UserData>,
}

impl LightAnim {
    pub const SIGNATURE: &'static [u8; 4] = b"FLIT";

    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        ctx.check_signature(Self::SIGNATURE)?;
        let flags = PlayFlags::from_bits(ctx.read_u16()?);
        let frame_count = ctx.read_i32()?;
        let num_curve = ctx.read_u8()? as usize;
        let light_type_index = ctx.read_i8()?;
        let _num_user_data = ctx.read_u16()?;
        let baked_size = ctx.read_u32()?;
        let name = ctx.load_string()?;
        let light_type_name = ctx.load_string()?;
        let curves = ctx.load_list(num_curve, AnimCurve::read)?;
        let base_data = ctx.load_custom(|ctx| ctx.read_struct())?.unwrap_or_default();
        let user_data = ctx.load_dict(UserData::read)?;
        Ok(Self {
            flags,
            frame_count,
            light_type_index,
            baked_size,
            name,
            light_type_name,
            curves,
            base_data,
            user_data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_signature(Self::SIGNATURE)?;
        ctx.write_u16(self.flags.bits())?;
        ctx.write_i32(self.frame_count)?;
        ctx.write_u8(self.curves.len() as u8)?;
        ctx.write_i8(self.light_type_index)?;
        ctx.write_u16(self.user_data.len() as u16)?;
        ctx.write_u32(self.baked_size)?;
        ctx.save_string(&self.name)?;
        ctx.save_string(&self.light_type_name)?;
        ctx.save_list(&self.curves, |ctx, curve: &AnimCurve| curve.write(ctx))?;
        let base_data = self.base_data;
        ctx.save_custom(move |ctx| ctx.write_struct(&base_data))?;
        ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        Ok(())
    }
}

/// An FSCN subfile aggregating camera, light and fog animations.
///
/// Containers older than [`V2_4_0`] have no scene animation section, so
/// decoding below that version is a no-op yielding an empty entity. Encode
/// always emits the modern layout and deliberately does not gate on the
/// version; a below-gate reader treats the section as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneAnim {
    pub name: String,
    pub path: String,
    pub camera_anims: NameDict<CameraAnim>,
    pub light_anims: NameDict<LightAnim>,
    pub fog_anims: NameDict<FogAnim>,
    pub user_data: NameDict<UserData>,
}

impl SceneAnim {
    pub const SIGNATURE: &'static [u8; 4] = b"FSCN";

    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        if ctx.version() < V2_4_0 {
            return Ok(Self::default());
        }
        ctx.check_signature(Self::SIGNATURE)?;
        let name = ctx.load_string()?;
        let path = ctx.load_string()?;
        let _num_user_data = ctx.read_u16()?;
        let _num_camera_anim = ctx.read_u16()?;
        let _num_light_anim = ctx.read_u16()?;
        let _num_fog_anim = ctx.read_u16()?;
        let camera_anims = ctx.load_dict(CameraAnim::read)?;
        let light_anims = ctx.load_dict(LightAnim::read)?;
        let fog_anims = ctx.load_dict(FogAnim::read)?;
        let user_data = ctx.load_dict(UserData::read)?;
        Ok(Self {
            name,
            path,
            camera_anims,
            light_anims,
            fog_anims,
            user_data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_signature(Self::SIGNATURE)?;
        ctx.save_string(&self.name)?;
        ctx.save_string(&self.path)?;
        ctx.write_u16(self.user_data.len() as u16)?;
        ctx.write_u16(self.camera_anims.len() as u16)?;
        ctx.write_u16(self.light_anims.len() as u16)?;
        ctx.write_u16(self.fog_anims.len() as u16)?;
        ctx.save_dict(&self.camera_anims, |ctx, anim: &CameraAnim| anim.write(ctx))?;
        ctx.save_dict(&self.light_anims, |ctx, anim: &LightAnim| anim.write(ctx))?;
        ctx.save_dict(&self.fog_anims, |ctx, anim: &FogAnim| anim.write(ctx))?;
        ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        Ok(())
    }
}
