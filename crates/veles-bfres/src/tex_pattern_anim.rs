//! Texture pattern animation subfiles.
//!
//! FTXP subfiles swap the textures referenced by a model's materials over
//! time. The set of participating textures is stored as a name-keyed
//! dictionary of texture references from [`V3_4_0`] on and as a flat list
//! of texture names before that; encode picks the representation the
//! decoder would select for the context's version.

use crate::context::{share, ReadContext, Shared, WriteContext};
use crate::curve::{AnimCurve, PlayFlags};
use crate::dict::NameDict;
use crate::model::Model;
use crate::texture::TextureRef;
use crate::user_data::UserData;
use crate::version::V3_4_0;
use crate::Result;

/// One sampler's pattern track inside a material group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternAnimInfo {
    pub name: String,
    pub curve_index: i8,
    pub sub_bind_index: i8,
}

impl PatternAnimInfo {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let name = ctx.load_string()?;
        let curve_index = ctx.read_i8()?;
        let sub_bind_index = ctx.read_i8()?;
        ctx.skip(2);
        Ok(Self {
            name,
            curve_index,
            sub_bind_index,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.name)?;
        ctx.write_i8(self.curve_index)?;
        ctx.write_i8(self.sub_bind_index)?;
        ctx.write_u16(0)?;
        Ok(())
    }
}

/// All pattern tracks targeting one material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TexPatternMatAnim {
    pub name: String,
    pub pattern_anim_infos: Vec<PatternAnimInfo>,
    pub curves: Vec<AnimCurve>,
    /// Base pattern index per info entry.
    pub base_indices: Vec<u16>,
}

impl TexPatternMatAnim {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let num_info = ctx.read_u16()? as usize;
        let num_curve = ctx.read_u16()? as usize;
        let name = ctx.load_string()?;
        let pattern_anim_infos = ctx.load_list(num_info, PatternAnimInfo::read)?;
        let curves = ctx.load_list(num_curve, AnimCurve::read)?;
        let base_indices = ctx
            .load_custom(|ctx| ctx.read_u16s(num_info))?
            .unwrap_or_default();
        Ok(Self {
            name,
            pattern_anim_infos,
            curves,
            base_indices,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_u16(self.pattern_anim_infos.len() as u16)?;
        ctx.write_u16(self.curves.len() as u16)?;
        ctx.save_string(&self.name)?;
        ctx.save_list(&self.pattern_anim_infos, |ctx, info: &PatternAnimInfo| {
            info.write(ctx)
        })?;
        ctx.save_list(&self.curves, |ctx, curve: &AnimCurve| curve.write(ctx))?;
        if self.base_indices.is_empty() {
            ctx.reserve_offset()?;
        } else {
            let indices = self.base_indices.clone();
            ctx.save_custom(move |ctx| ctx.write_u16s(&indices))?;
        }
        Ok(())
    }
}

/// An FTXP subfile animating material texture patterns of a [`Model`].
#[derive(Debug, Clone, PartialEq)]
pub struct TexPatternAnim {
    pub name: String,
    pub path: String,
    pub flags: PlayFlags,
    pub frame_count: i32,
    pub baked_size: u32,
    /// The model whose materials this animation drives. Shared: several
    /// animations may bind the same model instance.
    pub bind_model: Shared<Model>,
    /// Per-group indices into the bound model's material dictionary;
    /// [`BIND_NONE`](Self::BIND_NONE) marks an unbound group. Always as
    /// long as `mat_anims`.
    pub bind_indices: Vec<u16>,
    pub mat_anims: Vec<TexPatternMatAnim>,
    /// Participating textures, [`V3_4_0`] representation.
    pub texture_refs: NameDict<TextureRef>,
    /// Participating textures, pre-[`V3_4_0`] representation.
    pub texture_names: Vec<String>,
    pub user_data: NameDict<UserData>,
}

impl Default for TexPatternAnim {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            flags: PlayFlags::default(),
            frame_count: 0,
            baked_size: 0,
            bind_model: share(Model::default()),
            bind_indices: Vec::new(),
            mat_anims: Vec::new(),
            texture_refs: NameDict::new(),
            texture_names: Vec::new(),
            user_data: NameDict::new(),
        }
    }
}

impl TexPatternAnim {
    pub const SIGNATURE: &'static [u8; 4] = b"FTXP";

    /// Bind index sentinel: the group drives no material.
    pub const BIND_NONE: u16 = u16::MAX;

    /// Total pattern track count across all material groups.
    pub fn pattern_anim_count(&self) -> usize {
        self.mat_anims
            .iter()
            .map(|anim| anim.pattern_anim_infos.len())
            .sum()
    }

    /// Total curve count across all material groups.
    pub fn curve_count(&self) -> usize {
        self.mat_anims.iter().map(|anim| anim.curves.len()).sum()
    }

    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        ctx.check_signature(Self::SIGNATURE)?;
        let mut anim = Self::default();
        anim.name = ctx.load_string()?;
        anim.path = ctx.load_string()?;
        anim.flags = PlayFlags::from_bits(ctx.read_u16()?);
        let _num_user_data = ctx.read_u16()?;
        anim.frame_count = ctx.read_i32()?;
        let num_texture_ref = ctx.read_u16()? as usize;
        let num_mat_anim = ctx.read_u16()? as usize;
        let _num_pattern_anim = ctx.read_i32()?;
        let _num_curve = ctx.read_i32()?;
        anim.baked_size = ctx.read_u32()?;
        anim.bind_model = ctx.load_reference(Model::read)?;
        anim.bind_indices = ctx
            .load_custom(|ctx| ctx.read_u16s(num_mat_anim))?
            .unwrap_or_default();
        anim.mat_anims = ctx.load_list(num_mat_anim, TexPatternMatAnim::read)?;
        if ctx.version() >= V3_4_0 {
            anim.texture_refs = ctx.load_dict(TextureRef::read)?;
        } else {
            anim.texture_names = ctx.load_strings(num_texture_ref)?;
        }
        anim.user_data = ctx.load_dict(UserData::read)?;
        Ok(anim)
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_signature(Self::SIGNATURE)?;
        ctx.save_string(&self.name)?;
        ctx.save_string(&self.path)?;
        ctx.write_u16(self.flags.bits())?;
        ctx.write_u16(self.user_data.len() as u16)?;
        ctx.write_i32(self.frame_count)?;
        let num_texture_ref = if ctx.version() >= V3_4_0 {
            self.texture_refs.len()
        } else {
            self.texture_names.len()
        };
        ctx.write_u16(num_texture_ref as u16)?;
        ctx.write_u16(self.mat_anims.len() as u16)?;
        ctx.write_i32(self.pattern_anim_count() as i32)?;
        ctx.write_i32(self.curve_count() as i32)?;
        ctx.write_u32(self.baked_size)?;
        ctx.save_reference(&self.bind_model, |ctx, model| model.write(ctx))?;
        if self.bind_indices.is_empty() {
            ctx.reserve_offset()?;
        } else {
            let indices = self.bind_indices.clone();
            ctx.save_custom(move |ctx| ctx.write_u16s(&indices))?;
        }
        ctx.save_list(&self.mat_anims, |ctx, anim: &TexPatternMatAnim| {
            anim.write(ctx)
        })?;
        if ctx.version() >= V3_4_0 {
            ctx.save_dict(&self.texture_refs, |ctx, texture_ref: &TextureRef| {
                texture_ref.write(ctx)
            })?;
        } else {
            ctx.save_strings(&self.texture_names)?;
        }
        ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Material;
    use crate::texture::Texture;
    use crate::version::V3_3_0;
    use std::rc::Rc;

    fn sample_model() -> Model {
        let mut model = Model {
            name: "stage".into(),
            ..Model::default()
        };
        model
            .materials
            .insert(
                "water",
                Material {
                    name: "water".into(),
                    ..Material::default()
                },
            )
            .unwrap();
        model
    }

    fn sample_anim(model: Shared<Model>) -> TexPatternAnim {
        let mut anim = TexPatternAnim {
            name: "water_flow".into(),
            path: "anims/water_flow.ftxp".into(),
            frame_count: 8,
            bind_model: model,
            ..TexPatternAnim::default()
        };
        anim.flags.set_looping(true);

        anim.mat_anims.push(TexPatternMatAnim {
            name: "water".into(),
            pattern_anim_infos: vec![PatternAnimInfo {
                name: "_a0".into(),
                curve_index: 0,
                sub_bind_index: -1,
            }],
            curves: vec![AnimCurve {
                frames: vec![0.0, 4.0],
                keys: vec![0.0, 1.0],
                end_frame: 8.0,
                ..AnimCurve::default()
            }],
            base_indices: vec![0],
        });
        anim.bind_indices = vec![0];

        anim.texture_refs
            .insert(
                "water_0",
                TextureRef {
                    name: "water_0".into(),
                    texture: share(Texture {
                        name: "water_0".into(),
                        ..Texture::default()
                    }),
                },
            )
            .unwrap();
        anim
    }

    fn roundtrip(anim: &TexPatternAnim, version: u32) -> TexPatternAnim {
        let mut ctx = WriteContext::new(version);
        anim.write(&mut ctx).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, version);
        TexPatternAnim::read(&mut ctx).unwrap()
    }

    #[test]
    fn test_roundtrip_modern_uses_texture_refs() {
        let anim = sample_anim(share(sample_model()));
        let decoded = roundtrip(&anim, V3_4_0);

        assert_eq!(decoded.texture_refs.len(), 1);
        assert!(decoded.texture_names.is_empty());
        assert_eq!(decoded, anim);
    }

    #[test]
    fn test_roundtrip_legacy_uses_texture_names() {
        // The pre-V3_4_0 layout stores a flat name list instead of the
        // texture reference dictionary.
        let mut anim = sample_anim(share(sample_model()));
        anim.texture_refs = NameDict::new();
        anim.texture_names = vec!["water_0".into()];
        let decoded = roundtrip(&anim, V3_3_0);

        assert!(decoded.texture_refs.is_empty());
        assert_eq!(decoded.texture_names, vec!["water_0".to_string()]);
        assert_eq!(decoded, anim);
    }

    #[test]
    fn test_shared_model_identity_after_roundtrip() {
        let model = share(sample_model());
        let first = sample_anim(model.clone());
        let mut second = sample_anim(model);
        second.name = "lava_flow".into();

        let mut ctx = WriteContext::new(V3_4_0);
        first.write(&mut ctx).unwrap();
        second.write(&mut ctx).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, V3_4_0);
        let first = TexPatternAnim::read(&mut ctx).unwrap();
        let second = TexPatternAnim::read(&mut ctx).unwrap();

        assert!(Rc::ptr_eq(&first.bind_model, &second.bind_model));
        assert_eq!(first.bind_model.borrow().name, "stage");
    }

    #[test]
    fn test_counts_are_derived() {
        let mut anim = sample_anim(share(sample_model()));
        anim.mat_anims.push(TexPatternMatAnim {
            name: "extra".into(),
            curves: vec![AnimCurve::default(), AnimCurve::default()],
            ..TexPatternMatAnim::default()
        });
        anim.bind_indices.push(TexPatternAnim::BIND_NONE);

        assert_eq!(anim.pattern_anim_count(), 1);
        assert_eq!(anim.curve_count(), 3);

        let decoded = roundtrip(&anim, V3_4_0);
        assert_eq!(decoded.mat_anims.len(), 2);
        assert_eq!(decoded.bind_indices, vec![0, TexPatternAnim::BIND_NONE]);
    }

    #[test]
    fn test_signature_rejected() {
        let bytes = [0u8; 64];
        let mut ctx = ReadContext::new(&bytes, V3_4_0);
        assert!(matches!(
            TexPatternAnim::read(&mut ctx),
            Err(crate::Error::Signature { .. })
        ));
    }
}
