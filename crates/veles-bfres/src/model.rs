//! Model subfiles: skeletons, vertex buffers, shapes and materials.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::context::{ReadContext, WriteContext};
use crate::dict::NameDict;
use crate::shader_assign::ShaderAssign;
use crate::texture::TextureRef;
use crate::user_data::UserData;
use crate::version::V3_3_0;
use crate::Result;

/// Sentinel parent index marking a root bone.
pub const BONE_NO_PARENT: u16 = u16::MAX;

/// Rest pose transform of a bone.
#[derive(Debug, Clone, Copy, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct BoneTransform {
    pub scale: [f32; 3],
    pub rotation: [f32; 4],
    pub position: [f32; 3],
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            scale: [1.0, 1.0, 1.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            position: [0.0, 0.0, 0.0],
        }
    }
}

/// A single bone in a skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent_index: u16,
    pub transform: BoneTransform,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent_index: BONE_NO_PARENT,
            transform: BoneTransform::default(),
        }
    }
}

impl Bone {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let name = ctx.load_string()?;
        let parent_index = ctx.read_u16()?;
        ctx.skip(2);
        let transform = ctx.read_struct()?;
        Ok(Self {
            name,
            parent_index,
            transform,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.name)?;
        ctx.write_u16(self.parent_index)?;
        ctx.write_u16(0)?;
        ctx.write_struct(&self.transform)?;
        Ok(())
    }
}

/// The bone hierarchy deforming a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub flags: u32,
    pub bones: NameDict<Bone>,
}

impl Skeleton {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let flags = ctx.read_u32()?;
        let _num_bones = ctx.read_u16()?;
        ctx.skip(2);
        let bones = ctx.load_dict(Bone::read)?;
        Ok(Self { flags, bones })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_u32(self.flags)?;
        ctx.write_u16(self.bones.len() as u16)?;
        ctx.write_u16(0)?;
        ctx.save_dict(&self.bones, |ctx, bone: &Bone| bone.write(ctx))?;
        Ok(())
    }
}

/// Raw vertex data consumed by shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBuffer {
    pub vertex_count: u32,
    pub stride: u16,
    pub data: Vec<u8>,
}

impl VertexBuffer {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let vertex_count = ctx.read_u32()?;
        let stride = ctx.read_u16()?;
        ctx.skip(2);
        let data = ctx
            .load_custom(|ctx| {
                let len = ctx.read_u32()? as usize;
                ctx.read_bytes(len)
            })?
            .unwrap_or_default();
        Ok(Self {
            vertex_count,
            stride,
            data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_u32(self.vertex_count)?;
        ctx.write_u16(self.stride)?;
        ctx.write_u16(0)?;
        if self.data.is_empty() {
            ctx.reserve_offset()?;
        } else {
            let data = self.data.clone();
            ctx.save_custom(move |ctx| {
                ctx.write_u32(data.len() as u32)?;
                ctx.write_bytes(&data)
            })?;
        }
        Ok(())
    }
}

/// A surface piece binding a vertex buffer to a material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub name: String,
    pub material_index: u16,
    pub vertex_buffer_index: u16,
}

impl Shape {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let name = ctx.load_string()?;
        let material_index = ctx.read_u16()?;
        let vertex_buffer_index = ctx.read_u16()?;
        Ok(Self {
            name,
            material_index,
            vertex_buffer_index,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.name)?;
        ctx.write_u16(self.material_index)?;
        ctx.write_u16(self.vertex_buffer_index)?;
        Ok(())
    }
}

/// Surface appearance: shader binding plus referenced textures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    pub flags: u32,
    pub texture_refs: Vec<TextureRef>,
    pub shader_assign: ShaderAssign,
    pub user_data: NameDict<UserData>,
}

impl Material {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let name = ctx.load_string()?;
        let flags = ctx.read_u32()?;
        let num_texture_ref = ctx.read_u16()? as usize;
        let _num_user_data = ctx.read_u16()?;
        let texture_refs = ctx.load_list(num_texture_ref, TextureRef::read)?;
        let shader_assign = ctx.load_custom(ShaderAssign::read)?.unwrap_or_default();
        let user_data = ctx.load_dict(UserData::read)?;
        Ok(Self {
            name,
            flags,
            texture_refs,
            shader_assign,
            user_data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.name)?;
        ctx.write_u32(self.flags)?;
        ctx.write_u16(self.texture_refs.len() as u16)?;
        ctx.write_u16(self.user_data.len() as u16)?;
        ctx.save_list(&self.texture_refs, |ctx, texture_ref: &TextureRef| {
            texture_ref.write(ctx)
        })?;
        let shader_assign = self.shader_assign.clone();
        ctx.save_custom(move |ctx| shader_assign.write(ctx))?;
        ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        Ok(())
    }
}

/// An FMDL subfile: model vertex data, skeleton and materials.
///
/// The skeleton is owned by the model; it is decoded immediately through
/// its offset rather than going through the shared reference cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub name: String,
    pub path: String,
    pub skeleton: Skeleton,
    pub vertex_buffers: Vec<VertexBuffer>,
    pub shapes: NameDict<Shape>,
    pub materials: NameDict<Material>,
    pub user_data: NameDict<UserData>,
}

impl Model {
    pub const SIGNATURE: &'static [u8; 4] = b"FMDL";

    /// Total number of vertices across all vertex buffers.
    ///
    /// Kept as the plain sum even though not every vertex is necessarily
    /// shader-consumed; the exact value does not matter to readers.
    pub fn total_vertex_count(&self) -> u32 {
        self.vertex_buffers
            .iter()
            .map(|buffer| buffer.vertex_count)
            .sum()
    }

    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        ctx.check_signature(Self::SIGNATURE)?;
        let name = ctx.load_string()?;
        let path = ctx.load_string()?;
        let skeleton = ctx.load_custom(Skeleton::read)?.unwrap_or_default();
        let vertex_buffer_offset = ctx.read_offset()?;
        let shapes = ctx.load_dict(Shape::read)?;
        let materials = ctx.load_dict(Material::read)?;
        let user_data = ctx.load_dict(UserData::read)?;
        let num_vertex_buffer = ctx.read_u16()? as usize;
        let _num_shape = ctx.read_u16()?;
        let _num_material = ctx.read_u16()?;
        let _num_user_data = ctx.read_u16()?;
        let _total_vertex_count = ctx.read_u32()?;
        if ctx.version() >= V3_3_0 {
            let _user_pointer = ctx.read_u32()?;
        }
        let vertex_buffers =
            ctx.load_list_at(vertex_buffer_offset, num_vertex_buffer, VertexBuffer::read)?;
        Ok(Self {
            name,
            path,
            skeleton,
            vertex_buffers,
            shapes,
            materials,
            user_data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.write_signature(Self::SIGNATURE)?;
        ctx.save_string(&self.name)?;
        ctx.save_string(&self.path)?;
        let skeleton = self.skeleton.clone();
        ctx.save_custom(move |ctx| skeleton.write(ctx))?;
        ctx.save_list(&self.vertex_buffers, |ctx, buffer: &VertexBuffer| {
            buffer.write(ctx)
        })?;
        ctx.save_dict(&self.shapes, |ctx, shape: &Shape| shape.write(ctx))?;
        ctx.save_dict(&self.materials, |ctx, material: &Material| {
            material.write(ctx)
        })?;
        ctx.save_dict(&self.user_data, |ctx, entry: &UserData| entry.write(ctx))?;
        ctx.write_u16(self.vertex_buffers.len() as u16)?;
        ctx.write_u16(self.shapes.len() as u16)?;
        ctx.write_u16(self.materials.len() as u16)?;
        ctx.write_u16(self.user_data.len() as u16)?;
        // Pre-V3_3_0 layouts have no user pointer; the unconditional zero
        // word below lands in the total-vertex-count position there, and
        // readers never trust the stored total anyway.
        if ctx.version() >= V3_3_0 {
            ctx.write_u32(self.total_vertex_count())?;
        }
        ctx.write_u32(0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::share;
    use crate::texture::Texture;
    use crate::user_data::UserDataValue;
    use crate::version::{V2_4_0, V3_4_0};

    fn sample_model() -> Model {
        let mut model = Model {
            name: "chr_hero".into(),
            path: "models/chr_hero.fmdl".into(),
            ..Model::default()
        };

        model.skeleton.flags = 0x1100;
        model
            .skeleton
            .bones
            .insert(
                "root",
                Bone {
                    name: "root".into(),
                    ..Bone::default()
                },
            )
            .unwrap();
        model
            .skeleton
            .bones
            .insert(
                "spine",
                Bone {
                    name: "spine".into(),
                    parent_index: 0,
                    transform: BoneTransform {
                        position: [0.0, 1.2, 0.0],
                        ..BoneTransform::default()
                    },
                },
            )
            .unwrap();

        model.vertex_buffers.push(VertexBuffer {
            vertex_count: 120,
            stride: 32,
            data: vec![1, 2, 3, 4],
        });
        model.vertex_buffers.push(VertexBuffer {
            vertex_count: 36,
            stride: 16,
            data: Vec::new(),
        });

        model
            .shapes
            .insert(
                "body",
                Shape {
                    name: "body".into(),
                    material_index: 0,
                    vertex_buffer_index: 0,
                },
            )
            .unwrap();

        let mut material = Material {
            name: "skin".into(),
            flags: 1,
            ..Material::default()
        };
        material.texture_refs.push(TextureRef {
            name: "skin_alb".into(),
            texture: share(Texture {
                name: "skin_alb".into(),
                width: 64,
                height: 64,
                ..Texture::default()
            }),
        });
        material.shader_assign.shader_archive_name = "standard".into();
        material
            .shader_assign
            .shader_options
            .insert("enable_skin", "1".to_string())
            .unwrap();
        model.materials.insert("skin", material).unwrap();

        model
            .user_data
            .insert(
                "lod_bias",
                UserData {
                    name: "lod_bias".into(),
                    value: UserDataValue::Single(vec![0.5]),
                },
            )
            .unwrap();

        model
    }

    fn roundtrip(model: &Model, version: u32) -> Model {
        let mut ctx = WriteContext::new(version);
        model.write(&mut ctx).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, version);
        Model::read(&mut ctx).unwrap()
    }

    #[test]
    fn test_roundtrip_modern() {
        let model = sample_model();
        assert_eq!(roundtrip(&model, V3_4_0), model);
    }

    #[test]
    fn test_roundtrip_legacy() {
        // Pre-V3_3_0 layout: no user pointer word, zero in the stored
        // total-vertex-count position. Round-trips all the same.
        let model = sample_model();
        assert_eq!(roundtrip(&model, V2_4_0), model);
    }

    #[test]
    fn test_total_vertex_count_is_derived() {
        let mut model = sample_model();
        assert_eq!(model.total_vertex_count(), 156);
        model.vertex_buffers.pop();
        assert_eq!(model.total_vertex_count(), 120);

        let decoded = roundtrip(&model, V3_4_0);
        assert_eq!(decoded.vertex_buffers.len(), 1);
        assert_eq!(decoded.total_vertex_count(), 120);
    }

    #[test]
    fn test_signature_rejected() {
        let model = sample_model();
        let mut ctx = WriteContext::new(V3_4_0);
        model.write(&mut ctx).unwrap();
        let mut bytes = ctx.finish().unwrap();
        bytes[0..4].copy_from_slice(b"XXXX");

        let mut ctx = ReadContext::new(&bytes, V3_4_0);
        assert!(matches!(
            Model::read(&mut ctx),
            Err(crate::Error::Signature { .. })
        ));
    }
}
