//! Textures and named texture references.

use crate::context::{ReadContext, Shared, WriteContext};
use crate::Result;

/// An opaque texture payload.
///
/// Pixel data and format details are not interpreted; the codec stores the
/// surface description and raw bytes verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Texture {
    pub name: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub data: Vec<u8>,
}

impl Texture {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let name = ctx.load_string()?;
        let path = ctx.load_string()?;
        let width = ctx.read_u32()?;
        let height = ctx.read_u32()?;
        let format = ctx.read_u32()?;
        let data = ctx
            .load_custom(|ctx| {
                let len = ctx.read_u32()? as usize;
                ctx.read_bytes(len)
            })?
            .unwrap_or_default();
        Ok(Self {
            name,
            path,
            width,
            height,
            format,
            data,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.name)?;
        ctx.save_string(&self.path)?;
        ctx.write_u32(self.width)?;
        ctx.write_u32(self.height)?;
        ctx.write_u32(self.format)?;
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

/// A reference to a [`Texture`] by name.
///
/// The referenced texture is a shared node: any number of parents may point
/// at the same instance, and a single copy is stored on encode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureRef {
    pub name: String,
    pub texture: Shared<Texture>,
}

impl TextureRef {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let name = ctx.load_string()?;
        let texture = ctx.load_reference(Texture::read)?;
        Ok(Self { name, texture })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.name)?;
        ctx.save_reference(&self.texture, |ctx, texture| texture.write(ctx))?;
        Ok(())
    }
}
