//! Shader assignment tables.

use crate::context::{ReadContext, WriteContext};
use crate::dict::NameDict;
use crate::Result;

/// Binds a material to a shading model and its option values.
///
/// The three dictionaries map attribute, sampler and option names to plain
/// string values. The count fields on the wire only size the reads; the
/// dictionary lengths are authoritative and re-derived on encode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderAssign {
    pub shader_archive_name: String,
    pub shading_model_name: String,
    pub revision: u32,
    pub attrib_assigns: NameDict<String>,
    pub sampler_assigns: NameDict<String>,
    pub shader_options: NameDict<String>,
}

impl ShaderAssign {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let shader_archive_name = ctx.load_string()?;
        let shading_model_name = ctx.load_string()?;
        let revision = ctx.read_u32()?;
        let _num_attrib_assign = ctx.read_u8()?;
        let _num_sampler_assign = ctx.read_u8()?;
        let _num_shader_option = ctx.read_u16()?;
        let attrib_assigns = ctx.load_dict(|ctx| ctx.read_inline_string())?;
        let sampler_assigns = ctx.load_dict(|ctx| ctx.read_inline_string())?;
        let shader_options = ctx.load_dict(|ctx| ctx.read_inline_string())?;
        Ok(Self {
            shader_archive_name,
            shading_model_name,
            revision,
            attrib_assigns,
            sampler_assigns,
            shader_options,
        })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.shader_archive_name)?;
        ctx.save_string(&self.shading_model_name)?;
        ctx.write_u32(self.revision)?;
        ctx.write_u8(self.attrib_assigns.len() as u8)?;
        ctx.write_u8(self.sampler_assigns.len() as u8)?;
        ctx.write_u16(self.shader_options.len() as u16)?;
        ctx.save_dict(&self.attrib_assigns, |ctx, value: &String| {
            ctx.write_inline_string(value)
        })?;
        ctx.save_dict(&self.sampler_assigns, |ctx, value: &String| {
            ctx.write_inline_string(value)
        })?;
        ctx.save_dict(&self.shader_options, |ctx, value: &String| {
            ctx.write_inline_string(value)
        })?;
        Ok(())
    }
}
