//! User-attachable auxiliary data.
//!
//! Most subfiles carry a dictionary of named user data entries. The values
//! are opaque to this crate; they are stored and round-tripped, never
//! interpreted.

use crate::context::{ReadContext, WriteContext};
use crate::{Error, Result};

const TYPE_INT32: u8 = 0;
const TYPE_SINGLE: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_BYTE: u8 = 3;

/// The typed payload of a [`UserData`] entry.
#[derive(Debug, Clone, PartialEq)]
pub enum UserDataValue {
    Int32(Vec<i32>),
    Single(Vec<f32>),
    String(Vec<String>),
    Byte(Vec<u8>),
}

impl Default for UserDataValue {
    fn default() -> Self {
        Self::Int32(Vec::new())
    }
}

impl UserDataValue {
    fn type_tag(&self) -> u8 {
        match self {
            Self::Int32(_) => TYPE_INT32,
            Self::Single(_) => TYPE_SINGLE,
            Self::String(_) => TYPE_STRING,
            Self::Byte(_) => TYPE_BYTE,
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            Self::Int32(values) => values.len(),
            Self::Single(values) => values.len(),
            Self::String(values) => values.len(),
            Self::Byte(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named user data entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    pub name: String,
    pub value: UserDataValue,
}

impl UserData {
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let name = ctx.load_string()?;
        let type_tag = ctx.read_u8()?;
        ctx.skip(1);
        let count = ctx.read_u16()? as usize;
        let value = match type_tag {
            TYPE_INT32 => {
                let values = ctx.load_custom(|ctx| {
                    let mut values = Vec::with_capacity(count);
                    for _ in 0..count {
                        values.push(ctx.read_i32()?);
                    }
                    Ok(values)
                })?;
                UserDataValue::Int32(values.unwrap_or_default())
            }
            TYPE_SINGLE => {
                let values = ctx.load_custom(|ctx| {
                    let mut values = Vec::with_capacity(count);
                    for _ in 0..count {
                        values.push(ctx.read_f32()?);
                    }
                    Ok(values)
                })?;
                UserDataValue::Single(values.unwrap_or_default())
            }
            TYPE_STRING => {
                let values = ctx.load_custom(|ctx| {
                    let mut values = Vec::with_capacity(count);
                    for _ in 0..count {
                        values.push(ctx.load_string()?);
                    }
                    Ok(values)
                })?;
                UserDataValue::String(values.unwrap_or_default())
            }
            TYPE_BYTE => {
                let values = ctx.load_custom(|ctx| ctx.read_bytes(count))?;
                UserDataValue::Byte(values.unwrap_or_default())
            }
            value => return Err(Error::UnknownUserDataType { value }),
        };
        Ok(Self { name, value })
    }

    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        ctx.save_string(&self.name)?;
        ctx.write_u8(self.value.type_tag())?;
        ctx.write_u8(0)?;
        ctx.write_u16(self.value.len() as u16)?;
        if self.value.is_empty() {
            ctx.reserve_offset()?;
            return Ok(());
        }
        match &self.value {
            UserDataValue::Int32(values) => {
                let values = values.clone();
                ctx.save_custom(move |ctx| {
                    for value in &values {
                        ctx.write_i32(*value)?;
                    }
                    Ok(())
                })?;
            }
            UserDataValue::Single(values) => {
                let values = values.clone();
                ctx.save_custom(move |ctx| {
                    for value in &values {
                        ctx.write_f32(*value)?;
                    }
                    Ok(())
                })?;
            }
            UserDataValue::String(values) => {
                let values = values.clone();
                ctx.save_custom(move |ctx| {
                    for value in &values {
                        ctx.save_string(value)?;
                    }
                    Ok(())
                })?;
            }
            UserDataValue::Byte(values) => {
                let values = values.clone();
                ctx.save_custom(move |ctx| ctx.write_bytes(&values))?;
            }
        }
        Ok(())
    }
}
