//! Signature-dispatched subfile decoding.
//!
//! The five dictionary-level subfile types each start with a 4-byte magic.
//! [`Subfile::read`] peeks the magic and dispatches to the matching codec
//! through a closed lookup table; embedded sub-objects (texture references,
//! shader assigns) carry no magic and are never dispatched standalone.
//!
//! Dispatch needs the magic to be present, so it applies to layouts from
//! [`V2_4_0`](crate::version::V2_4_0) on; older skeletal and scene
//! animation layouts are decoded through their codecs directly.

use crate::context::{ReadContext, WriteContext};
use crate::model::Model;
use crate::scene_anim::{FogAnim, SceneAnim};
use crate::skeletal_anim::SkeletalAnim;
use crate::tex_pattern_anim::TexPatternAnim;
use crate::{Error, Result};

/// The magics of all dispatchable subfile types.
pub const SIGNATURES: [&[u8; 4]; 5] = [
    Model::SIGNATURE,
    SkeletalAnim::SIGNATURE,
    TexPatternAnim::SIGNATURE,
    SceneAnim::SIGNATURE,
    FogAnim::SIGNATURE,
];

/// Any signatured subfile.
#[derive(Debug, Clone, PartialEq)]
pub enum Subfile {
    Model(Model),
    SkeletalAnim(SkeletalAnim),
    TexPatternAnim(TexPatternAnim),
    SceneAnim(SceneAnim),
    FogAnim(FogAnim),
}

impl Subfile {
    /// The magic identifying this subfile's type.
    pub fn signature(&self) -> &'static [u8; 4] {
        match self {
            Self::Model(_) => Model::SIGNATURE,
            Self::SkeletalAnim(_) => SkeletalAnim::SIGNATURE,
            Self::TexPatternAnim(_) => TexPatternAnim::SIGNATURE,
            Self::SceneAnim(_) => SceneAnim::SIGNATURE,
            Self::FogAnim(_) => FogAnim::SIGNATURE,
        }
    }

    /// Decode whichever subfile type the next magic selects.
    pub fn read(ctx: &mut ReadContext) -> Result<Self> {
        let magic = ctx.peek_signature()?;
        match &magic {
            m if m == Model::SIGNATURE => Model::read(ctx).map(Self::Model),
            m if m == SkeletalAnim::SIGNATURE => SkeletalAnim::read(ctx).map(Self::SkeletalAnim),
            m if m == TexPatternAnim::SIGNATURE => {
                TexPatternAnim::read(ctx).map(Self::TexPatternAnim)
            }
            m if m == SceneAnim::SIGNATURE => SceneAnim::read(ctx).map(Self::SceneAnim),
            m if m == FogAnim::SIGNATURE => FogAnim::read(ctx).map(Self::FogAnim),
            _ => Err(Error::UnknownSignature { signature: magic }),
        }
    }

    /// Encode the contained subfile.
    pub fn write(&self, ctx: &mut WriteContext) -> Result<()> {
        match self {
            Self::Model(model) => model.write(ctx),
            Self::SkeletalAnim(anim) => anim.write(ctx),
            Self::TexPatternAnim(anim) => anim.write(ctx),
            Self::SceneAnim(anim) => anim.write(ctx),
            Self::FogAnim(anim) => anim.write(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::V3_4_0;

    #[test]
    fn test_dispatch_by_signature() {
        let model = Model {
            name: "probe".into(),
            ..Model::default()
        };
        let mut ctx = WriteContext::new(V3_4_0);
        model.write(&mut ctx).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, V3_4_0);
        match Subfile::read(&mut ctx).unwrap() {
            Subfile::Model(decoded) => assert_eq!(decoded, model),
            other => panic!("dispatched to {:?}", other.signature()),
        }
    }

    #[test]
    fn test_unknown_signature_rejected() {
        let bytes = *b"ZZZZ\0\0\0\0";
        let mut ctx = ReadContext::new(&bytes, V3_4_0);
        assert!(matches!(
            Subfile::read(&mut ctx),
            Err(Error::UnknownSignature { signature }) if &signature == b"ZZZZ"
        ));
    }

    #[test]
    fn test_signature_table_is_distinct() {
        for (i, a) in SIGNATURES.iter().enumerate() {
            for b in &SIGNATURES[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
