//! BFRES subfile codecs.
//!
//! BFRES containers hold versioned binary "subfiles" describing 3D assets:
//! model geometry with skeletons and materials, plus skeletal, scene and
//! texture pattern animations. This crate implements the symmetric decode
//! and encode protocol those subfiles share.
//!
//! # Wire protocol
//!
//! Every subfile follows the same discipline:
//! - a 4-byte magic identifying the type, checked on decode and written
//!   verbatim on encode (`FMDL`, `FSKA`, `FTXP`, `FSCN`, `FFOG`);
//! - a run of scalar fields, some of which change width or disappear
//!   depending on the container version (see [`version`]);
//! - count fields that are only sizing hints on decode and are always
//!   re-derived from live collection lengths on encode;
//! - offset-indirected payloads: ordered lists, name-keyed dictionaries
//!   ([`NameDict`]) and shared references ([`Shared`]) resolved through
//!   the decode context's offset cache so reconverging references yield
//!   one instance.
//!
//! Encode is deferred: subfile writers emit their scalar region and
//! reserve placeholder slots, and [`WriteContext::finish`] lays out the
//! payloads, writes each distinct shared target once and patches every
//! slot.
//!
//! # Example
//!
//! ```
//! use veles_bfres::{Model, ReadContext, WriteContext, version};
//!
//! let model = Model::default();
//! let mut ctx = WriteContext::new(version::V3_4_0);
//! model.write(&mut ctx)?;
//! let bytes = ctx.finish()?;
//!
//! let mut ctx = ReadContext::new(&bytes, version::V3_4_0);
//! assert_eq!(Model::read(&mut ctx)?, model);
//! # Ok::<(), veles_bfres::Error>(())
//! ```

mod context;
mod curve;
mod dict;
mod error;
mod model;
mod scene_anim;
mod shader_assign;
mod skeletal_anim;
mod subfile;
mod tex_pattern_anim;
mod texture;
mod user_data;

pub mod version;

pub use context::{share, ReadContext, Shared, WriteContext};
pub use curve::{AnimCurve, PlayFlags};
pub use dict::NameDict;
pub use error::{Error, Result};
pub use model::{
    Bone, BoneTransform, Material, Model, Shape, Skeleton, VertexBuffer, BONE_NO_PARENT,
};
pub use scene_anim::{
    CameraAnim, CameraAnimData, FogAnim, FogAnimData, LightAnim, LightAnimData, SceneAnim,
};
pub use shader_assign::ShaderAssign;
pub use skeletal_anim::{
    BoneAnim, BoneAnimData, RotateMode, ScaleMode, SkeletalAnim, FLAGS_MASK_ROTATE,
    FLAGS_MASK_SCALE, FLAGS_MASK_SETTINGS,
};
pub use subfile::{Subfile, SIGNATURES};
pub use tex_pattern_anim::{PatternAnimInfo, TexPatternAnim, TexPatternMatAnim};
pub use texture::{Texture, TextureRef};
pub use user_data::{UserData, UserDataValue};
