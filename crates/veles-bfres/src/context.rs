//! Decode and encode contexts.
//!
//! A context pairs a binary cursor with the container version and the
//! session-scoped state the offset protocol needs: the decode side keeps an
//! offset-indexed cache of shared instances, the encode side keeps a queue
//! of deferred payloads, an identity map of already-written shared targets,
//! and a deduplicating string pool.
//!
//! Offsets are absolute from the start of the buffer; an offset of zero
//! stands for "absent" (empty string, empty collection, default instance).
//! A context is scoped to one decode or encode session and must not be
//! reused across sessions.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use veles_common::{BinaryReader, BinaryWriter};

use crate::dict::NameDict;
use crate::{Error, Result};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// A shared, mutable node of the decoded graph.
///
/// Two parents referencing the same byte offset resolve to the same
/// instance; identity is `Rc` pointer identity.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value for shared ownership.
pub fn share<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Decode-side I/O context.
pub struct ReadContext<'a> {
    reader: BinaryReader<'a>,
    version: u32,
    references: FxHashMap<(u32, TypeId), Rc<dyn Any>>,
}

impl<'a> ReadContext<'a> {
    /// Create a context over a buffer for one decode session.
    pub fn new(data: &'a [u8], version: u32) -> Self {
        Self {
            reader: BinaryReader::new(data),
            version,
            references: FxHashMap::default(),
        }
    }

    /// The container version all layout gates compare against.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Current cursor position.
    #[inline]
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.reader.seek(position);
    }

    /// Skip over `count` bytes (padding).
    #[inline]
    pub fn skip(&mut self, count: usize) {
        self.reader.advance(count);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.reader.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.reader.read_i8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.reader.read_u16()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.reader.read_i16()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.reader.read_u32()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.reader.read_i32()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.reader.read_f32()?)
    }

    /// Read a POD struct via zerocopy.
    pub fn read_struct<T: veles_common::FromBytes>(&mut self) -> Result<T> {
        Ok(self.reader.read_struct()?)
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        Ok(self.reader.read_bytes(count)?.to_vec())
    }

    /// Read `count` consecutive 16-bit values.
    pub fn read_u16s(&mut self, count: usize) -> Result<Vec<u16>> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_u16()?);
        }
        Ok(values)
    }

    /// Read and verify a subfile signature.
    pub fn check_signature(&mut self, expected: &[u8; 4]) -> Result<()> {
        let bytes = self.reader.read_bytes(4)?;
        let actual = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if &actual != expected {
            return Err(Error::Signature {
                expected: *expected,
                actual,
            });
        }
        Ok(())
    }

    /// Peek the next 4 bytes without consuming them.
    pub fn peek_signature(&mut self) -> Result<[u8; 4]> {
        let position = self.reader.position();
        let bytes = self.reader.read_bytes(4)?;
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        self.reader.seek(position);
        Ok(magic)
    }

    /// Read a raw offset field.
    #[inline]
    pub fn read_offset(&mut self) -> Result<u32> {
        self.read_u32()
    }

    /// Read an offset-indirected string. Offset zero decodes as `""`.
    pub fn load_string(&mut self) -> Result<String> {
        let offset = self.read_u32()?;
        if offset == 0 {
            return Ok(String::new());
        }
        let position = self.reader.position();
        self.reader.seek(offset as usize);
        let value = self.reader.read_cstring()?.to_string();
        self.reader.seek(position);
        Ok(value)
    }

    /// Read a null-terminated string at the current cursor, no indirection.
    pub fn read_inline_string(&mut self) -> Result<String> {
        Ok(self.reader.read_cstring()?.to_string())
    }

    /// Read an offset and decode a custom region there.
    ///
    /// Returns `None` for a zero offset. The cursor is restored afterwards.
    pub fn load_custom<T, F>(&mut self, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let offset = self.read_u32()?;
        if offset == 0 {
            return Ok(None);
        }
        let position = self.reader.position();
        self.reader.seek(offset as usize);
        let value = f(self)?;
        self.reader.seek(position);
        Ok(Some(value))
    }

    /// Read an offset and decode `count` consecutive records there.
    pub fn load_list<T, F>(&mut self, count: usize, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let offset = self.read_u32()?;
        self.load_list_at(offset, count, f)
    }

    /// Decode `count` consecutive records at a previously read offset.
    pub fn load_list_at<T, F>(&mut self, offset: u32, count: usize, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        if offset == 0 {
            return Ok(Vec::new());
        }
        let position = self.reader.position();
        self.reader.seek(offset as usize);
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(f(self)?);
        }
        self.reader.seek(position);
        Ok(items)
    }

    /// Read an offset to `count` consecutive string slots.
    pub fn load_strings(&mut self, count: usize) -> Result<Vec<String>> {
        let offset = self.read_u32()?;
        self.load_list_at(offset, count, |ctx| ctx.load_string())
    }

    /// Read an offset-indirected dictionary.
    ///
    /// The region holds an entry count followed by `(name offset, value
    /// offset)` pairs; entries keep their file order.
    pub fn load_dict<T, F>(&mut self, mut f: F) -> Result<NameDict<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let offset = self.read_u32()?;
        if offset == 0 {
            return Ok(NameDict::new());
        }
        let position = self.reader.position();
        self.reader.seek(offset as usize);

        let count = self.read_u32()? as usize;
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let name_offset = self.read_u32()?;
            let value_offset = self.read_u32()?;
            slots.push((name_offset, value_offset));
        }

        let mut dict = NameDict::new();
        for (name_offset, value_offset) in slots {
            self.reader.seek(name_offset as usize);
            let name = self.reader.read_cstring()?.to_string();
            self.reader.seek(value_offset as usize);
            let value = f(self)?;
            dict.insert(name, value)?;
        }

        self.reader.seek(position);
        Ok(dict)
    }

    /// Read an offset-indirected shared reference.
    ///
    /// A zero offset yields a fresh default instance. Otherwise the
    /// instance cached for this offset is returned if one exists, so every
    /// parent referencing the same offset shares one node; the first visit
    /// decodes and caches it.
    pub fn load_reference<T, F>(&mut self, f: F) -> Result<Shared<T>>
    where
        T: Default + 'static,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let offset = self.read_u32()?;
        if offset == 0 {
            return Ok(share(T::default()));
        }

        let key = (offset, TypeId::of::<T>());
        if let Some(existing) = self.references.get(&key) {
            if let Ok(shared) = existing.clone().downcast::<RefCell<T>>() {
                return Ok(shared);
            }
        }

        // Register the node before decoding it so a reference cycle back to
        // this offset resolves to the same instance instead of recursing.
        let shared = share(T::default());
        self.references.insert(key, shared.clone() as Rc<dyn Any>);

        let position = self.reader.position();
        self.reader.seek(offset as usize);
        let value = f(self)?;
        self.reader.seek(position);

        *shared.borrow_mut() = value;
        Ok(shared)
    }
}

struct Pending {
    slot: usize,
    identity: Option<(usize, TypeId)>,
    write: Box<dyn FnOnce(&mut WriteContext) -> Result<()>>,
}

/// Encode-side I/O context.
///
/// Encoding is three-phase: subfile `write` methods emit their scalar
/// regions and reserve placeholder slots, [`finish`](Self::finish) drains
/// the deferred payload queue in reservation order (writing each distinct
/// shared target exactly once), and finally the string pool is flushed and
/// every placeholder patched.
pub struct WriteContext {
    writer: BinaryWriter,
    version: u32,
    queue: VecDeque<Pending>,
    written: FxHashMap<(usize, TypeId), u32>,
    strings: Vec<(usize, String)>,
}

impl WriteContext {
    /// Create a context for one encode session.
    pub fn new(version: u32) -> Self {
        Self {
            writer: BinaryWriter::new(),
            version,
            queue: VecDeque::new(),
            written: FxHashMap::default(),
            strings: Vec::new(),
        }
    }

    /// The container version all layout gates compare against.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Current write position.
    #[inline]
    pub fn position(&self) -> usize {
        self.writer.position()
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.writer.write_u8(value)?)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        Ok(self.writer.write_i8(value)?)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.writer.write_u16(value)?)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        Ok(self.writer.write_i16(value)?)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.writer.write_u32(value)?)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        Ok(self.writer.write_i32(value)?)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        Ok(self.writer.write_f32(value)?)
    }

    /// Write raw bytes at the current position.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.writer.write_bytes(bytes)?)
    }

    /// Write a POD struct via zerocopy.
    pub fn write_struct<T: veles_common::IntoBytes + veles_common::Immutable>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        Ok(self.writer.write_struct(value)?)
    }

    /// Write `values` as consecutive 16-bit fields.
    pub fn write_u16s(&mut self, values: &[u16]) -> Result<()> {
        for &value in values {
            self.write_u16(value)?;
        }
        Ok(())
    }

    /// Write a subfile signature verbatim.
    pub fn write_signature(&mut self, signature: &[u8; 4]) -> Result<()> {
        self.write_bytes(signature)
    }

    /// Reserve a 4-byte offset slot at the current position.
    ///
    /// Unpatched slots encode as zero ("absent").
    pub fn reserve_offset(&mut self) -> Result<usize> {
        Ok(self.writer.reserve_u32()?)
    }

    /// Patch a reserved offset slot.
    pub fn patch_offset(&mut self, slot: usize, offset: u32) -> Result<()> {
        Ok(self.writer.patch_u32(slot, offset)?)
    }

    /// Reserve a string slot. The string itself lands in the pooled string
    /// region on [`finish`](Self::finish); equal strings share storage.
    pub fn save_string(&mut self, value: &str) -> Result<()> {
        let slot = self.reserve_offset()?;
        if !value.is_empty() {
            self.strings.push((slot, value.to_string()));
        }
        Ok(())
    }

    /// Write a null-terminated string at the current cursor, no indirection.
    pub fn write_inline_string(&mut self, value: &str) -> Result<()> {
        Ok(self.writer.write_cstring(value)?)
    }

    /// Reserve an offset slot and defer a custom payload region for it.
    pub fn save_custom<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut WriteContext) -> Result<()> + 'static,
    {
        let slot = self.reserve_offset()?;
        self.queue.push_back(Pending {
            slot,
            identity: None,
            write: Box::new(f),
        });
        Ok(())
    }

    /// Reserve an offset slot for `items` written consecutively.
    ///
    /// An empty list encodes as a zero offset.
    pub fn save_list<T, F>(&mut self, items: &[T], write: F) -> Result<()>
    where
        T: Clone + 'static,
        F: Fn(&mut WriteContext, &T) -> Result<()> + 'static,
    {
        let slot = self.reserve_offset()?;
        if items.is_empty() {
            return Ok(());
        }
        let items = items.to_vec();
        self.queue.push_back(Pending {
            slot,
            identity: None,
            write: Box::new(move |ctx| {
                for item in &items {
                    write(ctx, item)?;
                }
                Ok(())
            }),
        });
        Ok(())
    }

    /// Reserve an offset slot for a region of consecutive string slots.
    pub fn save_strings(&mut self, names: &[String]) -> Result<()> {
        let slot = self.reserve_offset()?;
        if names.is_empty() {
            return Ok(());
        }
        let names = names.to_vec();
        self.queue.push_back(Pending {
            slot,
            identity: None,
            write: Box::new(move |ctx| {
                for name in &names {
                    ctx.save_string(name)?;
                }
                Ok(())
            }),
        });
        Ok(())
    }

    /// Reserve an offset slot for a dictionary region.
    ///
    /// An empty dictionary encodes as a zero offset; entries are laid out
    /// in insertion order, values as deferred payloads.
    pub fn save_dict<T, F>(&mut self, dict: &NameDict<T>, write: F) -> Result<()>
    where
        T: Clone + 'static,
        F: Fn(&mut WriteContext, &T) -> Result<()> + 'static,
    {
        let slot = self.reserve_offset()?;
        if dict.is_empty() {
            return Ok(());
        }
        let entries: Vec<(String, T)> = dict
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let write = Rc::new(write);
        self.queue.push_back(Pending {
            slot,
            identity: None,
            write: Box::new(move |ctx| {
                ctx.write_u32(entries.len() as u32)?;
                for (name, value) in entries {
                    ctx.save_string(&name)?;
                    let write = Rc::clone(&write);
                    ctx.save_custom(move |ctx| (*write)(ctx, &value))?;
                }
                Ok(())
            }),
        });
        Ok(())
    }

    /// Reserve an offset slot for a shared reference target.
    ///
    /// Each distinct target (by `Rc` identity) is serialized exactly once;
    /// every slot referencing it is patched to the same final offset.
    pub fn save_reference<T, F>(&mut self, value: &Shared<T>, write: F) -> Result<()>
    where
        T: 'static,
        F: Fn(&mut WriteContext, &T) -> Result<()> + 'static,
    {
        let slot = self.reserve_offset()?;
        let identity = (Rc::as_ptr(value) as usize, TypeId::of::<T>());
        let value = Rc::clone(value);
        self.queue.push_back(Pending {
            slot,
            identity: Some(identity),
            write: Box::new(move |ctx| {
                let value = value.borrow();
                write(ctx, &value)
            }),
        });
        Ok(())
    }

    /// Run the deferred passes and return the finished buffer.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        while let Some(pending) = self.queue.pop_front() {
            if let Some(identity) = pending.identity {
                if let Some(&offset) = self.written.get(&identity) {
                    self.patch_offset(pending.slot, offset)?;
                    continue;
                }
            }
            self.writer.align_to(4)?;
            let offset = self.writer.position() as u32;
            if let Some(identity) = pending.identity {
                self.written.insert(identity, offset);
            }
            (pending.write)(&mut self)?;
            self.patch_offset(pending.slot, offset)?;
        }

        let strings = std::mem::take(&mut self.strings);
        let mut pool: FxHashMap<String, u32> = FxHashMap::default();
        for (slot, string) in strings {
            let offset = match pool.get(&string) {
                Some(&offset) => offset,
                None => {
                    let offset = self.writer.position() as u32;
                    self.writer.write_cstring(&string)?;
                    pool.insert(string, offset);
                    offset
                }
            };
            self.writer.patch_u32(slot, offset)?;
        }

        Ok(self.writer.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_roundtrip() {
        let mut ctx = WriteContext::new(0);
        ctx.save_string("alpha").unwrap();
        ctx.save_string("").unwrap();
        ctx.save_string("alpha").unwrap();
        let bytes = ctx.finish().unwrap();

        // Pooled: both non-empty slots point at one stored copy.
        assert_eq!(bytes.len(), 12 + "alpha".len() + 1);

        let mut ctx = ReadContext::new(&bytes, 0);
        assert_eq!(ctx.load_string().unwrap(), "alpha");
        assert_eq!(ctx.load_string().unwrap(), "");
        assert_eq!(ctx.load_string().unwrap(), "alpha");
    }

    #[test]
    fn test_custom_roundtrip() {
        let mut ctx = WriteContext::new(0);
        ctx.save_custom(|ctx| ctx.write_u32(0xDEAD)).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, 0);
        let value = ctx.load_custom(|ctx| ctx.read_u32()).unwrap();
        assert_eq!(value, Some(0xDEAD));
    }

    #[test]
    fn test_custom_absent() {
        let bytes = 0u32.to_le_bytes();
        let mut ctx = ReadContext::new(&bytes, 0);
        let value = ctx.load_custom(|ctx| ctx.read_u32()).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_list_roundtrip() {
        let items = vec![3u16, 1, 4, 1, 5];
        let mut ctx = WriteContext::new(0);
        ctx.save_list(&items, |ctx, v| ctx.write_u16(*v)).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, 0);
        let decoded = ctx.load_list(items.len(), |ctx| ctx.read_u16()).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn test_empty_list_is_zero_offset() {
        let mut ctx = WriteContext::new(0);
        ctx.save_list(&[] as &[u16], |ctx, v| ctx.write_u16(*v))
            .unwrap();
        let bytes = ctx.finish().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_dict_preserves_order() {
        let mut dict = NameDict::new();
        dict.insert("zzz", 1u32).unwrap();
        dict.insert("aaa", 2u32).unwrap();

        let mut ctx = WriteContext::new(0);
        ctx.save_dict(&dict, |ctx, v| ctx.write_u32(*v)).unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, 0);
        let decoded = ctx.load_dict(|ctx| ctx.read_u32()).unwrap();
        assert_eq!(decoded, dict);
        let keys: Vec<_> = decoded.keys().collect();
        assert_eq!(keys, ["zzz", "aaa"]);
    }

    #[test]
    fn test_shared_reference_written_once() {
        let target = share(7u32);
        let mut ctx = WriteContext::new(0);
        ctx.save_reference(&target, |ctx, v| ctx.write_u32(*v))
            .unwrap();
        ctx.save_reference(&target, |ctx, v| ctx.write_u32(*v))
            .unwrap();
        let bytes = ctx.finish().unwrap();

        // Two slots, one 4-byte payload.
        assert_eq!(bytes.len(), 12);
        let first = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let second = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(first, second);

        let mut ctx = ReadContext::new(&bytes, 0);
        let a = ctx.load_reference(|ctx| ctx.read_u32()).unwrap();
        let b = ctx.load_reference(|ctx| ctx.read_u32()).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(*a.borrow(), 7);
    }

    #[test]
    fn test_distinct_references_stay_distinct() {
        let first = share(1u32);
        let second = share(1u32);
        let mut ctx = WriteContext::new(0);
        ctx.save_reference(&first, |ctx, v| ctx.write_u32(*v))
            .unwrap();
        ctx.save_reference(&second, |ctx, v| ctx.write_u32(*v))
            .unwrap();
        let bytes = ctx.finish().unwrap();

        let mut ctx = ReadContext::new(&bytes, 0);
        let a = ctx.load_reference(|ctx| ctx.read_u32()).unwrap();
        let b = ctx.load_reference(|ctx| ctx.read_u32()).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(*a.borrow(), *b.borrow());
    }

    #[test]
    fn test_null_reference_yields_default() {
        let bytes = 0u32.to_le_bytes();
        let mut ctx = ReadContext::new(&bytes, 0);
        let value: Shared<u32> = ctx.load_reference(|ctx| ctx.read_u32()).unwrap();
        assert_eq!(*value.borrow(), 0);
    }
}
