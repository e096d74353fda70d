//! Interned string, type, and method tables
//!
//! The IR references strings, class types, and method prototypes through
//! copyable handles into globally uniqued tables. Interning guarantees
//! that two handles are equal exactly when their contents are equal, so
//! the pattern engine compares handles instead of data.
//!
//! # Design
//!
//! - Lock-free via DashMap (concurrent HashMap), append-only
//! - `make_*` is idempotent and safe to call from multiple workers
//! - Strings are stored as Modified UTF-8 bytes, as in a dex file

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::mutf8;

/// Handle to an interned string (Modified UTF-8 data)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringId(u32);

/// Handle to an interned type descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// Handle to an interned method reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(u32);

/// An interned method reference: defining class, name, and prototype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Defining class
    pub class: TypeId,
    /// Method name
    pub name: Box<str>,
    /// Return type
    pub ret: TypeId,
    /// Parameter types in declaration order
    pub params: Vec<TypeId>,
}

/// Interned tables shared by the IR and the optimizer
///
/// One context lives for the whole post-processor run. All tables are
/// concurrent and append-only; handles stay valid for the context's
/// lifetime.
pub struct IrContext {
    strings: DashMap<Box<[u8]>, StringId>,
    strings_rev: DashMap<StringId, Arc<[u8]>>,
    string_counter: AtomicU32,

    types: DashMap<Box<str>, TypeId>,
    types_rev: DashMap<TypeId, Arc<str>>,
    type_counter: AtomicU32,

    methods: DashMap<Box<str>, MethodId>,
    methods_rev: DashMap<MethodId, Arc<MethodRef>>,
    method_counter: AtomicU32,
}

impl std::fmt::Debug for IrContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrContext")
            .field("strings", &self.strings.len())
            .field("types", &self.types.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

impl IrContext {
    /// Create a new empty context
    pub fn new() -> Self {
        let ctx = Self {
            strings: DashMap::new(),
            strings_rev: DashMap::new(),
            string_counter: AtomicU32::new(0),
            types: DashMap::new(),
            types_rev: DashMap::new(),
            type_counter: AtomicU32::new(0),
            methods: DashMap::new(),
            methods_rev: DashMap::new(),
            method_counter: AtomicU32::new(0),
        };
        // The empty string is always id 0; `empty_string` relies on it.
        ctx.make_string("");
        ctx
    }

    /// Intern a string given as a Rust `&str`
    pub fn make_string(&self, s: &str) -> StringId {
        self.make_string_from_mutf8(mutf8::encode_str(s))
    }

    /// Intern a string given as Modified UTF-8 bytes
    pub fn make_string_from_mutf8(&self, bytes: Vec<u8>) -> StringId {
        if let Some(id) = self.strings.get(bytes.as_slice()) {
            return *id;
        }
        match self.strings.entry(bytes.clone().into_boxed_slice()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(v) => {
                let id = StringId(self.string_counter.fetch_add(1, Ordering::Relaxed));
                self.strings_rev.insert(id, Arc::from(bytes.into_boxed_slice()));
                v.insert(id);
                id
            }
        }
    }

    /// Handle of the interned empty string
    #[inline]
    pub fn empty_string(&self) -> StringId {
        StringId(0)
    }

    /// Modified UTF-8 data of an interned string
    pub fn string_data(&self, id: StringId) -> Arc<[u8]> {
        self.strings_rev
            .get(&id)
            .map(|e| e.value().clone())
            .expect("string id from a different context")
    }

    /// UTF-16 code unit count of an interned string
    pub fn string_code_units(&self, id: StringId) -> usize {
        mutf8::code_unit_len(&self.string_data(id))
    }

    /// Lossy decoded form of an interned string, for logs
    pub fn string_display(&self, id: StringId) -> String {
        mutf8::decode_lossy(&self.string_data(id))
    }

    /// Intern a type descriptor such as `Ljava/lang/String;`
    pub fn make_type(&self, descriptor: &str) -> TypeId {
        if let Some(id) = self.types.get(descriptor) {
            return *id;
        }
        match self.types.entry(descriptor.into()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(v) => {
                let id = TypeId(self.type_counter.fetch_add(1, Ordering::Relaxed));
                self.types_rev.insert(id, Arc::from(descriptor));
                v.insert(id);
                id
            }
        }
    }

    /// Descriptor of an interned type
    pub fn type_descriptor(&self, id: TypeId) -> Arc<str> {
        self.types_rev
            .get(&id)
            .map(|e| e.value().clone())
            .expect("type id from a different context")
    }

    /// Simple class name of a type: `Lpkg/Outer/Simple;` becomes `Simple`
    ///
    /// For a class in the default package the leading `L` is dropped.
    pub fn type_simple_name(&self, id: TypeId) -> StringId {
        let desc = self.type_descriptor(id);
        let trimmed = desc.strip_suffix(';').unwrap_or(&desc);
        let simple = match trimmed.rfind('/') {
            Some(pos) => &trimmed[pos + 1..],
            None => trimmed.strip_prefix('L').unwrap_or(trimmed),
        };
        self.make_string(simple)
    }

    /// Intern a method reference
    ///
    /// `class` and `ret` are type descriptors; `params` are the parameter
    /// type descriptors in order.
    pub fn make_method(&self, class: &str, name: &str, ret: &str, params: &[&str]) -> MethodId {
        let key = format!("{}.{}:({}){}", class, name, params.concat(), ret);
        if let Some(id) = self.methods.get(key.as_str()) {
            return *id;
        }
        match self.methods.entry(key.into_boxed_str()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(v) => {
                let id = MethodId(self.method_counter.fetch_add(1, Ordering::Relaxed));
                let mref = MethodRef {
                    class: self.make_type(class),
                    name: name.into(),
                    ret: self.make_type(ret),
                    params: params.iter().map(|p| self.make_type(p)).collect(),
                };
                self.methods_rev.insert(id, Arc::new(mref));
                v.insert(id);
                id
            }
        }
    }

    /// Reference data of an interned method
    pub fn method(&self, id: MethodId) -> Arc<MethodRef> {
        self.methods_rev
            .get(&id)
            .map(|e| e.value().clone())
            .expect("method id from a different context")
    }
}
