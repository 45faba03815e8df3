//! Named per-entity attribute arrays.
//!
//! A tag holds `ncomps` values per entity of one dimension. The element
//! type is one of a small fixed set, stored as a variant of [`TagData`] and
//! recovered through [`TagType`].

use std::sync::Arc;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

/// Typed storage of one tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TagData {
    I8(Arc<[i8]>),
    I32(Arc<[i32]>),
    I64(Arc<[i64]>),
    F64(Arc<[f64]>),
}

impl TagData {
    pub fn len(&self) -> usize {
        match self {
            TagData::I8(a) => a.len(),
            TagData::I32(a) => a.len(),
            TagData::I64(a) => a.len(),
            TagData::F64(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TagData::I8(_) => i8::NAME,
            TagData::I32(_) => i32::NAME,
            TagData::I64(_) => i64::NAME,
            TagData::F64(_) => f64::NAME,
        }
    }
}

/// Element types a tag may store.
pub trait TagType: Pod + Send + Sync + 'static {
    const NAME: &'static str;

    fn wrap(data: Arc<[Self]>) -> TagData;

    fn unwrap(data: &TagData) -> Option<&Arc<[Self]>>;
}

macro_rules! impl_tag_type {
    ($t:ty, $variant:ident, $name:literal) => {
        impl TagType for $t {
            const NAME: &'static str = $name;

            fn wrap(data: Arc<[Self]>) -> TagData {
                TagData::$variant(data)
            }

            fn unwrap(data: &TagData) -> Option<&Arc<[Self]>> {
                match data {
                    TagData::$variant(a) => Some(a),
                    _ => None,
                }
            }
        }
    };
}

impl_tag_type!(i8, I8, "i8");
impl_tag_type!(i32, I32, "i32");
impl_tag_type!(i64, I64, "i64");
impl_tag_type!(f64, F64, "f64");

/// One named tag on one entity dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    name: String,
    ncomps: usize,
    type_name: &'static str,
    data: Option<TagData>,
}

impl Tag {
    /// Declares a tag without data.
    pub fn new<T: TagType>(name: impl Into<String>, ncomps: usize) -> Self {
        Self {
            name: name.into(),
            ncomps,
            type_name: T::NAME,
            data: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ncomps(&self) -> usize {
        self.ncomps
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn data(&self) -> Option<&TagData> {
        self.data.as_ref()
    }

    /// Typed view, `None` when empty or of another type.
    pub fn array<T: TagType>(&self) -> Option<&Arc<[T]>> {
        self.data.as_ref().and_then(T::unwrap)
    }

    pub(crate) fn set_data(&mut self, data: TagData) {
        self.data = Some(data);
    }
}
