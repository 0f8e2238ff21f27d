pub mod compact;
pub mod data;
pub mod file;
pub mod normal;
pub mod object;
pub mod tse;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures;

pub use compact::{compactify, compactify_object, shell_diameter};
pub use data::{ShellData, TseRow, TseSource, TseStorage};
pub use file::{DataType, SharedShellFile, ShellFile, StructureInfo, Unit};
pub use normal::NormalCodec;
pub use object::{Appearance, ShellObject};
pub use tse::{Kind, Tse};

use crate::error::StoreError;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Unique identifier for an object in a [`ShellStore`].
    pub struct ShellObjectId;
}

/// Arena that owns every object of a scene, plus their display order.
#[derive(Debug, Default)]
pub struct ShellStore {
    objects: SlotMap<ShellObjectId, ShellObject>,
    order: Vec<ShellObjectId>,
}

impl ShellStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object at the end of the display order and returns its ID.
    pub fn add(&mut self, object: ShellObject) -> ShellObjectId {
        let id = self.objects.insert(object);
        self.order.push(id);
        id
    }

    /// Returns a reference to the object, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn get(&self, id: ShellObjectId) -> Result<&ShellObject, StoreError> {
        self.objects
            .get(id)
            .ok_or_else(|| StoreError::EntityNotFound("object".into()))
    }

    /// Returns a mutable reference to the object, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn get_mut(&mut self, id: ShellObjectId) -> Result<&mut ShellObject, StoreError> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| StoreError::EntityNotFound("object".into()))
    }

    /// Removes an object and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn remove(&mut self, id: ShellObjectId) -> Result<ShellObject, StoreError> {
        let object = self
            .objects
            .remove(id)
            .ok_or_else(|| StoreError::EntityNotFound("object".into()))?;
        self.order.retain(|&o| o != id);
        Ok(object)
    }

    /// Object IDs in display order.
    #[must_use]
    pub fn ids(&self) -> &[ShellObjectId] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
