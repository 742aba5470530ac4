/*
 * Bidirectional map between realized model items and native tree-item
 * handles.
 *
 * `items` answers "which handle does this item have, who is its realized
 * parent, and which of its children are realized"; `handles` answers "which
 * item does this native handle belong to" for incoming notifications. Both
 * sides are always updated together, so an item has a handle exactly when it
 * has an `ItemInfo`.
 */

use crate::model::{ItemKey, ItemRef};
use crate::types::NativeItemHandle;

use std::collections::HashMap;

#[derive(Clone)]
pub(crate) struct ItemInfo {
    pub(crate) item: ItemRef,
    pub(crate) handle: NativeItemHandle,
    pub(crate) parent: Option<ItemKey>,
    pub(crate) children: HashMap<ItemKey, NativeItemHandle>,
}

#[derive(Default)]
pub(crate) struct ItemRegistry {
    items: HashMap<ItemKey, ItemInfo>,
    handles: HashMap<NativeItemHandle, ItemRef>,
}

impl ItemRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.handles.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn contains(&self, key: ItemKey) -> bool {
        self.items.contains_key(&key)
    }

    pub(crate) fn handle_for(&self, key: ItemKey) -> Option<NativeItemHandle> {
        self.items.get(&key).map(|info| info.handle)
    }

    pub(crate) fn item_for_handle(&self, handle: NativeItemHandle) -> Option<ItemRef> {
        self.handles.get(&handle).cloned()
    }

    pub(crate) fn items(&self) -> impl Iterator<Item = ItemRef> + '_ {
        self.items.values().map(|info| info.item.clone())
    }

    pub(crate) fn info(&self, key: ItemKey) -> Option<&ItemInfo> {
        self.items.get(&key)
    }

    pub(crate) fn realized_child_count(&self, key: ItemKey) -> Option<usize> {
        self.items.get(&key).map(|info| info.children.len())
    }

    /// Realized children of `key` as owned item references.
    pub(crate) fn realized_children(&self, key: ItemKey) -> Vec<ItemRef> {
        let Some(info) = self.items.get(&key) else {
            return Vec::new();
        };
        info.children
            .keys()
            .filter_map(|child| self.items.get(child).map(|c| c.item.clone()))
            .collect()
    }

    /*
     * Records a freshly inserted native item. The parent, if any, must already
     * be registered; callers check this before creating the native item.
     */
    pub(crate) fn register(
        &mut self,
        item: &ItemRef,
        handle: NativeItemHandle,
        parent: Option<ItemKey>,
    ) {
        let key = ItemKey::of(item);
        if let Some(parent_key) = parent {
            if let Some(parent_info) = self.items.get_mut(&parent_key) {
                parent_info.children.insert(key, handle);
            } else {
                log::warn!("TreeView: registering {key:?} under unrealized parent {parent_key:?}");
            }
        }
        self.items.insert(
            key,
            ItemInfo {
                item: item.clone(),
                handle,
                parent,
                children: HashMap::new(),
            },
        );
        self.handles.insert(handle, item.clone());
    }

    /// Removes one entry (not its descendants) from both maps and from its
    /// parent's child map.
    pub(crate) fn unregister(&mut self, key: ItemKey) -> Option<ItemInfo> {
        let info = self.items.remove(&key)?;
        self.handles.remove(&info.handle);
        if let Some(parent_info) = info.parent.and_then(|p| self.items.get_mut(&p)) {
            parent_info.children.remove(&key);
        }
        Some(info)
    }

    /// Snapshot of the realized structure as (item, parent) key pairs, for
    /// comparing registry shapes independent of handle values.
    #[cfg(test)]
    pub(crate) fn shape(&self) -> Vec<(ItemKey, Option<ItemKey>)> {
        let mut shape: Vec<_> = self
            .items
            .iter()
            .map(|(key, info)| (*key, info.parent))
            .collect();
        shape.sort();
        shape
    }
}
