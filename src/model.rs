/*
 * The tree model contract consumed by the tree view.
 *
 * The model owns its items; the tree view only observes them through
 * `ItemRef` clones and never mutates structure. Item identity is pointer
 * identity of the `Rc`, captured as an `ItemKey` for registry lookups.
 */

use crate::event::{Event, EventPublisher};
use crate::image_cache::ItemImage;

use std::rc::Rc;

pub type ItemRef = Rc<dyn TreeItem>;

/// Identity of a model item, derived from the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey(usize);

impl ItemKey {
    pub fn of(item: &ItemRef) -> Self {
        ItemKey(Rc::as_ptr(item) as *const () as usize)
    }
}

pub fn same_item(a: &ItemRef, b: &ItemRef) -> bool {
    ItemKey::of(a) == ItemKey::of(b)
}

pub trait TreeItem {
    fn text(&self) -> String;

    fn image(&self) -> Option<ItemImage> {
        None
    }

    /// Parent item, or `None` for roots. Implementations typically hold a
    /// `Weak` back-reference.
    fn parent(&self) -> Option<ItemRef>;

    fn child_count(&self) -> usize;

    fn child_at(&self, index: usize) -> Option<ItemRef>;

    /// Whether the item shows an expand button. Lazy models can override this
    /// to avoid loading children just to count them.
    fn has_children(&self) -> bool {
        self.child_count() > 0
    }

    /// Checkbox capability; `None` for items without a checkbox.
    fn as_checkable(&self) -> Option<&dyn CheckableItem> {
        None
    }
}

/*
 * Checked state of a checkable item. `set_checked` only stores the value;
 * publishing item-checked is left to the model, so bulk propagation through a
 * subtree does not produce one event per child.
 */
pub trait CheckableItem {
    fn checked(&self) -> bool;
    fn set_checked(&self, checked: bool);
}

pub trait TreeModel {
    /// Read once when the model is attached; must not change afterwards.
    fn lazy_population(&self) -> bool;

    fn root_count(&self) -> usize;

    fn root_at(&self, index: usize) -> Option<ItemRef>;

    /// `None` resets the whole tree, `Some(item)` only the subtree below it.
    fn items_reset(&self) -> &Event<Option<ItemRef>>;

    fn item_changed(&self) -> &Event<ItemRef>;

    fn item_inserted(&self) -> &Event<ItemRef>;

    fn item_removed(&self) -> &Event<ItemRef>;

    fn item_checked(&self) -> &Event<ItemRef>;
}

pub(crate) fn is_checked(item: &ItemRef) -> Option<bool> {
    item.as_checkable().map(|c| c.checked())
}

/// Publishers for the five model streams. Embed it in a model and forward
/// the `TreeModel` event accessors to it.
#[derive(Debug, Default)]
pub struct TreeModelBase {
    items_reset: EventPublisher<Option<ItemRef>>,
    item_changed: EventPublisher<ItemRef>,
    item_inserted: EventPublisher<ItemRef>,
    item_removed: EventPublisher<ItemRef>,
    item_checked: EventPublisher<ItemRef>,
}

impl TreeModelBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items_reset(&self) -> &Event<Option<ItemRef>> {
        self.items_reset.event()
    }

    pub fn item_changed(&self) -> &Event<ItemRef> {
        self.item_changed.event()
    }

    pub fn item_inserted(&self) -> &Event<ItemRef> {
        self.item_inserted.event()
    }

    pub fn item_removed(&self) -> &Event<ItemRef> {
        self.item_removed.event()
    }

    pub fn item_checked(&self) -> &Event<ItemRef> {
        self.item_checked.event()
    }

    pub fn publish_items_reset(&self, parent: Option<ItemRef>) {
        self.items_reset.publish(&parent);
    }

    pub fn publish_item_changed(&self, item: &ItemRef) {
        self.item_changed.publish(item);
    }

    /// Publish after the item is linked into its parent.
    pub fn publish_item_inserted(&self, item: &ItemRef) {
        self.item_inserted.publish(item);
    }

    /// Publish after the item is unlinked from its parent.
    pub fn publish_item_removed(&self, item: &ItemRef) {
        self.item_removed.publish(item);
    }

    pub fn publish_item_checked(&self, item: &ItemRef) {
        self.item_checked.publish(item);
    }
}
