/*
 * Test doubles shared by the unit tests: an in-memory native tree control
 * that records what the engine asked it to do, and a small folder-style model
 * whose mutations publish the same notifications a real model would.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::event::Event;
use crate::image_cache::{Bitmap, ItemImage};
use crate::model::{CheckableItem, ItemRef, TreeItem, TreeModel, TreeModelBase};
use crate::native::NativeTreeControl;
use crate::types::{
    CheckState, Color, ExpandAction, HitTestInfo, ImageListHandle, InsertPosition,
    NativeItemHandle, NativeItemSpec, Point, Rect,
};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::{Rc, Weak};

// ── FakeTreeControl ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FakeNode {
    parent: Option<NativeItemHandle>,
    spec: NativeItemSpec,
    check: CheckState,
    expanded: bool,
}

#[derive(Debug)]
pub(crate) struct FakeTreeControl {
    next_handle: Cell<isize>,
    nodes: RefCell<HashMap<NativeItemHandle, FakeNode>>,
    order: RefCell<HashMap<Option<NativeItemHandle>, Vec<NativeItemHandle>>>,
    selected: Cell<Option<NativeItemHandle>>,
    visible: RefCell<Vec<NativeItemHandle>>,
    hit: Cell<HitTestInfo>,
    fail_inserts_after: Cell<Option<usize>>,
    insert_calls: Cell<usize>,
    delete_calls: Cell<usize>,
    set_check_calls: Cell<usize>,
    redraw_log: RefCell<Vec<bool>>,
    invalidated: RefCell<Vec<Rect>>,
    image_list: Cell<Option<ImageListHandle>>,
    next_image_list: Cell<isize>,
    next_image_index: Cell<i32>,
    added_images: Cell<usize>,
    destroyed_lists: RefCell<Vec<ImageListHandle>>,
    background: Cell<Option<Color>>,
    item_height: Cell<i32>,
}

impl FakeTreeControl {
    pub(crate) fn new() -> Self {
        Self {
            next_handle: Cell::new(100),
            nodes: RefCell::new(HashMap::new()),
            order: RefCell::new(HashMap::new()),
            selected: Cell::new(None),
            visible: RefCell::new(Vec::new()),
            hit: Cell::new(HitTestInfo::nowhere()),
            fail_inserts_after: Cell::new(None),
            insert_calls: Cell::new(0),
            delete_calls: Cell::new(0),
            set_check_calls: Cell::new(0),
            redraw_log: RefCell::new(Vec::new()),
            invalidated: RefCell::new(Vec::new()),
            image_list: Cell::new(None),
            next_image_list: Cell::new(1),
            next_image_index: Cell::new(0),
            added_images: Cell::new(0),
            destroyed_lists: RefCell::new(Vec::new()),
            background: Cell::new(None),
            item_height: Cell::new(16),
        }
    }

    /// Handles of the children of `parent` in native display order.
    pub(crate) fn child_handles(&self, parent: Option<NativeItemHandle>) -> Vec<NativeItemHandle> {
        self.order.borrow().get(&parent).cloned().unwrap_or_default()
    }

    /// Texts of the children of `parent` in native display order.
    pub(crate) fn child_texts(&self, parent: Option<NativeItemHandle>) -> Vec<String> {
        let nodes = self.nodes.borrow();
        self.child_handles(parent)
            .iter()
            .map(|h| nodes[h].spec.text.clone())
            .collect()
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub(crate) fn is_live(&self, handle: NativeItemHandle) -> bool {
        self.nodes.borrow().contains_key(&handle)
    }

    pub(crate) fn text_of(&self, handle: NativeItemHandle) -> Option<String> {
        self.nodes.borrow().get(&handle).map(|n| n.spec.text.clone())
    }

    pub(crate) fn has_children_flag(&self, handle: NativeItemHandle) -> Option<bool> {
        self.nodes.borrow().get(&handle).map(|n| n.spec.has_children)
    }

    pub(crate) fn image_index_of(&self, handle: NativeItemHandle) -> Option<i32> {
        self.nodes.borrow().get(&handle).and_then(|n| n.spec.image_index)
    }

    pub(crate) fn selected(&self) -> Option<NativeItemHandle> {
        self.selected.get()
    }

    pub(crate) fn made_visible(&self) -> Vec<NativeItemHandle> {
        self.visible.borrow().clone()
    }

    /// Scripts the result of the next hit tests.
    pub(crate) fn set_hit(&self, hit: HitTestInfo) {
        self.hit.set(hit);
    }

    /// Lets `count` further inserts succeed, then fails every following one.
    pub(crate) fn fail_inserts_after(&self, count: usize) {
        self.fail_inserts_after.set(Some(self.insert_calls.get() + count));
    }

    pub(crate) fn insert_calls(&self) -> usize {
        self.insert_calls.get()
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.delete_calls.get()
    }

    pub(crate) fn set_check_calls(&self) -> usize {
        self.set_check_calls.get()
    }

    pub(crate) fn redraw_log(&self) -> Vec<bool> {
        self.redraw_log.borrow().clone()
    }

    pub(crate) fn invalidated_count(&self) -> usize {
        self.invalidated.borrow().len()
    }

    pub(crate) fn attached_image_list(&self) -> Option<ImageListHandle> {
        self.image_list.get()
    }

    pub(crate) fn added_image_count(&self) -> usize {
        self.added_images.get()
    }

    pub(crate) fn destroyed_image_lists(&self) -> Vec<ImageListHandle> {
        self.destroyed_lists.borrow().clone()
    }

    pub(crate) fn background(&self) -> Option<Color> {
        self.background.get()
    }

    fn node_exists(&self, handle: NativeItemHandle, operation: &str) -> PlatformResult<()> {
        if self.is_live(handle) {
            Ok(())
        } else {
            Err(PlatformError::native_failed(operation))
        }
    }

    fn delete_subtree(&self, handle: NativeItemHandle) {
        let children = self.child_handles(Some(handle));
        for child in children {
            self.delete_subtree(child);
        }
        self.order.borrow_mut().remove(&Some(handle));
        self.nodes.borrow_mut().remove(&handle);
        if self.selected.get() == Some(handle) {
            self.selected.set(None);
        }
    }

    fn next_image_index(&self) -> i32 {
        let index = self.next_image_index.get();
        self.next_image_index.set(index + 1);
        self.added_images.set(self.added_images.get() + 1);
        index
    }
}

impl NativeTreeControl for FakeTreeControl {
    fn insert_item(
        &self,
        parent: Option<NativeItemHandle>,
        position: InsertPosition,
        spec: &NativeItemSpec,
    ) -> PlatformResult<NativeItemHandle> {
        let call = self.insert_calls.get();
        self.insert_calls.set(call + 1);
        if self.fail_inserts_after.get().is_some_and(|limit| call >= limit) {
            return Err(PlatformError::native_failed("TVM_INSERTITEMW"));
        }
        if let Some(p) = parent {
            self.node_exists(p, "TVM_INSERTITEMW")?;
        }

        let handle = NativeItemHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);

        let mut order = self.order.borrow_mut();
        let siblings = order.entry(parent).or_default();
        let at = match position {
            InsertPosition::First => 0,
            InsertPosition::After(anchor) => match siblings.iter().position(|h| *h == anchor) {
                Some(i) => i + 1,
                None => return Err(PlatformError::native_failed("TVM_INSERTITEMW")),
            },
        };
        siblings.insert(at, handle);

        self.nodes.borrow_mut().insert(
            handle,
            FakeNode {
                parent,
                spec: spec.clone(),
                check: spec.check_state.unwrap_or(CheckState::Unchecked),
                expanded: false,
            },
        );
        Ok(handle)
    }

    fn delete_item(&self, handle: NativeItemHandle) -> PlatformResult<()> {
        self.delete_calls.set(self.delete_calls.get() + 1);
        self.node_exists(handle, "TVM_DELETEITEM")?;
        let parent = self.nodes.borrow()[&handle].parent;
        self.delete_subtree(handle);
        if let Some(siblings) = self.order.borrow_mut().get_mut(&parent) {
            siblings.retain(|h| *h != handle);
        }
        Ok(())
    }

    fn delete_all_items(&self) -> PlatformResult<()> {
        self.nodes.borrow_mut().clear();
        self.order.borrow_mut().clear();
        self.selected.set(None);
        Ok(())
    }

    fn update_item(&self, handle: NativeItemHandle, spec: &NativeItemSpec) -> PlatformResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes
            .get_mut(&handle)
            .ok_or_else(|| PlatformError::native_failed("TVM_SETITEMW"))?;
        node.spec.text = spec.text.clone();
        node.spec.image_index = spec.image_index;
        node.spec.has_children = spec.has_children;
        Ok(())
    }

    fn check_state(&self, handle: NativeItemHandle) -> CheckState {
        self.nodes
            .borrow()
            .get(&handle)
            .map(|n| n.check)
            .unwrap_or(CheckState::Unchecked)
    }

    fn set_check_state(&self, handle: NativeItemHandle, state: CheckState) -> PlatformResult<()> {
        self.set_check_calls.set(self.set_check_calls.get() + 1);
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes
            .get_mut(&handle)
            .ok_or_else(|| PlatformError::native_failed("TVM_SETITEMW"))?;
        node.check = state;
        Ok(())
    }

    fn is_expanded(&self, handle: NativeItemHandle) -> PlatformResult<bool> {
        self.nodes
            .borrow()
            .get(&handle)
            .map(|n| n.expanded)
            .ok_or_else(|| PlatformError::native_failed("TVM_GETITEMW"))
    }

    fn expand(&self, handle: NativeItemHandle, action: ExpandAction) -> PlatformResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes
            .get_mut(&handle)
            .ok_or_else(|| PlatformError::native_failed("TVM_EXPAND"))?;
        node.expanded = match action {
            ExpandAction::Expand | ExpandAction::ExpandPartial => true,
            ExpandAction::Collapse | ExpandAction::CollapseReset => false,
            ExpandAction::Toggle => !node.expanded,
        };
        Ok(())
    }

    fn select_item(&self, handle: NativeItemHandle) -> PlatformResult<()> {
        self.node_exists(handle, "TVM_SELECTITEM")?;
        self.selected.set(Some(handle));
        Ok(())
    }

    fn ensure_visible(&self, handle: NativeItemHandle) {
        self.visible.borrow_mut().push(handle);
    }

    fn hit_test(&self, _point: Point) -> HitTestInfo {
        self.hit.get()
    }

    fn item_rect(&self, handle: NativeItemHandle) -> Option<Rect> {
        self.is_live(handle).then_some(Rect {
            left: 0,
            top: 0,
            right: 100,
            bottom: self.item_height.get(),
        })
    }

    fn invalidate_rect(&self, rect: Rect) {
        self.invalidated.borrow_mut().push(rect);
    }

    fn set_image_list(&self, list: Option<ImageListHandle>) {
        self.image_list.set(list);
    }

    fn create_image_list(&self, _dpi: u32) -> PlatformResult<ImageListHandle> {
        let handle = ImageListHandle(self.next_image_list.get());
        self.next_image_list.set(handle.0 + 1);
        Ok(handle)
    }

    fn system_image_list(&self, _dpi: u32) -> PlatformResult<ImageListHandle> {
        Ok(ImageListHandle(-1))
    }

    fn destroy_image_list(&self, list: ImageListHandle) {
        self.destroyed_lists.borrow_mut().push(list);
    }

    fn add_bitmap(
        &self,
        _list: ImageListHandle,
        _bitmap: &Bitmap,
        _dpi: u32,
    ) -> PlatformResult<i32> {
        Ok(self.next_image_index())
    }

    fn add_file_icon(&self, _list: ImageListHandle, _path: &Path, _dpi: u32) -> PlatformResult<i32> {
        Ok(self.next_image_index())
    }

    fn system_icon_index(&self, _path: &Path) -> PlatformResult<i32> {
        Ok(self.next_image_index())
    }

    fn set_background_color(&self, color: Option<Color>) {
        self.background.set(color);
    }

    fn item_height(&self) -> i32 {
        self.item_height.get()
    }

    fn set_item_height(&self, height: i32) {
        self.item_height.set(height);
    }

    fn set_redraw(&self, enabled: bool) {
        self.redraw_log.borrow_mut().push(enabled);
    }
}

// ── TestItem / TestModel ────────────────────────────────────────────────────

pub(crate) struct TestItem {
    text: RefCell<String>,
    parent: RefCell<Weak<TestItem>>,
    children: RefCell<Vec<Rc<TestItem>>>,
    checked: Option<Cell<bool>>,
    image: RefCell<Option<ItemImage>>,
}

impl TestItem {
    fn build(text: &str, checked: Option<bool>) -> Rc<Self> {
        Rc::new(Self {
            text: RefCell::new(text.to_string()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            checked: checked.map(Cell::new),
            image: RefCell::new(None),
        })
    }

    /// Unlinked item without a checkbox.
    pub(crate) fn root(text: &str) -> Rc<Self> {
        Self::build(text, None)
    }

    /// Unlinked checkable item.
    pub(crate) fn checkable(text: &str, checked: bool) -> Rc<Self> {
        Self::build(text, Some(checked))
    }

    /// Appends a new plain child to `parent` without publishing anything.
    pub(crate) fn child(parent: &Rc<Self>, text: &str) -> Rc<Self> {
        let child = Self::build(text, None);
        Self::link(parent, child.clone(), usize::MAX);
        child
    }

    /// Appends a new checkable child to `parent` without publishing anything.
    pub(crate) fn checkable_child(parent: &Rc<Self>, text: &str, checked: bool) -> Rc<Self> {
        let child = Self::build(text, Some(checked));
        Self::link(parent, child.clone(), usize::MAX);
        child
    }

    fn link(parent: &Rc<Self>, child: Rc<Self>, index: usize) {
        *child.parent.borrow_mut() = Rc::downgrade(parent);
        let mut children = parent.children.borrow_mut();
        let at = index.min(children.len());
        children.insert(at, child);
    }

    pub(crate) fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }

    pub(crate) fn set_image(&self, image: Option<ItemImage>) {
        *self.image.borrow_mut() = image;
    }

    pub(crate) fn is_checked(&self) -> bool {
        self.checked.as_ref().is_some_and(Cell::get)
    }

    pub(crate) fn as_item(self: &Rc<Self>) -> ItemRef {
        self.clone()
    }
}

impl TreeItem for TestItem {
    fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn image(&self) -> Option<ItemImage> {
        self.image.borrow().clone()
    }

    fn parent(&self) -> Option<ItemRef> {
        self.parent
            .borrow()
            .upgrade()
            .map(|parent| parent as ItemRef)
    }

    fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    fn child_at(&self, index: usize) -> Option<ItemRef> {
        self.children
            .borrow()
            .get(index)
            .map(|child| child.clone() as ItemRef)
    }

    fn as_checkable(&self) -> Option<&dyn CheckableItem> {
        if self.checked.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl CheckableItem for TestItem {
    fn checked(&self) -> bool {
        self.is_checked()
    }

    fn set_checked(&self, checked: bool) {
        if let Some(cell) = &self.checked {
            cell.set(checked);
        }
    }
}

pub(crate) struct TestModel {
    base: TreeModelBase,
    roots: RefCell<Vec<Rc<TestItem>>>,
    lazy: bool,
}

impl TestModel {
    pub(crate) fn new(lazy: bool, roots: Vec<Rc<TestItem>>) -> Rc<Self> {
        Rc::new(Self {
            base: TreeModelBase::new(),
            roots: RefCell::new(roots),
            lazy,
        })
    }

    pub(crate) fn as_model(self: &Rc<Self>) -> Rc<dyn TreeModel> {
        self.clone()
    }

    /// Links `child` at `index` under `parent` and publishes item-inserted.
    pub(crate) fn insert_child(&self, parent: &Rc<TestItem>, index: usize, child: Rc<TestItem>) {
        TestItem::link(parent, child.clone(), index);
        self.base.publish_item_inserted(&child.as_item());
    }

    pub(crate) fn insert_root(&self, index: usize, root: Rc<TestItem>) {
        {
            let mut roots = self.roots.borrow_mut();
            let at = index.min(roots.len());
            roots.insert(at, root.clone());
        }
        self.base.publish_item_inserted(&root.as_item());
    }

    /// Unlinks the child at `index` and publishes item-removed.
    pub(crate) fn remove_child(&self, parent: &Rc<TestItem>, index: usize) -> Rc<TestItem> {
        let child = parent.children.borrow_mut().remove(index);
        *child.parent.borrow_mut() = Weak::new();
        self.base.publish_item_removed(&child.as_item());
        child
    }

    pub(crate) fn rename(&self, item: &Rc<TestItem>, text: &str) {
        item.set_text(text);
        self.base.publish_item_changed(&item.as_item());
    }

    pub(crate) fn set_checked(&self, item: &Rc<TestItem>, checked: bool) {
        item.set_checked(checked);
        self.base.publish_item_checked(&item.as_item());
    }

    /// Replaces the children of `parent` and publishes a scoped reset.
    pub(crate) fn replace_children(&self, parent: &Rc<TestItem>, texts: &[&str]) {
        for old in parent.children.borrow_mut().drain(..) {
            *old.parent.borrow_mut() = Weak::new();
        }
        for text in texts {
            TestItem::child(parent, text);
        }
        self.base.publish_items_reset(Some(parent.as_item()));
    }

    pub(crate) fn reset_all(&self) {
        self.base.publish_items_reset(None);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.base.items_reset().handler_count()
            + self.base.item_changed().handler_count()
            + self.base.item_inserted().handler_count()
            + self.base.item_removed().handler_count()
            + self.base.item_checked().handler_count()
    }
}

impl TreeModel for TestModel {
    fn lazy_population(&self) -> bool {
        self.lazy
    }

    fn root_count(&self) -> usize {
        self.roots.borrow().len()
    }

    fn root_at(&self, index: usize) -> Option<ItemRef> {
        self.roots
            .borrow()
            .get(index)
            .map(|root| root.clone() as ItemRef)
    }

    fn items_reset(&self) -> &Event<Option<ItemRef>> {
        self.base.items_reset()
    }

    fn item_changed(&self) -> &Event<ItemRef> {
        self.base.item_changed()
    }

    fn item_inserted(&self) -> &Event<ItemRef> {
        self.base.item_inserted()
    }

    fn item_removed(&self) -> &Event<ItemRef> {
        self.base.item_removed()
    }

    fn item_checked(&self) -> &Event<ItemRef> {
        self.base.item_checked()
    }
}
