/*
 * The tree view reconciliation engine.
 *
 * `TreeView` keeps a native tree control in step with a `TreeModel`. Model
 * items are realized (given a native handle) lazily or eagerly depending on
 * the model's `lazy_population` flag; the `ItemRegistry` maps realized items
 * to handles and back. Model notifications drive inserts, removals, updates
 * and resets; native notifications (expand, selection, activation, checkbox
 * clicks) are fed in through `handle_notification`.
 *
 * Everything runs on the UI thread. Native calls can synchronously re-enter
 * the engine (TVM_EXPAND raises TVN_ITEMEXPANDING, deleting the selection
 * raises TVN_SELCHANGED), and event handlers may mutate the model from inside
 * a publish. To stay sound under that re-entrancy no `RefCell` borrow is held
 * across a native call or an event publish, and each registry update is
 * completed before the corresponding event goes out.
 */

mod registry;

use crate::error::{PlatformError, Result as PlatformResult};
use crate::event::{Event, EventHandle, EventPublisher};
use crate::image_cache::ImageCache;
use crate::model::{ItemKey, ItemRef, TreeModel, is_checked, same_item};
use crate::native::NativeTreeControl;
use crate::types::{
    CheckState, Color, ExpandAction, HitRegion, InsertPosition, NativeItemHandle, NativeItemSpec,
    Point, TreeNotification, TreeViewConfig,
};

use registry::ItemRegistry;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

struct ModelSubscriptions {
    items_reset: EventHandle,
    item_changed: EventHandle,
    item_inserted: EventHandle,
    item_removed: EventHandle,
    item_checked: EventHandle,
}

pub struct TreeView<C: NativeTreeControl + 'static> {
    control: C,
    self_ref: Weak<TreeView<C>>,
    checkboxes: bool,
    model: RefCell<Option<Rc<dyn TreeModel>>>,
    subscriptions: RefCell<Option<ModelSubscriptions>>,
    lazy_population: Cell<bool>,
    registry: RefCell<ItemRegistry>,
    current_item: RefCell<Option<ItemRef>>,
    images: RefCell<ImageCache>,
    suspend_depth: Cell<u32>,
    expanded_changed: EventPublisher<ItemRef>,
    current_item_changed: EventPublisher<()>,
    item_activated: EventPublisher<()>,
    item_checked: EventPublisher<ItemRef>,
}

/*
 * Keeps redrawing of the control switched off while alive. Guards nest; the
 * control repaints when the outermost guard is dropped.
 */
pub struct SuspendGuard<'a, C: NativeTreeControl + 'static> {
    view: &'a TreeView<C>,
}

impl<C: NativeTreeControl + 'static> Drop for SuspendGuard<'_, C> {
    fn drop(&mut self) {
        let depth = self.view.suspend_depth.get().saturating_sub(1);
        self.view.suspend_depth.set(depth);
        if depth == 0 {
            self.view.control.set_redraw(true);
        }
    }
}

impl<C: NativeTreeControl + 'static> TreeView<C> {
    /*
     * Wraps an already created native control. The configuration is applied
     * immediately; no model is attached yet.
     */
    pub fn new(control: C, config: &TreeViewConfig) -> Rc<Self> {
        let view = Rc::new_cyclic(|self_ref| Self {
            control,
            self_ref: self_ref.clone(),
            checkboxes: config.checkboxes,
            model: RefCell::new(None),
            subscriptions: RefCell::new(None),
            lazy_population: Cell::new(false),
            registry: RefCell::new(ItemRegistry::new()),
            current_item: RefCell::new(None),
            images: RefCell::new(ImageCache::new(config.initial_dpi)),
            suspend_depth: Cell::new(0),
            expanded_changed: EventPublisher::new(),
            current_item_changed: EventPublisher::new(),
            item_activated: EventPublisher::new(),
            item_checked: EventPublisher::new(),
        });
        view.set_background(config.background);
        if let Some(height) = config.item_height {
            view.set_item_height(height);
        }
        view
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn suspend(&self) -> SuspendGuard<'_, C> {
        let depth = self.suspend_depth.get();
        if depth == 0 {
            self.control.set_redraw(false);
        }
        self.suspend_depth.set(depth + 1);
        SuspendGuard { view: self }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend_depth.get() > 0
    }

    // ── Events ──────────────────────────────────────────────────────────────

    pub fn expanded_changed(&self) -> &Event<ItemRef> {
        self.expanded_changed.event()
    }

    pub fn current_item_changed(&self) -> &Event<()> {
        self.current_item_changed.event()
    }

    pub fn item_activated(&self) -> &Event<()> {
        self.item_activated.event()
    }

    pub fn item_checked(&self) -> &Event<ItemRef> {
        self.item_checked.event()
    }

    // ── Model attachment ────────────────────────────────────────────────────

    pub fn model(&self) -> Option<Rc<dyn TreeModel>> {
        self.model.borrow().clone()
    }

    pub fn lazy_population(&self) -> bool {
        self.lazy_population.get()
    }

    /*
     * Detaches the previous model, attaches `model` (if any) and rebuilds the
     * native tree from scratch. The lazy-population flag is read once here.
     */
    pub fn set_model(&self, model: Option<Rc<dyn TreeModel>>) -> PlatformResult<()> {
        self.detach_model();

        if let Some(model) = &model {
            self.lazy_population.set(model.lazy_population());
            let subscriptions = self.subscribe(model.as_ref());
            *self.subscriptions.borrow_mut() = Some(subscriptions);
            log::debug!(
                "TreeView: attached model (lazy population: {})",
                self.lazy_population.get()
            );
        }
        *self.model.borrow_mut() = model;

        self.reset_items()
    }

    fn detach_model(&self) {
        let subscriptions = self.subscriptions.borrow_mut().take();
        let previous = self.model.borrow_mut().take();
        if let (Some(model), Some(subs)) = (previous, subscriptions) {
            model.items_reset().detach(subs.items_reset);
            model.item_changed().detach(subs.item_changed);
            model.item_inserted().detach(subs.item_inserted);
            model.item_removed().detach(subs.item_removed);
            model.item_checked().detach(subs.item_checked);
            log::debug!("TreeView: detached previous model");
        }
        self.images.borrow_mut().dispose(&self.control);
    }

    /*
     * Model handlers cannot return errors to the publisher, so failures are
     * logged here and the notification is otherwise dropped.
     */
    fn subscribe(&self, model: &dyn TreeModel) -> ModelSubscriptions {
        let weak = self.self_ref.clone();
        let items_reset = model.items_reset().attach(move |scope: &Option<ItemRef>| {
            let Some(view) = weak.upgrade() else { return };
            if let Err(e) = view.reset(scope.as_ref()) {
                log::warn!("TreeView: items-reset handling failed: {e}");
            }
        });

        let weak = self.self_ref.clone();
        let item_changed = model.item_changed().attach(move |item: &ItemRef| {
            let Some(view) = weak.upgrade() else { return };
            if !view.is_realized(item) {
                return;
            }
            if let Err(e) = view.update(item) {
                log::warn!("TreeView: item-changed handling failed: {e}");
            }
        });

        let weak = self.self_ref.clone();
        let item_inserted = model.item_inserted().attach(move |item: &ItemRef| {
            let Some(view) = weak.upgrade() else { return };
            if let Err(e) = view.insert(item) {
                log::warn!("TreeView: item-inserted handling failed: {e}");
            }
        });

        let weak = self.self_ref.clone();
        let item_removed = model.item_removed().attach(move |item: &ItemRef| {
            let Some(view) = weak.upgrade() else { return };
            // Items under never-expanded lazy parents were never realized.
            if !view.is_realized(item) {
                return;
            }
            if let Err(e) = view.remove(item) {
                log::warn!("TreeView: item-removed handling failed: {e}");
            }
        });

        let weak = self.self_ref.clone();
        let item_checked = model.item_checked().attach(move |item: &ItemRef| {
            let Some(view) = weak.upgrade() else { return };
            view.on_model_item_checked(item);
        });

        ModelSubscriptions {
            items_reset,
            item_changed,
            item_inserted,
            item_removed,
            item_checked,
        }
    }

    fn on_model_item_checked(&self, item: &ItemRef) {
        let checked = is_checked(item).filter(|_| self.is_realized(item));
        if let Some(checked) = checked {
            if let Err(e) = self.set_checked(item, checked) {
                log::warn!("TreeView: item-checked handling failed: {e}");
                return;
            }
        }
        self.item_checked.publish(item);
    }

    // ── Inspection ──────────────────────────────────────────────────────────

    pub fn is_realized(&self, item: &ItemRef) -> bool {
        self.registry.borrow().contains(ItemKey::of(item))
    }

    /// Number of realized children, or `None` if `item` itself is not realized.
    pub fn realized_child_count(&self, item: &ItemRef) -> Option<usize> {
        self.registry.borrow().realized_child_count(ItemKey::of(item))
    }

    pub fn realized_item_count(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn handle_for_item(&self, item: &ItemRef) -> PlatformResult<NativeItemHandle> {
        self.registry
            .borrow()
            .handle_for(ItemKey::of(item))
            .ok_or_else(|| PlatformError::invalid_item("item is not realized"))
    }

    pub fn item_for_handle(&self, handle: NativeItemHandle) -> Option<ItemRef> {
        self.registry.borrow().item_for_handle(handle)
    }

    // ── Reset ───────────────────────────────────────────────────────────────

    /*
     * `None` rebuilds the whole tree. `Some(item)` rebuilds the children of a
     * realized item and is a no-op for an unrealized one, since its children
     * will be read fresh when it gets realized.
     */
    pub fn reset(&self, scope: Option<&ItemRef>) -> PlatformResult<()> {
        let Some(parent) = scope else {
            return self.reset_items();
        };
        if !self.is_realized(parent) {
            log::trace!("TreeView: ignoring reset of unrealized subtree");
            return Ok(());
        }

        let mut cleared_current = false;
        let result = {
            let _suspend = self.suspend();
            self.remove_descendants(ItemKey::of(parent), &mut cleared_current)
                .and_then(|()| self.insert_children(parent))
        };
        self.publish_current_cleared(cleared_current);
        result
    }

    /*
     * current-item-changed goes out only once the new roots are in, so an
     * observer that mutates the model sees a consistent registry.
     */
    fn reset_items(&self) -> PlatformResult<()> {
        let mut cleared_current = false;
        let result = {
            let _suspend = self.suspend();
            self.clear_items(&mut cleared_current).and_then(|()| match self.model() {
                Some(model) => self.insert_roots(model.as_ref()),
                None => Ok(()),
            })
        };
        self.publish_current_cleared(cleared_current);
        result
    }

    fn clear_items(&self, cleared_current: &mut bool) -> PlatformResult<()> {
        self.control.delete_all_items()?;
        self.registry.borrow_mut().clear();
        *cleared_current |= self.current_item.borrow_mut().take().is_some();
        Ok(())
    }

    fn publish_current_cleared(&self, cleared_current: bool) {
        if cleared_current {
            self.current_item_changed.publish(&());
        }
    }

    /*
     * Roots go in last to first, each at the front, so the final native order
     * matches model order.
     */
    fn insert_roots(&self, model: &dyn TreeModel) -> PlatformResult<()> {
        for index in (0..model.root_count()).rev() {
            let Some(root) = model.root_at(index) else {
                continue;
            };
            if self.is_realized(&root) {
                continue;
            }
            self.insert_item_after(&root, InsertPosition::First)?;
        }
        log::debug!(
            "TreeView: realized {} items after reset",
            self.realized_item_count()
        );
        Ok(())
    }

    // ── Insertion ───────────────────────────────────────────────────────────

    /*
     * Realizes a newly inserted model item next to its nearest realized
     * preceding sibling. Under lazy population an insert below a realized
     * parent whose children were never populated only refreshes the parent's
     * expand button; the new child is realized with its siblings on first
     * expansion.
     */
    pub fn insert(&self, item: &ItemRef) -> PlatformResult<()> {
        if self.is_realized(item) {
            log::trace!("TreeView: insert of already realized item ignored");
            return Ok(());
        }

        let parent = item.parent();
        if let Some(parent) = &parent {
            let (realized_children, parent_handle) = {
                let registry = self.registry.borrow();
                let key = ItemKey::of(parent);
                (registry.realized_child_count(key), registry.handle_for(key))
            };
            let (Some(realized_children), Some(parent_handle)) = (realized_children, parent_handle)
            else {
                return Err(PlatformError::invalid_item("parent is not realized"));
            };
            if self.lazy_population.get()
                && realized_children == 0
                && !self.control.is_expanded(parent_handle)?
            {
                log::trace!("TreeView: deferring insert below unpopulated lazy parent");
                return self.update(parent);
            }
        }

        let index = self
            .index_among_siblings(parent.as_ref(), item)
            .ok_or_else(|| PlatformError::invalid_item("item not found among its siblings"))?;

        let _suspend = self.suspend();
        let position = self.insertion_anchor(parent.as_ref(), index);
        self.insert_item_after(item, position)?;
        Ok(())
    }

    fn sibling_at(&self, parent: Option<&ItemRef>, index: usize) -> Option<ItemRef> {
        match parent {
            Some(parent) => parent.child_at(index),
            None => self.model().and_then(|model| model.root_at(index)),
        }
    }

    fn sibling_count(&self, parent: Option<&ItemRef>) -> usize {
        match parent {
            Some(parent) => parent.child_count(),
            None => self.model().map_or(0, |model| model.root_count()),
        }
    }

    fn index_among_siblings(&self, parent: Option<&ItemRef>, item: &ItemRef) -> Option<usize> {
        (0..self.sibling_count(parent)).rev().find(|&index| {
            self.sibling_at(parent, index)
                .is_some_and(|sibling| same_item(&sibling, item))
        })
    }

    /*
     * Unrealized siblings are skipped: the new item goes right after the
     * closest preceding sibling that has a native handle, or first.
     */
    fn insertion_anchor(&self, parent: Option<&ItemRef>, index: usize) -> InsertPosition {
        for sibling_index in (0..index).rev() {
            let Some(sibling) = self.sibling_at(parent, sibling_index) else {
                continue;
            };
            if let Some(handle) = self.registry.borrow().handle_for(ItemKey::of(&sibling)) {
                return InsertPosition::After(handle);
            }
        }
        InsertPosition::First
    }

    fn item_spec(&self, item: &ItemRef) -> NativeItemSpec {
        let image_index = item.image().and_then(|image| {
            match self.images.borrow_mut().index_for(&self.control, &image) {
                Ok(index) => Some(index),
                Err(e) => {
                    log::warn!("TreeView: no image index for '{}': {e}", item.text());
                    None
                }
            }
        });
        NativeItemSpec {
            text: item.text(),
            image_index,
            check_state: is_checked(item).map(CheckState::from_bool),
            has_children: item.has_children(),
        }
    }

    fn insert_item_after(
        &self,
        item: &ItemRef,
        position: InsertPosition,
    ) -> PlatformResult<NativeItemHandle> {
        let parent_key = item.parent().map(|parent| ItemKey::of(&parent));
        let parent_handle = match parent_key {
            Some(key) => Some(
                self.registry
                    .borrow()
                    .handle_for(key)
                    .ok_or_else(|| PlatformError::invalid_item("parent is not realized"))?,
            ),
            None => None,
        };

        let spec = self.item_spec(item);
        let handle = self.control.insert_item(parent_handle, position, &spec)?;
        self.registry
            .borrow_mut()
            .register(item, handle, parent_key);
        log::trace!("TreeView: realized '{}' as {handle:?}", spec.text);

        if !self.lazy_population.get() {
            self.insert_children(item)?;
        }
        Ok(handle)
    }

    /*
     * Realizes every not yet realized child of a realized item. Children are
     * walked last to first and anchored after their closest realized
     * predecessor, so already realized children keep their handles and the
     * native order still matches the model.
     */
    fn insert_children(&self, parent: &ItemRef) -> PlatformResult<()> {
        if !self.is_realized(parent) {
            return Err(PlatformError::invalid_item("parent is not realized"));
        }
        for index in (0..parent.child_count()).rev() {
            let Some(child) = parent.child_at(index) else {
                continue;
            };
            if self.is_realized(&child) {
                continue;
            }
            let position = self.insertion_anchor(Some(parent), index);
            self.insert_item_after(&child, position)?;
        }
        Ok(())
    }

    /*
     * Makes sure `item` has a native handle by populating the unrealized part
     * of its ancestor chain from the top down.
     */
    pub fn ensure_realized(&self, item: &ItemRef) -> PlatformResult<()> {
        if self.is_realized(item) {
            return Ok(());
        }

        let _suspend = self.suspend();
        let mut chain = Vec::new();
        let mut current = item.clone();
        while !self.is_realized(&current) {
            let Some(parent) = current.parent() else {
                return Err(PlatformError::invalid_item(
                    "item is not connected to a realized ancestor",
                ));
            };
            chain.push(parent.clone());
            current = parent;
        }

        for ancestor in chain.iter().rev() {
            self.insert_children(ancestor)?;
        }

        if self.is_realized(item) {
            Ok(())
        } else {
            Err(PlatformError::invalid_item(
                "item is not among its parent's children",
            ))
        }
    }

    // ── Removal and update ──────────────────────────────────────────────────

    /*
     * Removes `item` and all of its realized descendants from the control. If
     * the current item was among them, current-item-changed is published after
     * the whole subtree is gone.
     */
    pub fn remove(&self, item: &ItemRef) -> PlatformResult<()> {
        let mut cleared_current = false;
        let result = self.remove_item(ItemKey::of(item), &mut cleared_current);
        self.publish_current_cleared(cleared_current);
        result
    }

    fn remove_item(&self, key: ItemKey, cleared_current: &mut bool) -> PlatformResult<()> {
        self.remove_descendants(key, cleared_current)?;

        let handle = self
            .registry
            .borrow()
            .handle_for(key)
            .ok_or_else(|| PlatformError::invalid_item("item is not realized"))?;
        self.control.delete_item(handle)?;
        self.registry.borrow_mut().unregister(key);
        log::trace!("TreeView: removed {handle:?}");

        let was_current = self
            .current_item
            .borrow()
            .as_ref()
            .is_some_and(|current| ItemKey::of(current) == key);
        if was_current {
            *self.current_item.borrow_mut() = None;
            *cleared_current = true;
        }
        Ok(())
    }

    fn remove_descendants(&self, key: ItemKey, cleared_current: &mut bool) -> PlatformResult<()> {
        let children: Vec<ItemKey> = {
            let registry = self.registry.borrow();
            let info = registry
                .info(key)
                .ok_or_else(|| PlatformError::invalid_item("item is not realized"))?;
            info.children.keys().copied().collect()
        };
        for child in children {
            // Deleting the selected item re-enters with a selection change;
            // an observer of that change may already have removed this child.
            if !self.registry.borrow().contains(child) {
                continue;
            }
            self.remove_item(child, cleared_current)?;
        }
        Ok(())
    }

    /// Pushes the current text, image and children flag of a realized item.
    pub fn update(&self, item: &ItemRef) -> PlatformResult<()> {
        let handle = self.handle_for_item(item)?;
        let spec = self.item_spec(item);
        self.control.update_item(handle, &spec)
    }

    // ── Check state ─────────────────────────────────────────────────────────

    /// Native check state; `false` for unrealized items.
    pub fn checked(&self, item: &ItemRef) -> bool {
        match self.handle_for_item(item) {
            Ok(handle) => self.control.check_state(handle).is_checked(),
            Err(_) => false,
        }
    }

    /// Sets the native check state of a realized item and repaints it. The
    /// model is not touched.
    pub fn set_checked(&self, item: &ItemRef, checked: bool) -> PlatformResult<()> {
        let handle = self.handle_for_item(item)?;
        self.control
            .set_check_state(handle, CheckState::from_bool(checked))?;
        if let Some(rect) = self.control.item_rect(handle) {
            self.control.invalidate_rect(rect);
        }
        Ok(())
    }

    /*
     * Copies the model's check state onto `item` and its realized descendants.
     * Unrealized subtrees are left alone; they pick up the model state when
     * they are realized.
     */
    fn apply_check_state_recursive(&self, item: &ItemRef) -> PlatformResult<()> {
        if let Some(checked) = is_checked(item) {
            self.set_checked(item, checked)?;
        }
        self.apply_check_state_to_realized_children(item)
    }

    fn apply_check_state_to_realized_children(&self, item: &ItemRef) -> PlatformResult<()> {
        let children = self.registry.borrow().realized_children(ItemKey::of(item));
        for child in &children {
            self.apply_check_state_recursive(child)?;
        }
        Ok(())
    }

    /// Resynchronizes the native checkboxes of every realized item from the model.
    pub fn apply_root_check_states(&self) -> PlatformResult<()> {
        let Some(model) = self.model() else {
            return Ok(());
        };
        let _suspend = self.suspend();
        for index in 0..model.root_count() {
            let Some(root) = model.root_at(index) else {
                continue;
            };
            if self.is_realized(&root) {
                self.apply_check_state_recursive(&root)?;
            }
        }
        Ok(())
    }

    /*
     * User toggled the checkbox of `item`: flip the model value, give every
     * model descendant the same value, repaint realized descendants and
     * publish a single item-checked for `item`. The control flips the clicked
     * item's own state image itself once the click is processed.
     */
    fn toggle_checked(&self, item: &ItemRef) -> PlatformResult<()> {
        let Some(checkable) = item.as_checkable() else {
            return Ok(());
        };
        let checked = !checkable.checked();
        checkable.set_checked(checked);
        set_descendants_checked(item, checked);

        let native_result = {
            let _suspend = self.suspend();
            self.apply_check_state_to_realized_children(item)
        };
        self.item_checked.publish(item);
        native_result
    }

    /// Rewrites the native checkbox of `handle` from the model value.
    pub fn resync_check_state(&self, handle: NativeItemHandle) -> PlatformResult<()> {
        let item = self
            .item_for_handle(handle)
            .ok_or_else(|| PlatformError::invalid_item("unknown native handle"))?;
        match is_checked(&item) {
            Some(checked) => self.set_checked(&item, checked),
            None => Ok(()),
        }
    }

    // ── Expansion ───────────────────────────────────────────────────────────

    pub fn expanded(&self, item: &ItemRef) -> bool {
        let Ok(handle) = self.handle_for_item(item) else {
            return false;
        };
        match self.control.is_expanded(handle) {
            Ok(expanded) => expanded,
            Err(e) => {
                log::warn!("TreeView: reading expanded state failed: {e}");
                false
            }
        }
    }

    /*
     * Expanding populates a lazy item up front, so the children exist even if
     * the control does not route TVN_ITEMEXPANDING back to us.
     */
    pub fn set_expanded(&self, item: &ItemRef, expanded: bool) -> PlatformResult<()> {
        if expanded {
            self.ensure_realized(item)?;
            self.populate_lazy_children(item)?;
        }
        let handle = self.handle_for_item(item)?;
        let action = if expanded {
            ExpandAction::Expand
        } else {
            ExpandAction::Collapse
        };
        self.control.expand(handle, action)
    }

    /// Expands every item that has children, realizing lazy subtrees on the way.
    pub fn expand_all(&self) -> PlatformResult<()> {
        let Some(model) = self.model() else {
            return Ok(());
        };
        let _suspend = self.suspend();
        for index in 0..model.root_count() {
            if let Some(root) = model.root_at(index) {
                self.expand_subtree(&root)?;
            }
        }
        Ok(())
    }

    fn expand_subtree(&self, item: &ItemRef) -> PlatformResult<()> {
        if !item.has_children() {
            return Ok(());
        }
        self.set_expanded(item, true)?;
        for index in 0..item.child_count() {
            if let Some(child) = item.child_at(index) {
                self.expand_subtree(&child)?;
            }
        }
        Ok(())
    }

    // ── Selection and geometry ──────────────────────────────────────────────

    pub fn current_item(&self) -> Option<ItemRef> {
        self.current_item.borrow().clone()
    }

    pub fn has_current_item(&self) -> bool {
        self.current_item.borrow().is_some()
    }

    /// Depth of the current item (roots are 0), `None` without a current item.
    pub fn current_item_level(&self) -> Option<usize> {
        let mut item = self.current_item()?.parent();
        let mut level = 0;
        while let Some(parent) = item {
            level += 1;
            item = parent.parent();
        }
        Some(level)
    }

    /*
     * Selects `item`, realizing its ancestors first. The control reports the
     * selection change back through `SelectionChanged`, which publishes
     * current-item-changed.
     */
    pub fn set_current_item(&self, item: &ItemRef) -> PlatformResult<()> {
        let unchanged = self
            .current_item
            .borrow()
            .as_ref()
            .is_some_and(|current| same_item(current, item));
        if unchanged {
            return Ok(());
        }

        self.ensure_realized(item)?;
        let handle = self.handle_for_item(item)?;
        self.control.select_item(handle)?;
        *self.current_item.borrow_mut() = Some(item.clone());
        Ok(())
    }

    pub fn ensure_visible(&self, item: &ItemRef) -> PlatformResult<()> {
        self.ensure_realized(item)?;
        let handle = self.handle_for_item(item)?;
        self.control.ensure_visible(handle);
        Ok(())
    }

    /// Item under `point` (client coordinates, native pixels).
    pub fn item_at(&self, point: Point) -> Option<ItemRef> {
        let hit = self.control.hit_test(point);
        hit.handle.and_then(|handle| self.item_for_handle(handle))
    }

    pub fn item_height(&self) -> i32 {
        self.control.item_height()
    }

    pub fn set_item_height(&self, height: i32) {
        self.control.set_item_height(height);
    }

    pub fn set_background(&self, color: Option<Color>) {
        self.control.set_background_color(color);
    }

    // ── DPI and lifetime ────────────────────────────────────────────────────

    /*
     * Image indices are DPI specific: drop the image list and push fresh
     * indices to every realized item that shows an image.
     */
    pub fn apply_dpi(&self, dpi: u32) -> PlatformResult<()> {
        self.images.borrow_mut().apply_dpi(&self.control, dpi);

        let with_images: Vec<ItemRef> = {
            let registry = self.registry.borrow();
            registry
                .items()
                .filter(|item| item.image().is_some())
                .collect()
        };
        if with_images.is_empty() {
            return Ok(());
        }
        let _suspend = self.suspend();
        for item in &with_images {
            self.update(item)?;
        }
        Ok(())
    }

    pub fn dpi(&self) -> u32 {
        self.images.borrow().dpi()
    }

    /// Detaches the model and releases the image list. The native control
    /// itself belongs to the caller.
    pub fn dispose(&self) {
        self.detach_model();
        self.registry.borrow_mut().clear();
        *self.current_item.borrow_mut() = None;
    }

    // ── Native notifications ────────────────────────────────────────────────

    pub fn handle_notification(&self, notification: TreeNotification) -> PlatformResult<()> {
        match notification {
            TreeNotification::ItemExpanding { handle, action } => {
                if action != ExpandAction::Expand || !self.lazy_population.get() {
                    return Ok(());
                }
                let item = self.notified_item(handle)?;
                self.populate_lazy_children(&item)?;
            }
            TreeNotification::ItemExpanded { handle, action } => {
                let item = self.notified_item(handle)?;
                match action {
                    ExpandAction::Expand => {
                        self.expanded_changed.publish(&item);
                        self.apply_check_state_recursive(&item)?;
                    }
                    ExpandAction::Collapse => self.expanded_changed.publish(&item),
                    _ => {}
                }
            }
            TreeNotification::SelectionChanged { new_handle } => {
                let item = new_handle.and_then(|handle| self.item_for_handle(handle));
                *self.current_item.borrow_mut() = item;
                self.current_item_changed.publish(&());
            }
            TreeNotification::DoubleClick | TreeNotification::ReturnKey => {
                self.item_activated.publish(&());
            }
            TreeNotification::Click { point } => self.handle_click(point)?,
        }
        Ok(())
    }

    fn populate_lazy_children(&self, item: &ItemRef) -> PlatformResult<()> {
        if !self.lazy_population.get() || self.realized_child_count(item) != Some(0) {
            return Ok(());
        }
        log::trace!("TreeView: populating '{}' on expansion", item.text());
        self.insert_children(item)?;
        self.apply_check_state_recursive(item)
    }

    fn notified_item(&self, handle: NativeItemHandle) -> PlatformResult<ItemRef> {
        self.item_for_handle(handle).ok_or_else(|| {
            log::warn!("TreeView: notification for unknown handle {handle:?}");
            PlatformError::invalid_item("notification for unknown native handle")
        })
    }

    fn handle_click(&self, point: Point) -> PlatformResult<()> {
        if !self.checkboxes {
            return Ok(());
        }
        let hit = self.control.hit_test(point);
        if hit.region != HitRegion::StateIcon {
            return Ok(());
        }
        let Some(item) = hit.handle.and_then(|handle| self.item_for_handle(handle)) else {
            return Ok(());
        };
        self.toggle_checked(&item)
    }
}

impl<C: NativeTreeControl + 'static> Drop for TreeView<C> {
    fn drop(&mut self) {
        self.detach_model();
    }
}

/// Model-side propagation: reaches every descendant, realized or not.
fn set_descendants_checked(item: &ItemRef, checked: bool) {
    for index in 0..item.child_count() {
        let Some(child) = item.child_at(index) else {
            continue;
        };
        if let Some(checkable) = child.as_checkable() {
            checkable.set_checked(checked);
        }
        set_descendants_checked(&child, checked);
    }
}
