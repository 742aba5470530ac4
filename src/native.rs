/*
 * The native control surface consumed by the reconciliation engine.
 *
 * On Windows this is implemented by `controls::treeview_handler::Win32TreeControl`
 * on top of `TVM_*` messages; tests use an in-memory fake. All methods take
 * `&self`: a native call may synchronously raise a notification that re-enters
 * the engine (for example `TVM_EXPAND` sends `TVN_ITEMEXPANDING`), so
 * implementations must not hold exclusive state across the call.
 *
 * Usage contract the engine relies on:
 * - `insert_item` with `InsertPosition::After(h)` places the item directly
 *   after sibling `h`; `First` places it before every existing sibling.
 * - A handle returned by `insert_item` stays valid until `delete_item` is
 *   called on it, on one of its ancestors, or `delete_all_items` is called.
 * - Methods returning `PlatformResult` map the native failure sentinel to
 *   `PlatformError::NativeOperationFailed`.
 */

use crate::error::Result as PlatformResult;
use crate::image_cache::Bitmap;
use crate::types::{
    CheckState, Color, ExpandAction, HitTestInfo, ImageListHandle, InsertPosition,
    NativeItemHandle, NativeItemSpec, Point, Rect,
};

use std::path::Path;

pub trait NativeTreeControl {
    /// Inserts a new item under `parent` (`None` = root level).
    fn insert_item(
        &self,
        parent: Option<NativeItemHandle>,
        position: InsertPosition,
        spec: &NativeItemSpec,
    ) -> PlatformResult<NativeItemHandle>;

    /// Deletes an item together with all of its native children.
    fn delete_item(&self, handle: NativeItemHandle) -> PlatformResult<()>;

    fn delete_all_items(&self) -> PlatformResult<()>;

    /// Re-pushes text, image and children indicator of an existing item.
    /// The check state in `spec` is ignored; use `set_check_state`.
    fn update_item(&self, handle: NativeItemHandle, spec: &NativeItemSpec) -> PlatformResult<()>;

    fn check_state(&self, handle: NativeItemHandle) -> CheckState;

    fn set_check_state(&self, handle: NativeItemHandle, state: CheckState) -> PlatformResult<()>;

    fn is_expanded(&self, handle: NativeItemHandle) -> PlatformResult<bool>;

    fn expand(&self, handle: NativeItemHandle, action: ExpandAction) -> PlatformResult<()>;

    fn select_item(&self, handle: NativeItemHandle) -> PlatformResult<()>;

    fn ensure_visible(&self, handle: NativeItemHandle);

    fn hit_test(&self, point: Point) -> HitTestInfo;

    fn item_rect(&self, handle: NativeItemHandle) -> Option<Rect>;

    fn invalidate_rect(&self, rect: Rect);

    fn set_image_list(&self, list: Option<ImageListHandle>);

    fn create_image_list(&self, dpi: u32) -> PlatformResult<ImageListHandle>;

    /// The shell's shared small-icon list. Must not be destroyed.
    fn system_image_list(&self, dpi: u32) -> PlatformResult<ImageListHandle>;

    fn destroy_image_list(&self, list: ImageListHandle);

    fn add_bitmap(&self, list: ImageListHandle, bitmap: &Bitmap, dpi: u32)
    -> PlatformResult<i32>;

    fn add_file_icon(&self, list: ImageListHandle, path: &Path, dpi: u32) -> PlatformResult<i32>;

    /// Index of the icon for `path` inside the system image list.
    fn system_icon_index(&self, path: &Path) -> PlatformResult<i32>;

    /// `None` restores the system window color.
    fn set_background_color(&self, color: Option<Color>);

    fn item_height(&self) -> i32;

    fn set_item_height(&self, height: i32);

    /// Turns redrawing off (`false`) or back on with a repaint (`true`).
    fn set_redraw(&self, enabled: bool);
}
