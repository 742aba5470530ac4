/*
 * Provides the public entry point for the treesync crate: a model-driven
 * Win32 TreeView that keeps a native tree control synchronized with an
 * abstract, mutable tree model.
 *
 * The reconciliation engine (`treeview`), the model contract (`model`), the
 * event channels (`event`) and the image cache are platform-agnostic and talk
 * to the control only through the `NativeTreeControl` trait. Only `controls`,
 * which binds that trait to `SysTreeView32` messages, depends on Win32; the
 * test suite drives the engine through an in-memory control instead.
 */
#[cfg(target_os = "windows")]
pub mod controls;
pub mod error;
pub mod event;
pub mod image_cache;
pub mod model;
pub mod native;
#[cfg(test)]
pub(crate) mod testing;
pub mod treeview;
pub mod types;

#[cfg(target_os = "windows")]
pub use controls::treeview_handler::{
    Win32TreeControl, create_treeview, handle_wm_app_treeview_checkbox_clicked, handle_wm_notify,
    translate_notification, wants_all_keys,
};
pub use error::{PlatformError, Result as PlatformResult};
pub use event::{Event, EventHandle, EventPublisher};
pub use image_cache::{Bitmap, ItemImage};
pub use model::{CheckableItem, ItemKey, ItemRef, TreeItem, TreeModel, TreeModelBase, same_item};
pub use native::NativeTreeControl;
pub use treeview::{SuspendGuard, TreeView};
pub use types::{
    CheckState, Color, ExpandAction, HitRegion, HitTestInfo, ImageListHandle, InsertPosition,
    NativeItemHandle, NativeItemSpec, Point, Rect, TreeNotification, TreeViewConfig,
};
