/*
 * Win32 side of the tree view: creates the `SysTreeView32` control,
 * implements `NativeTreeControl` on top of `TVM_*` messages, and decodes the
 * control's `WM_NOTIFY` traffic into portable `TreeNotification` values for
 * the engine.
 *
 * The owning window procedure forwards three messages here:
 * - `WM_NOTIFY` from the tree control, via `handle_wm_notify`;
 * - `WM_APP_TREEVIEW_CHECKBOX_CLICKED`, posted by `handle_wm_notify` after a
 *   checkbox click so the clicked item is re-synchronized once the control has
 *   flipped its state image, via `handle_wm_app_treeview_checkbox_clicked`;
 * - `WM_GETDLGCODE` for the tree control, answered by `wants_all_keys`.
 */

use crate::controls::styling_handler::background_lparam;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::image_cache::Bitmap;
use crate::native::NativeTreeControl;
use crate::treeview::TreeView;
use crate::types::{
    CheckState, Color, ExpandAction, HitRegion, HitTestInfo, ImageListHandle, InsertPosition,
    NativeItemHandle, NativeItemSpec, Point, Rect, TreeNotification, TreeViewConfig,
};

use std::ffi::c_void;
use std::path::Path;
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{CreateBitmap, DeleteObject, InvalidateRect, ScreenToClient};
use windows::Win32::Storage::FileSystem::FILE_ATTRIBUTE_NORMAL;
use windows::Win32::System::WindowsProgramming::MulDiv;
use windows::Win32::UI::Controls::{
    HIMAGELIST, HTREEITEM, ILC_COLOR32, ILC_MASK, ImageList_Add, ImageList_Create,
    ImageList_Destroy, ImageList_ReplaceIcon, NM_CLICK, NM_DBLCLK, NMHDR, NMTREEVIEWW,
    NMTVKEYDOWN, SetWindowTheme, TVE_COLLAPSE, TVE_COLLAPSERESET, TVE_EXPAND, TVE_EXPANDPARTIAL,
    TVE_TOGGLE, TVGN_CARET, TVHITTESTINFO, TVHT_ONITEMBUTTON, TVHT_ONITEMICON,
    TVHT_ONITEMINDENT, TVHT_ONITEMLABEL, TVHT_ONITEMRIGHT, TVHT_ONITEMSTATEICON, TVI_FIRST,
    TVI_ROOT, TVIF_CHILDREN, TVIF_IMAGE, TVIF_SELECTEDIMAGE, TVIF_STATE, TVIF_TEXT,
    TVINSERTSTRUCTW, TVINSERTSTRUCTW_0, TVIS_EXPANDED, TVIS_STATEIMAGEMASK, TVITEMEXW,
    TVITEMEXW_CHILDREN, TVM_DELETEITEM, TVM_ENSUREVISIBLE, TVM_EXPAND, TVM_GETITEMHEIGHT,
    TVM_GETITEMRECT, TVM_GETITEMSTATE, TVM_HITTEST, TVM_INSERTITEMW, TVM_SELECTITEM,
    TVM_SETBKCOLOR, TVM_SETEXTENDEDSTYLE, TVM_SETIMAGELIST, TVM_SETITEMHEIGHT, TVM_SETITEMW,
    TVN_ITEMEXPANDEDW, TVN_ITEMEXPANDINGW, TVN_KEYDOWN, TVN_SELCHANGEDW, TVS_CHECKBOXES,
    TVS_EX_DOUBLEBUFFER, TVS_HASBUTTONS, TVS_LINESATROOT, TVS_SHOWSELALWAYS, TVS_TRACKSELECT,
    TVSIL_NORMAL, WC_TREEVIEWW,
};
use windows::Win32::UI::Input::KeyboardAndMouse::VK_RETURN;
use windows::Win32::UI::Shell::{
    SHFILEINFOW, SHGFI_ICON, SHGFI_SMALLICON, SHGFI_SYSICONINDEX, SHGFI_USEFILEATTRIBUTES,
    SHGetFileInfoW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DLGC_WANTALLKEYS, DestroyIcon, GetCursorPos, GetParent, HMENU, PostMessageW,
    SendMessageW, WINDOW_STYLE, WM_APP, WM_SETREDRAW, WS_CHILD, WS_EX_CLIENTEDGE, WS_TABSTOP,
    WS_VISIBLE,
};
use windows::core::{HSTRING, PCWSTR, PWSTR, w};

// Posted to the tree's parent after a checkbox click; WPARAM carries the item handle.
pub(crate) const WM_APP_TREEVIEW_CHECKBOX_CLICKED: u32 = WM_APP + 0x100;

const BASE_ICON_SIZE: i32 = 16;

/// A `SysTreeView32` window driven through `TVM_*` messages.
#[derive(Debug)]
pub struct Win32TreeControl {
    hwnd: HWND,
}

impl Win32TreeControl {
    /// Wraps an existing tree view window; the caller keeps ownership of it.
    pub fn from_hwnd(hwnd: HWND) -> PlatformResult<Self> {
        if hwnd.is_invalid() {
            return Err(PlatformError::InvalidHandle(
                "TreeViewHandler: tree view HWND is invalid".to_string(),
            ));
        }
        Ok(Self { hwnd })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    fn send(&self, msg: u32, wparam: usize, lparam: isize) -> LRESULT {
        unsafe { SendMessageW(self.hwnd, msg, Some(WPARAM(wparam)), Some(LPARAM(lparam))) }
    }

    fn set_item(&self, item: &TVITEMEXW, operation: &str) -> PlatformResult<()> {
        let result = self.send(TVM_SETITEMW, 0, item as *const TVITEMEXW as isize);
        if result.0 == 0 {
            return Err(PlatformError::native_failed(operation));
        }
        Ok(())
    }

    fn icon_size(dpi: u32) -> i32 {
        unsafe { MulDiv(BASE_ICON_SIZE, dpi as i32, 96) }
    }
}

fn to_htreeitem(handle: NativeItemHandle) -> HTREEITEM {
    HTREEITEM(handle.0 as _)
}

fn from_htreeitem(item: HTREEITEM) -> Option<NativeItemHandle> {
    let raw = item.0 as isize;
    (raw != 0).then_some(NativeItemHandle(raw))
}

fn to_himagelist(list: ImageListHandle) -> HIMAGELIST {
    HIMAGELIST(list.0 as _)
}

fn wide_text(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/*
 * Fills the display part of a TVITEMEXW. `text` must outlive the message
 * that consumes the struct.
 */
fn display_item(spec: &NativeItemSpec, text: &mut [u16]) -> TVITEMEXW {
    let mut item = TVITEMEXW {
        mask: TVIF_TEXT | TVIF_CHILDREN,
        pszText: PWSTR(text.as_mut_ptr()),
        cChildren: TVITEMEXW_CHILDREN(i32::from(spec.has_children)),
        ..Default::default()
    };
    if let Some(index) = spec.image_index {
        item.mask |= TVIF_IMAGE | TVIF_SELECTEDIMAGE;
        item.iImage = index;
        item.iSelectedImage = index;
    }
    item
}

fn expand_action_to_native(action: ExpandAction) -> u32 {
    match action {
        ExpandAction::Expand => TVE_EXPAND.0,
        ExpandAction::Collapse => TVE_COLLAPSE.0,
        ExpandAction::CollapseReset => TVE_COLLAPSE.0 | TVE_COLLAPSERESET.0,
        ExpandAction::ExpandPartial => TVE_EXPAND.0 | TVE_EXPANDPARTIAL.0,
        ExpandAction::Toggle => TVE_TOGGLE.0,
    }
}

fn expand_action_from_native(action: u32) -> ExpandAction {
    if action & TVE_COLLAPSERESET.0 != 0 {
        ExpandAction::CollapseReset
    } else if action & TVE_EXPANDPARTIAL.0 != 0 {
        ExpandAction::ExpandPartial
    } else if action & TVE_TOGGLE.0 == TVE_TOGGLE.0 {
        ExpandAction::Toggle
    } else if action & TVE_EXPAND.0 != 0 {
        ExpandAction::Expand
    } else {
        ExpandAction::Collapse
    }
}

/*
 * TVHT_* flags can combine (e.g. label plus right of the item on a full-row
 * hit); the state icon wins because it drives checkbox toggling.
 */
fn hit_region_from_flags(flags: u32) -> HitRegion {
    let regions = [
        (TVHT_ONITEMSTATEICON.0, HitRegion::StateIcon),
        (TVHT_ONITEMBUTTON.0, HitRegion::Button),
        (TVHT_ONITEMICON.0, HitRegion::Icon),
        (TVHT_ONITEMLABEL.0, HitRegion::Label),
        (TVHT_ONITEMINDENT.0, HitRegion::Indent),
        (TVHT_ONITEMRIGHT.0, HitRegion::Right),
    ];
    regions
        .into_iter()
        .find(|(flag, _)| flags & flag != 0)
        .map_or(HitRegion::Nowhere, |(_, region)| region)
}

fn compute_treeview_style(checkboxes: bool) -> WINDOW_STYLE {
    let mut tree_styles =
        TVS_HASBUTTONS | TVS_LINESATROOT | TVS_SHOWSELALWAYS | TVS_TRACKSELECT;
    if checkboxes {
        tree_styles |= TVS_CHECKBOXES;
    }
    WS_CHILD | WS_VISIBLE | WS_TABSTOP | WINDOW_STYLE(tree_styles)
}

impl NativeTreeControl for Win32TreeControl {
    fn insert_item(
        &self,
        parent: Option<NativeItemHandle>,
        position: InsertPosition,
        spec: &NativeItemSpec,
    ) -> PlatformResult<NativeItemHandle> {
        let mut text = wide_text(&spec.text);
        let mut item = display_item(spec, &mut text);
        if let Some(state) = spec.check_state {
            item.mask |= TVIF_STATE;
            item.state.0 = state.to_state_bits();
            item.stateMask = TVIS_STATEIMAGEMASK;
        }

        let insert = TVINSERTSTRUCTW {
            hParent: parent.map_or(TVI_ROOT, to_htreeitem),
            hInsertAfter: match position {
                InsertPosition::First => TVI_FIRST,
                InsertPosition::After(anchor) => to_htreeitem(anchor),
            },
            Anonymous: TVINSERTSTRUCTW_0 { itemex: item },
        };
        let result = self.send(
            TVM_INSERTITEMW,
            0,
            &insert as *const TVINSERTSTRUCTW as isize,
        );
        if result.0 == 0 {
            log::warn!("TreeViewHandler: TVM_INSERTITEMW failed for '{}'", spec.text);
            return Err(PlatformError::native_failed("TVM_INSERTITEMW"));
        }
        Ok(NativeItemHandle(result.0))
    }

    fn delete_item(&self, handle: NativeItemHandle) -> PlatformResult<()> {
        if self.send(TVM_DELETEITEM, 0, handle.0).0 == 0 {
            return Err(PlatformError::native_failed("TVM_DELETEITEM"));
        }
        Ok(())
    }

    fn delete_all_items(&self) -> PlatformResult<()> {
        let root = TVI_ROOT.0 as isize;
        if self.send(TVM_DELETEITEM, 0, root).0 == 0 {
            return Err(PlatformError::native_failed("TVM_DELETEITEM(TVI_ROOT)"));
        }
        Ok(())
    }

    fn update_item(&self, handle: NativeItemHandle, spec: &NativeItemSpec) -> PlatformResult<()> {
        let mut text = wide_text(&spec.text);
        let mut item = display_item(spec, &mut text);
        item.hItem = to_htreeitem(handle);
        self.set_item(&item, "TVM_SETITEMW")
    }

    fn check_state(&self, handle: NativeItemHandle) -> CheckState {
        let state = self.send(
            TVM_GETITEMSTATE,
            handle.0 as usize,
            TVIS_STATEIMAGEMASK.0 as isize,
        );
        CheckState::from_state_bits(state.0 as u32)
    }

    fn set_check_state(&self, handle: NativeItemHandle, state: CheckState) -> PlatformResult<()> {
        let mut item = TVITEMEXW {
            mask: TVIF_STATE,
            hItem: to_htreeitem(handle),
            stateMask: TVIS_STATEIMAGEMASK,
            ..Default::default()
        };
        item.state.0 = state.to_state_bits();
        self.set_item(&item, "TVM_SETITEMW(state)")
    }

    fn is_expanded(&self, handle: NativeItemHandle) -> PlatformResult<bool> {
        let state = self.send(
            TVM_GETITEMSTATE,
            handle.0 as usize,
            TVIS_EXPANDED.0 as isize,
        );
        Ok(state.0 as u32 & TVIS_EXPANDED.0 != 0)
    }

    fn expand(&self, handle: NativeItemHandle, action: ExpandAction) -> PlatformResult<()> {
        let code = expand_action_to_native(action);
        // Zero also means "nothing to do", e.g. expanding an item without children.
        if self.send(TVM_EXPAND, code as usize, handle.0).0 == 0 {
            log::trace!("TreeViewHandler: TVM_EXPAND({action:?}) had no effect on {handle:?}");
        }
        Ok(())
    }

    fn select_item(&self, handle: NativeItemHandle) -> PlatformResult<()> {
        if self.send(TVM_SELECTITEM, TVGN_CARET as usize, handle.0).0 == 0 {
            return Err(PlatformError::native_failed("TVM_SELECTITEM"));
        }
        Ok(())
    }

    fn ensure_visible(&self, handle: NativeItemHandle) {
        let _ = self.send(TVM_ENSUREVISIBLE, 0, handle.0);
    }

    fn hit_test(&self, point: Point) -> HitTestInfo {
        let mut info = TVHITTESTINFO {
            pt: POINT {
                x: point.x,
                y: point.y,
            },
            ..Default::default()
        };
        let _ = self.send(TVM_HITTEST, 0, &mut info as *mut TVHITTESTINFO as isize);
        match from_htreeitem(info.hItem) {
            Some(handle) => HitTestInfo {
                handle: Some(handle),
                region: hit_region_from_flags(info.flags.0),
            },
            None => HitTestInfo::nowhere(),
        }
    }

    fn item_rect(&self, handle: NativeItemHandle) -> Option<Rect> {
        // TVM_GETITEMRECT takes the item handle in the first bytes of the RECT.
        let mut rect = RECT::default();
        unsafe {
            std::ptr::write_unaligned(&mut rect as *mut RECT as *mut isize, handle.0);
        }
        let ok = self.send(TVM_GETITEMRECT, 0, &mut rect as *mut RECT as isize);
        (ok.0 != 0).then_some(Rect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }

    fn invalidate_rect(&self, rect: Rect) {
        let native = RECT {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        };
        let _ = unsafe { InvalidateRect(Some(self.hwnd), Some(&native as *const RECT), true) };
    }

    fn set_image_list(&self, list: Option<ImageListHandle>) {
        let raw = list.map_or(0, |list| list.0);
        let _ = self.send(TVM_SETIMAGELIST, TVSIL_NORMAL as usize, raw);
    }

    fn create_image_list(&self, dpi: u32) -> PlatformResult<ImageListHandle> {
        let size = Self::icon_size(dpi);
        let list = unsafe { ImageList_Create(size, size, ILC_COLOR32 | ILC_MASK, 8, 8) };
        if list.0 as isize == 0 {
            return Err(PlatformError::native_failed("ImageList_Create"));
        }
        log::debug!("TreeViewHandler: created {size}px image list {list:?}");
        Ok(ImageListHandle(list.0 as isize))
    }

    fn system_image_list(&self, _dpi: u32) -> PlatformResult<ImageListHandle> {
        let mut info = SHFILEINFOW::default();
        let list = unsafe {
            SHGetFileInfoW(
                w!(""),
                FILE_ATTRIBUTE_NORMAL,
                Some(&mut info as *mut SHFILEINFOW),
                std::mem::size_of::<SHFILEINFOW>() as u32,
                SHGFI_SYSICONINDEX | SHGFI_SMALLICON,
            )
        };
        if list == 0 {
            return Err(PlatformError::native_failed("SHGetFileInfoW(SHGFI_SYSICONINDEX)"));
        }
        Ok(ImageListHandle(list as isize))
    }

    fn destroy_image_list(&self, list: ImageListHandle) {
        let destroyed = unsafe { ImageList_Destroy(Some(to_himagelist(list))) };
        if !destroyed.as_bool() {
            log::warn!("TreeViewHandler: ImageList_Destroy failed for {list:?}");
        }
    }

    fn add_bitmap(
        &self,
        list: ImageListHandle,
        bitmap: &Bitmap,
        _dpi: u32,
    ) -> PlatformResult<i32> {
        let hbitmap = unsafe {
            CreateBitmap(
                bitmap.width as i32,
                bitmap.height as i32,
                1,
                32,
                Some(bitmap.pixels.as_ptr() as *const c_void),
            )
        };
        if hbitmap.0 as isize == 0 {
            return Err(PlatformError::native_failed("CreateBitmap"));
        }
        let index = unsafe { ImageList_Add(to_himagelist(list), hbitmap, None) };
        let _ = unsafe { DeleteObject(hbitmap.into()) };
        if index < 0 {
            return Err(PlatformError::native_failed("ImageList_Add"));
        }
        Ok(index)
    }

    fn add_file_icon(&self, list: ImageListHandle, path: &Path, _dpi: u32) -> PlatformResult<i32> {
        let mut info = SHFILEINFOW::default();
        let found = unsafe {
            SHGetFileInfoW(
                &HSTRING::from(path.as_os_str()),
                FILE_ATTRIBUTE_NORMAL,
                Some(&mut info as *mut SHFILEINFOW),
                std::mem::size_of::<SHFILEINFOW>() as u32,
                SHGFI_ICON | SHGFI_SMALLICON | SHGFI_USEFILEATTRIBUTES,
            )
        };
        if found == 0 || info.hIcon.0 as isize == 0 {
            return Err(PlatformError::native_failed("SHGetFileInfoW(SHGFI_ICON)"));
        }
        let index = unsafe { ImageList_ReplaceIcon(to_himagelist(list), -1, info.hIcon) };
        let _ = unsafe { DestroyIcon(info.hIcon) };
        if index < 0 {
            return Err(PlatformError::native_failed("ImageList_ReplaceIcon"));
        }
        Ok(index)
    }

    fn system_icon_index(&self, path: &Path) -> PlatformResult<i32> {
        let mut info = SHFILEINFOW::default();
        let found = unsafe {
            SHGetFileInfoW(
                &HSTRING::from(path.as_os_str()),
                FILE_ATTRIBUTE_NORMAL,
                Some(&mut info as *mut SHFILEINFOW),
                std::mem::size_of::<SHFILEINFOW>() as u32,
                SHGFI_SYSICONINDEX | SHGFI_SMALLICON | SHGFI_USEFILEATTRIBUTES,
            )
        };
        if found == 0 {
            return Err(PlatformError::native_failed("SHGetFileInfoW(SHGFI_SYSICONINDEX)"));
        }
        Ok(info.iIcon)
    }

    fn set_background_color(&self, color: Option<Color>) {
        let _ = self.send(TVM_SETBKCOLOR, 0, background_lparam(color).0);
    }

    fn item_height(&self) -> i32 {
        self.send(TVM_GETITEMHEIGHT, 0, 0).0 as i32
    }

    fn set_item_height(&self, height: i32) {
        let _ = self.send(TVM_SETITEMHEIGHT, height as usize, 0);
    }

    fn set_redraw(&self, enabled: bool) {
        let _ = self.send(WM_SETREDRAW, usize::from(enabled), 0);
        if enabled {
            let _ = unsafe { InvalidateRect(Some(self.hwnd), None, true) };
        }
    }
}

/*
 * Creates the tree view child window with the styles the engine expects and
 * wraps it. Background and item height from `config` are applied by
 * `TreeView::new`.
 */
pub fn create_treeview(
    parent: HWND,
    control_id: i32,
    h_instance: HINSTANCE,
    config: &TreeViewConfig,
) -> PlatformResult<Win32TreeControl> {
    log::debug!(
        "TreeViewHandler: create_treeview under {parent:?}, ControlID {control_id}, checkboxes {}",
        config.checkboxes
    );
    if parent.is_invalid() {
        return Err(PlatformError::InvalidHandle(
            "TreeViewHandler: parent HWND for create_treeview is invalid".to_string(),
        ));
    }

    let hwnd = unsafe {
        CreateWindowExW(
            WS_EX_CLIENTEDGE,
            WC_TREEVIEWW,
            PCWSTR::null(),
            compute_treeview_style(config.checkboxes),
            0,
            0,
            10,
            10,
            Some(parent),
            Some(HMENU(control_id as isize as *mut _)),
            Some(h_instance),
            None,
        )?
    };

    let control = Win32TreeControl::from_hwnd(hwnd)?;
    let _ = control.send(
        TVM_SETEXTENDEDSTYLE,
        TVS_EX_DOUBLEBUFFER as usize,
        TVS_EX_DOUBLEBUFFER as isize,
    );
    if let Err(e) = unsafe { SetWindowTheme(hwnd, w!("Explorer"), PCWSTR::null()) } {
        log::warn!("TreeViewHandler: SetWindowTheme(Explorer) failed: {e}");
    }
    log::debug!("TreeViewHandler: created tree view {hwnd:?}");
    Ok(control)
}

/*
 * Decodes a tree view WM_NOTIFY. Returns `None` for codes the engine does
 * not consume.
 */
pub fn translate_notification(hwnd_tree: HWND, lparam: LPARAM) -> Option<TreeNotification> {
    let nmhdr_ptr = lparam.0 as *const NMHDR;
    if nmhdr_ptr.is_null() {
        log::warn!("TreeViewHandler: WM_NOTIFY with null NMHDR pointer");
        return None;
    }
    let nmhdr = unsafe { &*nmhdr_ptr };
    if nmhdr.hwndFrom != hwnd_tree {
        return None;
    }

    match nmhdr.code {
        TVN_ITEMEXPANDINGW | TVN_ITEMEXPANDEDW => {
            let nmtv = unsafe { &*(lparam.0 as *const NMTREEVIEWW) };
            let handle = from_htreeitem(nmtv.itemNew.hItem)?;
            let action = expand_action_from_native(nmtv.action.0);
            if nmhdr.code == TVN_ITEMEXPANDINGW {
                Some(TreeNotification::ItemExpanding { handle, action })
            } else {
                Some(TreeNotification::ItemExpanded { handle, action })
            }
        }
        TVN_SELCHANGEDW => {
            let nmtv = unsafe { &*(lparam.0 as *const NMTREEVIEWW) };
            Some(TreeNotification::SelectionChanged {
                new_handle: from_htreeitem(nmtv.itemNew.hItem),
            })
        }
        NM_DBLCLK => Some(TreeNotification::DoubleClick),
        TVN_KEYDOWN => {
            let keydown = unsafe { &*(lparam.0 as *const NMTVKEYDOWN) };
            (keydown.wVKey == VK_RETURN.0).then_some(TreeNotification::ReturnKey)
        }
        NM_CLICK => {
            // NM_CLICK carries no coordinates; use the cursor position.
            let mut cursor = POINT::default();
            let resolved = unsafe {
                GetCursorPos(&mut cursor).is_ok() && ScreenToClient(hwnd_tree, &mut cursor).as_bool()
            };
            if !resolved {
                log::warn!("TreeViewHandler: could not resolve NM_CLICK position");
                return None;
            }
            Some(TreeNotification::Click {
                point: Point {
                    x: cursor.x,
                    y: cursor.y,
                },
            })
        }
        _ => None,
    }
}

/*
 * Routes a WM_NOTIFY from the tree control into the engine. A click on a
 * checkbox additionally posts WM_APP_TREEVIEW_CHECKBOX_CLICKED so the item is
 * re-synchronized after the control has toggled its own state image.
 */
pub fn handle_wm_notify(view: &TreeView<Win32TreeControl>, lparam: LPARAM) -> Option<LRESULT> {
    let hwnd_tree = view.control().hwnd();
    let notification = translate_notification(hwnd_tree, lparam)?;
    log::trace!("TreeViewHandler: {notification:?}");

    let checkbox_click = match notification {
        TreeNotification::Click { point } => {
            let hit = view.control().hit_test(point);
            hit.handle.filter(|_| hit.region == HitRegion::StateIcon)
        }
        _ => None,
    };

    if let Err(e) = view.handle_notification(notification) {
        log::warn!("TreeViewHandler: handling {notification:?} failed: {e}");
    }

    if let Some(handle) = checkbox_click {
        match unsafe { GetParent(hwnd_tree) } {
            Ok(parent) => {
                let posted = unsafe {
                    PostMessageW(
                        Some(parent),
                        WM_APP_TREEVIEW_CHECKBOX_CLICKED,
                        WPARAM(handle.0 as usize),
                        LPARAM(0),
                    )
                };
                if let Err(e) = posted {
                    log::warn!("TreeViewHandler: posting checkbox resync failed: {e}");
                }
            }
            Err(e) => log::warn!("TreeViewHandler: tree view has no parent: {e}"),
        }
    }

    // Returning FALSE from TVN_ITEMEXPANDING lets the expansion proceed.
    Some(LRESULT(0))
}

pub fn handle_wm_app_treeview_checkbox_clicked(
    view: &TreeView<Win32TreeControl>,
    wparam: WPARAM,
) -> PlatformResult<()> {
    view.resync_check_state(NativeItemHandle(wparam.0 as isize))
}

/// `WM_GETDLGCODE` answer for the tree control, so Return reaches it inside dialogs.
pub fn wants_all_keys() -> LRESULT {
    LRESULT(DLGC_WANTALLKEYS as isize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treeview_style_has_checkboxes_only_when_requested() {
        let plain = compute_treeview_style(false);
        let checkable = compute_treeview_style(true);

        assert_eq!(plain.0 & TVS_CHECKBOXES, 0);
        assert_ne!(checkable.0 & TVS_CHECKBOXES, 0);
        assert_ne!(plain.0 & WS_TABSTOP.0, 0);
        assert_ne!(plain.0 & TVS_LINESATROOT, 0);
    }

    #[test]
    fn expand_actions_decode_from_native_codes() {
        assert_eq!(expand_action_from_native(TVE_EXPAND.0), ExpandAction::Expand);
        assert_eq!(
            expand_action_from_native(TVE_COLLAPSE.0),
            ExpandAction::Collapse
        );
        assert_eq!(
            expand_action_from_native(TVE_COLLAPSE.0 | TVE_COLLAPSERESET.0),
            ExpandAction::CollapseReset
        );
        assert_eq!(
            expand_action_from_native(expand_action_to_native(ExpandAction::Toggle)),
            ExpandAction::Toggle
        );
    }

    #[test]
    fn state_icon_wins_over_other_hit_flags() {
        let flags = TVHT_ONITEMSTATEICON.0 | TVHT_ONITEMRIGHT.0;
        assert_eq!(hit_region_from_flags(flags), HitRegion::StateIcon);
        assert_eq!(hit_region_from_flags(TVHT_ONITEMLABEL.0), HitRegion::Label);
        assert_eq!(hit_region_from_flags(0), HitRegion::Nowhere);
    }

    #[test]
    fn wide_text_is_nul_terminated() {
        assert_eq!(wide_text("ab"), vec![b'a' as u16, b'b' as u16, 0]);
    }
}
