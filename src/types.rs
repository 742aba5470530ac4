/*
 * Platform-agnostic types shared between the reconciliation engine and the
 * native control adapter. Nothing in here touches Win32 directly, so these
 * types compile and are testable on every platform; the Windows adapter
 * converts them to and from `HTREEITEM`, `POINT`, `RECT` and friends.
 */

/// Opaque native tree-item handle (an `HTREEITEM` on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeItemHandle(pub isize);

/// Opaque native image-list handle (an `HIMAGELIST` on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageListHandle(pub isize);

/// Where a new native item goes among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    First,
    After(NativeItemHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const STATE_IMAGE_SHIFT: u32 = 12;
pub(crate) const STATE_IMAGE_MASK: u32 = 0xF000;

/// Checkbox state as shown by the native control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Unchecked,
    Checked,
}

impl CheckState {
    pub fn from_bool(checked: bool) -> Self {
        if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        }
    }

    pub fn is_checked(self) -> bool {
        self == CheckState::Checked
    }

    /*
     * Tree-view checkboxes are state images: index 1 is the unchecked box,
     * index 2 the checked one, stored in bits 12..16 of the item state.
     */
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub(crate) fn to_state_bits(self) -> u32 {
        let index = match self {
            CheckState::Unchecked => 1,
            CheckState::Checked => 2,
        };
        index << STATE_IMAGE_SHIFT
    }

    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub(crate) fn from_state_bits(state: u32) -> Self {
        CheckState::from_bool((state & STATE_IMAGE_MASK) >> STATE_IMAGE_SHIFT == 2)
    }
}

/// Which part of an item a hit-test point landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRegion {
    Nowhere,
    Button,
    Icon,
    Label,
    StateIcon,
    Indent,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTestInfo {
    pub handle: Option<NativeItemHandle>,
    pub region: HitRegion,
}

impl HitTestInfo {
    pub fn nowhere() -> Self {
        Self {
            handle: None,
            region: HitRegion::Nowhere,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandAction {
    Expand,
    Collapse,
    CollapseReset,
    ExpandPartial,
    Toggle,
}

/*
 * Notifications raised by the native control, already decoded from the
 * platform's message structures. Handles are resolved through the engine's
 * handle registry.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeNotification {
    ItemExpanding {
        handle: NativeItemHandle,
        action: ExpandAction,
    },
    ItemExpanded {
        handle: NativeItemHandle,
        action: ExpandAction,
    },
    SelectionChanged {
        new_handle: Option<NativeItemHandle>,
    },
    DoubleClick,
    ReturnKey,
    /// A mouse click at `point`, in client coordinates of the control.
    Click { point: Point },
}

/// Everything the native control needs to display a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeItemSpec {
    pub text: String,
    pub image_index: Option<i32>,
    pub check_state: Option<CheckState>,
    pub has_children: bool,
}

/// Per-control settings handed to the tree view at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeViewConfig {
    /// Background color; `None` keeps the system window color.
    pub background: Option<Color>,
    /// Item height in native pixels; `None` keeps the control default.
    pub item_height: Option<i32>,
    pub checkboxes: bool,
    pub initial_dpi: u32,
}

impl Default for TreeViewConfig {
    fn default() -> Self {
        Self {
            background: None,
            item_height: None,
            checkboxes: false,
            initial_dpi: 96,
        }
    }
}
