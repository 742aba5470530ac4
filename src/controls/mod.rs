/*
 * Win32-specific pieces: the `SysTreeView32` adapter and the color helpers it
 * uses. Compiled on Windows only; everything above the adapter trait is
 * portable.
 */
pub(crate) mod styling_handler;
pub mod treeview_handler;
