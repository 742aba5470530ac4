/*
 * Maps item images to indices in the tree view's native image list.
 *
 * The image list is created lazily for the first item that carries an image.
 * File icons use the shared system image list (which must never be
 * destroyed); bitmaps go into a private list owned by the cache. Cached
 * indices are only valid for the DPI the list was created at, so the whole
 * cache is dropped whenever the DPI changes or the model is replaced.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::native::NativeTreeControl;
use crate::types::ImageListHandle;

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// 32-bit BGRA pixels, top-down rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> PlatformResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(PlatformError::OperationFailed(format!(
                "Bitmap {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// Image attached to a tree item. Bitmaps are cached by identity, file icons
/// by path.
#[derive(Debug, Clone)]
pub enum ItemImage {
    Bitmap(Rc<Bitmap>),
    FileIcon(PathBuf),
}

#[derive(Debug, Clone, Copy)]
struct ActiveList {
    handle: ImageListHandle,
    is_system: bool,
}

#[derive(Debug)]
pub(crate) struct ImageCache {
    list: Option<ActiveList>,
    dpi: u32,
    // The Rc is kept alive so its address cannot be reused by another bitmap.
    bitmap_indices: HashMap<usize, (Rc<Bitmap>, i32)>,
    file_icon_indices: HashMap<PathBuf, i32>,
}

impl ImageCache {
    pub(crate) fn new(dpi: u32) -> Self {
        Self {
            list: None,
            dpi,
            bitmap_indices: HashMap::new(),
            file_icon_indices: HashMap::new(),
        }
    }

    pub(crate) fn dpi(&self) -> u32 {
        self.dpi
    }

    #[cfg(test)]
    pub(crate) fn has_image_list(&self) -> bool {
        self.list.is_some()
    }

    #[cfg(test)]
    pub(crate) fn cached_count(&self) -> usize {
        self.bitmap_indices.len() + self.file_icon_indices.len()
    }

    /*
     * Returns the image-list index for `image`, creating the list and adding
     * the image on first use.
     */
    pub(crate) fn index_for<C: NativeTreeControl + ?Sized>(
        &mut self,
        control: &C,
        image: &ItemImage,
    ) -> PlatformResult<i32> {
        let list = self.ensure_list(control, image)?;
        match image {
            ItemImage::Bitmap(bitmap) => {
                let key = Rc::as_ptr(bitmap) as usize;
                if let Some((_, index)) = self.bitmap_indices.get(&key) {
                    return Ok(*index);
                }
                if list.is_system {
                    return Err(PlatformError::OperationFailed(
                        "Bitmaps cannot be added to the shared system image list".to_string(),
                    ));
                }
                let index = control.add_bitmap(list.handle, bitmap, self.dpi)?;
                self.bitmap_indices.insert(key, (Rc::clone(bitmap), index));
                Ok(index)
            }
            ItemImage::FileIcon(path) => {
                if let Some(index) = self.file_icon_indices.get(path) {
                    return Ok(*index);
                }
                let index = if list.is_system {
                    control.system_icon_index(path)?
                } else {
                    control.add_file_icon(list.handle, path, self.dpi)?
                };
                self.file_icon_indices.insert(path.clone(), index);
                Ok(index)
            }
        }
    }

    fn ensure_list<C: NativeTreeControl + ?Sized>(
        &mut self,
        control: &C,
        first_image: &ItemImage,
    ) -> PlatformResult<ActiveList> {
        if let Some(list) = self.list {
            return Ok(list);
        }

        let is_system = matches!(first_image, ItemImage::FileIcon(_));
        let handle = if is_system {
            control.system_image_list(self.dpi)?
        } else {
            control.create_image_list(self.dpi)?
        };
        log::debug!(
            "ImageCache: created {} image list {handle:?} at {} DPI",
            if is_system { "system" } else { "private" },
            self.dpi
        );
        control.set_image_list(Some(handle));
        let list = ActiveList { handle, is_system };
        self.list = Some(list);
        Ok(list)
    }

    /// Releases the image list (private lists only) and forgets every index.
    pub(crate) fn dispose<C: NativeTreeControl + ?Sized>(&mut self, control: &C) {
        if let Some(list) = self.list.take() {
            control.set_image_list(None);
            if !list.is_system {
                control.destroy_image_list(list.handle);
            }
            log::debug!("ImageCache: disposed image list {:?}", list.handle);
        }
        self.bitmap_indices.clear();
        self.file_icon_indices.clear();
    }

    pub(crate) fn apply_dpi<C: NativeTreeControl + ?Sized>(&mut self, control: &C, dpi: u32) {
        self.dispose(control);
        self.dpi = dpi;
    }
}
