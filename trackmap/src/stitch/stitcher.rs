//! Row-group by row-group mosaic assembly.

use tracing::{debug, info};

use super::{PngRowSource, ResizedSource, RowProducer, ScanlineEncoder, ScanlineSource, StitchError, TileStore};
use crate::coord::PixelDimensions;
use crate::grid::GridLayout;

/// Assembles stored tiles into one encoded image.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingStitcher;

impl StreamingStitcher {
    pub fn new() -> Self {
        Self
    }

    /// Streams every tile of `layout` from `store` through `encoder`.
    ///
    /// Only the sources of one row group are open at a time and only one
    /// mosaic line is buffered. `on_stitched` receives each sub-region's
    /// row-major index once its whole row group has been emitted.
    pub fn stitch<F>(
        &self,
        layout: &GridLayout,
        store: &dyn TileStore,
        encoder: &mut dyn ScanlineEncoder,
        on_stitched: F,
    ) -> Result<(), StitchError>
    where
        F: FnMut(usize),
    {
        if layout.is_empty() || layout.dimensions.area() == 0 {
            return Err(StitchError::EmptyLayout);
        }
        info!(
            tiles = layout.len(),
            rows = layout.rows,
            size = %layout.dimensions,
            "Stitching mosaic"
        );

        let mut mosaic = MosaicRows::new(layout, store, on_stitched);
        encoder.encode(&mut mosaic)?;
        mosaic.finish();
        Ok(())
    }
}

/// The mosaic as a stream of scanlines.
struct MosaicRows<'a, F> {
    layout: &'a GridLayout,
    store: &'a dyn TileStore,
    on_stitched: F,
    /// Next mosaic line to emit.
    cursor: u32,
    /// Row group whose sources are open, if any.
    group: usize,
    opened: bool,
    /// `(index, x offset, source)` of every open tile, left to right.
    sources: Vec<(usize, u32, Box<dyn ScanlineSource + 'a>)>,
    line: Vec<u8>,
}

impl<'a, F: FnMut(usize)> MosaicRows<'a, F> {
    fn new(layout: &'a GridLayout, store: &'a dyn TileStore, on_stitched: F) -> Self {
        Self {
            layout,
            store,
            on_stitched,
            cursor: 0,
            group: 0,
            opened: false,
            sources: Vec::new(),
            line: vec![0; layout.dimensions.row_bytes()],
        }
    }

    /// Opens one source per member of the current group, left to right.
    fn open_group(&mut self) -> Result<(), StitchError> {
        let (layout, store) = (self.layout, self.store);
        self.sources.clear();
        for &member in &layout.row_groups[self.group].members {
            let sub = &layout.ordered[member];
            let png = PngRowSource::new(sub.index, store.open(sub.index)?)?;
            let source: Box<dyn ScanlineSource + 'a> = if png.dimensions() == sub.cell.dimensions() {
                Box::new(png)
            } else {
                debug!(
                    index = sub.index,
                    stored = %png.dimensions(),
                    cell = %sub.cell.dimensions(),
                    "Resizing tile to its cell"
                );
                Box::new(ResizedSource::new(sub.index, png, sub.cell.dimensions()))
            };
            self.sources.push((sub.index, sub.cell.x, source));
        }
        self.opened = true;
        debug!(group = self.group, tiles = self.sources.len(), "Opened row group");
        Ok(())
    }

    /// Closes the current group and reports its members as stitched.
    fn close_group(&mut self) {
        self.sources.clear();
        self.opened = false;
        for &member in &self.layout.row_groups[self.group].members {
            (self.on_stitched)(self.layout.ordered[member].index);
        }
        self.group += 1;
    }

    /// Closes every group not yet reported, including empty trailing ones.
    fn finish(&mut self) {
        while self.group < self.layout.row_groups.len() {
            self.close_group();
        }
    }
}

impl<F: FnMut(usize)> RowProducer for MosaicRows<'_, F> {
    fn dimensions(&self) -> PixelDimensions {
        self.layout.dimensions
    }

    fn next_row(&mut self) -> Result<&[u8], StitchError> {
        let y = self.cursor;
        if y >= self.layout.dimensions.height {
            return Err(StitchError::PastEnd(y));
        }
        let layout = self.layout;
        while self.group < layout.row_groups.len() {
            let group = &layout.row_groups[self.group];
            if y < group.y + group.height {
                break;
            }
            self.close_group();
        }

        self.line.fill(0);
        let inside = layout
            .row_groups
            .get(self.group)
            .is_some_and(|group| y >= group.y);
        if inside {
            if !self.opened {
                self.open_group()?;
            }
            let line_len = self.line.len();
            let group_y = layout.row_groups[self.group].y;
            for (index, x, source) in &mut self.sources {
                let expected = source.dimensions().height;
                let row = source.next_row()?.ok_or(StitchError::ShortTile {
                    index: *index,
                    rows: y - group_y,
                    expected,
                })?;
                let start = (*x as usize * 4).min(line_len);
                let end = (start + row.len()).min(line_len);
                self.line[start..end].copy_from_slice(&row[..end - start]);
            }
        }

        self.cursor += 1;
        Ok(&self.line)
    }
}
