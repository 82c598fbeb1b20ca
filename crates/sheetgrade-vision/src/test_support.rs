// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic answer sheets for unit tests.

use image::{Rgb, RgbImage};

const INK: Rgb<u8> = Rgb([0, 0, 0]);
const PENCIL: Rgb<u8> = Rgb([30, 30, 30]);
const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

/// A ruled answer table: one header row, one header column, and a grid of
/// answer cells, drawn with black lines on white paper.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SheetLayout {
    /// Top-left corner of the table on the canvas.
    pub origin: (u32, u32),
    /// Pitch between grid lines.
    pub cell: (u32, u32),
    /// Row count including the header row.
    pub rows: u32,
    /// Column count including the header column.
    pub cols: u32,
    pub line: u32,
    pub canvas: (u32, u32),
}

impl SheetLayout {
    /// Four questions with options A-D on a 420x340 photo.
    pub fn standard() -> Self {
        Self {
            origin: (40, 40),
            cell: (60, 50),
            rows: 5,
            cols: 5,
            line: 3,
            canvas: (420, 340),
        }
    }

    /// Distance between the outermost corner pixels of the table.
    pub fn table_size(&self) -> (u32, u32) {
        let (w, h) = self.table_extent();
        (w - 1, h - 1)
    }

    fn table_extent(&self) -> (u32, u32) {
        (
            self.cols * self.cell.0 + self.line,
            self.rows * self.cell.1 + self.line,
        )
    }

    /// The table on its canvas. `marks` are `(row, col)` grid indices, with
    /// row 1 the first question and col 1 option A.
    pub fn render(&self, marks: &[(u32, u32)]) -> RgbImage {
        self.draw(self.origin, self.canvas, marks)
    }

    /// The table alone, as the geometry stage would hand it on.
    pub fn render_table(&self, marks: &[(u32, u32)]) -> RgbImage {
        self.draw((0, 0), self.table_extent(), marks)
    }

    fn draw(&self, (ox, oy): (u32, u32), (w, h): (u32, u32), marks: &[(u32, u32)]) -> RgbImage {
        let mut img = RgbImage::from_pixel(w, h, PAPER);
        let (tw, th) = self.table_extent();

        for i in 0..=self.cols {
            let x0 = ox + i * self.cell.0;
            fill(&mut img, x0, oy, x0 + self.line, oy + th, INK);
        }
        for j in 0..=self.rows {
            let y0 = oy + j * self.cell.1;
            fill(&mut img, ox, y0, ox + tw, y0 + self.line, INK);
        }

        // Pencil marks are squares centered in the cell, leaving a ring of paper.
        for &(row, col) in marks {
            let cx = ox + col * self.cell.0 + self.line + (self.cell.0 - self.line) / 2;
            let cy = oy + row * self.cell.1 + self.line + (self.cell.1 - self.line) / 2;
            fill(&mut img, cx - 15, cy - 12, cx + 15, cy + 12, PENCIL);
        }
        img
    }
}

fn fill(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1.min(img.height()) {
        for x in x0..x1.min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}
