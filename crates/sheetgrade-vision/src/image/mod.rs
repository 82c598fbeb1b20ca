// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decoding, rotation, contrast, filters, and binarization.

pub mod filters;
pub mod processor;
pub mod threshold;

pub use processor::ImageProcessor;
pub use threshold::Polarity;
