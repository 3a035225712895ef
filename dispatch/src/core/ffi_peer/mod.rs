// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
mod ref_counted_peer;

// Re-export.
pub use ref_counted_peer::*;
