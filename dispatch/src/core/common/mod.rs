// Copyright (c) 2022-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod closure;
pub mod common_enums;
pub mod scoped_release;
pub mod thread_liveness;

// Re-export.
pub use closure::*;
pub use common_enums::*;
pub use scoped_release::*;
pub use thread_liveness::*;
