/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

pub mod api;
pub mod attachment;
pub mod builder;
pub mod client;
pub mod descriptor;
pub mod errors;
mod parsers;
pub mod properties;
pub mod reference;
pub mod unlink;
pub mod uploader;

pub use api::*;
pub use attachment::*;
pub use builder::*;
pub use client::*;
pub use descriptor::*;
pub use errors::*;
pub use properties::*;
pub use reference::*;
pub use unlink::*;
pub use uploader::*;
