// The infra module contains implementations of core traits.
// Each collaborator implementation goes in its own submodule.

#[path = "source/http_source.rs"]
pub mod source;

#[path = "analysis/indicator_analyzer.rs"]
pub mod analysis;

#[path = "render/html_renderer.rs"]
pub mod render;

#[path = "storage/mod.rs"]
pub mod storage;

#[path = "tracker/mod.rs"]
pub mod tracker;

#[path = "catalog/json_catalog.rs"]
pub mod catalog;
