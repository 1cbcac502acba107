//! Synchronous unidirectional data flow: actions are dispatched to stores,
//! stores notify bound views, views hand element trees to a renderer.

pub mod config;
pub mod demo;
pub mod flux;
pub mod logging;
pub mod render;
