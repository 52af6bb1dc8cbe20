use smartstring::{LazyCompact, SmartString};

pub mod command;
pub mod config;
pub mod document;
pub mod editor;
pub mod history;
pub mod markup;
pub mod persistence;
pub mod selection;
pub mod surface;

pub type Tendril = SmartString<LazyCompact>;
